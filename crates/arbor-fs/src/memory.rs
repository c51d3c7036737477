//! In-memory filesystem, for tests and embedding

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use arbor_core::{FileEvent, ProjectError};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::fs::FileSystem;
use crate::path::normalize;

/// A flat path → content map implementing [`FileSystem`]. Mutations dispatch
/// the same change notifications the real filesystem would, which makes it a
/// faithful stand-in for driving projects in tests.
pub struct MemoryFileSystem {
    files: RwLock<HashMap<PathBuf, String>>,
    events: broadcast::Sender<FileEvent>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        MemoryFileSystem {
            files: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Replace the whole file map without dispatching events. Used to seed
    /// initial state.
    pub fn set_files<P, C, I>(&self, files: I)
    where
        P: AsRef<Path>,
        C: Into<String>,
        I: IntoIterator<Item = (P, C)>,
    {
        let mut map = self.files.write().unwrap();
        map.clear();
        for (path, content) in files {
            map.insert(normalize(path.as_ref()), content.into());
        }
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = normalize(path.as_ref());
        self.files
            .write()
            .unwrap()
            .insert(path.clone(), content.into());
        let _ = self.events.send(FileEvent::Added(path));
    }

    pub fn update_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = normalize(path.as_ref());
        self.files
            .write()
            .unwrap()
            .insert(path.clone(), content.into());
        let _ = self.events.send(FileEvent::Updated(path));
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.files.write().unwrap().remove(&path);
        let _ = self.events.send(FileEvent::Removed(path));
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files
            .read()
            .unwrap()
            .contains_key(&normalize(path.as_ref()))
    }
}

impl Default for MemoryFileSystem {
    fn default() -> Self {
        MemoryFileSystem::new()
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn list_files(&self, base: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        let files = self.files.read().unwrap();
        let mut listed: Vec<PathBuf> = files
            .keys()
            .filter(|path| path.starts_with(base))
            .cloned()
            .collect();
        listed.sort();
        Ok(listed)
    }

    async fn read_file(&self, path: &Path) -> Result<String, ProjectError> {
        let path = normalize(path);
        self.files
            .read()
            .unwrap()
            .get(&path)
            .cloned()
            .ok_or_else(|| ProjectError::Unreadable {
                path,
                reason: "no such file".into(),
            })
    }

    fn subscribe(&self) -> broadcast::Receiver<FileEvent> {
        self.events.subscribe()
    }
}
