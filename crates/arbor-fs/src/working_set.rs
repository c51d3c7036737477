//! Working-set collaborator: the editor's open-document list

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use arbor_core::{DocumentChange, WorkingSetEvent};
use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::path::normalize;

/// The editor's currently-open-for-editing file list, plus notifications
/// about membership changes and document edits.
#[async_trait]
pub trait WorkingSet: Send + Sync {
    /// Current membership snapshot.
    async fn files(&self) -> Vec<PathBuf>;

    /// Subscribe to membership and edit notifications.
    fn subscribe(&self) -> broadcast::Receiver<WorkingSetEvent>;
}

/// In-memory [`WorkingSet`], driven programmatically. Stands in for an
/// editor in tests and headless runs.
pub struct MemoryWorkingSet {
    files: RwLock<Vec<PathBuf>>,
    events: broadcast::Sender<WorkingSetEvent>,
}

impl MemoryWorkingSet {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        MemoryWorkingSet {
            files: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Replace membership without dispatching events. Used to seed state.
    pub fn set_files<P: AsRef<Path>>(&self, files: impl IntoIterator<Item = P>) {
        *self.files.write().unwrap() = files
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .collect();
    }

    pub fn add_files<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) {
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .collect();
        let mut files = self.files.write().unwrap();
        for path in &paths {
            if !files.contains(path) {
                files.push(path.clone());
            }
        }
        drop(files);
        let _ = self.events.send(WorkingSetEvent::FilesAdded(paths));
    }

    pub fn remove_files<P: AsRef<Path>>(&self, paths: impl IntoIterator<Item = P>) {
        let paths: Vec<PathBuf> = paths
            .into_iter()
            .map(|p| normalize(p.as_ref()))
            .collect();
        self.files
            .write()
            .unwrap()
            .retain(|existing| !paths.contains(existing));
        let _ = self.events.send(WorkingSetEvent::FilesRemoved(paths));
    }

    pub fn edit_document(&self, path: impl AsRef<Path>, change: DocumentChange) {
        let _ = self.events.send(WorkingSetEvent::DocumentEdited {
            path: normalize(path.as_ref()),
            change,
        });
    }
}

impl Default for MemoryWorkingSet {
    fn default() -> Self {
        MemoryWorkingSet::new()
    }
}

#[async_trait]
impl WorkingSet for MemoryWorkingSet {
    async fn files(&self) -> Vec<PathBuf> {
        self.files.read().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<WorkingSetEvent> {
        self.events.subscribe()
    }
}
