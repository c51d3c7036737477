//! Filesystem collaborator trait

use std::path::{Path, PathBuf};

use arbor_core::{FileEvent, ProjectError};
use async_trait::async_trait;
use tokio::sync::broadcast;

/// The filesystem as projects see it: enumeration, reads, and a stream of
/// change notifications. Projects never touch the disk directly, which is
/// what lets tests run against [`crate::MemoryFileSystem`].
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Every plain file reachable under `base`, as absolute normalized paths.
    async fn list_files(&self, base: &Path) -> Result<Vec<PathBuf>, ProjectError>;

    /// Full text content of one file.
    async fn read_file(&self, path: &Path) -> Result<String, ProjectError>;

    /// Subscribe to change notifications. Every subscriber sees every event.
    fn subscribe(&self) -> broadcast::Receiver<FileEvent>;
}
