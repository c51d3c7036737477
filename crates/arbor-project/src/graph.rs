//! Dependency graph engine: owns one project's file set

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_core::{FileKind, ProjectConfig, ProjectError, ScriptRegistry};
use arbor_fs::{FileSystem, PatternSet};
use tracing::{debug, warn};

use crate::refs::extract_references;

/// Maintains the transitive closure of pattern-matched source roots plus
/// every file reachable from them through reference/import edges. Edges are
/// never stored; every pass re-derives them from current content, so the
/// reverse-reference invariant (a file stays exactly as long as something
/// live reaches it) holds by construction.
///
/// All mutation goes through the owning project's task queue, so the
/// methods here can assume single-threaded access.
pub struct FileGraph {
    fs: Arc<dyn FileSystem>,
    registry: Arc<ScriptRegistry>,
    patterns: PatternSet,
    default_lib: Option<PathBuf>,
    /// Existing files currently matched by the source patterns.
    source_files: HashSet<PathBuf>,
    /// The current file set.
    members: HashSet<PathBuf>,
    /// Referenced paths that could not be read in the last pass. Candidate
    /// nodes without content; they materialize if the filesystem later
    /// confirms them.
    missing_refs: HashSet<PathBuf>,
}

impl FileGraph {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        registry: Arc<ScriptRegistry>,
        config: &ProjectConfig,
        default_lib: &Path,
    ) -> Self {
        FileGraph {
            fs,
            registry,
            patterns: PatternSet::compile(&config.base_dir, &config.sources),
            default_lib: (!config.compiler_options.no_default_lib())
                .then(|| default_lib.to_path_buf()),
            source_files: HashSet::new(),
            members: HashSet::new(),
            missing_refs: HashSet::new(),
        }
    }

    /// Enumerate the filesystem, seed the source roots, and compute the
    /// initial closure. Unreadable files are skipped and kept as pending
    /// candidates; only the project layer's engine load can fail an init.
    pub async fn initialize(&mut self) -> Result<(), ProjectError> {
        self.enumerate_sources().await;
        self.recompute().await;
        debug!(
            files = self.members.len(),
            roots = self.source_files.len(),
            "project file set initialized"
        );
        Ok(())
    }

    /// A file appeared. New source roots and previously missing reference
    /// targets join the set; anything else is not ours to track.
    pub async fn handle_file_added(&mut self, path: &Path) {
        if self.patterns.matches(path) {
            self.source_files.insert(path.to_path_buf());
            self.recompute().await;
        } else if self.missing_refs.contains(path) {
            self.recompute().await;
        }
    }

    /// A file disappeared. Dropping a referencer can strand files that are
    /// only reachable through it, so the closure is recomputed globally.
    pub async fn handle_file_removed(&mut self, path: &Path) {
        let was_root = self.source_files.remove(path);
        if self.members.remove(path) {
            // Drop the cached content first so remaining referencers
            // observe the loss instead of resurrecting it.
            self.registry.remove(path);
            self.recompute().await;
        } else if was_root {
            self.recompute().await;
        }
    }

    /// A tracked file's on-disk content changed: reload, bump its version,
    /// and recompute, since its reference directives may have changed.
    pub async fn handle_file_updated(&mut self, path: &Path) {
        if !self.members.contains(path) {
            return;
        }
        match self.fs.read_file(path).await {
            Ok(content) => {
                let _ = self.registry.set_full_text(path, content);
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "updated file became unreadable");
                return;
            }
        }
        self.recompute().await;
    }

    /// Swap in a new config snapshot: new pattern set, new default-lib
    /// policy, fresh enumeration, recomputed closure. Files surviving the
    /// transition keep their content, version and open flag.
    pub async fn update_config(&mut self, config: &ProjectConfig, default_lib: &Path) {
        self.patterns = PatternSet::compile(&config.base_dir, &config.sources);
        self.default_lib = (!config.compiler_options.no_default_lib())
            .then(|| default_lib.to_path_buf());
        self.enumerate_sources().await;
        self.recompute().await;
    }

    /// Fixed-point traversal from all roots. Content comes from the
    /// registry for files already held (preserving in-memory edits) and
    /// from the filesystem for newcomers. The per-pass visited set keeps
    /// circular references from looping; only membership matters, so the
    /// result is independent of traversal order.
    pub(crate) async fn recompute(&mut self) {
        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut reached: HashSet<PathBuf> = HashSet::new();
        let mut missing: HashSet<PathBuf> = HashSet::new();

        let mut queue: VecDeque<PathBuf> = self.source_files.iter().cloned().collect();
        queue.extend(self.default_lib.clone());

        while let Some(path) = queue.pop_front() {
            if !visited.insert(path.clone()) {
                continue;
            }
            let content = match self.registry.content(&path) {
                Some(held) => held,
                None => match self.fs.read_file(&path).await {
                    Ok(read) => read,
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "candidate has no content yet");
                        missing.insert(path);
                        continue;
                    }
                },
            };
            for target in extract_references(&content, &path) {
                if !visited.contains(&target) {
                    queue.push_back(target);
                }
            }
            if !self.registry.contains(&path) {
                self.registry.insert(path.clone(), content);
            }
            reached.insert(path);
        }

        for stale in self.members.difference(&reached) {
            self.registry.remove(stale);
        }
        self.members = reached;
        self.missing_refs = missing;
    }

    async fn enumerate_sources(&mut self) {
        let listed = match self.fs.list_files(self.patterns.enumeration_base()).await {
            Ok(listed) => listed,
            Err(err) => {
                warn!(error = %err, "filesystem enumeration failed, no source roots");
                Vec::new()
            }
        };
        self.source_files = listed
            .into_iter()
            .filter(|path| self.patterns.matches(path))
            .collect();
    }

    /// Membership first, then pattern precedence: a file both matched and
    /// referenced reports `Source`.
    pub fn file_kind(&self, path: &Path) -> FileKind {
        if !self.members.contains(path) {
            FileKind::None
        } else if self.source_files.contains(path) {
            FileKind::Source
        } else {
            FileKind::Reference
        }
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.members.contains(path)
    }

    /// Sorted snapshot of the current file set.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.members.iter().cloned().collect();
        files.sort();
        files
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
