//! Per-file content, version, and open-flag registry

use std::path::{Path, PathBuf};

use dashmap::DashMap;

use crate::error::ProjectError;
use crate::model::TextEdit;

/// One tracked script buffer. The version is bumped on every observable
/// content change and never decreases; the analysis engine uses it to
/// detect "nothing changed since last query" cheaply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Script {
    pub content: String,
    pub version: u64,
    pub open: bool,
}

/// Read-only view of one script, handed to the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSnapshot {
    pub path: PathBuf,
    pub content: String,
    pub version: u64,
    pub open: bool,
}

/// Holds content, version and open flag for every file of one project.
/// Mutations arrive serialized through the project's update queue; reads
/// may come from anywhere, hence the concurrent map.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: DashMap<PathBuf, Script>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        ScriptRegistry::default()
    }

    /// Start tracking a file at version 0.
    pub fn insert(&self, path: PathBuf, content: String) {
        self.scripts.insert(
            path,
            Script {
                content,
                version: 0,
                open: false,
            },
        );
    }

    pub fn remove(&self, path: &Path) {
        self.scripts.remove(path);
    }

    pub fn clear(&self) {
        self.scripts.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.scripts.contains_key(path)
    }

    pub fn content(&self, path: &Path) -> Option<String> {
        self.scripts.get(path).map(|s| s.content.clone())
    }

    pub fn version(&self, path: &Path) -> Option<u64> {
        self.scripts.get(path).map(|s| s.version)
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.scripts.get(path).map(|s| s.open).unwrap_or(false)
    }

    /// Mirror working-set membership onto a tracked file. Returns false if
    /// the file is not tracked.
    pub fn set_open(&self, path: &Path, open: bool) -> bool {
        match self.scripts.get_mut(path) {
            Some(mut script) => {
                script.open = open;
                true
            }
            None => false,
        }
    }

    /// Whole-buffer replacement. Bumps the version and returns it.
    pub fn set_full_text(&self, path: &Path, text: String) -> Result<u64, ProjectError> {
        let mut script = self
            .scripts
            .get_mut(path)
            .ok_or_else(|| ProjectError::UnknownFile {
                path: path.to_path_buf(),
            })?;
        script.content = text;
        script.version += 1;
        Ok(script.version)
    }

    /// Apply positional edits in order against the evolving buffer. The call
    /// is all-or-nothing: any out-of-range edit fails it and leaves the
    /// content untouched. Bumps the version once and returns it.
    pub fn apply_edits(&self, path: &Path, edits: &[TextEdit]) -> Result<u64, ProjectError> {
        let mut script = self
            .scripts
            .get_mut(path)
            .ok_or_else(|| ProjectError::UnknownFile {
                path: path.to_path_buf(),
            })?;
        let mut content = script.content.clone();
        for edit in edits {
            content = splice(&content, edit, path)?;
        }
        script.content = content;
        script.version += 1;
        Ok(script.version)
    }

    pub fn snapshot(&self, path: &Path) -> Option<ScriptSnapshot> {
        self.scripts.get(path).map(|s| ScriptSnapshot {
            path: path.to_path_buf(),
            content: s.content.clone(),
            version: s.version,
            open: s.open,
        })
    }

    /// Snapshot of every tracked script, sorted by path.
    pub fn snapshots(&self) -> Vec<ScriptSnapshot> {
        let mut all: Vec<ScriptSnapshot> = self
            .scripts
            .iter()
            .map(|entry| ScriptSnapshot {
                path: entry.key().clone(),
                content: entry.value().content.clone(),
                version: entry.value().version,
                open: entry.value().open,
            })
            .collect();
        all.sort_by(|a, b| a.path.cmp(&b.path));
        all
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.scripts.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Replace the character range `edit.start..edit.end` with `edit.text`.
fn splice(content: &str, edit: &TextEdit, path: &Path) -> Result<String, ProjectError> {
    let len = content.chars().count();
    if edit.start > edit.end || edit.end > len {
        return Err(ProjectError::EditOutOfRange {
            path: path.to_path_buf(),
            start: edit.start,
            end: edit.end,
            len,
        });
    }
    let mut out = String::with_capacity(content.len() + edit.text.len());
    out.extend(content.chars().take(edit.start));
    out.push_str(&edit.text);
    out.extend(content.chars().skip(edit.end));
    Ok(out)
}
