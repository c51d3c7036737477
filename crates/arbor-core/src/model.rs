//! Core data structures for the project file-set model

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Membership a file has inside a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileKind {
    /// Selected directly by a configured source pattern.
    Source,
    /// Included only because another included file points at it.
    Reference,
    /// Not part of the project.
    None,
}

/// A change observed on the underlying filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Added(PathBuf),
    Removed(PathBuf),
    Updated(PathBuf),
}

impl FileEvent {
    /// The path this event concerns.
    pub fn path(&self) -> &PathBuf {
        match self {
            FileEvent::Added(p) | FileEvent::Removed(p) | FileEvent::Updated(p) => p,
        }
    }
}

/// A positional edit into a script buffer. Offsets are character offsets
/// into the current content, `start..end` is the replaced range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextEdit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TextEdit {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        TextEdit {
            start,
            end,
            text: text.into(),
        }
    }
}

/// How an edited document's new content is described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentChange {
    /// Whole-buffer replacement.
    FullText(String),
    /// A list of positional edits applied in order against the evolving buffer.
    Edits(Vec<TextEdit>),
}

/// A change observed on the editor's set of open documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingSetEvent {
    FilesAdded(Vec<PathBuf>),
    FilesRemoved(Vec<PathBuf>),
    DocumentEdited {
        path: PathBuf,
        change: DocumentChange,
    },
}
