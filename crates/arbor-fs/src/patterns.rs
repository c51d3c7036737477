//! Source-pattern matching against the filesystem

use std::path::{Component, Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::warn;

use crate::path::normalize;

/// A compiled set of source patterns, resolved against a project's base
/// directory. Malformed patterns are dropped with a warning and contribute
/// nothing; compilation itself never fails.
#[derive(Debug)]
pub struct PatternSet {
    base: PathBuf,
    set: GlobSet,
    pattern_count: usize,
    enumeration_base: PathBuf,
}

impl PatternSet {
    pub fn compile(base: &Path, patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_count = 0;
        let mut enumeration_base: Option<PathBuf> = None;

        for pattern in patterns {
            let resolved = normalize(&base.join(pattern));
            let resolved_str = resolved.to_string_lossy();
            match GlobBuilder::new(&resolved_str).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    pattern_count += 1;
                    let prefix = static_prefix(&resolved);
                    enumeration_base = Some(match enumeration_base {
                        Some(current) => common_ancestor(&current, &prefix),
                        None => prefix,
                    });
                }
                Err(err) => {
                    warn!(pattern = %pattern, error = %err, "skipping malformed source pattern");
                }
            }
        }

        let set = builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "source pattern set failed to compile, matching nothing");
            GlobSet::empty()
        });

        PatternSet {
            base: base.to_path_buf(),
            set,
            pattern_count,
            enumeration_base: enumeration_base.unwrap_or_else(|| base.to_path_buf()),
        }
    }

    /// Whether `path` is selected as a source root by any pattern.
    pub fn matches(&self, path: &Path) -> bool {
        self.set.is_match(path)
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The highest directory filesystem enumeration has to start from so
    /// every pattern (including ones escaping upward with `..`) can see its
    /// matches.
    pub fn enumeration_base(&self) -> &Path {
        &self.enumeration_base
    }

    pub fn is_empty(&self) -> bool {
        self.pattern_count == 0
    }
}

/// Leading directory components of a resolved pattern up to the first glob
/// metacharacter. For a fully literal pattern this is its parent directory.
fn static_prefix(resolved: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in resolved.components() {
        if let Component::Normal(part) = component {
            let part = part.to_string_lossy();
            if part.contains(['*', '?', '[', '{']) {
                return prefix;
            }
        }
        prefix.push(component);
    }
    // No glob at all: the last component names a file.
    prefix.pop();
    prefix
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for (left, right) in a.components().zip(b.components()) {
        if left == right {
            out.push(left);
        } else {
            break;
        }
    }
    out
}
