//! Lightweight textual extraction of reference/import targets

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use arbor_fs::resolve_relative;
use regex::Regex;

/// Implicit extension tried for extensionless module specifiers.
const DEFAULT_EXT: &str = "ts";

/// Triple-slash reference directives: `/// <reference path="./file.ts" />`.
static REFERENCE_DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"///\s*<reference\s+path\s*=\s*["']([^"']+)["']"#).unwrap()
});

/// Import/require expressions with a quoted relative specifier. Bare and
/// absolute specifiers are out of scope and ignored.
static RELATIVE_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:\bimport\b[^"'\r\n]*|\brequire\s*\(\s*)["'](\.\.?/[^"']+)["']"#).unwrap()
});

/// Scan `content` for files it pulls into the project. Resolution is purely
/// lexical against the referencing file's directory; nothing is checked
/// against the filesystem, the graph engine decides what the candidate
/// paths mean. An extensionless specifier yields two candidates, the bare
/// path and the path with the implicit default extension.
pub fn extract_references(content: &str, path: &Path) -> HashSet<PathBuf> {
    let dir = path.parent().unwrap_or_else(|| Path::new("/"));
    let mut targets = HashSet::new();

    for capture in REFERENCE_DIRECTIVE.captures_iter(content) {
        targets.insert(resolve_relative(dir, Path::new(&capture[1])));
    }
    for capture in RELATIVE_IMPORT.captures_iter(content) {
        let resolved = resolve_relative(dir, Path::new(&capture[1]));
        if resolved.extension().is_none() {
            targets.insert(resolved.with_extension(DEFAULT_EXT));
        }
        targets.insert(resolved);
    }

    targets
}
