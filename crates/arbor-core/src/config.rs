//! Project and host configuration

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque compiler-options bag, passed through to the analysis engine
/// untouched. The core itself only ever inspects the `noLib` flag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompilerOptions(pub Map<String, Value>);

impl CompilerOptions {
    /// Whether the default library file should be skipped.
    pub fn no_default_lib(&self) -> bool {
        self.0.get("noLib").and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }
}

/// Immutable configuration snapshot of one project. A config update
/// wholesale-replaces the previous snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Directory source patterns are resolved against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    /// Glob patterns selecting the project's source roots, relative to
    /// `base_dir`. May escape upward with `..`.
    pub sources: Vec<String>,
    #[serde(default)]
    pub compiler_options: CompilerOptions,
    /// Overrides the host's default analysis-engine directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_directory: Option<PathBuf>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from("/")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            base_dir: default_base_dir(),
            sources: Vec::new(),
            compiler_options: CompilerOptions::default(),
            compiler_directory: None,
        }
    }
}

impl ProjectConfig {
    /// Config of a throwaway single-file project: the file itself is the
    /// sole source pattern, rooted at its parent directory.
    pub fn single_file(path: &Path) -> Self {
        let base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(default_base_dir);
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        ProjectConfig {
            base_dir,
            sources: vec![name],
            ..ProjectConfig::default()
        }
    }
}

/// Host-level options every project shares: where the default library file
/// lives and which directory defines the analysis engine when a project
/// does not override it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostOptions {
    pub default_lib: PathBuf,
    pub engine_dir: PathBuf,
}

impl HostOptions {
    /// The engine directory a given project config resolves to.
    pub fn engine_dir_for(&self, config: &ProjectConfig) -> PathBuf {
        config
            .compiler_directory
            .clone()
            .unwrap_or_else(|| self.engine_dir.clone())
    }
}

/// Top-level configuration file consumed by the binary: the host options
/// plus one project config per project id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    #[serde(flatten)]
    pub host: HostOptions,
    pub projects: BTreeMap<String, ProjectConfig>,
}
