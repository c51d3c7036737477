//! Analysis-engine binding

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_core::{CompilerOptions, ProjectError, ScriptSnapshot};
use arbor_fs::FileSystem;
use serde::Deserialize;
use tracing::info;

/// Manifest file defining an analysis engine inside its directory. A change
/// to this file is the hot-swap signal: the owning project tears itself
/// down and reinitializes against the re-resolved engine.
pub const ENGINE_MANIFEST: &str = "engine.toml";

/// Identity of a loaded analysis engine, parsed from its manifest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineSpec {
    pub name: String,
    pub version: String,
}

/// A resolved handle to the external analysis engine. The engine itself is
/// opaque; what the binding pins down is which directory defines it and
/// which manifest file to watch.
#[derive(Debug, Clone)]
pub struct EngineBinding {
    pub directory: PathBuf,
    pub manifest_path: PathBuf,
    pub spec: EngineSpec,
}

impl EngineBinding {
    /// Resolve the engine defined in `directory`. Failure here is fatal to
    /// project initialization.
    pub async fn load(fs: &Arc<dyn FileSystem>, directory: &Path) -> Result<Self, ProjectError> {
        let manifest_path = directory.join(ENGINE_MANIFEST);
        let text = fs.read_file(&manifest_path).await.map_err(|err| {
            ProjectError::EngineLoad {
                directory: directory.to_path_buf(),
                reason: err.to_string(),
            }
        })?;
        let spec: EngineSpec =
            toml::from_str(&text).map_err(|err| ProjectError::EngineLoad {
                directory: directory.to_path_buf(),
                reason: err.to_string(),
            })?;

        info!(engine = %spec.name, version = %spec.version, "loaded analysis engine");
        Ok(EngineBinding {
            directory: directory.to_path_buf(),
            manifest_path,
            spec,
        })
    }

    /// Whether a filesystem change to `path` invalidates this binding.
    pub fn defined_by(&self, path: &Path) -> bool {
        self.manifest_path == path
    }
}

/// The stable view a project exposes to its analysis engine: the file list
/// with per-file versioned content and open flags, plus the untouched
/// compiler-options bag.
#[derive(Debug, Clone)]
pub struct ProjectView {
    pub engine: EngineSpec,
    pub compiler_options: CompilerOptions,
    pub scripts: Vec<ScriptSnapshot>,
}
