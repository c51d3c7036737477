//! Unit tests for arbor-core

use std::path::{Path, PathBuf};

use crate::config::{CompilerOptions, ProjectConfig, WorkspaceConfig};
use crate::error::ProjectError;
use crate::model::TextEdit;
use crate::scripts::ScriptRegistry;

#[test]
fn registry_tracks_versions_monotonically() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    registry.insert(path.clone(), String::new());
    assert_eq!(registry.version(&path), Some(0));

    let v1 = registry
        .set_full_text(&path, "console.log('hello world')".into())
        .unwrap();
    let v2 = registry
        .apply_edits(&path, &[TextEdit::new(8, 11, "warn")])
        .unwrap();
    assert!(v2 > v1);
    assert_eq!(registry.version(&path), Some(v2));
}

#[test]
fn positional_edit_splices_at_offset() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    registry.insert(path.clone(), "console.log('hello world')".into());

    registry
        .apply_edits(&path, &[TextEdit::new(8, 11, "warn")])
        .unwrap();
    assert_eq!(
        registry.content(&path).unwrap(),
        "console.warn('hello world')"
    );
}

#[test]
fn edit_list_applies_against_evolving_buffer() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    registry.insert(path.clone(), String::new());

    registry
        .apply_edits(
            &path,
            &[
                TextEdit::new(0, 0, "console.log('hello world')"),
                TextEdit::new(8, 11, "warn"),
            ],
        )
        .unwrap();
    assert_eq!(
        registry.content(&path).unwrap(),
        "console.warn('hello world')"
    );
}

#[test]
fn out_of_range_edit_fails_and_leaves_content_unchanged() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    registry.insert(path.clone(), "short".into());
    let version = registry.version(&path).unwrap();

    let err = registry
        .apply_edits(
            &path,
            &[TextEdit::new(0, 2, "ok"), TextEdit::new(100, 200, "nope")],
        )
        .unwrap_err();
    assert!(matches!(err, ProjectError::EditOutOfRange { .. }));
    assert_eq!(registry.content(&path).unwrap(), "short");
    assert_eq!(registry.version(&path), Some(version));
}

#[test]
fn edit_offsets_are_character_based() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    registry.insert(path.clone(), "let π = 3;".into());

    registry
        .apply_edits(&path, &[TextEdit::new(4, 5, "tau")])
        .unwrap();
    assert_eq!(registry.content(&path).unwrap(), "let tau = 3;");
}

#[test]
fn open_flag_follows_set_open() {
    let registry = ScriptRegistry::new();
    let path = PathBuf::from("/src/file1.ts");
    assert!(!registry.set_open(&path, true));

    registry.insert(path.clone(), String::new());
    assert!(registry.set_open(&path, true));
    assert!(registry.is_open(&path));
    assert!(registry.set_open(&path, false));
    assert!(!registry.is_open(&path));
}

#[test]
fn no_lib_flag_is_read_from_compiler_options() {
    let mut options = CompilerOptions::default();
    assert!(!options.no_default_lib());

    options.set("noLib", serde_json::Value::Bool(true));
    assert!(options.no_default_lib());

    options.set("noLib", serde_json::Value::String("yes".into()));
    assert!(!options.no_default_lib());
}

#[test]
fn single_file_config_uses_parent_as_base() {
    let config = ProjectConfig::single_file(Path::new("/root/other/file5.ts"));
    assert_eq!(config.base_dir, PathBuf::from("/root/other"));
    assert_eq!(config.sources, vec!["file5.ts".to_string()]);
    assert!(config.compiler_directory.is_none());
}

#[test]
fn workspace_config_deserializes_camel_case() {
    let raw = r#"{
        "defaultLib": "/lib.d.ts",
        "engineDir": "/opt/engine",
        "projects": {
            "main": {
                "baseDir": "/root/project",
                "sources": ["src/**/*.ts"],
                "compilerOptions": { "noLib": true },
                "compilerDirectory": "/opt/other-engine"
            }
        }
    }"#;

    let config: WorkspaceConfig = serde_json::from_str(raw).unwrap();
    assert_eq!(config.host.default_lib, PathBuf::from("/lib.d.ts"));
    assert_eq!(config.host.engine_dir, PathBuf::from("/opt/engine"));

    let main = &config.projects["main"];
    assert_eq!(main.base_dir, PathBuf::from("/root/project"));
    assert!(main.compiler_options.no_default_lib());
    assert_eq!(
        main.compiler_directory,
        Some(PathBuf::from("/opt/other-engine"))
    );
}
