//! End-to-end tests wiring the workspace config, manager, and collaborators
//! together the way the binary does.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arbor_core::{FileKind, WorkspaceConfig};
use arbor_fs::{LocalFileSystem, MemoryFileSystem, MemoryWorkingSet, FileSystem};
use arbor_manager::ProjectManager;
use tempfile::TempDir;

const MANIFEST: &str = "name = \"typeline\"\nversion = \"1.0.0\"\n";

fn paths(strs: &[&str]) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = strs.iter().map(PathBuf::from).collect();
    out.sort();
    out
}

#[tokio::test]
async fn workspace_config_drives_the_manager() {
    let raw = r#"{
        "defaultLib": "/lib.d.ts",
        "engineDir": "/typeline",
        "projects": {
            "app": {
                "baseDir": "/root/project",
                "sources": ["../file1.ts", "src/**/*ts"]
            },
            "scripts": {
                "baseDir": "/scripts",
                "sources": ["**/*.ts"],
                "compilerOptions": { "noLib": true }
            }
        }
    }"#;
    let workspace: WorkspaceConfig = serde_json::from_str(raw).unwrap();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.set_files([
        ("/typeline/engine.toml", MANIFEST),
        ("/lib.d.ts", ""),
        ("/root/file1.ts", ""),
        ("/root/project/src/file3.ts", "import './file4'"),
        ("/root/project/src/file4.ts", ""),
        ("/scripts/tool.ts", ""),
    ]);
    let manager = ProjectManager::new(
        workspace.host.clone(),
        fs.clone(),
        Arc::new(MemoryWorkingSet::new()),
    );
    manager.init(workspace.projects).await;

    let app = manager.project("app").await.unwrap();
    assert_eq!(
        app.files().await,
        paths(&[
            "/lib.d.ts",
            "/root/file1.ts",
            "/root/project/src/file3.ts",
            "/root/project/src/file4.ts",
        ])
    );

    // noLib keeps the default library out of the second project.
    let scripts = manager.project("scripts").await.unwrap();
    assert_eq!(scripts.files().await, paths(&["/scripts/tool.ts"]));

    manager.dispose().await;
}

#[tokio::test]
async fn resolution_policy_end_to_end() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.set_files([
        ("/typeline/engine.toml", MANIFEST),
        ("/file1.ts", ""),
        ("/file2.ts", "import './file1'"),
        ("/file5.ts", ""),
    ]);
    let workspace: WorkspaceConfig = serde_json::from_str(
        r#"{
            "defaultLib": "/lib.d.ts",
            "engineDir": "/typeline",
            "projects": {
                "a": { "baseDir": "/", "sources": ["file1.ts"] },
                "b": { "baseDir": "/", "sources": ["file2.ts"] }
            }
        }"#,
    )
    .unwrap();
    let manager = ProjectManager::new(
        workspace.host.clone(),
        fs.clone(),
        Arc::new(MemoryWorkingSet::new()),
    );
    manager.init(workspace.projects).await;

    // file1 is a source of "a" and a reference of "b": the source holder wins.
    let owner = manager.project_for_file(Path::new("/file1.ts")).await.unwrap();
    assert_eq!(manager.id_of(&owner).await.as_deref(), Some("a"));
    assert_eq!(owner.file_kind(Path::new("/file1.ts")).await, FileKind::Source);

    // file5 belongs to nobody and lands in the shared temporary project.
    let temp = manager.project_for_file(Path::new("/file5.ts")).await.unwrap();
    assert!(manager.id_of(&temp).await.is_none());
    let temp_again = manager.project_for_file(Path::new("/file5.ts")).await.unwrap();
    assert!(temp.ptr_eq(&temp_again));

    manager.dispose().await;
}

#[tokio::test]
async fn live_updates_flow_through_the_manager() {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.set_files([
        ("/typeline/engine.toml", MANIFEST),
        ("/src/a.ts", ""),
    ]);
    let workspace: WorkspaceConfig = serde_json::from_str(
        r#"{
            "defaultLib": "/lib.d.ts",
            "engineDir": "/typeline",
            "projects": {
                "main": { "baseDir": "/", "sources": ["src/**/*.ts"] }
            }
        }"#,
    )
    .unwrap();
    let manager = ProjectManager::new(
        workspace.host.clone(),
        fs.clone(),
        Arc::new(MemoryWorkingSet::new()),
    );
    manager.init(workspace.projects).await;
    let project = manager.project("main").await.unwrap();
    assert_eq!(project.files().await, paths(&["/src/a.ts"]));

    fs.add_file("/src/b.ts", "import './c'");
    fs.add_file("/src/c.ts", "");
    project.settle().await;

    assert_eq!(
        project.files().await,
        paths(&["/src/a.ts", "/src/b.ts", "/src/c.ts"])
    );

    fs.remove_file("/src/b.ts");
    project.settle().await;
    assert_eq!(project.files().await, paths(&["/src/a.ts", "/src/c.ts"]));

    manager.dispose().await;
}

#[tokio::test]
async fn real_disk_project_initializes_over_local_filesystem() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("engine")).unwrap();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::write(root.join("engine/engine.toml"), MANIFEST).unwrap();
    std::fs::write(root.join("lib.d.ts"), "").unwrap();
    std::fs::write(root.join("src/main.ts"), "import './util'").unwrap();
    std::fs::write(root.join("src/util.ts"), "export {}").unwrap();
    std::fs::write(root.join("src/readme.md"), "not a source").unwrap();

    let fs = Arc::new(LocalFileSystem::new(root).unwrap());
    let listed = fs.list_files(&root.join("src")).await.unwrap();
    assert_eq!(listed.len(), 3);

    let workspace: WorkspaceConfig = serde_json::from_str(&format!(
        r#"{{
            "defaultLib": "{root}/lib.d.ts",
            "engineDir": "{root}/engine",
            "projects": {{
                "main": {{ "baseDir": "{root}", "sources": ["src/**/*.ts"] }}
            }}
        }}"#,
        root = root.display()
    ))
    .unwrap();
    let manager = ProjectManager::new(
        workspace.host.clone(),
        fs.clone(),
        Arc::new(MemoryWorkingSet::new()),
    );
    manager.init(workspace.projects).await;

    let project = manager.project("main").await.unwrap();
    let files = project.files().await;
    assert!(files.contains(&root.join("src/main.ts")));
    assert!(files.contains(&root.join("src/util.ts")));
    assert!(files.contains(&root.join("lib.d.ts")));
    assert!(!files.iter().any(|f| f.ends_with("readme.md")));

    manager.dispose().await;
}
