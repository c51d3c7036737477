//! CLI command implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use arbor_core::{FileKind, WorkspaceConfig};
use arbor_fs::{LocalFileSystem, MemoryWorkingSet, normalize};
use arbor_manager::ProjectManager;
use arbor_project::ProjectNotification;
use tokio::sync::broadcast;

pub async fn files(
    root: PathBuf,
    config_path: PathBuf,
    only: Option<String>,
) -> anyhow::Result<()> {
    let (manager, _) = start(&root, &config_path).await?;

    for id in manager.project_ids().await {
        if only.as_ref().is_some_and(|want| want != &id) {
            continue;
        }
        let Some(project) = manager.project(&id).await else {
            continue;
        };
        println!("{id}:");
        for file in project.files().await {
            let kind = project.file_kind(&file).await;
            println!("  {} [{}]", file.display(), kind_label(kind));
        }
    }

    manager.dispose().await;
    Ok(())
}

pub async fn resolve(root: PathBuf, config_path: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let (manager, _) = start(&root, &config_path).await?;

    let file = normalize(&std::path::absolute(&file)?);
    let project = manager.project_for_file(&file).await?;
    let owner = manager
        .id_of(&project)
        .await
        .unwrap_or_else(|| "(temporary project)".to_string());
    println!(
        "{} -> {} [{}]",
        file.display(),
        owner,
        kind_label(project.file_kind(&file).await)
    );

    manager.dispose().await;
    Ok(())
}

pub async fn watch(root: PathBuf, config_path: PathBuf) -> anyhow::Result<()> {
    let (manager, _fs) = start(&root, &config_path).await?;

    for id in manager.project_ids().await {
        let Some(project) = manager.project(&id).await else {
            continue;
        };
        tokio::spawn(log_notifications(id, project.subscribe()));
    }

    tracing::info!("watching, press ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    manager.dispose().await;
    Ok(())
}

/// Load the workspace config and bring every configured project up.
async fn start(
    root: &Path,
    config_path: &Path,
) -> anyhow::Result<(ProjectManager, Arc<LocalFileSystem>)> {
    let workspace = load_workspace(config_path)?;
    let fs = Arc::new(LocalFileSystem::new(root)?);
    let working_set = Arc::new(MemoryWorkingSet::new());
    let manager = ProjectManager::new(workspace.host.clone(), fs.clone(), working_set);
    manager.init(workspace.projects).await;
    Ok((manager, fs))
}

fn load_workspace(path: &Path) -> anyhow::Result<WorkspaceConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read workspace config {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("invalid workspace config {}", path.display()))
}

async fn log_notifications(id: String, mut rx: broadcast::Receiver<ProjectNotification>) {
    loop {
        match rx.recv().await {
            Ok(ProjectNotification::FileSetChanged) => {
                tracing::info!(project = %id, "file set changed");
            }
            Ok(ProjectNotification::ContentChanged { path, version }) => {
                tracing::info!(project = %id, path = %path.display(), version, "content changed");
            }
            Ok(ProjectNotification::Reinitialized) => {
                tracing::info!(project = %id, "project reinitialized");
            }
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn kind_label(kind: FileKind) -> &'static str {
    match kind {
        FileKind::Source => "source",
        FileKind::Reference => "reference",
        FileKind::None => "none",
    }
}
