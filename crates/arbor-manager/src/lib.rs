//! Arbor Manager — multi-project registry and file-to-project resolution

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use arbor_core::{FileKind, HostOptions, ProjectConfig, ProjectError};
use arbor_fs::{FileSystem, WorkingSet};
use arbor_project::Project;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};


/// Owns every configured project plus one shared temporary project for
/// files nothing claims. Projects iterate (and therefore resolve) in
/// sorted-id order.
pub struct ProjectManager {
    fs: Arc<dyn FileSystem>,
    working_set: Arc<dyn WorkingSet>,
    host: HostOptions,
    projects: RwLock<BTreeMap<String, Project>>,
    /// The single temporary-project slot. The lock is held across the whole
    /// resolution body, which is what keeps two concurrent lookups from
    /// racing to create two temporaries.
    temp: Mutex<Option<Project>>,
}

impl ProjectManager {
    pub fn new(
        host: HostOptions,
        fs: Arc<dyn FileSystem>,
        working_set: Arc<dyn WorkingSet>,
    ) -> Self {
        ProjectManager {
            fs,
            working_set,
            host,
            projects: RwLock::new(BTreeMap::new()),
            temp: Mutex::new(None),
        }
    }

    /// Create and initialize one project per config entry. A project that
    /// fails to initialize stays registered non-ready; a later config
    /// update or engine arrival can still bring it up.
    pub async fn init(&self, configs: BTreeMap<String, ProjectConfig>) {
        let mut projects = self.projects.write().await;
        for (id, config) in configs {
            let project = self.create_project(config).await;
            projects.insert(id, project);
        }
    }

    /// Reconcile against a new configuration map: dispose removed ids,
    /// create newly present ones, update the rest in place.
    pub async fn update_configs(&self, new_configs: BTreeMap<String, ProjectConfig>) {
        let mut projects = self.projects.write().await;

        let removed: Vec<String> = projects
            .keys()
            .filter(|id| !new_configs.contains_key(*id))
            .cloned()
            .collect();
        for id in removed {
            if let Some(project) = projects.remove(&id) {
                project.dispose();
                info!(project = %id, "project removed from configuration");
            }
        }

        for (id, config) in new_configs {
            match projects.get(&id) {
                Some(project) => {
                    if let Err(err) = project.update(config).await {
                        warn!(project = %id, error = %err, "project update failed");
                    }
                }
                None => {
                    let project = self.create_project(config).await;
                    projects.insert(id, project);
                }
            }
        }
    }

    /// Dispose every owned project, the temporary one included. Idempotent.
    /// Lock order matches `project_for_file`: temp slot first, registry
    /// second.
    pub async fn dispose(&self) {
        let mut temp = self.temp.lock().await;
        let mut projects = self.projects.write().await;
        for project in projects.values() {
            project.dispose();
        }
        projects.clear();
        if let Some(temporary) = temp.take() {
            temporary.dispose();
        }
    }

    /// Resolve the project responsible for `path`: the first project
    /// holding it as a source, else the first holding it as a reference,
    /// else the shared temporary project scoped to just that file. The
    /// temporary is reused while it still contains the requested file and
    /// replaced otherwise; exactly one exists at a time.
    pub async fn project_for_file(&self, path: &Path) -> Result<Project, ProjectError> {
        let mut temp = self.temp.lock().await;

        {
            let projects = self.projects.read().await;
            for project in projects.values() {
                if project.file_kind(path).await == FileKind::Source {
                    return Ok(project.clone());
                }
            }
            for project in projects.values() {
                if project.file_kind(path).await == FileKind::Reference {
                    return Ok(project.clone());
                }
            }
        }

        if let Some(existing) = temp.as_ref() {
            if existing.contains(path).await {
                return Ok(existing.clone());
            }
        }
        if let Some(stale) = temp.take() {
            stale.dispose();
        }

        info!(path = %path.display(), "no project claims file, creating temporary project");
        let project = Project::new(
            ProjectConfig::single_file(path),
            self.host.clone(),
            self.fs.clone(),
            self.working_set.clone(),
        );
        project.init().await?;
        *temp = Some(project.clone());
        Ok(project)
    }

    pub async fn project(&self, id: &str) -> Option<Project> {
        self.projects.read().await.get(id).cloned()
    }

    pub async fn project_ids(&self) -> Vec<String> {
        self.projects.read().await.keys().cloned().collect()
    }

    /// The id a resolved project is registered under, if it is not the
    /// temporary one.
    pub async fn id_of(&self, project: &Project) -> Option<String> {
        self.projects
            .read()
            .await
            .iter()
            .find(|(_, candidate)| candidate.ptr_eq(project))
            .map(|(id, _)| id.clone())
    }

    async fn create_project(&self, config: ProjectConfig) -> Project {
        let project = Project::new(
            config,
            self.host.clone(),
            self.fs.clone(),
            self.working_set.clone(),
        );
        if let Err(err) = project.init().await {
            warn!(error = %err, "project failed to initialize");
        }
        project
    }
}
