//! Project lifecycle: one configured project and its update discipline

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use arbor_core::{
    DocumentChange, FileEvent, FileKind, HostOptions, ProjectConfig, ProjectError,
    ScriptRegistry, WorkingSetEvent,
};
use arbor_fs::{FileSystem, WorkingSet};
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{ENGINE_MANIFEST, EngineBinding, ProjectView};
use crate::graph::FileGraph;
use crate::queue::TaskQueue;

const SETTLE_DELAY: Duration = Duration::from_millis(10);

/// Lifecycle states. A failed init falls back to `Created`; the project is
/// non-ready until a successful reinit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectStatus {
    Created,
    Initializing,
    Ready,
    Updating,
    Disposed,
}

/// Downstream notifications, consumed by whatever feeds the analysis
/// engine.
#[derive(Debug, Clone)]
pub enum ProjectNotification {
    /// Membership of the file set changed.
    FileSetChanged,
    /// One file's content changed; carries the new version.
    ContentChanged { path: PathBuf, version: u64 },
    /// The project was fully reinitialized (first init included).
    Reinitialized,
}

struct ProjectState {
    status: ProjectStatus,
    config: ProjectConfig,
    graph: FileGraph,
    engine: Option<EngineBinding>,
}

struct ProjectInner {
    fs: Arc<dyn FileSystem>,
    working_set: Arc<dyn WorkingSet>,
    host: HostOptions,
    registry: Arc<ScriptRegistry>,
    state: RwLock<ProjectState>,
    queue: TaskQueue,
    pumps: StdMutex<Vec<JoinHandle<()>>>,
    disposed: AtomicBool,
    notifications: broadcast::Sender<ProjectNotification>,
}

/// One configured project. Every externally triggered mutation (init,
/// filesystem events, working-set events, edits, config updates) funnels
/// through a single FIFO task queue, so the graph underneath never sees
/// concurrent mutation.
#[derive(Clone)]
pub struct Project {
    inner: Arc<ProjectInner>,
}

impl Project {
    pub fn new(
        config: ProjectConfig,
        host: HostOptions,
        fs: Arc<dyn FileSystem>,
        working_set: Arc<dyn WorkingSet>,
    ) -> Self {
        let registry = Arc::new(ScriptRegistry::new());
        let graph = FileGraph::new(fs.clone(), registry.clone(), &config, &host.default_lib);
        let (notifications, _) = broadcast::channel(256);
        Project {
            inner: Arc::new(ProjectInner {
                fs,
                working_set,
                host,
                registry,
                state: RwLock::new(ProjectState {
                    status: ProjectStatus::Created,
                    config,
                    graph,
                    engine: None,
                }),
                queue: TaskQueue::new(),
                pumps: StdMutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
                notifications,
            }),
        }
    }

    /// Load the analysis engine, compute the initial file set, and start
    /// tracking filesystem and working-set changes. Resolves once the
    /// project reaches `Ready`; an engine-load failure fails the init and
    /// leaves the project non-ready.
    pub async fn init(&self) -> Result<(), ProjectError> {
        self.spawn_pumps();
        let inner = self.inner.clone();
        self.inner.queue.run(async move { initialize(inner).await }).await
    }

    /// Apply a new config snapshot. A changed compiler-backend directory
    /// forces a full reinit; anything else is an incremental update.
    pub async fn update(&self, new_config: ProjectConfig) -> Result<(), ProjectError> {
        let inner = self.inner.clone();
        self.inner
            .queue
            .run(async move { apply_config(inner, new_config).await })
            .await
    }

    /// Detach from all signals and release every file. Idempotent; queued
    /// operations settling afterwards observe the disposal and no-op.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for pump in self.inner.pumps.lock().unwrap().drain(..) {
            pump.abort();
        }
        self.inner.queue.close();
        self.inner.registry.clear();
        debug!("project disposed");
    }

    pub async fn status(&self) -> ProjectStatus {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return ProjectStatus::Disposed;
        }
        self.inner.state.read().await.status
    }

    pub async fn is_ready(&self) -> bool {
        self.status().await == ProjectStatus::Ready
    }

    /// Membership the file has in this project right now.
    pub async fn file_kind(&self, path: &Path) -> FileKind {
        if self.inner.disposed.load(Ordering::SeqCst) {
            return FileKind::None;
        }
        self.inner.state.read().await.graph.file_kind(path)
    }

    pub async fn contains(&self, path: &Path) -> bool {
        self.file_kind(path).await != FileKind::None
    }

    /// Read-only snapshot of the current file set.
    pub async fn files(&self) -> Vec<PathBuf> {
        self.inner.state.read().await.graph.files()
    }

    pub fn file_content(&self, path: &Path) -> Option<String> {
        self.inner.registry.content(path)
    }

    /// The per-file content/version/open registry.
    pub fn registry(&self) -> &ScriptRegistry {
        &self.inner.registry
    }

    pub async fn config(&self) -> ProjectConfig {
        self.inner.state.read().await.config.clone()
    }

    /// The stable versioned view handed to the analysis engine. `None`
    /// until the project has initialized successfully.
    pub async fn snapshot(&self) -> Option<ProjectView> {
        let state = self.inner.state.read().await;
        let engine = state.engine.as_ref()?;
        Some(ProjectView {
            engine: engine.spec.clone(),
            compiler_options: state.config.compiler_options.clone(),
            scripts: self.inner.registry.snapshots(),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectNotification> {
        self.inner.notifications.subscribe()
    }

    /// Whether two handles refer to the same underlying project.
    pub fn ptr_eq(&self, other: &Project) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Wait until every update triggered by already-dispatched events has
    /// settled. Two rounds, so an update that itself triggers a follow-up
    /// event is covered too.
    pub async fn settle(&self) {
        for _ in 0..2 {
            tokio::time::sleep(SETTLE_DELAY).await;
            let _ = self.inner.queue.run(async { Ok(()) }).await;
        }
    }

    fn spawn_pumps(&self) {
        let mut pumps = self.inner.pumps.lock().unwrap();
        if !pumps.is_empty() {
            return;
        }
        let fs_rx = self.inner.fs.subscribe();
        let ws_rx = self.inner.working_set.subscribe();
        pumps.push(tokio::spawn(pump_fs_events(self.inner.clone(), fs_rx)));
        pumps.push(tokio::spawn(pump_ws_events(self.inner.clone(), ws_rx)));
    }
}

/// Forward filesystem events into the update queue, preserving arrival
/// order.
async fn pump_fs_events(inner: Arc<ProjectInner>, mut rx: broadcast::Receiver<FileEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let task_inner = inner.clone();
                let _ = inner
                    .queue
                    .push(async move { handle_file_event(task_inner, event).await });
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "filesystem event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn pump_ws_events(inner: Arc<ProjectInner>, mut rx: broadcast::Receiver<WorkingSetEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => {
                let task_inner = inner.clone();
                let _ = inner
                    .queue
                    .push(async move { handle_working_set_event(task_inner, event).await });
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "working-set event stream lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Full (re)initialization unit: load the engine, rebuild the graph from
/// scratch, repopulate open flags.
async fn initialize(inner: Arc<ProjectInner>) -> Result<(), ProjectError> {
    if inner.disposed.load(Ordering::SeqCst) {
        return Err(ProjectError::Disposed);
    }
    {
        let mut state = inner.state.write().await;
        state.status = ProjectStatus::Initializing;
        state.engine = None;
    }
    inner.registry.clear();

    let (config, engine_dir) = {
        let state = inner.state.read().await;
        (
            state.config.clone(),
            inner.host.engine_dir_for(&state.config),
        )
    };

    let engine = match EngineBinding::load(&inner.fs, &engine_dir).await {
        Ok(engine) => engine,
        Err(err) => {
            inner.state.write().await.status = ProjectStatus::Created;
            return Err(err);
        }
    };

    let mut graph = FileGraph::new(
        inner.fs.clone(),
        inner.registry.clone(),
        &config,
        &inner.host.default_lib,
    );
    if let Err(err) = graph.initialize().await {
        inner.state.write().await.status = ProjectStatus::Created;
        return Err(err);
    }

    if inner.disposed.load(Ordering::SeqCst) {
        inner.registry.clear();
        return Err(ProjectError::Disposed);
    }
    {
        let mut state = inner.state.write().await;
        state.graph = graph;
        state.engine = Some(engine);
        state.status = ProjectStatus::Ready;
    }
    sync_open_flags(&inner).await;
    let _ = inner.notifications.send(ProjectNotification::Reinitialized);
    Ok(())
}

/// Config-update unit. The backend directory is the one setting that can't
/// be patched incrementally: the engine identity itself changed, so the
/// whole project goes through `initialize` again.
async fn apply_config(
    inner: Arc<ProjectInner>,
    new_config: ProjectConfig,
) -> Result<(), ProjectError> {
    if inner.disposed.load(Ordering::SeqCst) {
        return Err(ProjectError::Disposed);
    }
    let (directory_changed, was_ready) = {
        let mut state = inner.state.write().await;
        let changed = state.config.compiler_directory != new_config.compiler_directory;
        let was_ready = state.status == ProjectStatus::Ready;
        state.config = new_config;
        (changed, was_ready)
    };

    if directory_changed || !was_ready {
        return initialize(inner).await;
    }

    {
        let mut state = inner.state.write().await;
        state.status = ProjectStatus::Updating;
        let config = state.config.clone();
        state
            .graph
            .update_config(&config, &inner.host.default_lib)
            .await;
        state.status = ProjectStatus::Ready;
    }
    sync_open_flags(&inner).await;
    let _ = inner.notifications.send(ProjectNotification::FileSetChanged);
    Ok(())
}

/// One filesystem event against the graph. A change to the engine manifest
/// supersedes everything else and reinitializes the project.
async fn handle_file_event(
    inner: Arc<ProjectInner>,
    event: FileEvent,
) -> Result<(), ProjectError> {
    if inner.disposed.load(Ordering::SeqCst) {
        return Ok(());
    }

    let manifest_path = {
        let state = inner.state.read().await;
        inner.host.engine_dir_for(&state.config).join(ENGINE_MANIFEST)
    };
    if event.path() == &manifest_path {
        info!(path = %manifest_path.display(), "engine manifest changed, reinitializing project");
        return initialize(inner).await;
    }

    {
        let mut state = inner.state.write().await;
        if state.status != ProjectStatus::Ready {
            return Ok(());
        }
        match &event {
            FileEvent::Added(path) => state.graph.handle_file_added(path).await,
            FileEvent::Removed(path) => state.graph.handle_file_removed(path).await,
            FileEvent::Updated(path) => state.graph.handle_file_updated(path).await,
        }
    }
    sync_open_flags(&inner).await;
    let _ = inner.notifications.send(ProjectNotification::FileSetChanged);
    Ok(())
}

/// One working-set event: open-flag bookkeeping, buffer edits, and reverts
/// of buffers closed without saving.
async fn handle_working_set_event(
    inner: Arc<ProjectInner>,
    event: WorkingSetEvent,
) -> Result<(), ProjectError> {
    if inner.disposed.load(Ordering::SeqCst) {
        return Ok(());
    }
    match event {
        WorkingSetEvent::FilesAdded(_) => {
            sync_open_flags(&inner).await;
            Ok(())
        }
        WorkingSetEvent::FilesRemoved(paths) => {
            let tracked: Vec<PathBuf> = {
                let state = inner.state.read().await;
                paths
                    .into_iter()
                    .filter(|path| state.graph.contains(path))
                    .collect()
            };
            for path in &tracked {
                match inner.fs.read_file(path).await {
                    Ok(on_disk) => {
                        let _ = inner.registry.set_full_text(path, on_disk);
                    }
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "cannot revert closed buffer from disk");
                    }
                }
            }
            if !tracked.is_empty() {
                inner.state.write().await.graph.recompute().await;
            }
            sync_open_flags(&inner).await;
            let _ = inner.notifications.send(ProjectNotification::FileSetChanged);
            Ok(())
        }
        WorkingSetEvent::DocumentEdited { path, change } => {
            {
                let state = inner.state.read().await;
                if !state.graph.contains(&path) {
                    return Ok(());
                }
            }
            let version = match change {
                DocumentChange::FullText(text) => inner.registry.set_full_text(&path, text)?,
                DocumentChange::Edits(edits) => inner.registry.apply_edits(&path, &edits)?,
            };
            inner.state.write().await.graph.recompute().await;
            sync_open_flags(&inner).await;
            let _ = inner
                .notifications
                .send(ProjectNotification::ContentChanged { path, version });
            Ok(())
        }
    }
}

/// Make every tracked file's open flag equal working-set membership.
async fn sync_open_flags(inner: &Arc<ProjectInner>) {
    let open_files = inner.working_set.files().await;
    for path in inner.registry.paths() {
        inner.registry.set_open(&path, open_files.contains(&path));
    }
}
