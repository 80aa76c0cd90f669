use aura_core::config::Config;
use aura_core::generation::GenerationBackend;
use aura_core::handoff::HandoffStore;
use aura_core::inflight::{InFlight, RequestGeneration};
use aura_core::loader::Loader;
use aura_core::store::{Counts, Snapshot, WorkItemStore};
use aura_core::view_state::WorkflowSession;
use aura_core::{paths, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tokio::sync::broadcast;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub config: Arc<Config>,
    pub store: Arc<RwLock<WorkItemStore>>,
    pub loader: Arc<Loader>,
    pub generations: InFlight<String>,
    pub requests: Arc<RequestGeneration>,
    pub handoff: Arc<Mutex<HandoffStore>>,
    pub session: Arc<Mutex<WorkflowSession>>,
    pub backend: Arc<dyn GenerationBackend>,
    pub event_tx: broadcast::Sender<()>,
    /// Data-dir mtime after our last save, so the watcher skips our own writes.
    persisted: Arc<Mutex<Option<SystemTime>>>,
}

impl AppState {
    pub fn new(root: PathBuf) -> Self {
        let config = Config::load(&root).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default config");
            Config::default()
        });
        let backend = crate::backend::from_config(&config.generation);
        Self::with_backend(root, config, backend)
    }

    pub fn with_backend(root: PathBuf, config: Config, backend: Arc<dyn GenerationBackend>) -> Self {
        let (tx, _) = broadcast::channel(64);
        let handoff = HandoffStore::load(&paths::session_path(&root)).unwrap_or_default();
        let state = Self {
            root,
            config: Arc::new(config),
            store: Arc::new(RwLock::new(WorkItemStore::new())),
            loader: Arc::new(Loader::new()),
            generations: InFlight::new(),
            requests: Arc::new(RequestGeneration::new()),
            handoff: Arc::new(Mutex::new(handoff)),
            session: Arc::new(Mutex::new(WorkflowSession::new())),
            backend,
            event_tx: tx,
            persisted: Arc::new(Mutex::new(None)),
        };

        if let Err(e) = state.reload(false) {
            tracing::warn!(error = %e, "initial load failed");
        }

        // Reload when the data files change underneath us (CLI edits).
        // Only spawned inside a Tokio runtime; sync unit tests skip it.
        if tokio::runtime::Handle::try_current().is_ok() {
            let watcher = state.clone();
            tokio::spawn(async move {
                let data_dir = paths::data_dir(&watcher.root);
                let mut last_mtime = latest_mtime(&data_dir);
                loop {
                    tokio::time::sleep(std::time::Duration::from_millis(800)).await;
                    let mtime = latest_mtime(&data_dir);
                    if mtime == last_mtime {
                        continue;
                    }
                    last_mtime = mtime;
                    if mtime == *watcher.lock_persisted() {
                        continue;
                    }
                    let state = watcher.clone();
                    let _ = tokio::task::spawn_blocking(move || {
                        if let Err(e) = state.reload(true) {
                            tracing::debug!(error = %e, "watch reload skipped");
                        }
                    })
                    .await;
                }
            });
        }

        state
    }

    pub fn read_store(&self) -> RwLockReadGuard<'_, WorkItemStore> {
        self.store.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn write_store(&self) -> RwLockWriteGuard<'_, WorkItemStore> {
        self.store.write().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lock_handoff(&self) -> MutexGuard<'_, HandoffStore> {
        self.handoff.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn lock_session(&self) -> MutexGuard<'_, WorkflowSession> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_persisted(&self) -> MutexGuard<'_, Option<SystemTime>> {
        self.persisted.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Clear and reload the store from disk under the loader. Returns
    /// `None` when data is already loaded and `force` is unset.
    pub fn reload(&self, force: bool) -> Result<Option<Counts>> {
        let counts = self.loader.run(force, || {
            // Read under the write guard so a concurrent commit cannot land
            // between the read and the swap.
            let mut store = self.write_store();
            let snapshot = Snapshot::load(&self.root)?;
            store.reload(snapshot)
        })?;
        if let Some(c) = counts {
            tracing::info!(
                initiatives = c.initiatives,
                features = c.features,
                epics = c.epics,
                stories = c.stories,
                "work items loaded"
            );
            self.notify();
        }
        Ok(counts)
    }

    /// Apply `f` to a copy of the store, write the copy to disk, then swap
    /// it in. The write guard is held throughout, so commits are serialized
    /// and memory only changes once the files agree. On a failed write the
    /// previous collections are written back and the store is left as is.
    pub fn commit<T>(&self, f: impl FnOnce(&mut WorkItemStore) -> Result<T>) -> Result<T> {
        let mut store = self.write_store();
        let mut staged = store.clone();
        let out = f(&mut staged)?;

        if let Err(e) = staged.snapshot().save(&self.root) {
            tracing::error!(error = %e, "persist failed, restoring previous collections");
            if let Err(restore) = store.snapshot().save(&self.root) {
                tracing::error!(error = %restore, "restore failed");
            }
            self.mark_persisted();
            return Err(e);
        }
        self.mark_persisted();
        *store = staged;
        Ok(out)
    }

    fn mark_persisted(&self) {
        *self.lock_persisted() = latest_mtime(&paths::data_dir(&self.root));
    }

    pub fn persist_handoff(&self) -> Result<()> {
        let store = self.lock_handoff();
        store.save(&paths::session_path(&self.root))
    }

    pub fn notify(&self) {
        let _ = self.event_tx.send(());
    }
}

fn latest_mtime(dir: &Path) -> Option<SystemTime> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok()?.metadata().ok()?.modified().ok())
        .max()
}
