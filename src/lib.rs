pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod reports;
pub mod rest;
pub mod storage;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use clock::Clock;
use config::DaemonConfig;
use notify::{EventBroadcaster, Notifier};
use storage::Storage;
use tasks::{LifecycleEngine, TaskStore};
use users::UserDirectory;

/// Shared application state passed to every REST handler and background job.
///
/// All collaborators are wired explicitly here — the engine and scheduler
/// take their store, sink, and clock as constructor parameters, never as
/// globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<DaemonConfig>,
    pub storage: Arc<Storage>,
    /// Task table plus dependency/resource link tables (shares the pool).
    pub task_store: Arc<TaskStore>,
    pub users: Arc<UserDirectory>,
    pub broadcaster: Arc<EventBroadcaster>,
    /// Fire-and-forget notification sink.
    pub notifier: Arc<Notifier>,
    /// Task lifecycle engine (core).
    pub engine: Arc<LifecycleEngine>,
    pub clock: Arc<dyn Clock>,
    pub started_at: std::time::Instant,
}

impl AppContext {
    /// Open storage under the config's data dir and wire the full component
    /// graph.
    pub async fn new(config: DaemonConfig, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let storage = Arc::new(
            Storage::new_with_slow_query(&config.data_dir, config.slow_query_ms).await?,
        );
        Ok(Self::with_storage(config, storage, clock))
    }

    /// Wire the component graph over an already-open storage handle.
    /// Used by tests that want to share the pool.
    pub fn with_storage(
        config: DaemonConfig,
        storage: Arc<Storage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let task_store = Arc::new(TaskStore::new(storage.pool()));
        let broadcaster = Arc::new(EventBroadcaster::new());
        let notifier = Arc::new(Notifier::new(storage.clone(), broadcaster.clone()));
        let users = Arc::new(UserDirectory::new(storage.clone()));
        let engine = Arc::new(LifecycleEngine::new(
            task_store.clone(),
            storage.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        Self {
            config: Arc::new(config),
            storage,
            task_store,
            users,
            broadcaster,
            notifier,
            engine,
            clock,
            started_at: std::time::Instant::now(),
        }
    }

    /// Start the recurrence and reminder background jobs, unless disabled.
    pub fn spawn_scheduler_jobs(&self) {
        if self.config.scheduler.disabled {
            tracing::info!("scheduler jobs disabled by config");
            return;
        }
        tokio::spawn(tasks::jobs::run_recurrence_job(
            self.task_store.clone(),
            self.clock.clone(),
            self.config.scheduler.recurrence_interval_secs,
        ));
        tokio::spawn(tasks::jobs::run_reminder_job(
            self.task_store.clone(),
            self.notifier.clone(),
            self.config.scheduler.reminder_interval_secs,
        ));
    }
}
