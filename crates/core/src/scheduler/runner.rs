//! The scheduler itself: spawned per-task loops driven by due times.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use crate::metrics;
use crate::store::StoreError;

use super::store::TaskStore;
use super::types::{ScheduledTask, TaskType};

/// How often task loops re-check their due time. Interval and enabled
/// changes take effect within one tick.
const SCHEDULER_TICK: Duration = Duration::from_secs(30);

/// A runnable periodic task. `run` must be idempotent; `is_running` is the
/// re-entrancy guard the scheduler consults before each execution.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    fn task_type(&self) -> TaskType;

    fn is_running(&self) -> bool;

    /// Execute once. Batch-level errors are returned joined; the scheduler
    /// logs them and never propagates.
    async fn run(&self) -> Result<(), String>;
}

/// Schedule row plus live runner state, for the management surface.
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatus {
    #[serde(flatten)]
    pub task: ScheduledTask,
    pub is_running: bool,
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Registers task runners and drives them on their configured intervals.
pub struct Scheduler {
    store: Arc<dyn TaskStore>,
    runners: Vec<Arc<dyn TaskRunner>>,
    shutdown_tx: broadcast::Sender<()>,
    started: AtomicBool,
}

impl Scheduler {
    pub fn new(store: Arc<dyn TaskStore>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            store,
            runners: Vec::new(),
            shutdown_tx,
            started: AtomicBool::new(false),
        }
    }

    /// Register a runner. Call before `start`.
    pub fn register(&mut self, runner: Arc<dyn TaskRunner>) {
        self.runners.push(runner);
    }

    fn runner_for(&self, task: TaskType) -> Option<&Arc<dyn TaskRunner>> {
        self.runners.iter().find(|r| r.task_type() == task)
    }

    /// Upsert the schedule rows and spawn one loop per registered runner.
    /// Tasks whose `next_run_at` is absent or past run once at startup after
    /// a per-type stagger delay.
    pub async fn start(&self, defaults: &[ScheduledTask]) -> Result<(), StoreError> {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("Scheduler already started");
            return Ok(());
        }

        self.store.upsert_defaults(defaults)?;
        info!(tasks = self.runners.len(), "Scheduler starting");

        for (index, runner) in self.runners.iter().enumerate() {
            self.spawn_task_loop(index, Arc::clone(runner));
        }
        Ok(())
    }

    fn spawn_task_loop(&self, index: usize, runner: Arc<dyn TaskRunner>) {
        let store = Arc::clone(&self.store);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let task = runner.task_type();

        // Deterministic 5..60s stagger by registration order, so a cold boot
        // with stale due times does not fire every task at once.
        let stagger = Duration::from_secs(5 + (index as u64 * 9) % 56);

        tokio::spawn(async move {
            info!(task = task.as_str(), stagger_secs = stagger.as_secs(), "Task loop started");

            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = tokio::time::sleep(stagger) => {}
            }

            loop {
                let due = match store.get(task) {
                    Ok(Some(row)) => row.is_due(Utc::now()),
                    Ok(None) => false,
                    Err(e) => {
                        error!(task = task.as_str(), "Schedule lookup failed: {}", e);
                        false
                    }
                };
                if due {
                    Self::execute(&store, runner.as_ref()).await;
                }

                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = tokio::time::sleep(SCHEDULER_TICK) => {}
                }
            }
            info!(task = task.as_str(), "Task loop stopped");
        });
    }

    /// One guarded execution: skip when already running, log errors, always
    /// update the schedule row.
    async fn execute(store: &Arc<dyn TaskStore>, runner: &dyn TaskRunner) {
        let task = runner.task_type();

        if runner.is_running() {
            metrics::TASK_RUNS
                .with_label_values(&[task.as_str(), "skipped"])
                .inc();
            warn!(task = task.as_str(), "Skipping tick, task still running");
            return;
        }

        let started_at = Utc::now();
        let started = std::time::Instant::now();
        let outcome = runner.run().await;
        let duration_ms = started.elapsed().as_millis() as i64;

        metrics::TASK_DURATION
            .with_label_values(&[task.as_str()])
            .observe(duration_ms as f64 / 1000.0);

        match outcome {
            Ok(()) => {
                metrics::TASK_RUNS
                    .with_label_values(&[task.as_str(), "success"])
                    .inc();
            }
            Err(e) => {
                metrics::TASK_RUNS
                    .with_label_values(&[task.as_str(), "error"])
                    .inc();
                error!(task = task.as_str(), "Task finished with errors: {}", e);
            }
        }

        let interval = match store.get(task) {
            Ok(Some(row)) => row.interval_minutes,
            _ => task.default_interval_minutes(),
        };
        let next_run_at = Utc::now() + chrono::Duration::minutes(interval);
        if let Err(e) = store.record_run(task, started_at, duration_ms, next_run_at) {
            error!(task = task.as_str(), "Failed to record run: {}", e);
        }
    }

    /// Manual run, bypassing the schedule. Returns false when the task was
    /// already running.
    pub async fn trigger(&self, task: TaskType) -> Result<bool, SchedulerError> {
        let runner = self
            .runner_for(task)
            .ok_or_else(|| SchedulerError::UnknownTask(task.as_str().to_string()))?;

        if runner.is_running() {
            return Ok(false);
        }

        let store = Arc::clone(&self.store);
        let runner = Arc::clone(runner);
        tokio::spawn(async move {
            Scheduler::execute(&store, runner.as_ref()).await;
        });
        Ok(true)
    }

    /// Re-schedule a task. Takes effect within one scheduler tick.
    pub fn update(
        &self,
        task: TaskType,
        interval_minutes: Option<i64>,
        enabled: Option<bool>,
    ) -> Result<ScheduledTask, SchedulerError> {
        self.runner_for(task)
            .ok_or_else(|| SchedulerError::UnknownTask(task.as_str().to_string()))?;
        Ok(self.store.update(task, interval_minutes, enabled)?)
    }

    /// All schedule rows with live running state.
    pub fn list(&self) -> Result<Vec<TaskStatus>, SchedulerError> {
        let rows = self.store.list()?;
        Ok(rows
            .into_iter()
            .map(|task| {
                let is_running = self
                    .runner_for(task.task_type)
                    .map(|r| r.is_running())
                    .unwrap_or(false);
                TaskStatus { task, is_running }
            })
            .collect())
    }

    /// Signal all task loops to stop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SqliteTaskStore;

    struct CountingRunner {
        task: TaskType,
        running: AtomicBool,
        runs: std::sync::atomic::AtomicU32,
    }

    impl CountingRunner {
        fn new(task: TaskType) -> Self {
            Self {
                task,
                running: AtomicBool::new(false),
                runs: std::sync::atomic::AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl TaskRunner for CountingRunner {
        fn task_type(&self) -> TaskType {
            self.task
        }

        fn is_running(&self) -> bool {
            self.running.load(Ordering::Relaxed)
        }

        async fn run(&self) -> Result<(), String> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn defaults() -> Vec<ScheduledTask> {
        TaskType::all()
            .iter()
            .map(|t| ScheduledTask::with_defaults(*t))
            .collect()
    }

    #[tokio::test]
    async fn test_trigger_runs_and_updates_row() {
        let store = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let runner = Arc::new(CountingRunner::new(TaskType::RssSync));

        let mut scheduler = Scheduler::new(Arc::clone(&store) as Arc<dyn TaskStore>);
        scheduler.register(Arc::clone(&runner) as Arc<dyn TaskRunner>);
        store.upsert_defaults(&defaults()).unwrap();

        assert!(scheduler.trigger(TaskType::RssSync).await.unwrap());
        // The trigger spawns; give it a moment.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(runner.runs.load(Ordering::SeqCst), 1);
        let row = store.get(TaskType::RssSync).unwrap().unwrap();
        assert!(row.last_run_at.is_some());
        assert!(row.next_run_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn test_trigger_unknown_task_errors() {
        let store = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let scheduler = Scheduler::new(store as Arc<dyn TaskStore>);
        let result = scheduler.trigger(TaskType::Backup).await;
        assert!(matches!(result, Err(SchedulerError::UnknownTask(_))));
    }

    #[tokio::test]
    async fn test_trigger_skips_running_task() {
        let store = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let runner = Arc::new(CountingRunner::new(TaskType::RssSync));
        runner.running.store(true, Ordering::SeqCst);

        let mut scheduler = Scheduler::new(Arc::clone(&store) as Arc<dyn TaskStore>);
        scheduler.register(Arc::clone(&runner) as Arc<dyn TaskRunner>);
        store.upsert_defaults(&defaults()).unwrap();

        assert!(!scheduler.trigger(TaskType::RssSync).await.unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(runner.runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_list_includes_running_state() {
        let store = Arc::new(SqliteTaskStore::in_memory().unwrap());
        let runner = Arc::new(CountingRunner::new(TaskType::RssSync));
        runner.running.store(true, Ordering::SeqCst);

        let mut scheduler = Scheduler::new(Arc::clone(&store) as Arc<dyn TaskStore>);
        scheduler.register(Arc::clone(&runner) as Arc<dyn TaskRunner>);
        store.upsert_defaults(&defaults()).unwrap();

        let statuses = scheduler.list().unwrap();
        let rss = statuses
            .iter()
            .find(|s| s.task.task_type == TaskType::RssSync)
            .unwrap();
        assert!(rss.is_running);
        let backup = statuses
            .iter()
            .find(|s| s.task.task_type == TaskType::Backup)
            .unwrap();
        assert!(!backup.is_running);
    }
}
