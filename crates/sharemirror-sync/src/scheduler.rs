//! Tick-level orchestration
//!
//! The [`TaskScheduler`] selects due tasks and runs them one after another:
//! reconciliation first, then retention. Each task's failure is recorded and
//! the tick moves on. The texts of one tick are forwarded as one
//! notification.
//!
//! Two kinds of tick exist:
//!
//! - the global tick covers active tasks without their own interval
//! - the override sweep covers active tasks whose own interval elapsed
//!
//! Both may run at the same time. A task already being processed is
//! skipped by the per-task guard rather than waited for. Failed tasks are
//! never selected; an operator resets them.
//!
//! An interval task's clock starts when it actually ran. A task skipped as
//! busy stays due for the next sweep. Each global tick drops the lock
//! entries and run stamps of tasks that are no longer active.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, info, warn};

use sharemirror_core::config::Config;
use sharemirror_core::domain::{Account, BatchKind, Task, TaskId, TaskStatus};
use sharemirror_core::ports::{INotificationService, ITaskRepository, Notification};

use crate::engine::SyncEngine;
use crate::locks::TaskLocks;
use crate::poller::{BatchOperationPoller, PollOutcome};
use crate::registry::{ClientFactory, ClientRegistry};
use crate::rename::AutoRenamer;
use crate::retention::RetentionEnforcer;
use crate::SyncError;

/// Notification title for tick summaries
const SUMMARY_TITLE: &str = "ShareMirror";

/// What one tick did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Tasks that ran to the end (with or without changes)
    pub processed: usize,
    /// Tasks skipped because another pass held them or their account is off
    pub skipped: usize,
    /// Tasks that returned an error
    pub failed: usize,
    /// Summary texts of tasks that changed something
    pub summaries: Vec<String>,
    /// One line per failed task
    pub failures: Vec<String>,
}

impl TickReport {
    /// Adds the counts and texts of `other`
    pub fn merge(&mut self, other: TickReport) {
        self.processed += other.processed;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.summaries.extend(other.summaries);
        self.failures.extend(other.failures);
    }

    /// Summaries joined by blank lines
    pub fn summary_text(&self) -> Option<String> {
        (!self.summaries.is_empty()).then(|| self.summaries.join("\n\n"))
    }
}

enum TaskOutcome {
    Done(Vec<String>),
    Skipped,
}

/// Runs due tasks through the engine and retention enforcer
pub struct TaskScheduler {
    repository: Arc<dyn ITaskRepository>,
    registry: Arc<ClientRegistry>,
    engine: SyncEngine,
    retention: RetentionEnforcer,
    poller: BatchOperationPoller,
    notifier: Option<Arc<dyn INotificationService>>,
    last_runs: DashMap<TaskId, DateTime<Utc>>,
}

impl TaskScheduler {
    pub fn new(
        repository: Arc<dyn ITaskRepository>,
        registry: Arc<ClientRegistry>,
        poller: BatchOperationPoller,
        renamer: AutoRenamer,
    ) -> Self {
        let locks = TaskLocks::new();
        Self {
            engine: SyncEngine::new(repository.clone(), locks.clone(), poller.clone(), renamer),
            retention: RetentionEnforcer::new(locks, poller.clone()),
            repository,
            registry,
            poller,
            notifier: None,
            last_runs: DashMap::new(),
        }
    }

    /// Wires a scheduler from the poller and provider sections of `config`
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn ITaskRepository>,
        factory: ClientFactory,
    ) -> Self {
        Self::new(
            repository,
            Arc::new(ClientRegistry::new(factory)),
            BatchOperationPoller::from_config(&config.poller),
            AutoRenamer::new(Duration::from_millis(config.provider.rename_pause_ms)),
        )
    }

    /// Sends tick summaries and failures through `notifier`
    pub fn with_notifier(mut self, notifier: Arc<dyn INotificationService>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    /// Processes every active task that has no interval of its own
    #[tracing::instrument(skip(self))]
    pub async fn run_global_tick(&self) -> Result<TickReport, SyncError> {
        let active = self.active_tasks().await?;
        self.prune(&active);
        let tasks: Vec<Task> = active
            .into_iter()
            .filter(|t| t.check_interval_secs().is_none())
            .collect();
        info!(count = tasks.len(), "Global tick");
        let report = self.process(tasks, Utc::now()).await;
        self.notify(&report).await;
        Ok(report)
    }

    /// Processes active tasks whose own interval elapsed by `now`
    #[tracing::instrument(skip(self))]
    pub async fn run_override_sweep(&self, now: DateTime<Utc>) -> Result<TickReport, SyncError> {
        let tasks: Vec<Task> = self
            .active_tasks()
            .await?
            .into_iter()
            .filter(|t| self.is_due(t, now))
            .collect();
        if tasks.is_empty() {
            return Ok(TickReport::default());
        }
        info!(count = tasks.len(), "Override sweep");
        let report = self.process(tasks, now).await;
        self.notify(&report).await;
        Ok(report)
    }

    /// Processes one task immediately, whatever its interval
    #[tracing::instrument(skip(self))]
    pub async fn run_task(&self, task_id: &TaskId) -> Result<TickReport, SyncError> {
        let task = self
            .repository
            .get_task(task_id)
            .await
            .map_err(SyncError::Repository)?
            .ok_or(SyncError::TaskNotFound(*task_id))?;
        let report = self.process(vec![task], Utc::now()).await;
        self.notify(&report).await;
        Ok(report)
    }

    /// Purges the recycle bin of every active account
    ///
    /// Returns one line per account. Failures are reported in the lines,
    /// not as errors.
    #[tracing::instrument(skip(self))]
    pub async fn clear_recycle(&self) -> Result<Vec<String>, SyncError> {
        let accounts = self
            .repository
            .list_accounts()
            .await
            .map_err(SyncError::Repository)?;

        let mut lines = Vec::new();
        for account in &accounts {
            if !account.is_active() {
                self.registry.invalidate(account.id());
                continue;
            }
            let line = match self.purge_account(account).await {
                Ok(PollOutcome::Completed) => {
                    format!("{}: recycle bin cleared", account.username())
                }
                Ok(PollOutcome::Pending) => {
                    format!("{}: recycle bin purge still pending", account.username())
                }
                Ok(PollOutcome::Failed(code)) => {
                    warn!(account = account.username(), code, "Recycle purge reported failure");
                    format!(
                        "{}: recycle bin purge failed (status {code})",
                        account.username()
                    )
                }
                Err(e) => {
                    warn!(account = account.username(), error = %format!("{e:#}"), "Recycle purge failed");
                    format!("{}: recycle bin purge failed: {e:#}", account.username())
                }
            };
            lines.push(line);
        }
        Ok(lines)
    }

    async fn purge_account(&self, account: &Account) -> anyhow::Result<PollOutcome> {
        let client = self.registry.client_for(account)?;
        let submission = client.submit_empty_recycle().await?;
        if !submission.is_accepted() {
            anyhow::bail!(
                "rejected (code {}): {}",
                submission.code,
                submission.message.unwrap_or_default()
            );
        }
        Ok(match submission.operation_id.as_deref() {
            Some(op) => {
                self.poller
                    .await_completion(client.as_ref(), op, BatchKind::EmptyRecycle)
                    .await
            }
            None => PollOutcome::Pending,
        })
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn active_tasks(&self) -> Result<Vec<Task>, SyncError> {
        self.repository
            .find_tasks_by_status(&TaskStatus::ACTIVE)
            .await
            .map_err(SyncError::Repository)
    }

    fn is_due(&self, task: &Task, now: DateTime<Utc>) -> bool {
        let Some(secs) = task.check_interval_secs() else {
            return false;
        };
        match self.last_runs.get(task.id()) {
            Some(last) => {
                u64::try_from((now - *last).num_seconds()).is_ok_and(|elapsed| elapsed >= secs)
            }
            None => true,
        }
    }

    /// Drops per-task state of tasks that left the active set
    fn prune(&self, active: &[Task]) {
        let live: HashSet<TaskId> = active.iter().map(|t| *t.id()).collect();
        self.engine.locks().retain_live(&live);
        self.last_runs.retain(|id, _| live.contains(id));
    }

    fn forget(&self, task_id: &TaskId) {
        self.engine.locks().forget(task_id);
        self.last_runs.remove(task_id);
    }

    async fn process(&self, tasks: Vec<Task>, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        for task in tasks {
            let mut one = TickReport::default();
            let ran = match self.process_task(&task).await {
                Ok(TaskOutcome::Done(texts)) => {
                    one.processed = 1;
                    one.summaries = texts;
                    true
                }
                Ok(TaskOutcome::Skipped) => {
                    one.skipped = 1;
                    false
                }
                Err(SyncError::TaskBusy(_)) => {
                    debug!(task_id = %task.id(), "Task busy, skipped this tick");
                    one.skipped = 1;
                    false
                }
                Err(SyncError::TaskNotFound(id)) => {
                    debug!(task_id = %id, "Task removed while processing");
                    self.forget(&id);
                    one.skipped = 1;
                    false
                }
                Err(e) => {
                    warn!(task_id = %task.id(), error = %e, "Task failed");
                    one.failed = 1;
                    one.failures.push(format!("{}: {}", task.display_name(), e));
                    true
                }
            };
            if ran && task.check_interval_secs().is_some() {
                self.last_runs.insert(*task.id(), now);
            }
            report.merge(one);
        }
        report
    }

    async fn process_task(&self, task: &Task) -> Result<TaskOutcome, SyncError> {
        let account = self
            .repository
            .get_account(task.account_id())
            .await
            .map_err(SyncError::Repository)?;
        let Some(account) = account else {
            self.registry.invalidate(task.account_id());
            return Err(SyncError::AccountNotFound(*task.account_id()));
        };
        if !account.is_active() {
            debug!(task_id = %task.id(), "Account deactivated, skipping task");
            self.registry.invalidate(account.id());
            return Ok(TaskOutcome::Skipped);
        }
        let client = self
            .registry
            .client_for(&account)
            .map_err(SyncError::Remote)?;

        let mut texts = Vec::new();
        if let Some(summary) = self.engine.reconcile(client.as_ref(), task).await? {
            texts.push(summary.to_string());
        }

        let current = self
            .repository
            .get_task(task.id())
            .await
            .map_err(SyncError::Repository)?
            .ok_or(SyncError::TaskNotFound(*task.id()))?;
        if let Some(summary) = self.retention.enforce(client.as_ref(), &current).await? {
            texts.push(summary.to_string());
        }
        Ok(TaskOutcome::Done(texts))
    }

    async fn notify(&self, report: &TickReport) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let mut outgoing = Vec::new();
        if let Some(text) = report.summary_text() {
            outgoing.push(Notification::sync(SUMMARY_TITLE, text));
        }
        if !report.failures.is_empty() {
            outgoing.push(Notification::error(
                "ShareMirror task failures",
                report.failures.join("\n"),
            ));
        }
        for notification in outgoing {
            if let Err(e) = notifier.notify(&notification).await {
                warn!(error = %format!("{e:#}"), "Notification delivery failed");
            }
        }
    }
}
