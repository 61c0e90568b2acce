//! Share reconciliation engine
//!
//! The [`SyncEngine`] runs one reconciliation pass for one task:
//!
//! 1. List the share folder and the mirror folder (both fresh, every pass)
//! 2. Select share files whose content hash is absent from the mirror and
//!    which pass the task's filter
//! 3. Submit them as one batch SAVE and poll it to completion
//! 4. Raise the episode threshold, mark the task processing, append a log
//! 5. Apply the task's rename rule once the transfer is complete
//!
//! Nothing is diffed against stored state, so a pass with no remote change
//! selects nothing and has no side effects.
//!
//! Listing and submission failures mark the task failed before the error is
//! returned. An operation that is still pending after the polling budget
//! leaves the task `processing`; the next pass re-derives everything. An
//! operation the provider reports as failed changes nothing stored, so the
//! same files are selected again next time.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use sharemirror_core::domain::{
    BatchItem, BatchKind, ContentHash, FolderListing, RemoteFileEntry, Task, TaskId, TaskLog,
};
use sharemirror_core::ports::{IRemoteShareClient, ITaskRepository};

use crate::episode;
use crate::filter::{self, Verdict};
use crate::format_bytes;
use crate::locks::TaskLocks;
use crate::poller::{BatchOperationPoller, PollOutcome};
use crate::rename::{AutoRenamer, RenameReport};
use crate::SyncError;

// ============================================================================
// Summary
// ============================================================================

/// A file included in a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredFile {
    pub name: String,
    pub size: u64,
}

/// Outcome of a reconciliation pass that transferred files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub task_id: TaskId,
    pub resource: String,
    pub files: Vec<TransferredFile>,
    /// `(old, new)` when the episode threshold moved
    pub threshold_change: Option<(u32, u32)>,
    /// How the SAVE operation ended
    pub outcome: PollOutcome,
    pub rename: Option<RenameReport>,
}

impl ReconcileSummary {
    fn transfer_lines(&self) -> String {
        let mut out = match self.outcome {
            PollOutcome::Failed(code) => format!(
                "{}: saving {} file(s) failed (status {}), retrying next pass",
                self.resource,
                self.files.len(),
                code
            ),
            _ => format!("{}: saved {} file(s)", self.resource, self.files.len()),
        };
        for f in &self.files {
            out.push_str(&format!("\n  {} ({})", f.name, format_bytes(f.size)));
        }
        out
    }
}

impl fmt::Display for ReconcileSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((old, new)) = self.threshold_change {
            let old = if old == 0 {
                "none".to_string()
            } else {
                old.to_string()
            };
            writeln!(f, "{}: episode threshold {} -> {}", self.resource, old, new)?;
        }
        write!(f, "{}", self.transfer_lines())?;
        if self.outcome == PollOutcome::Pending {
            write!(f, "\n  (transfer still in progress)")?;
        }
        if let Some(rename) = &self.rename {
            write!(f, "\n{}", rename)?;
        }
        Ok(())
    }
}

// ============================================================================
// Candidate selection
// ============================================================================

/// Share files that are new to the mirror and pass the task's filter
///
/// An entry without a content hash is deduplicated by name instead.
pub fn select_candidates<'a>(
    share: &'a FolderListing,
    mirror: &FolderListing,
    task: &Task,
) -> Vec<&'a RemoteFileEntry> {
    let local_hashes: HashSet<&ContentHash> = mirror
        .plain_files()
        .filter_map(|f| f.content_hash.as_ref())
        .collect();
    let local_names: HashSet<&str> = mirror.plain_files().map(|f| f.name.as_str()).collect();

    share
        .plain_files()
        .filter(|f| match &f.content_hash {
            Some(hash) => !local_hashes.contains(hash),
            None => !local_names.contains(f.name.as_str()),
        })
        .filter(|f| match filter::evaluate(&f.name, task) {
            Verdict::Accepted => true,
            verdict => {
                debug!(file = %f.name, ?verdict, "File filtered out");
                false
            }
        })
        .collect()
}

// ============================================================================
// SyncEngine
// ============================================================================

/// Runs reconciliation passes against a task store
pub struct SyncEngine {
    repository: Arc<dyn ITaskRepository>,
    locks: TaskLocks,
    poller: BatchOperationPoller,
    renamer: AutoRenamer,
}

impl SyncEngine {
    pub fn new(
        repository: Arc<dyn ITaskRepository>,
        locks: TaskLocks,
        poller: BatchOperationPoller,
        renamer: AutoRenamer,
    ) -> Self {
        Self {
            repository,
            locks,
            poller,
            renamer,
        }
    }

    pub fn locks(&self) -> &TaskLocks {
        &self.locks
    }

    /// Reconciles one task
    ///
    /// The task is reloaded from the store under its single-flight guard;
    /// `task` only identifies it. Returns `None` when nothing was new or
    /// the task is no longer active.
    ///
    /// # Errors
    /// [`SyncError::TaskBusy`] when another pass holds the task. Fatal
    /// remote errors are returned after the task was marked failed.
    #[tracing::instrument(skip(self, client, task), fields(task_id = %task.id()))]
    pub async fn reconcile(
        &self,
        client: &dyn IRemoteShareClient,
        task: &Task,
    ) -> Result<Option<ReconcileSummary>, SyncError> {
        let _guard = self
            .locks
            .try_acquire(task.id())
            .ok_or(SyncError::TaskBusy(*task.id()))?;

        let mut current = self
            .repository
            .get_task(task.id())
            .await
            .map_err(SyncError::Repository)?
            .ok_or(SyncError::TaskNotFound(*task.id()))?;

        if !current.status().is_active() {
            debug!(status = %current.status(), "Task not active, skipping");
            return Ok(None);
        }

        match self.run_pass(client, &mut current).await {
            Err(e) if e.is_fatal() => {
                warn!(error = %e, "Reconciliation failed, marking task failed");
                current.mark_failed(e.to_string());
                if let Err(save_err) = self.repository.save_task(&current).await {
                    warn!(error = %format!("{save_err:#}"), "Could not persist failed status");
                }
                Err(e)
            }
            other => other,
        }
    }

    async fn run_pass(
        &self,
        client: &dyn IRemoteShareClient,
        task: &mut Task,
    ) -> Result<Option<ReconcileSummary>, SyncError> {
        let share = client
            .list_share_dir(&task.share_location())
            .await
            .map_err(SyncError::RemoteListing)?;
        let mirror = client
            .list_files(task.target_folder_id())
            .await
            .map_err(SyncError::RemoteListing)?;

        let candidates = select_candidates(&share, &mirror, task);
        if candidates.is_empty() {
            debug!(share_files = share.files.len(), "Nothing new in share");
            return Ok(None);
        }

        let items: Vec<BatchItem> = candidates
            .iter()
            .map(|f| BatchItem::file(f.id.clone(), f.name.clone()))
            .collect();
        let submission = client
            .submit_batch_save(&items, task.target_folder_id(), task.share_id())
            .await
            .map_err(SyncError::Remote)?;
        if !submission.is_accepted() {
            return Err(SyncError::BatchSubmission {
                code: submission.code,
                message: submission.message.unwrap_or_default(),
            });
        }
        info!(count = items.len(), "Batch save submitted");

        let outcome = match submission.operation_id.as_deref() {
            Some(op) => self.poller.await_completion(client, op, BatchKind::Save).await,
            None => {
                warn!("Save accepted without an operation id");
                PollOutcome::Pending
            }
        };

        let files: Vec<TransferredFile> = candidates
            .iter()
            .map(|f| TransferredFile {
                name: f.name.clone(),
                size: f.size,
            })
            .collect();

        if outcome.is_failed() {
            warn!(%outcome, "Batch save failed, files stay eligible");
            return Ok(Some(ReconcileSummary {
                task_id: *task.id(),
                resource: task.display_name(),
                files,
                threshold_change: None,
                outcome,
                rename: None,
            }));
        }

        let max_episode = candidates
            .iter()
            .filter_map(|f| episode::extract_for_task(&f.name, task))
            .max();
        let threshold_change = max_episode
            .and_then(|max| task.raise_episode_threshold(max).map(|old| (old, max)));
        if let Some((old, new)) = threshold_change {
            info!(old, new, "Episode threshold raised");
        }

        task.mark_processing(Utc::now())?;

        let summary = ReconcileSummary {
            task_id: *task.id(),
            resource: task.display_name(),
            files,
            threshold_change,
            outcome,
            rename: None,
        };

        self.repository
            .append_log(&TaskLog::new(*task.id(), summary.transfer_lines()))
            .await
            .map_err(SyncError::Repository)?;
        self.repository
            .save_task(task)
            .await
            .map_err(SyncError::Repository)?;

        let rename = if outcome.is_completed() {
            match self.renamer.apply(client, task).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(error = %format!("{e:#}"), "Auto-rename skipped");
                    None
                }
            }
        } else {
            None
        };

        Ok(Some(ReconcileSummary { rename, ..summary }))
    }
}
