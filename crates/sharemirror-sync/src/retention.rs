//! Retention enforcement
//!
//! Keeps a mirror folder at or under its task's retention cap by deleting
//! the oldest files in one batch DELETE. Entries without a creation time
//! count as oldest; ties keep the listing's own order. The task record
//! itself is never modified here.

use std::fmt;

use tracing::{debug, info, warn};

use sharemirror_core::domain::{BatchItem, BatchKind, RemoteFileEntry, Task};
use sharemirror_core::ports::IRemoteShareClient;

use crate::locks::TaskLocks;
use crate::poller::{BatchOperationPoller, PollOutcome};
use crate::SyncError;

/// Outcome of one retention pass that deleted something
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetentionSummary {
    pub resource: String,
    pub kept: usize,
    pub deleted: Vec<String>,
    /// How the DELETE operation ended
    pub outcome: PollOutcome,
}

impl fmt::Display for RetentionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: removed {} old file(s), kept {}",
            self.resource,
            self.deleted.len(),
            self.kept
        )?;
        for name in &self.deleted {
            write!(f, "\n  - {}", name)?;
        }
        match self.outcome {
            PollOutcome::Completed => {}
            PollOutcome::Pending => write!(f, "\n  (deletion still pending)")?,
            PollOutcome::Failed(code) => write!(f, "\n  (deletion failed, status {code})")?,
        }
        Ok(())
    }
}

/// Picks the entries beyond the newest `keep`, newest first
pub fn select_for_deletion(files: &[RemoteFileEntry], keep: usize) -> Vec<&RemoteFileEntry> {
    let mut plain: Vec<&RemoteFileEntry> = files.iter().filter(|f| !f.is_folder).collect();
    if plain.len() <= keep {
        return Vec::new();
    }
    // Stable: equal timestamps keep listing order. `None` sorts last.
    plain.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    plain.split_off(keep)
}

/// Trims mirror folders to their task's retention cap
pub struct RetentionEnforcer {
    locks: TaskLocks,
    poller: BatchOperationPoller,
}

impl RetentionEnforcer {
    pub fn new(locks: TaskLocks, poller: BatchOperationPoller) -> Self {
        Self { locks, poller }
    }

    /// Deletes the oldest files of `task`'s mirror folder beyond its cap
    ///
    /// Returns `None` when the cap is disabled (`0`) or not exceeded.
    #[tracing::instrument(skip(self, client, task), fields(task_id = %task.id()))]
    pub async fn enforce(
        &self,
        client: &dyn IRemoteShareClient,
        task: &Task,
    ) -> Result<Option<RetentionSummary>, SyncError> {
        let keep = task.max_keep_save_file() as usize;
        if keep == 0 {
            return Ok(None);
        }

        let _guard = self
            .locks
            .try_acquire(task.id())
            .ok_or(SyncError::TaskBusy(*task.id()))?;

        let listing = client
            .list_files(task.target_folder_id())
            .await
            .map_err(SyncError::RemoteListing)?;

        let doomed = select_for_deletion(&listing.files, keep);
        if doomed.is_empty() {
            debug!(keep, "Mirror folder within retention cap");
            return Ok(None);
        }

        let items: Vec<BatchItem> = doomed
            .iter()
            .map(|f| BatchItem::file(f.id.clone(), f.name.clone()))
            .collect();
        let submission = client
            .submit_batch_delete(&items)
            .await
            .map_err(SyncError::Remote)?;
        if !submission.is_accepted() {
            return Err(SyncError::BatchSubmission {
                code: submission.code,
                message: submission.message.unwrap_or_default(),
            });
        }

        let outcome = match submission.operation_id.as_deref() {
            Some(op) => self.poller.await_completion(client, op, BatchKind::Delete).await,
            None => {
                warn!("Delete accepted without an operation id");
                PollOutcome::Pending
            }
        };

        info!(deleted = items.len(), keep, %outcome, "Retention cap enforced");
        Ok(Some(RetentionSummary {
            resource: task.display_name(),
            kept: keep,
            deleted: items.into_iter().map(|i| i.file_name).collect(),
            outcome,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{file_at, sample_task, FakeRemote};
    use sharemirror_core::domain::BatchStatus;

    fn enforcer() -> RetentionEnforcer {
        RetentionEnforcer::new(TaskLocks::new(), BatchOperationPoller::default())
    }

    fn five_files() -> Vec<RemoteFileEntry> {
        // listed newest first like the provider does, but shuffled a bit
        vec![
            file_at("t3", "c.mkv", 3),
            file_at("t5", "e.mkv", 5),
            file_at("t1", "a.mkv", 1),
            file_at("t4", "d.mkv", 4),
            file_at("t2", "b.mkv", 2),
        ]
    }

    #[test]
    fn test_select_oldest_beyond_cap() {
        let files = five_files();
        let ids: Vec<&str> = select_for_deletion(&files, 3)
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t2", "t1"]);
    }

    #[test]
    fn test_select_nothing_within_cap() {
        assert!(select_for_deletion(&five_files(), 5).is_empty());
        assert!(select_for_deletion(&five_files(), 9).is_empty());
    }

    #[test]
    fn test_missing_creation_time_counts_as_oldest() {
        let mut files = five_files();
        files[4].created_at = None;
        let ids: Vec<&str> = select_for_deletion(&files, 4)
            .iter()
            .map(|f| f.id.as_str())
            .collect();
        assert_eq!(ids, vec!["t2"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforce_deletes_exactly_the_oldest() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        let mut task = sample_task();
        task.set_max_keep_save_file(3);

        let summary = enforcer().enforce(&remote, &task).await.unwrap().unwrap();
        assert_eq!(summary.deleted.len(), 2);
        assert!(summary.outcome.is_completed());

        let submissions = remote.submissions();
        assert_eq!(submissions.len(), 1);
        let (kind, items) = &submissions[0];
        assert_eq!(*kind, BatchKind::Delete);
        let mut ids: Vec<&str> = items.iter().map(|i| i.file_id.as_str()).collect();
        ids.sort();
        assert_eq!(ids, vec!["t1", "t2"]);
        assert_eq!(remote.target_files().len(), 3);
    }

    #[tokio::test]
    async fn test_enforce_disabled_cap_is_noop() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        let task = sample_task();

        assert!(enforcer().enforce(&remote, &task).await.unwrap().is_none());
        assert!(remote.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_enforce_within_cap_is_noop() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        let mut task = sample_task();
        task.set_max_keep_save_file(5);

        assert!(enforcer().enforce(&remote, &task).await.unwrap().is_none());
        assert!(remote.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_enforce_rejected_delete_is_error() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        remote.reject_submissions(7);
        let mut task = sample_task();
        task.set_max_keep_save_file(1);

        let err = enforcer().enforce(&remote, &task).await.unwrap_err();
        assert!(matches!(err, SyncError::BatchSubmission { code: 7, .. }));
        assert_eq!(remote.target_files().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforce_reports_pending_deletion() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        remote.script_statuses(std::iter::repeat(BatchStatus::Running).take(5));
        let mut task = sample_task();
        task.set_max_keep_save_file(4);

        let summary = enforcer().enforce(&remote, &task).await.unwrap().unwrap();
        assert_eq!(summary.outcome, PollOutcome::Pending);
        assert!(summary.to_string().contains("pending"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_enforce_reports_failed_deletion() {
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        remote.script_statuses([BatchStatus::Other(9)]);
        let mut task = sample_task();
        task.set_max_keep_save_file(4);

        let summary = enforcer().enforce(&remote, &task).await.unwrap().unwrap();
        assert_eq!(summary.outcome, PollOutcome::Failed(9));
        assert!(summary.to_string().ends_with("(deletion failed, status 9)"));
    }

    #[tokio::test]
    async fn test_enforce_skips_busy_task() {
        let locks = TaskLocks::new();
        let enforcer = RetentionEnforcer::new(locks.clone(), BatchOperationPoller::default());
        let remote = FakeRemote::new();
        remote.set_target_files(five_files());
        let mut task = sample_task();
        task.set_max_keep_save_file(1);

        let _held = locks.try_acquire(task.id()).unwrap();
        let err = enforcer.enforce(&remote, &task).await.unwrap_err();
        assert!(matches!(err, SyncError::TaskBusy(_)));
    }
}
