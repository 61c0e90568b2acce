//! Batch operation poller
//!
//! Drives a submitted batch operation to a terminal state within a fixed
//! attempt budget:
//!
//! ```text
//! Running ──(wait)──> poll again
//! Conflict ──(skip every clashing item, wait)──> poll again
//! client error ──(wait)──> poll again
//! Success ──> Completed
//! other ──> Failed
//! budget spent ──> Pending
//! ```
//!
//! `Pending` means "unknown or incomplete", never success. A stuck operation
//! is picked up again by the next reconciliation instead of blocking the
//! tick.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use sharemirror_core::config::PollerConfig;
use sharemirror_core::domain::{BatchKind, BatchStatus, ConflictDealWay, ResolvedItem};
use sharemirror_core::ports::IRemoteShareClient;

/// Default number of status polls per operation
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default pause between polls
pub const DEFAULT_POLL_DELAY: Duration = Duration::from_millis(200);

/// How a polled operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The provider reported success
    Completed,
    /// Still running (or unobservable) when the budget ran out
    Pending,
    /// The provider reported a terminal status other than success
    Failed(i64),
}

impl PollOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, PollOutcome::Completed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PollOutcome::Failed(_))
    }
}

impl fmt::Display for PollOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PollOutcome::Completed => f.write_str("completed"),
            PollOutcome::Pending => f.write_str("pending"),
            PollOutcome::Failed(code) => write!(f, "failed (status {code})"),
        }
    }
}

/// Bounded state machine over a batch operation's status
#[derive(Debug, Clone)]
pub struct BatchOperationPoller {
    max_attempts: u32,
    delay: Duration,
}

impl Default for BatchOperationPoller {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_DELAY)
    }
}

impl BatchOperationPoller {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(config: &PollerConfig) -> Self {
        Self::new(config.max_attempts, Duration::from_millis(config.delay_ms))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Polls `operation_id` until it succeeds, fails, or the budget runs out
    ///
    /// Name clashes are resolved by keeping the existing file. A client
    /// error while polling or resolving costs one attempt.
    #[tracing::instrument(skip(self, client))]
    pub async fn await_completion(
        &self,
        client: &dyn IRemoteShareClient,
        operation_id: &str,
        kind: BatchKind,
    ) -> PollOutcome {
        for attempt in 1..=self.max_attempts {
            match client.poll_batch_status(operation_id, kind).await {
                Ok(BatchStatus::Success) => {
                    debug!(attempt, "Batch operation finished");
                    return PollOutcome::Completed;
                }
                Ok(BatchStatus::Running) => {
                    debug!(attempt, "Batch operation still running");
                }
                Ok(BatchStatus::Conflict) => {
                    if let Err(e) = self.skip_conflicts(client, operation_id, kind).await {
                        warn!(attempt, error = %format!("{e:#}"), "Conflict resolution failed");
                    }
                }
                Ok(BatchStatus::Other(code)) => {
                    warn!(attempt, code, "Batch operation ended in an unexpected state");
                    return PollOutcome::Failed(code);
                }
                Err(e) => {
                    warn!(attempt, error = %format!("{e:#}"), "Batch status poll failed");
                }
            }

            if attempt < self.max_attempts {
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(
            attempts = self.max_attempts,
            "Batch operation still pending after polling budget"
        );
        PollOutcome::Pending
    }

    async fn skip_conflicts(
        &self,
        client: &dyn IRemoteShareClient,
        operation_id: &str,
        kind: BatchKind,
    ) -> anyhow::Result<()> {
        let detail = client.get_conflict_detail(operation_id, kind).await?;
        let resolved: Vec<ResolvedItem> = detail
            .items
            .into_iter()
            .map(|item| item.resolve(ConflictDealWay::Skip))
            .collect();
        info!(count = resolved.len(), "Skipping conflicting items, keeping existing files");
        client
            .resolve_conflict(operation_id, kind, &detail.target_folder_id, &resolved)
            .await
    }
}
