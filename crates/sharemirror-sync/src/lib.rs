//! ShareMirror Sync - share reconciliation engine
//!
//! Provides:
//! - Incremental mirroring of a share folder into a target folder
//! - Content-hash deduplication and episode-ordinal gating
//! - Keyword allow/deny filtering
//! - Bounded batch-operation polling with automatic conflict skipping
//! - Retention enforcement on mirror folders
//!
//! ## Modules
//!
//! - [`episode`] - Episode ordinal extraction from file names
//! - [`filter`] - Per-file eligibility (keywords, episode threshold)
//! - [`engine`] - One reconciliation pass for one task
//! - [`poller`] - Drives a submitted batch operation to completion
//! - [`retention`] - Trims mirror folders to their retention cap
//! - [`rename`] - Optional rule-based renames after a transfer
//! - [`locks`] - Per-task single-flight guard
//! - [`registry`] - Remote client per account
//! - [`scheduler`] - Tick-level orchestration across tasks

pub mod engine;
pub mod episode;
pub mod filter;
pub mod locks;
pub mod poller;
pub mod registry;
pub mod rename;
pub mod retention;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

use sharemirror_core::domain::{AccountId, DomainError, TaskId};
use thiserror::Error;

/// Errors that can occur while reconciling or trimming a task
#[derive(Debug, Error)]
pub enum SyncError {
    /// The share or mirror listing was unavailable or malformed
    #[error("Remote listing failed: {0:#}")]
    RemoteListing(anyhow::Error),

    /// The provider refused a batch submission
    #[error("Batch submission rejected (code {code}): {message}")]
    BatchSubmission {
        /// Provider result code
        code: i64,
        /// Provider message
        message: String,
    },

    /// Any other remote call failed
    #[error("Remote call failed: {0:#}")]
    Remote(anyhow::Error),

    /// Reading or writing task state failed
    #[error("Repository error: {0:#}")]
    Repository(anyhow::Error),

    /// Another reconciliation of the same task is in flight
    #[error("Task {0} is busy")]
    TaskBusy(TaskId),

    /// The task does not exist (removed between selection and processing)
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// The task references an unknown account
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// A domain-level error propagated from sharemirror-core
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl SyncError {
    /// Errors that leave the task marked failed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteListing(_) | SyncError::BatchSubmission { .. } | SyncError::Remote(_)
        )
    }
}

/// Formats a byte count for summaries (`1.50 GB`)
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536 * 1024 * 1024), "1.50 GB");
    }

    #[test]
    fn test_fatal_classification() {
        assert!(SyncError::RemoteListing(anyhow::anyhow!("down")).is_fatal());
        assert!(SyncError::BatchSubmission {
            code: 1,
            message: "full".into()
        }
        .is_fatal());
        assert!(!SyncError::TaskBusy(TaskId::new()).is_fatal());
        assert!(!SyncError::Repository(anyhow::anyhow!("locked")).is_fatal());
    }
}
