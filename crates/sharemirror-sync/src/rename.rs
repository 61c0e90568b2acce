//! Rule-based renames in the mirror folder
//!
//! When a task carries a rename rule, every file of its mirror folder whose
//! name changes under the rule is renamed, one request at a time with a
//! short pause in between. Refusals are collected, never raised.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use sharemirror_core::domain::{RenameOutcome, Task};
use sharemirror_core::ports::IRemoteShareClient;

/// Default pause between rename requests
pub const DEFAULT_RENAME_PAUSE: Duration = Duration::from_millis(50);

/// One attempted rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameAttempt {
    pub from: String,
    pub to: String,
    /// `None` on success, the provider's reason otherwise
    pub failure: Option<String>,
}

/// All renames attempted for one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameReport {
    pub resource: String,
    pub attempts: Vec<RenameAttempt>,
}

impl RenameReport {
    pub fn renamed(&self) -> usize {
        self.attempts.iter().filter(|a| a.failure.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempts.len() - self.renamed()
    }
}

impl fmt::Display for RenameReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} auto-rename:", self.resource)?;
        for a in &self.attempts {
            match &a.failure {
                None => write!(f, "\n  {} => {} ok", a.from, a.to)?,
                Some(reason) => write!(f, "\n  {} => {} failed: {}", a.from, a.to, reason)?,
            }
        }
        Ok(())
    }
}

/// Applies a task's rename rule to its mirror folder
#[derive(Debug, Clone)]
pub struct AutoRenamer {
    pause: Duration,
}

impl Default for AutoRenamer {
    fn default() -> Self {
        Self::new(DEFAULT_RENAME_PAUSE)
    }
}

impl AutoRenamer {
    pub fn new(pause: Duration) -> Self {
        Self { pause }
    }

    /// Renames matching files; `None` when the task has no rule or nothing matched
    ///
    /// Only a failed folder listing is an error.
    #[tracing::instrument(skip(self, client, task), fields(task_id = %task.id()))]
    pub async fn apply(
        &self,
        client: &dyn IRemoteShareClient,
        task: &Task,
    ) -> anyhow::Result<Option<RenameReport>> {
        let Some(rule) = task.rename_rule() else {
            return Ok(None);
        };

        let listing = client.list_files(task.target_folder_id()).await?;
        let planned: Vec<_> = listing
            .plain_files()
            .filter_map(|f| rule.apply(&f.name).map(|to| (f.id.clone(), f.name.clone(), to)))
            .collect();
        if planned.is_empty() {
            debug!("No file matches the rename rule");
            return Ok(None);
        }

        let mut attempts = Vec::with_capacity(planned.len());
        for (i, (id, from, to)) in planned.into_iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pause).await;
            }
            let failure = match client.rename_file(&id, &to).await {
                Ok(RenameOutcome::Renamed) => None,
                Ok(RenameOutcome::Rejected { code, message }) => {
                    Some(format!("{} ({})", message, code))
                }
                Err(e) => Some(format!("{e:#}")),
            };
            if let Some(reason) = &failure {
                warn!(from = %from, to = %to, reason = %reason, "Rename failed");
            }
            attempts.push(RenameAttempt { from, to, failure });
        }

        let report = RenameReport {
            resource: task.display_name(),
            attempts,
        };
        info!(renamed = report.renamed(), failed = report.failed(), "Auto-rename done");
        Ok(Some(report))
    }
}
