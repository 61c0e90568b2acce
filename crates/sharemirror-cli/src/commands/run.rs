//! Run command - one reconciliation pass in the foreground
//!
//! Without `--task`, runs the global tick and then the override sweep, so
//! every active task is visited once whatever its interval.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use sharemirror_cloud::provider::share_client_for;
use sharemirror_core::domain::Account;
use sharemirror_sync::registry::ClientFactory;
use sharemirror_sync::scheduler::{TaskScheduler, TickReport};

use super::{parse_task_id, CliContext};
use crate::output::Render;

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Run only this task, even if it has its own interval
    #[arg(long)]
    pub task: Option<String>,
}

impl Render for TickReport {
    /// Each task summary followed by a blank line
    fn lines(&self) -> Vec<String> {
        self.summaries
            .iter()
            .flat_map(|summary| [summary.clone(), String::new()])
            .collect()
    }

    fn json(&self) -> serde_json::Value {
        serde_json::json!({
            "processed": self.processed,
            "skipped": self.skipped,
            "failed": self.failed,
            "summaries": self.summaries,
            "failures": self.failures,
        })
    }
}

impl RunCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config = ctx.load_config()?;
        let repo = ctx.open_repository(&config).await?;
        let formatter = ctx.formatter();

        let provider_config = config.provider.clone();
        let factory: ClientFactory =
            Arc::new(move |account: &Account| share_client_for(&provider_config, account));
        let scheduler = TaskScheduler::from_config(&config, repo, factory);

        let report = match &self.task {
            Some(raw) => scheduler.run_task(&parse_task_id(raw)?).await?,
            None => {
                let mut report = scheduler.run_global_tick().await?;
                report.merge(scheduler.run_override_sweep(Utc::now()).await?);
                report
            }
        };

        for failure in &report.failures {
            formatter.error(failure);
        }
        formatter.done(
            &format!(
                "{} processed, {} skipped, {} failed",
                report.processed, report.skipped, report.failed
            ),
            &report,
        );
        Ok(())
    }
}
