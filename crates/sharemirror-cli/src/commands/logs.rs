//! Logs command - show what past passes transferred

use anyhow::Result;
use clap::Args;

use sharemirror_core::domain::TaskLog;

use super::{parse_task_id, CliContext};
use crate::output::{Listing, Render};

#[derive(Debug, Args)]
pub struct LogsCommand {
    /// Only entries of this task
    #[arg(long)]
    pub task: Option<String>,

    /// Maximum number of entries
    #[arg(long, default_value_t = 20)]
    pub limit: u32,
}

impl Render for TaskLog {
    /// A timestamped header, then the transfer text indented
    fn lines(&self) -> Vec<String> {
        let header = format!(
            "[{}] {}",
            self.created_at().format("%Y-%m-%d %H:%M:%S"),
            self.task_id()
        );
        std::iter::once(header)
            .chain(self.message().lines().map(|line| format!("    {line}")))
            .collect()
    }

    fn json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id().map(|id| id.as_i64()),
            "task_id": self.task_id().to_string(),
            "message": self.message(),
            "created_at": self.created_at().to_rfc3339(),
        })
    }
}

impl LogsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config = ctx.load_config()?;
        let repo = ctx.open_repository(&config).await?;
        let formatter = ctx.formatter();

        let mut entries = match &self.task {
            Some(raw) => repo.logs_for_task(&parse_task_id(raw)?).await?,
            None => repo.recent_logs(self.limit).await?,
        };
        entries.truncate(self.limit as usize);

        formatter.show(&Listing::new(&entries, "No log entries"));
        Ok(())
    }
}
