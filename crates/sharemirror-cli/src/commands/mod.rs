//! Subcommand implementations and the context they share

pub mod account;
pub mod config;
pub mod logs;
pub mod run;
pub mod task;

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use sharemirror_cache::{DatabasePool, SqliteTaskRepository};
use sharemirror_core::config::Config;
use sharemirror_core::domain::{AccountId, TaskId};
use sharemirror_core::ports::ITaskRepository;

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Global flags every subcommand sees
#[derive(Debug, Clone)]
pub struct CliContext {
    pub config_path: PathBuf,
    pub format: OutputFormat,
    pub quiet: bool,
}

impl CliContext {
    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format, self.quiet)
    }

    /// Configuration from `--config` (or the default path), defaults when absent
    pub fn load_config(&self) -> Result<Config> {
        if self.config_path.exists() {
            Config::load(&self.config_path)
        } else {
            debug!(path = %self.config_path.display(), "No config file, using defaults");
            Ok(Config::default())
        }
    }

    /// Opens the state database named in the configuration
    pub async fn open_repository(&self, config: &Config) -> Result<Arc<dyn ITaskRepository>> {
        let pool = DatabasePool::new(Path::new(&config.storage.database))
            .await
            .context("Failed to open database")?;
        Ok(Arc::new(SqliteTaskRepository::new(pool.pool().clone())))
    }
}

pub fn parse_task_id(raw: &str) -> Result<TaskId> {
    TaskId::from_str(raw).with_context(|| format!("'{raw}' is not a task id"))
}

pub fn parse_account_id(raw: &str) -> Result<AccountId> {
    AccountId::from_str(raw).with_context(|| format!("'{raw}' is not an account id"))
}
