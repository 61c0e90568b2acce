//! Task repository port (driven/secondary port)
//!
//! This module defines the interface for persisting accounts, tasks and
//! the append-only task log.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because storage errors are adapter-specific.
//! - `save_*` methods upsert; the caller keeps ownership of the entity.
//! - Task logs are write-once; there is no update or delete besides the
//!   cascade when a task is removed.

use crate::domain::{Account, AccountId, Task, TaskId, TaskLog, TaskStatus};

/// Port trait for persistent task storage
#[async_trait::async_trait]
pub trait ITaskRepository: Send + Sync {
    // --- Account operations ---

    /// Saves an account (insert or update)
    async fn save_account(&self, account: &Account) -> anyhow::Result<()>;

    /// Retrieves an account by its ID
    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>>;

    /// Lists all accounts, oldest first
    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>>;

    /// Removes an account; returns false if it did not exist
    async fn remove_account(&self, id: &AccountId) -> anyhow::Result<bool>;

    // --- Task operations ---

    /// Saves a task (insert or update)
    async fn save_task(&self, task: &Task) -> anyhow::Result<()>;

    /// Retrieves a task by its ID
    async fn get_task(&self, id: &TaskId) -> anyhow::Result<Option<Task>>;

    /// Lists all tasks, newest first
    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>>;

    /// Lists tasks whose status is one of `statuses`, oldest first
    async fn find_tasks_by_status(&self, statuses: &[TaskStatus]) -> anyhow::Result<Vec<Task>>;

    /// Removes a task and its log; returns false if it did not exist
    async fn remove_task(&self, id: &TaskId) -> anyhow::Result<bool>;

    // --- Task log operations ---

    /// Appends a log entry
    async fn append_log(&self, entry: &TaskLog) -> anyhow::Result<()>;

    /// Most recent log entries across all tasks, newest first
    async fn recent_logs(&self, limit: u32) -> anyhow::Result<Vec<TaskLog>>;

    /// All log entries of one task, newest first
    async fn logs_for_task(&self, id: &TaskId) -> anyhow::Result<Vec<TaskLog>>;
}
