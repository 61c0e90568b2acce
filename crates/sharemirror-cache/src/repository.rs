//! SQLite implementation of ITaskRepository
//!
//! ## Type Mapping
//!
//! | Domain Type          | SQL Type | Strategy                                        |
//! |----------------------|----------|-------------------------------------------------|
//! | TaskId, AccountId    | TEXT     | UUID string via `.to_string()` / `FromStr`      |
//! | RemoteId             | TEXT     | String via `.as_str()` / `RemoteId::new()`      |
//! | TaskStatus           | TEXT     | `.as_str()` / `FromStr`                         |
//! | RenameRule           | TEXT × 2 | `rename_source_regex`, `rename_target_template` |
//! | DateTime<Utc>        | TEXT     | RFC 3339 with nanoseconds, `Z` suffix           |
//! | bool                 | INTEGER  | 0 / 1                                           |
//!
//! Timestamps are written with a fixed width so that ordering by the text
//! column matches chronological order.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use sharemirror_core::domain::{
    Account, AccountId, Task, TaskId, TaskLog, TaskLogId, TaskStatus,
};
use sharemirror_core::ports::ITaskRepository;

use crate::CacheError;

/// SQLite-backed store for accounts, tasks and task logs
pub struct SqliteTaskRepository {
    pool: SqlitePool,
}

impl SqliteTaskRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // SQLite CURRENT_TIMESTAMP format
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_optional_datetime(s: Option<String>) -> Result<Option<DateTime<Utc>>, CacheError> {
    match s {
        Some(ref val) if !val.is_empty() => parse_datetime(val).map(Some),
        _ => Ok(None),
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============================================================================
// Row mapping functions
// ============================================================================

fn account_from_row(row: &SqliteRow) -> Result<Account, CacheError> {
    let id_str: String = row.get("id");
    let username: String = row.get("username");
    let session_token: String = row.get("session_token");
    let is_active: bool = row.get("is_active");
    let created_at_str: String = row.get("created_at");

    let id = AccountId::from_str(&id_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid AccountId '{}': {}", id_str, e))
    })?;
    let created_at = parse_datetime(&created_at_str)?;

    Ok(Account::with_id(
        id,
        username,
        session_token,
        is_active,
        created_at,
    ))
}

/// Reconstruct a Task from a database row
///
/// `Task` keeps its fields private, so the row is turned into the entity's
/// serde representation and deserialized. This also runs the newtype
/// validation of every id column.
fn task_from_row(row: &SqliteRow) -> Result<Task, CacheError> {
    let status_str: String = row.get("status");
    let status = TaskStatus::from_str(&status_str)
        .map_err(|e| CacheError::SerializationError(e.to_string()))?;

    let source_regex: Option<String> = row.get("rename_source_regex");
    let target_template: Option<String> = row.get("rename_target_template");
    let rename_rule = match (source_regex, target_template) {
        (Some(source_regex), Some(target_template)) => serde_json::json!({
            "source_regex": source_regex,
            "target_template": target_template,
        }),
        _ => serde_json::Value::Null,
    };

    let last_file_update_time = parse_optional_datetime(row.get("last_file_update_time"))?;
    let created_at_str: String = row.get("created_at");
    let updated_at_str: String = row.get("updated_at");

    let task_json = serde_json::json!({
        "id": row.get::<String, _>("id"),
        "account_id": row.get::<String, _>("account_id"),
        "share_link": row.get::<String, _>("share_link"),
        "share_id": row.get::<String, _>("share_id"),
        "share_file_id": row.get::<String, _>("share_file_id"),
        "share_folder_id": row.get::<String, _>("share_folder_id"),
        "share_folder_name": row.get::<String, _>("share_folder_name"),
        "share_mode": row.get::<i64, _>("share_mode"),
        "access_code": row.get::<Option<String>, _>("access_code"),
        "target_folder_id": row.get::<String, _>("target_folder_id"),
        "target_folder_name": row.get::<String, _>("target_folder_name"),
        "resource_name": row.get::<String, _>("resource_name"),
        "status": status,
        "current_episodes": row.get::<i64, _>("current_episodes"),
        "total_episodes": row.get::<i64, _>("total_episodes"),
        "episode_threshold": row.get::<i64, _>("episode_threshold"),
        "episode_regex": row.get::<Option<String>, _>("episode_regex"),
        "episode_use_regex": row.get::<bool, _>("episode_use_regex"),
        "whitelist_keywords": row.get::<Option<String>, _>("whitelist_keywords"),
        "blacklist_keywords": row.get::<Option<String>, _>("blacklist_keywords"),
        "max_keep_save_file": row.get::<i64, _>("max_keep_save_file"),
        "rename_rule": rename_rule,
        "check_interval_secs": row.get::<Option<i64>, _>("check_interval_secs"),
        "last_error": row.get::<Option<String>, _>("last_error"),
        "last_file_update_time": last_file_update_time,
        "created_at": parse_datetime(&created_at_str)?,
        "updated_at": parse_datetime(&updated_at_str)?,
    });

    serde_json::from_value(task_json).map_err(|e| {
        CacheError::SerializationError(format!("Failed to reconstruct Task from row: {}", e))
    })
}

fn task_log_from_row(row: &SqliteRow) -> Result<TaskLog, CacheError> {
    let id: i64 = row.get("id");
    let task_id_str: String = row.get("task_id");
    let message: String = row.get("message");
    let created_at_str: String = row.get("created_at");

    let task_id = TaskId::from_str(&task_id_str).map_err(|e| {
        CacheError::SerializationError(format!("Invalid TaskId '{}': {}", task_id_str, e))
    })?;

    Ok(TaskLog::with_id(
        TaskLogId::new(id),
        task_id,
        message,
        parse_datetime(&created_at_str)?,
    ))
}

fn collect<T>(
    rows: Vec<SqliteRow>,
    map: fn(&SqliteRow) -> Result<T, CacheError>,
) -> anyhow::Result<Vec<T>> {
    rows.iter()
        .map(|r| map(r).map_err(anyhow::Error::from))
        .collect()
}

// ============================================================================
// ITaskRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl ITaskRepository for SqliteTaskRepository {
    // --- Account operations ---

    async fn save_account(&self, account: &Account) -> anyhow::Result<()> {
        let id = account.id().to_string();

        sqlx::query(
            "INSERT INTO accounts (id, username, session_token, is_active, created_at) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             username = excluded.username, \
             session_token = excluded.session_token, \
             is_active = excluded.is_active",
        )
        .bind(&id)
        .bind(account.username())
        .bind(account.session_token())
        .bind(account.is_active())
        .bind(format_datetime(&account.created_at()))
        .execute(&self.pool)
        .await?;

        tracing::trace!(account_id = %id, "Saved account");
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(account_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>> {
        let rows = sqlx::query("SELECT * FROM accounts ORDER BY created_at ASC, rowid ASC")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, account_from_row)
    }

    async fn remove_account(&self, id: &AccountId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::trace!(account_id = %id, removed = result.rows_affected(), "Removed account");
        Ok(result.rows_affected() > 0)
    }

    // --- Task operations ---

    async fn save_task(&self, task: &Task) -> anyhow::Result<()> {
        let id = task.id().to_string();
        let rule = task.rename_rule();
        let interval = task
            .check_interval_secs()
            .map(|s| i64::try_from(s).unwrap_or(i64::MAX));

        sqlx::query(
            "INSERT INTO tasks \
             (id, account_id, share_link, share_id, share_file_id, share_folder_id, \
              share_folder_name, share_mode, access_code, target_folder_id, target_folder_name, \
              resource_name, status, current_episodes, total_episodes, episode_threshold, \
              episode_regex, episode_use_regex, whitelist_keywords, blacklist_keywords, \
              max_keep_save_file, rename_source_regex, rename_target_template, \
              check_interval_secs, last_error, last_file_update_time, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
             account_id = excluded.account_id, \
             share_link = excluded.share_link, \
             share_id = excluded.share_id, \
             share_file_id = excluded.share_file_id, \
             share_folder_id = excluded.share_folder_id, \
             share_folder_name = excluded.share_folder_name, \
             share_mode = excluded.share_mode, \
             access_code = excluded.access_code, \
             target_folder_id = excluded.target_folder_id, \
             target_folder_name = excluded.target_folder_name, \
             resource_name = excluded.resource_name, \
             status = excluded.status, \
             current_episodes = excluded.current_episodes, \
             total_episodes = excluded.total_episodes, \
             episode_threshold = excluded.episode_threshold, \
             episode_regex = excluded.episode_regex, \
             episode_use_regex = excluded.episode_use_regex, \
             whitelist_keywords = excluded.whitelist_keywords, \
             blacklist_keywords = excluded.blacklist_keywords, \
             max_keep_save_file = excluded.max_keep_save_file, \
             rename_source_regex = excluded.rename_source_regex, \
             rename_target_template = excluded.rename_target_template, \
             check_interval_secs = excluded.check_interval_secs, \
             last_error = excluded.last_error, \
             last_file_update_time = excluded.last_file_update_time, \
             updated_at = excluded.updated_at",
        )
        .bind(&id)
        .bind(task.account_id().to_string())
        .bind(task.share_link())
        .bind(task.share_id())
        .bind(task.share_file_id().as_str())
        .bind(task.share_folder_id().as_str())
        .bind(task.share_folder_name())
        .bind(task.share_mode())
        .bind(task.access_code())
        .bind(task.target_folder_id().as_str())
        .bind(task.target_folder_name())
        .bind(task.resource_name())
        .bind(task.status().as_str())
        .bind(i64::from(task.current_episodes()))
        .bind(i64::from(task.total_episodes()))
        .bind(i64::from(task.episode_threshold()))
        .bind(task.episode_regex())
        .bind(task.episode_use_regex())
        .bind(task.whitelist_keywords())
        .bind(task.blacklist_keywords())
        .bind(i64::from(task.max_keep_save_file()))
        .bind(rule.map(|r| r.source_regex.as_str()))
        .bind(rule.map(|r| r.target_template.as_str()))
        .bind(interval)
        .bind(task.last_error())
        .bind(task.last_file_update_time().as_ref().map(format_datetime))
        .bind(format_datetime(&task.created_at()))
        .bind(format_datetime(&task.updated_at()))
        .execute(&self.pool)
        .await?;

        tracing::trace!(task_id = %id, status = %task.status(), "Saved task");
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> anyhow::Result<Option<Task>> {
        let row = sqlx::query("SELECT * FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(task_from_row(r)?)),
            None => Ok(None),
        }
    }

    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        let rows = sqlx::query("SELECT * FROM tasks ORDER BY created_at DESC, rowid DESC")
            .fetch_all(&self.pool)
            .await?;
        collect(rows, task_from_row)
    }

    async fn find_tasks_by_status(&self, statuses: &[TaskStatus]) -> anyhow::Result<Vec<Task>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT * FROM tasks WHERE status IN ({}) ORDER BY created_at ASC, rowid ASC",
            placeholders(statuses.len())
        );
        let mut query = sqlx::query(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        collect(rows, task_from_row)
    }

    async fn remove_task(&self, id: &TaskId) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        tracing::trace!(task_id = %id, removed = result.rows_affected(), "Removed task");
        Ok(result.rows_affected() > 0)
    }

    // --- Task log operations ---

    async fn append_log(&self, entry: &TaskLog) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO task_logs (task_id, message, created_at) VALUES (?, ?, ?)")
            .bind(entry.task_id().to_string())
            .bind(entry.message())
            .bind(format_datetime(&entry.created_at()))
            .execute(&self.pool)
            .await?;

        tracing::trace!(task_id = %entry.task_id(), "Appended task log");
        Ok(())
    }

    async fn recent_logs(&self, limit: u32) -> anyhow::Result<Vec<TaskLog>> {
        let rows =
            sqlx::query("SELECT * FROM task_logs ORDER BY created_at DESC, id DESC LIMIT ?")
                .bind(i64::from(limit))
                .fetch_all(&self.pool)
                .await?;
        collect(rows, task_log_from_row)
    }

    async fn logs_for_task(&self, id: &TaskId) -> anyhow::Result<Vec<TaskLog>> {
        let rows = sqlx::query(
            "SELECT * FROM task_logs WHERE task_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(id.to_string())
        .fetch_all(&self.pool)
        .await?;
        collect(rows, task_log_from_row)
    }
}
