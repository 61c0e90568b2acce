//! Task log entries
//!
//! Append-only record of what each reconciliation transferred.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{TaskId, TaskLogId};

/// A single log line attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLog {
    /// Row id, assigned by the database
    id: Option<TaskLogId>,
    task_id: TaskId,
    message: String,
    created_at: DateTime<Utc>,
}

impl TaskLog {
    /// Creates an unsaved entry stamped with the current time
    pub fn new(task_id: TaskId, message: impl Into<String>) -> Self {
        Self {
            id: None,
            task_id,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// Rebuilds an entry from storage
    pub fn with_id(
        id: TaskLogId,
        task_id: TaskId,
        message: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            task_id,
            message: message.into(),
            created_at,
        }
    }

    pub fn id(&self) -> Option<TaskLogId> {
        self.id
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
