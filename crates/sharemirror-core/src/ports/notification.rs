//! Notification service port (driven/secondary port)
//!
//! This module defines the interface for delivering sync summaries and
//! failures to the operator. Implementations may post to a chat webhook
//! or simply write to the log.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because delivery is adapter-specific.
//! - Notifications are fire-and-forget; callers log a failed delivery and
//!   carry on.

use serde::{Deserialize, Serialize};

/// Priority level for a notification
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    /// Routine update
    #[default]
    Normal,
    /// Something went wrong and may need attention
    High,
}

impl std::fmt::Display for NotificationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        };
        write!(f, "{}", s)
    }
}

/// A message for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Short heading
    pub title: String,
    /// Body text, possibly multi-line
    pub body: String,
    /// Priority level
    pub priority: NotificationPriority,
    /// Category for filtering (`sync`, `error`, `rename`)
    pub category: String,
}

impl Notification {
    /// Creates a normal-priority notification with no category
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            priority: NotificationPriority::Normal,
            category: String::new(),
        }
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Creates a sync summary notification
    pub fn sync(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body).with_category("sync")
    }

    /// Creates an error notification with High priority
    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(title, body)
            .with_priority(NotificationPriority::High)
            .with_category("error")
    }

    /// Title and body joined the way text-only channels display them
    pub fn as_text(&self) -> String {
        if self.title.is_empty() {
            self.body.clone()
        } else {
            format!("{}\n\n{}", self.title, self.body)
        }
    }
}

/// Port trait for delivering notifications
#[async_trait::async_trait]
pub trait INotificationService: Send + Sync {
    /// Delivers a notification to the operator
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()>;
}
