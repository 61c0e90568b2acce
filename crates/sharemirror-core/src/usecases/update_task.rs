//! Task update use case
//!
//! Applies an administrative patch to a stored task. The whole patch is
//! validated before anything is changed, so a rejected update leaves the
//! task untouched.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::domain::task::compile_pattern;
use crate::domain::{DomainError, RemoteId, RenameRule, Task, TaskId, TaskStatus};
use crate::ports::ITaskRepository;

/// Patch of optional task fields
///
/// Counts are signed so that negative input is reported as a validation
/// error instead of failing to parse. For text filters and patterns an
/// empty string clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskUpdate {
    pub resource_name: Option<String>,
    pub target_folder_id: Option<String>,
    pub target_folder_name: Option<String>,
    pub share_folder_id: Option<String>,
    pub share_folder_name: Option<String>,
    pub current_episodes: Option<i64>,
    pub total_episodes: Option<i64>,
    pub status: Option<String>,
    pub episode_threshold: Option<i64>,
    pub episode_regex: Option<String>,
    pub episode_use_regex: Option<bool>,
    pub whitelist_keywords: Option<String>,
    pub blacklist_keywords: Option<String>,
    pub max_keep_save_file: Option<i64>,
    pub rename_source_regex: Option<String>,
    pub rename_target_template: Option<String>,
    /// `0` removes the per-task interval
    pub check_interval_secs: Option<i64>,
}

/// Patch values after validation
struct ValidatedUpdate {
    target_folder_id: Option<RemoteId>,
    share_folder_id: Option<RemoteId>,
    current_episodes: Option<u32>,
    total_episodes: Option<u32>,
    status: Option<TaskStatus>,
    episode_threshold: Option<u32>,
    max_keep_save_file: Option<u32>,
    rename_rule: Option<Option<RenameRule>>,
    check_interval_secs: Option<Option<u64>>,
}

fn non_negative(field: &str, value: Option<i64>) -> Result<Option<u32>, DomainError> {
    value
        .map(|v| {
            u32::try_from(v).map_err(|_| {
                DomainError::ValidationFailed(format!("{field} must be between 0 and {}", u32::MAX))
            })
        })
        .transpose()
}

fn remote_id(value: Option<&str>) -> Result<Option<RemoteId>, DomainError> {
    value.map(RemoteId::new).transpose()
}

impl TaskUpdate {
    /// Returns true if no field is set
    pub fn is_empty(&self) -> bool {
        self == &TaskUpdate::default()
    }

    fn validate(&self, task: &Task) -> Result<ValidatedUpdate, DomainError> {
        let status = self
            .status
            .as_deref()
            .map(str::parse::<TaskStatus>)
            .transpose()?;

        if let Some(pattern) = self.episode_regex.as_deref().filter(|p| !p.trim().is_empty()) {
            compile_pattern(pattern)?;
        }

        let check_interval_secs = match self.check_interval_secs {
            None => None,
            Some(v) if v < 0 => {
                return Err(DomainError::ValidationFailed(
                    "check_interval_secs must not be negative".to_string(),
                ))
            }
            Some(0) => Some(None),
            Some(v) => Some(Some(v as u64)),
        };

        let rename_rule = match (&self.rename_source_regex, &self.rename_target_template) {
            (None, None) => None,
            (Some(src), _) if src.trim().is_empty() => Some(None),
            (source, template) => {
                let existing = task.rename_rule();
                let source = source
                    .clone()
                    .or_else(|| existing.map(|r| r.source_regex.clone()))
                    .ok_or_else(|| {
                        DomainError::ValidationFailed(
                            "rename target given without a source pattern".to_string(),
                        )
                    })?;
                let template = template
                    .clone()
                    .or_else(|| existing.map(|r| r.target_template.clone()))
                    .unwrap_or_default();
                Some(Some(RenameRule::new(source, template)?))
            }
        };

        Ok(ValidatedUpdate {
            target_folder_id: remote_id(self.target_folder_id.as_deref())?,
            share_folder_id: remote_id(self.share_folder_id.as_deref())?,
            current_episodes: non_negative("current_episodes", self.current_episodes)?,
            total_episodes: non_negative("total_episodes", self.total_episodes)?,
            status,
            episode_threshold: non_negative("episode_threshold", self.episode_threshold)?,
            max_keep_save_file: non_negative("max_keep_save_file", self.max_keep_save_file)?,
            rename_rule,
            check_interval_secs,
        })
    }

    fn apply(&self, task: &mut Task, valid: ValidatedUpdate) -> Result<(), DomainError> {
        if let Some(name) = &self.resource_name {
            task.set_resource_name(name.clone());
        }
        if let Some(id) = valid.target_folder_id {
            task.set_target_folder(id, self.target_folder_name.clone());
        } else if let Some(name) = &self.target_folder_name {
            task.set_target_folder_name(name.clone());
        }
        if let Some(id) = valid.share_folder_id {
            task.set_share_folder(id, self.share_folder_name.clone());
        } else if let Some(name) = &self.share_folder_name {
            task.set_share_folder_name(name.clone());
        }
        if valid.current_episodes.is_some() || valid.total_episodes.is_some() {
            task.set_episode_counts(valid.current_episodes, valid.total_episodes);
        }
        if let Some(status) = valid.status {
            task.set_status(status);
        }
        if let Some(threshold) = valid.episode_threshold {
            task.set_episode_threshold(threshold);
        }
        if let Some(pattern) = &self.episode_regex {
            task.set_episode_regex(Some(pattern.clone()))?;
        }
        if let Some(enabled) = self.episode_use_regex {
            task.set_episode_use_regex(enabled);
        }
        if let Some(keywords) = &self.whitelist_keywords {
            task.set_whitelist_keywords(Some(keywords.clone()));
        }
        if let Some(keywords) = &self.blacklist_keywords {
            task.set_blacklist_keywords(Some(keywords.clone()));
        }
        if let Some(cap) = valid.max_keep_save_file {
            task.set_max_keep_save_file(cap);
        }
        if let Some(rule) = valid.rename_rule {
            task.set_rename_rule(rule);
        }
        if let Some(interval) = valid.check_interval_secs {
            task.set_check_interval_secs(interval);
        }
        Ok(())
    }
}

/// Use case for administrative task changes
pub struct UpdateTaskUseCase {
    repository: Arc<dyn ITaskRepository>,
}

impl UpdateTaskUseCase {
    pub fn new(repository: Arc<dyn ITaskRepository>) -> Self {
        Self { repository }
    }

    async fn load(&self, id: &TaskId) -> Result<Task> {
        self.repository
            .get_task(id)
            .await
            .context("Failed to load task")?
            .with_context(|| format!("Task not found: {id}"))
    }

    /// Validates and applies `update`, returning the saved task
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::ValidationFailed`] (or `InvalidPattern`)
    /// wrapped in `anyhow` for invalid input, or a storage error.
    pub async fn execute(&self, id: &TaskId, update: &TaskUpdate) -> Result<Task> {
        let mut task = self.load(id).await?;
        let valid = update.validate(&task)?;
        update.apply(&mut task, valid)?;
        self.repository
            .save_task(&task)
            .await
            .context("Failed to save updated task")?;
        info!(task_id = %id, "Task updated");
        Ok(task)
    }

    /// Returns a task to `pending` so the scheduler picks it up again
    pub async fn reset(&self, id: &TaskId) -> Result<Task> {
        let mut task = self.load(id).await?;
        task.reset();
        self.repository
            .save_task(&task)
            .await
            .context("Failed to save reset task")?;
        info!(task_id = %id, "Task reset to pending");
        Ok(task)
    }
}
