//! Mirror task domain entity
//!
//! A [`Task`] maps one sub-tree of a remote share onto one folder of the
//! operator's drive. It records where to read from, where to write to,
//! which files are wanted (keyword lists, episode threshold) and how far
//! mirroring has progressed.
//!
//! ## State machine
//!
//! ```text
//! pending ──┐
//!           ├──(transfer submitted)──> processing ──(transfer submitted)──> processing
//! processing┘
//!   any ──(unrecoverable remote error)──> failed ──(operator reset)──> pending
//! ```
//!
//! `completed` is only ever set administratively.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{
    errors::DomainError,
    newtypes::{AccountId, RemoteId, TaskId},
};

// ============================================================================
// TaskStatus
// ============================================================================

/// Processing status of a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Created, never transferred anything
    #[default]
    Pending,
    /// At least one transfer has been submitted
    Processing,
    /// Marked done by the operator
    Completed,
    /// Stopped after an unrecoverable remote error
    Failed,
}

impl TaskStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
    ];

    /// Statuses the scheduler picks up
    pub const ACTIVE: [TaskStatus; 2] = [TaskStatus::Pending, TaskStatus::Processing];

    /// Stable lowercase name used in storage and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Returns true if the scheduler should consider this task
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::Processing)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| DomainError::ValidationFailed(format!("invalid status value: {s}")))
    }
}

// ============================================================================
// RenameRule / ShareLocation
// ============================================================================

/// Regex-based rename applied to mirrored files
///
/// `target_template` uses the `regex` crate replacement syntax (`$1`, `${name}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameRule {
    /// Pattern matched against the current file name
    pub source_regex: String,
    /// Replacement template
    pub target_template: String,
}

impl RenameRule {
    /// Creates a rule after checking the pattern compiles
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPattern`] if `source_regex` is malformed
    pub fn new(
        source_regex: impl Into<String>,
        target_template: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let rule = Self {
            source_regex: source_regex.into(),
            target_template: target_template.into(),
        };
        compile_pattern(&rule.source_regex)?;
        Ok(rule)
    }

    /// Computes the new name for `name`, or `None` if the rule leaves it unchanged
    pub fn apply(&self, name: &str) -> Option<String> {
        let re = Regex::new(&self.source_regex).ok()?;
        let renamed = re.replace(name, self.target_template.as_str());
        (renamed != name).then(|| renamed.into_owned())
    }
}

/// Coordinates needed to list one folder of a share
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareLocation {
    /// Provider share id
    pub share_id: String,
    /// Folder inside the share
    pub folder_id: RemoteId,
    /// Provider share mode
    pub share_mode: i32,
    /// Access code for protected shares
    pub access_code: Option<String>,
}

impl ShareLocation {
    /// Same share, different folder
    pub fn with_folder(&self, folder_id: RemoteId) -> Self {
        Self {
            folder_id,
            ..self.clone()
        }
    }
}

pub(crate) fn compile_pattern(pattern: &str) -> Result<Regex, DomainError> {
    Regex::new(pattern).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

fn split_keywords(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

// ============================================================================
// TaskDraft
// ============================================================================

/// Everything needed to create a new task
///
/// Progress fields start at their defaults; see [`Task::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub account_id: AccountId,
    pub share_link: String,
    pub share_id: String,
    pub share_file_id: RemoteId,
    pub share_folder_id: RemoteId,
    pub share_folder_name: String,
    pub share_mode: i32,
    pub access_code: Option<String>,
    pub target_folder_id: RemoteId,
    pub target_folder_name: String,
    pub resource_name: String,
    pub current_episodes: u32,
    pub total_episodes: u32,
}

// ============================================================================
// Task
// ============================================================================

/// One mirrored mapping from a remote share sub-tree to a target folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    account_id: AccountId,
    share_link: String,
    share_id: String,
    share_file_id: RemoteId,
    share_folder_id: RemoteId,
    share_folder_name: String,
    share_mode: i32,
    access_code: Option<String>,
    target_folder_id: RemoteId,
    target_folder_name: String,
    resource_name: String,
    status: TaskStatus,
    current_episodes: u32,
    total_episodes: u32,
    episode_threshold: u32,
    episode_regex: Option<String>,
    episode_use_regex: bool,
    whitelist_keywords: Option<String>,
    blacklist_keywords: Option<String>,
    max_keep_save_file: u32,
    rename_rule: Option<RenameRule>,
    check_interval_secs: Option<u64>,
    last_error: Option<String>,
    last_file_update_time: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a pending task from a draft
    pub fn new(draft: TaskDraft) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            account_id: draft.account_id,
            share_link: draft.share_link,
            share_id: draft.share_id,
            share_file_id: draft.share_file_id,
            share_folder_id: draft.share_folder_id,
            share_folder_name: draft.share_folder_name,
            share_mode: draft.share_mode,
            access_code: draft.access_code,
            target_folder_id: draft.target_folder_id,
            target_folder_name: draft.target_folder_name,
            resource_name: draft.resource_name,
            status: TaskStatus::Pending,
            current_episodes: draft.current_episodes,
            total_episodes: draft.total_episodes,
            episode_threshold: 0,
            episode_regex: None,
            episode_use_regex: true,
            whitelist_keywords: None,
            blacklist_keywords: None,
            max_keep_save_file: 0,
            rename_rule: None,
            check_interval_secs: None,
            last_error: None,
            last_file_update_time: None,
            created_at: now,
            updated_at: now,
        }
    }

    // --- Getters ---

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn account_id(&self) -> &AccountId {
        &self.account_id
    }

    pub fn share_link(&self) -> &str {
        &self.share_link
    }

    pub fn share_id(&self) -> &str {
        &self.share_id
    }

    pub fn share_file_id(&self) -> &RemoteId {
        &self.share_file_id
    }

    pub fn share_folder_id(&self) -> &RemoteId {
        &self.share_folder_id
    }

    pub fn share_folder_name(&self) -> &str {
        &self.share_folder_name
    }

    pub fn share_mode(&self) -> i32 {
        self.share_mode
    }

    pub fn access_code(&self) -> Option<&str> {
        self.access_code.as_deref()
    }

    pub fn target_folder_id(&self) -> &RemoteId {
        &self.target_folder_id
    }

    pub fn target_folder_name(&self) -> &str {
        &self.target_folder_name
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn current_episodes(&self) -> u32 {
        self.current_episodes
    }

    pub fn total_episodes(&self) -> u32 {
        self.total_episodes
    }

    /// Highest episode ordinal already mirrored (0 = no gating)
    pub fn episode_threshold(&self) -> u32 {
        self.episode_threshold
    }

    pub fn episode_regex(&self) -> Option<&str> {
        self.episode_regex.as_deref()
    }

    pub fn episode_use_regex(&self) -> bool {
        self.episode_use_regex
    }

    pub fn whitelist_keywords(&self) -> Option<&str> {
        self.whitelist_keywords.as_deref()
    }

    pub fn blacklist_keywords(&self) -> Option<&str> {
        self.blacklist_keywords.as_deref()
    }

    /// Lower-cased, trimmed allow-list; empty entries are dropped
    pub fn whitelist(&self) -> Vec<String> {
        split_keywords(self.whitelist_keywords.as_deref())
    }

    /// Lower-cased, trimmed deny-list; empty entries are dropped
    pub fn blacklist(&self) -> Vec<String> {
        split_keywords(self.blacklist_keywords.as_deref())
    }

    /// Retention cap; `0` disables retention
    pub fn max_keep_save_file(&self) -> u32 {
        self.max_keep_save_file
    }

    pub fn rename_rule(&self) -> Option<&RenameRule> {
        self.rename_rule.as_ref()
    }

    /// Per-task check interval overriding the global tick
    pub fn check_interval_secs(&self) -> Option<u64> {
        self.check_interval_secs
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_file_update_time(&self) -> Option<DateTime<Utc>> {
        self.last_file_update_time
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Display name combining resource and share sub-folder
    pub fn display_name(&self) -> String {
        if self.share_folder_name.is_empty() {
            self.resource_name.clone()
        } else {
            format!("{}/{}", self.resource_name, self.share_folder_name)
        }
    }

    /// Listing coordinates for the share folder this task mirrors
    pub fn share_location(&self) -> ShareLocation {
        ShareLocation {
            share_id: self.share_id.clone(),
            folder_id: self.share_folder_id.clone(),
            share_mode: self.share_mode,
            access_code: self.access_code.clone(),
        }
    }

    // --- State transitions ---

    /// Records a successful transfer submission
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidState`] unless the task is pending or processing
    pub fn mark_processing(&mut self, at: DateTime<Utc>) -> Result<(), DomainError> {
        if !self.status.is_active() {
            return Err(DomainError::InvalidState {
                from: self.status.to_string(),
                to: TaskStatus::Processing.to_string(),
            });
        }
        self.status = TaskStatus::Processing;
        self.last_error = None;
        self.last_file_update_time = Some(at);
        self.touch();
        Ok(())
    }

    /// Marks the task failed after an unrecoverable error
    pub fn mark_failed(&mut self, reason: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.last_error = Some(reason.into());
        self.touch();
    }

    /// Puts a task back into the scheduler's queue
    pub fn reset(&mut self) {
        self.status = TaskStatus::Pending;
        self.last_error = None;
        self.touch();
    }

    /// Raises the episode threshold if `candidate` is higher
    ///
    /// Returns the previous threshold when it changed. The threshold never
    /// decreases through this method.
    pub fn raise_episode_threshold(&mut self, candidate: u32) -> Option<u32> {
        if candidate > self.episode_threshold {
            let old = self.episode_threshold;
            self.episode_threshold = candidate;
            self.touch();
            Some(old)
        } else {
            None
        }
    }

    // --- Administrative setters (validated by the update use case) ---

    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.touch();
    }

    pub fn set_resource_name(&mut self, name: impl Into<String>) {
        self.resource_name = name.into();
        self.touch();
    }

    pub fn set_target_folder(&mut self, id: RemoteId, name: Option<String>) {
        self.target_folder_id = id;
        if let Some(name) = name {
            self.target_folder_name = name;
        }
        self.touch();
    }

    pub fn set_target_folder_name(&mut self, name: impl Into<String>) {
        self.target_folder_name = name.into();
        self.touch();
    }

    pub fn set_share_folder(&mut self, id: RemoteId, name: Option<String>) {
        self.share_folder_id = id;
        if let Some(name) = name {
            self.share_folder_name = name;
        }
        self.touch();
    }

    pub fn set_share_folder_name(&mut self, name: impl Into<String>) {
        self.share_folder_name = name.into();
        self.touch();
    }

    pub fn set_episode_counts(&mut self, current: Option<u32>, total: Option<u32>) {
        if let Some(current) = current {
            self.current_episodes = current;
        }
        if let Some(total) = total {
            self.total_episodes = total;
        }
        self.touch();
    }

    /// Overwrites the threshold; operators may lower it to re-mirror episodes
    pub fn set_episode_threshold(&mut self, threshold: u32) {
        self.episode_threshold = threshold;
        self.touch();
    }

    /// Sets the custom episode pattern
    ///
    /// # Errors
    /// Returns [`DomainError::InvalidPattern`] if the pattern does not compile
    pub fn set_episode_regex(&mut self, pattern: Option<String>) -> Result<(), DomainError> {
        let pattern = pattern.filter(|p| !p.trim().is_empty());
        if let Some(p) = &pattern {
            compile_pattern(p)?;
        }
        self.episode_regex = pattern;
        self.touch();
        Ok(())
    }

    pub fn set_episode_use_regex(&mut self, enabled: bool) {
        self.episode_use_regex = enabled;
        self.touch();
    }

    pub fn set_keywords(&mut self, whitelist: Option<String>, blacklist: Option<String>) {
        self.whitelist_keywords = whitelist.filter(|k| !k.trim().is_empty());
        self.blacklist_keywords = blacklist.filter(|k| !k.trim().is_empty());
        self.touch();
    }

    pub fn set_whitelist_keywords(&mut self, keywords: Option<String>) {
        self.whitelist_keywords = keywords.filter(|k| !k.trim().is_empty());
        self.touch();
    }

    pub fn set_blacklist_keywords(&mut self, keywords: Option<String>) {
        self.blacklist_keywords = keywords.filter(|k| !k.trim().is_empty());
        self.touch();
    }

    pub fn set_max_keep_save_file(&mut self, cap: u32) {
        self.max_keep_save_file = cap;
        self.touch();
    }

    pub fn set_rename_rule(&mut self, rule: Option<RenameRule>) {
        self.rename_rule = rule;
        self.touch();
    }

    pub fn set_check_interval_secs(&mut self, secs: Option<u64>) {
        self.check_interval_secs = secs.filter(|s| *s > 0);
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
