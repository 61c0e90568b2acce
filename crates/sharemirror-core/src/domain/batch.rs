//! Provider batch operation types
//!
//! Bulk transfers and deletions are asynchronous on the provider side:
//! a submission returns an operation id that is then polled until it
//! reaches a terminal status. Status codes are converted into
//! [`BatchStatus`] at the adapter boundary.

use serde::{Deserialize, Serialize};

use super::newtypes::RemoteId;

/// Kind of batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchKind {
    /// Copy files from a share into the operator's drive
    Save,
    /// Move files to the recycle bin
    Delete,
    /// Purge the recycle bin
    EmptyRecycle,
}

impl BatchKind {
    /// Wire name the provider expects in the `type` field
    pub fn wire_name(&self) -> &'static str {
        match self {
            BatchKind::Save => "SHARE_SAVE",
            BatchKind::Delete => "DELETE",
            BatchKind::EmptyRecycle => "EMPTY_RECYCLE",
        }
    }
}

impl std::fmt::Display for BatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}

/// One file referenced by a batch submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    /// Provider id of the file
    pub file_id: RemoteId,
    /// File name
    pub file_name: String,
    /// Whether the item is a folder
    pub is_folder: bool,
}

impl BatchItem {
    /// Creates an item for a plain file
    pub fn file(file_id: RemoteId, file_name: impl Into<String>) -> Self {
        Self {
            file_id,
            file_name: file_name.into(),
            is_folder: false,
        }
    }
}

/// Provider reply to a batch submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSubmission {
    /// Result code, `0` on acceptance
    pub code: i64,
    /// Human-readable message accompanying a rejection
    pub message: Option<String>,
    /// Operation id to poll, present when the provider accepted the batch
    pub operation_id: Option<String>,
}

impl BatchSubmission {
    /// Returns true if the provider accepted the submission
    pub fn is_accepted(&self) -> bool {
        self.code == 0
    }
}

/// Status of a batch operation as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// Some items clash with existing names at the destination
    Conflict,
    /// Still in progress
    Running,
    /// Finished successfully
    Success,
    /// Any other code; treated as terminal failure
    Other(i64),
}

impl BatchStatus {
    /// Converts a provider status code
    pub fn from_code(code: i64) -> Self {
        match code {
            2 => BatchStatus::Conflict,
            3 => BatchStatus::Running,
            4 => BatchStatus::Success,
            other => BatchStatus::Other(other),
        }
    }

    /// Provider status code
    pub fn code(&self) -> i64 {
        match self {
            BatchStatus::Conflict => 2,
            BatchStatus::Running => 3,
            BatchStatus::Success => 4,
            BatchStatus::Other(code) => *code,
        }
    }
}

/// How the provider should settle a conflicting item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictDealWay {
    /// Leave the existing destination file alone
    Skip,
    /// Keep both, renaming the incoming copy
    KeepBoth,
    /// Replace the destination file
    Overwrite,
}

impl ConflictDealWay {
    /// Provider code for this choice
    pub fn code(&self) -> i64 {
        match self {
            ConflictDealWay::Skip => 1,
            ConflictDealWay::KeepBoth => 2,
            ConflictDealWay::Overwrite => 3,
        }
    }
}

/// One item of a conflict report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictItem {
    /// Provider id of the incoming file
    pub file_id: RemoteId,
    /// File name
    pub file_name: String,
    /// Whether the item is a folder
    pub is_folder: bool,
    /// Whether this particular item clashes
    pub is_conflict: bool,
}

impl ConflictItem {
    /// Attaches a resolution to this item
    pub fn resolve(self, deal_way: ConflictDealWay) -> ResolvedItem {
        ResolvedItem {
            item: self,
            deal_way,
        }
    }
}

/// Conflict report for a batch operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictDetail {
    /// Destination folder of the batch
    pub target_folder_id: RemoteId,
    /// Items listed by the provider
    pub items: Vec<ConflictItem>,
}

/// A conflict item paired with its resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedItem {
    /// The reported item
    pub item: ConflictItem,
    /// Chosen resolution
    pub deal_way: ConflictDealWay,
}
