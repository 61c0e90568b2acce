//! Remote listing and share value types
//!
//! These are the shapes the storage provider hands back when listing a
//! share or a folder of the operator's own drive. They carry no behavior
//! beyond small conveniences used by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{ContentHash, RemoteId};

/// A file (or folder) as reported by a remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFileEntry {
    /// Provider id of the entry
    pub id: RemoteId,
    /// Display name including extension
    pub name: String,
    /// Content digest, absent for folders and some zero-byte files
    pub content_hash: Option<ContentHash>,
    /// Size in bytes
    pub size: u64,
    /// Whether the entry is a folder
    pub is_folder: bool,
    /// Creation time on the provider, when reported
    pub created_at: Option<DateTime<Utc>>,
}

impl RemoteFileEntry {
    /// Creates a plain file entry with no creation time
    pub fn file(id: RemoteId, name: impl Into<String>, hash: Option<ContentHash>, size: u64) -> Self {
        Self {
            id,
            name: name.into(),
            content_hash: hash,
            size,
            is_folder: false,
            created_at: None,
        }
    }

    /// Sets the creation time
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

/// A sub-folder as reported by a remote listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    /// Provider id of the folder
    pub id: RemoteId,
    /// Folder name
    pub name: String,
}

/// One level of a remote folder: its files and its direct sub-folders
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderListing {
    /// Files at this level
    pub files: Vec<RemoteFileEntry>,
    /// Direct sub-folders
    pub folders: Vec<FolderEntry>,
}

impl FolderListing {
    /// Returns true when the level holds neither files nor folders
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.folders.is_empty()
    }

    /// Non-folder entries only
    pub fn plain_files(&self) -> impl Iterator<Item = &RemoteFileEntry> {
        self.files.iter().filter(|f| !f.is_folder)
    }
}

/// Metadata resolved from a share code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareInfo {
    /// Provider share id; absent until an access code is accepted for private shares
    pub share_id: Option<String>,
    /// Root file or folder id inside the share
    pub file_id: RemoteId,
    /// Name of the shared root
    pub file_name: String,
    /// Whether the shared root is a folder
    pub is_folder: bool,
    /// Provider share mode; `1` marks an access-code protected share
    pub share_mode: i32,
}

impl ShareInfo {
    /// Share mode value marking an access-code protected share
    pub const PRIVATE_MODE: i32 = 1;

    /// Returns true when the share needs an access code
    pub fn requires_access_code(&self) -> bool {
        self.share_mode == Self::PRIVATE_MODE
    }
}

/// Result of a rename request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RenameOutcome {
    /// The provider accepted the rename
    Renamed,
    /// The provider refused (name clash, illegal name, ...)
    Rejected {
        /// Provider result code
        code: String,
        /// Provider message
        message: String,
    },
}

impl RenameOutcome {
    /// Returns true if the rename went through
    pub fn is_renamed(&self) -> bool {
        matches!(self, RenameOutcome::Renamed)
    }
}
