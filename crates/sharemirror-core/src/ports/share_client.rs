//! Remote share client port (driven/secondary port)
//!
//! This module defines the capability surface the sync engine needs from
//! the storage provider: listing a share, listing the operator's own
//! folders, submitting and tracking batch operations, and a few folder
//! operations used during task setup and auto-rename.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because provider errors (HTTP, malformed JSON,
//!   expired session) are adapter-specific.
//! - Batch status codes are converted to [`BatchStatus`] by the adapter;
//!   raw provider integers never reach the engine.
//! - One client instance is bound to one account session. Callers pass it
//!   explicitly into each reconciliation.

use crate::domain::{
    BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDetail, FolderEntry,
    FolderListing, RemoteId, RenameOutcome, ResolvedItem, ShareCode, ShareInfo, ShareLocation,
};

/// Port trait for the storage provider's share API
#[async_trait::async_trait]
pub trait IRemoteShareClient: Send + Sync {
    // --- Share discovery ---

    /// Resolves a share code to its metadata
    async fn get_share_info(&self, code: &ShareCode) -> anyhow::Result<ShareInfo>;

    /// Validates an access code for a protected share
    ///
    /// Returns the share id unlocked by the code, or `None` if rejected.
    async fn check_access_code(
        &self,
        code: &ShareCode,
        access_code: &str,
    ) -> anyhow::Result<Option<String>>;

    // --- Listings ---

    /// Lists one level of a shared folder
    ///
    /// A missing or malformed listing is an error, never an empty result.
    async fn list_share_dir(&self, location: &ShareLocation) -> anyhow::Result<FolderListing>;

    /// Lists one level of a folder in the operator's drive
    async fn list_files(&self, folder_id: &RemoteId) -> anyhow::Result<FolderListing>;

    // --- Batch operations ---

    /// Submits a batch copy of share files into `target_folder_id`
    async fn submit_batch_save(
        &self,
        items: &[BatchItem],
        target_folder_id: &RemoteId,
        share_id: &str,
    ) -> anyhow::Result<BatchSubmission>;

    /// Submits a batch delete of files in the operator's drive
    async fn submit_batch_delete(&self, items: &[BatchItem]) -> anyhow::Result<BatchSubmission>;

    /// Submits a purge of the recycle bin
    async fn submit_empty_recycle(&self) -> anyhow::Result<BatchSubmission>;

    /// Reads the current status of a batch operation
    async fn poll_batch_status(
        &self,
        operation_id: &str,
        kind: BatchKind,
    ) -> anyhow::Result<BatchStatus>;

    /// Fetches the items of a batch operation that hit a name clash
    async fn get_conflict_detail(
        &self,
        operation_id: &str,
        kind: BatchKind,
    ) -> anyhow::Result<ConflictDetail>;

    /// Submits the resolution chosen for each conflicting item
    async fn resolve_conflict(
        &self,
        operation_id: &str,
        kind: BatchKind,
        target_folder_id: &RemoteId,
        items: &[ResolvedItem],
    ) -> anyhow::Result<()>;

    // --- Folder operations ---

    /// Creates a folder under `parent_id`
    async fn create_folder(&self, name: &str, parent_id: &RemoteId)
        -> anyhow::Result<FolderEntry>;

    /// Renames a file in the operator's drive
    ///
    /// A refusal by the provider is reported as [`RenameOutcome::Rejected`],
    /// not as an error.
    async fn rename_file(&self, file_id: &RemoteId, new_name: &str)
        -> anyhow::Result<RenameOutcome>;
}
