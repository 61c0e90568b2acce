//! CloudShareProvider - IRemoteShareClient implementation
//!
//! Wraps a [`CloudClient`] and adapts its typed results to the
//! [`IRemoteShareClient`] port contract.
//!
//! ## Design Notes
//!
//! - The client is stateless apart from its session token, so no lock is
//!   needed; every call goes straight through.
//! - Rename refusals are the only provider errors turned into a value
//!   ([`RenameOutcome::Rejected`]); everything else surfaces as an error
//!   with context.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::debug;

use sharemirror_core::config::ProviderConfig;

use sharemirror_core::domain::{
    Account, BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDetail, FolderEntry,
    FolderListing, RemoteId, RenameOutcome, ResolvedItem, ShareCode, ShareInfo, ShareLocation,
};
use sharemirror_core::ports::IRemoteShareClient;

use crate::client::CloudClient;
use crate::wire::Envelope;
use crate::CloudError;

/// Result code the provider uses when the destination name is taken
const FILE_ALREADY_EXISTS: &str = "FileAlreadyExists";

/// Remote share client backed by the provider's JSON API
pub struct CloudShareProvider {
    client: CloudClient,
}

impl CloudShareProvider {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Builds a provider for one session using the endpoint settings in `config`
    pub fn from_config(config: &ProviderConfig, session_token: &str) -> Result<Self> {
        let client = CloudClient::with_base_url(session_token, config.base_url.as_str())
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
            .context("Failed to build provider HTTP client")?
            .with_page_size(config.page_size);
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &CloudClient {
        &self.client
    }
}

/// Builds the share client for `account`, as handed to the client registry
pub fn share_client_for(
    config: &ProviderConfig,
    account: &Account,
) -> Result<Arc<dyn IRemoteShareClient>> {
    let provider = CloudShareProvider::from_config(config, account.session_token())?;
    debug!(account = account.username(), base_url = provider.client().base_url(), "Built share client");
    Ok(Arc::new(provider))
}

/// Interprets a rename reply, including name clashes reported as HTTP errors
fn rename_outcome(result: Result<Envelope, CloudError>) -> Result<RenameOutcome, CloudError> {
    match result {
        Ok(envelope) if envelope.is_ok() => Ok(RenameOutcome::Renamed),
        Ok(envelope) => Ok(RenameOutcome::Rejected {
            code: envelope.code_text(),
            message: envelope.message(),
        }),
        Err(CloudError::Http { status, body }) => {
            match serde_json::from_str::<Envelope>(&body) {
                Ok(envelope) if envelope.code_text() == FILE_ALREADY_EXISTS => {
                    Ok(RenameOutcome::Rejected {
                        code: envelope.code_text(),
                        message: envelope.message(),
                    })
                }
                _ => Err(CloudError::Http { status, body }),
            }
        }
        Err(e) => Err(e),
    }
}

#[async_trait::async_trait]
impl IRemoteShareClient for CloudShareProvider {
    async fn get_share_info(&self, code: &ShareCode) -> Result<ShareInfo> {
        debug!(code = code.as_str(), "CloudShareProvider::get_share_info");
        self.client
            .get_share_info(code.as_str())
            .await
            .with_context(|| format!("Failed to resolve share {}", code.as_str()))
    }

    async fn check_access_code(&self, code: &ShareCode, access_code: &str) -> Result<Option<String>> {
        debug!(code = code.as_str(), "CloudShareProvider::check_access_code");
        self.client
            .check_access_code(code.as_str(), access_code)
            .await
            .context("Failed to verify access code")
    }

    async fn list_share_dir(&self, location: &ShareLocation) -> Result<FolderListing> {
        debug!(
            share_id = %location.share_id,
            folder = %location.folder_id,
            "CloudShareProvider::list_share_dir"
        );
        self.client
            .list_share_dir(location)
            .await
            .with_context(|| format!("Failed to list share folder {}", location.folder_id))
    }

    async fn list_files(&self, folder_id: &RemoteId) -> Result<FolderListing> {
        debug!(folder = %folder_id, "CloudShareProvider::list_files");
        self.client
            .list_files(folder_id.as_str())
            .await
            .with_context(|| format!("Failed to list folder {}", folder_id))
    }

    async fn submit_batch_save(
        &self,
        items: &[BatchItem],
        target_folder_id: &RemoteId,
        share_id: &str,
    ) -> Result<BatchSubmission> {
        debug!(count = items.len(), target = %target_folder_id, "CloudShareProvider::submit_batch_save");
        self.client
            .create_batch_task(BatchKind::Save, items, target_folder_id.as_str(), Some(share_id))
            .await
            .context("Failed to submit batch save")
    }

    async fn submit_batch_delete(&self, items: &[BatchItem]) -> Result<BatchSubmission> {
        debug!(count = items.len(), "CloudShareProvider::submit_batch_delete");
        self.client
            .create_batch_task(BatchKind::Delete, items, "", None)
            .await
            .context("Failed to submit batch delete")
    }

    async fn submit_empty_recycle(&self) -> Result<BatchSubmission> {
        debug!("CloudShareProvider::submit_empty_recycle");
        self.client
            .create_batch_task(BatchKind::EmptyRecycle, &[], "", None)
            .await
            .context("Failed to submit recycle purge")
    }

    async fn poll_batch_status(&self, operation_id: &str, kind: BatchKind) -> Result<BatchStatus> {
        self.client
            .check_batch_task(operation_id, kind)
            .await
            .with_context(|| format!("Failed to check batch operation {}", operation_id))
    }

    async fn get_conflict_detail(&self, operation_id: &str, kind: BatchKind) -> Result<ConflictDetail> {
        self.client
            .get_conflict_task_info(operation_id, kind)
            .await
            .with_context(|| format!("Failed to fetch conflicts of {}", operation_id))
    }

    async fn resolve_conflict(
        &self,
        operation_id: &str,
        kind: BatchKind,
        target_folder_id: &RemoteId,
        items: &[ResolvedItem],
    ) -> Result<()> {
        debug!(operation_id, count = items.len(), "CloudShareProvider::resolve_conflict");
        self.client
            .manage_batch_task(operation_id, kind, target_folder_id.as_str(), items)
            .await
            .with_context(|| format!("Failed to resolve conflicts of {}", operation_id))
    }

    async fn create_folder(&self, name: &str, parent_id: &RemoteId) -> Result<FolderEntry> {
        debug!(name, parent = %parent_id, "CloudShareProvider::create_folder");
        self.client
            .create_folder(name, parent_id.as_str())
            .await
            .with_context(|| format!("Failed to create folder '{}'", name))
    }

    async fn rename_file(&self, file_id: &RemoteId, new_name: &str) -> Result<RenameOutcome> {
        debug!(id = %file_id, new_name, "CloudShareProvider::rename_file");
        let result = self.client.rename_file(file_id.as_str(), new_name).await;
        rename_outcome(result).with_context(|| format!("Failed to rename {}", file_id))
    }
}
