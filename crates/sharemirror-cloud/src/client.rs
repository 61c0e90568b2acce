//! Provider HTTP client
//!
//! Thin wrapper around `reqwest::Client` that knows the provider's base URL,
//! attaches the session cookie and `Accept` header to every request, and
//! maps transport failures and error statuses into [`CloudError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sharemirror_cloud::client::CloudClient;
//!
//! # async fn example() -> Result<(), sharemirror_cloud::CloudError> {
//! let client = CloudClient::new("session-token");
//! let listing = client.list_files("-11").await?;
//! println!("{} files", listing.files.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{
    header::{ACCEPT, COOKIE},
    Client, Method, RequestBuilder, Response, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use sharemirror_core::config::DEFAULT_BASE_URL;
use sharemirror_core::domain::{
    BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDetail, FolderEntry,
    FolderListing, ResolvedItem, ShareInfo, ShareLocation,
};

use crate::wire::{
    self, AccessCodeResponse, CheckBatchResponse, ConflictInfoRequest, ConflictInfoResponse,
    CreateBatchResponse, CreateFolderResponse, Envelope, ListingResponse, ManageBatchRequest,
    ShareInfoResponse, TaskInfoDto,
};
use crate::CloudError;

/// Value sent in the `Accept` header
const ACCEPT_JSON: &str = "application/json;charset=UTF-8";

/// Name of the session cookie
const SESSION_COOKIE: &str = "COOKIE_LOGIN_USER";

/// Entries requested per listing page
const DEFAULT_PAGE_SIZE: usize = 1000;

/// A folder listing stops after this many pages
const MAX_PAGES: usize = 100;

/// Error bodies are cut to this many characters
const MAX_ERROR_BODY: usize = 512;

/// HTTP client bound to one account session
#[derive(Clone)]
pub struct CloudClient {
    client: Client,
    base_url: String,
    session_token: String,
    page_size: usize,
}

impl CloudClient {
    /// Creates a client against the production API
    pub fn new(session_token: impl Into<String>) -> Self {
        Self::with_base_url(session_token, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    pub fn with_base_url(session_token: impl Into<String>, base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session_token: session_token.into(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Sets the number of entries requested per listing page (at least 1)
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Rebuilds the underlying HTTP client with a per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, CloudError> {
        self.client = Client::builder().timeout(timeout).build()?;
        Ok(self)
    }

    /// Replaces the session token (e.g. after the operator re-logs in)
    pub fn set_session_token(&mut self, token: impl Into<String>) {
        self.session_token = token.into();
        debug!("Updated CloudClient session token");
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a request with the session cookie and JSON accept header
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, &url)
            .header(ACCEPT, ACCEPT_JSON)
            .header(COOKIE, format!("{}={}", SESSION_COOKIE, self.session_token))
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        read_json(path, response).await
    }

    /// Fetches every page of a listing endpoint
    ///
    /// Pages are requested until one comes back short of the page size.
    async fn get_listing(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<FolderListing, CloudError> {
        let page_size = self.page_size.to_string();
        let mut listing = FolderListing::default();
        for page in 1..=MAX_PAGES {
            let page_num = page.to_string();
            let mut params = query.to_vec();
            params.push(("pageNum", page_num.as_str()));
            params.push(("pageSize", page_size.as_str()));

            let resp: ListingResponse = self.get_json(path, &params).await?;
            let chunk = resp.into_listing()?;
            let received = chunk.files.len() + chunk.folders.len();
            listing.files.extend(chunk.files);
            listing.folders.extend(chunk.folders);
            if received < self.page_size {
                return Ok(listing);
            }
            debug!(path, page, received, "Listing page full, fetching next");
        }
        warn!(path, pages = MAX_PAGES, "Listing cut at page limit");
        Ok(listing)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, CloudError> {
        let response = self.request(Method::POST, path).form(form).send().await?;
        read_json(path, response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, CloudError> {
        let response = self.request(Method::POST, path).json(body).send().await?;
        read_json(path, response).await
    }

    // ========================================================================
    // Share discovery
    // ========================================================================

    /// `GET /open/share/getShareInfoByCodeV2.action`
    pub async fn get_share_info(&self, share_code: &str) -> Result<ShareInfo, CloudError> {
        let resp: ShareInfoResponse = self
            .get_json(
                "/open/share/getShareInfoByCodeV2.action",
                &[("shareCode", share_code)],
            )
            .await?;
        resp.into_share_info()
    }

    /// `GET /open/share/checkAccessCode.action`
    ///
    /// Returns the unlocked share id, `None` when the code is refused.
    pub async fn check_access_code(
        &self,
        share_code: &str,
        access_code: &str,
    ) -> Result<Option<String>, CloudError> {
        let nonce = uuid::Uuid::new_v4().to_string();
        let resp: AccessCodeResponse = self
            .get_json(
                "/open/share/checkAccessCode.action",
                &[
                    ("shareCode", share_code),
                    ("accessCode", access_code),
                    ("uuid", nonce.as_str()),
                ],
            )
            .await?;
        if !resp.envelope.is_ok() {
            debug!(code = %resp.envelope.code_text(), "Access code refused");
            return Ok(None);
        }
        Ok(resp.share_id.filter(|id| !id.is_empty() && id != "0"))
    }

    // ========================================================================
    // Listings
    // ========================================================================

    /// `GET /open/share/listShareDir.action`, one level, newest first, all pages
    pub async fn list_share_dir(&self, location: &ShareLocation) -> Result<FolderListing, CloudError> {
        let share_mode = location.share_mode.to_string();
        let access_code = location.access_code.as_deref().unwrap_or_default();
        self.get_listing(
            "/open/share/listShareDir.action",
            &[
                ("shareId", location.share_id.as_str()),
                ("isFolder", "true"),
                ("fileId", location.folder_id.as_str()),
                ("orderBy", "lastOpTime"),
                ("descending", "true"),
                ("shareMode", share_mode.as_str()),
                ("accessCode", access_code),
            ],
        )
        .await
    }

    /// `GET /open/file/listFiles.action`, one level, newest first, all pages
    pub async fn list_files(&self, folder_id: &str) -> Result<FolderListing, CloudError> {
        self.get_listing(
            "/open/file/listFiles.action",
            &[
                ("folderId", folder_id),
                ("mediaType", "0"),
                ("orderBy", "lastOpTime"),
                ("descending", "true"),
            ],
        )
        .await
    }

    // ========================================================================
    // Batch operations
    // ========================================================================

    /// `POST /open/batch/createBatchTask.action`
    ///
    /// A non-zero `res_code` is returned inside the [`BatchSubmission`]
    /// rather than as an error, so callers can log the provider's message.
    pub async fn create_batch_task(
        &self,
        kind: BatchKind,
        items: &[BatchItem],
        target_folder_id: &str,
        share_id: Option<&str>,
    ) -> Result<BatchSubmission, CloudError> {
        let task_infos = match kind {
            BatchKind::EmptyRecycle => "[]".to_string(),
            _ => wire::task_infos_json(items)?,
        };
        let mut form = vec![
            ("type", kind.wire_name()),
            ("taskInfos", task_infos.as_str()),
            ("targetFolderId", target_folder_id),
        ];
        if let Some(share_id) = share_id {
            form.push(("shareId", share_id));
        }
        let resp: CreateBatchResponse = self
            .post_form("/open/batch/createBatchTask.action", &form)
            .await?;
        Ok(BatchSubmission {
            code: resp.envelope.code(),
            message: Some(resp.envelope.message()).filter(|m| !m.is_empty()),
            operation_id: resp.task_id.filter(|id| !id.is_empty()),
        })
    }

    /// `POST /open/batch/checkBatchTask.action`
    pub async fn check_batch_task(
        &self,
        operation_id: &str,
        kind: BatchKind,
    ) -> Result<BatchStatus, CloudError> {
        let resp: CheckBatchResponse = self
            .post_form(
                "/open/batch/checkBatchTask.action",
                &[("taskId", operation_id), ("type", kind.wire_name())],
            )
            .await?;
        resp.envelope.check()?;
        Ok(BatchStatus::from_code(resp.task_status))
    }

    /// `POST /open/batch/getConflictTaskInfo.action`
    pub async fn get_conflict_task_info(
        &self,
        operation_id: &str,
        kind: BatchKind,
    ) -> Result<ConflictDetail, CloudError> {
        let body = ConflictInfoRequest {
            task_id: operation_id,
            kind: kind.wire_name(),
        };
        let resp: ConflictInfoResponse = self
            .post_json("/open/batch/getConflictTaskInfo.action", &body)
            .await?;
        resp.into_detail()
    }

    /// `POST /open/batch/manageBatchTask.action`
    pub async fn manage_batch_task(
        &self,
        operation_id: &str,
        kind: BatchKind,
        target_folder_id: &str,
        items: &[ResolvedItem],
    ) -> Result<(), CloudError> {
        let body = ManageBatchRequest {
            task_id: operation_id,
            kind: kind.wire_name(),
            target_folder_id,
            task_infos: items.iter().map(TaskInfoDto::from).collect(),
        };
        let resp: Envelope = self
            .post_json("/open/batch/manageBatchTask.action", &body)
            .await?;
        resp.check()
    }

    // ========================================================================
    // Folder operations
    // ========================================================================

    /// `POST /open/file/createFolder.action`
    pub async fn create_folder(
        &self,
        name: &str,
        parent_id: &str,
    ) -> Result<FolderEntry, CloudError> {
        let resp: CreateFolderResponse = self
            .post_form(
                "/open/file/createFolder.action",
                &[("parentFolderId", parent_id), ("folderName", name)],
            )
            .await?;
        resp.into_entry(name)
    }

    /// `POST /open/file/renameFile.action`
    ///
    /// Returns the raw envelope; the provider reports a name clash either
    /// as a non-zero code or as an HTTP error carrying the same envelope.
    pub async fn rename_file(&self, file_id: &str, new_name: &str) -> Result<Envelope, CloudError> {
        self.post_form(
            "/open/file/renameFile.action",
            &[("fileId", file_id), ("destFileName", new_name)],
        )
        .await
    }
}

/// Checks the status and decodes a JSON body
async fn read_json<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, CloudError> {
    let status = response.status();
    let body = response.text().await?;

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        warn!(path, status = status.as_u16(), "Session refused by provider");
        return Err(CloudError::Unauthorized(truncate(&body)));
    }
    if !status.is_success() {
        warn!(path, status = status.as_u16(), "Provider returned error status");
        return Err(CloudError::Http {
            status: status.as_u16(),
            body: truncate(&body),
        });
    }

    serde_json::from_str(&body)
        .map_err(|e| CloudError::InvalidResponse(format!("{}: {}", path, e)))
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CloudClient::with_base_url("t", "http://localhost:9000/api/");
        assert_eq!(client.base_url(), "http://localhost:9000/api");
    }

    #[test]
    fn test_request_carries_session_cookie() {
        let client = CloudClient::with_base_url("abc", "http://localhost:9000");
        let request = client
            .request(Method::GET, "/open/file/listFiles.action")
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:9000/open/file/listFiles.action"
        );
        assert_eq!(
            request.headers().get(COOKIE).unwrap(),
            "COOKIE_LOGIN_USER=abc"
        );
        assert_eq!(request.headers().get(ACCEPT).unwrap(), ACCEPT_JSON);
    }

    #[test]
    fn test_default_base_url() {
        let client = CloudClient::new("t");
        assert_eq!(client.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_truncate_long_body() {
        let long = "x".repeat(MAX_ERROR_BODY + 10);
        assert_eq!(truncate(&long).len(), MAX_ERROR_BODY);
    }
}
