//! Provider response types
//!
//! The provider's JSON is loosely typed: ids arrive as numbers or strings,
//! `res_code` is usually an integer but some endpoints report a string
//! code, and timestamps are local wall-clock strings. Everything is
//! normalized here before it reaches the domain.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use sharemirror_core::domain::{
    BatchItem, ConflictDetail, ConflictItem, ContentHash, FolderEntry, FolderListing,
    RemoteFileEntry, RemoteId, ResolvedItem, ShareInfo,
};

use crate::CloudError;

/// Provider timestamps are China Standard Time without an offset
const PROVIDER_UTC_OFFSET_SECS: i32 = 8 * 3600;

/// Timestamp layout used by listings
const PROVIDER_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ============================================================================
// Loose scalar helpers
// ============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrString {
    Num(i64),
    Str(String),
}

impl NumOrString {
    fn into_string(self) -> String {
        match self {
            NumOrString::Num(n) => n.to_string(),
            NumOrString::Str(s) => s,
        }
    }
}

fn de_id<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    NumOrString::deserialize(d).map(NumOrString::into_string)
}

fn de_opt_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Option::<NumOrString>::deserialize(d).map(|v| v.map(NumOrString::into_string))
}

/// Accepts `true`/`false`, `0`/`1`
fn de_flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Num(i64),
    }
    Ok(match Option::<Flag>::deserialize(d)? {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Num(n)) => n != 0,
        None => false,
    })
}

fn de_i64<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    match Option::<NumOrString>::deserialize(d)? {
        Some(NumOrString::Num(n)) => Ok(n),
        Some(NumOrString::Str(s)) => s.trim().parse().map_err(serde::de::Error::custom),
        None => Ok(0),
    }
}

fn remote_id(raw: &str) -> Result<RemoteId, CloudError> {
    RemoteId::new(raw).map_err(|e| CloudError::InvalidResponse(e.to_string()))
}

/// Parses a provider timestamp (`YYYY-MM-DD HH:MM:SS`, provider local time)
///
/// RFC 3339 strings are accepted as well.
pub fn parse_provider_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw.trim(), PROVIDER_DATE_FORMAT).ok()?;
    let offset = FixedOffset::east_opt(PROVIDER_UTC_OFFSET_SECS)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

// ============================================================================
// Envelope
// ============================================================================

/// Result code and message present on every response
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    res_code: Option<serde_json::Value>,
    #[serde(default, alias = "res_msg")]
    res_message: Option<String>,
}

impl Envelope {
    /// Numeric result code; absent codes count as success
    pub fn code(&self) -> i64 {
        match &self.res_code {
            None | Some(serde_json::Value::Null) => 0,
            Some(serde_json::Value::Number(n)) => n.as_i64().unwrap_or(-1),
            Some(serde_json::Value::String(s)) => s.trim().parse().unwrap_or(-1),
            Some(_) => -1,
        }
    }

    /// Result code as text (`"0"`, `"FileAlreadyExists"`, ...)
    pub fn code_text(&self) -> String {
        match &self.res_code {
            None | Some(serde_json::Value::Null) => "0".to_string(),
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }

    pub fn message(&self) -> String {
        self.res_message.clone().unwrap_or_default()
    }

    pub fn is_ok(&self) -> bool {
        self.code() == 0
    }

    /// Turns a non-zero code into [`CloudError::Api`]
    pub fn check(&self) -> Result<(), CloudError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(CloudError::Api {
                code: self.code_text(),
                message: self.message(),
            })
        }
    }
}

// ============================================================================
// Listings
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDto {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default, deserialize_with = "de_i64")]
    pub size: i64,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_folder: bool,
    #[serde(default)]
    pub create_date: Option<String>,
}

impl FileDto {
    fn into_entry(self) -> Result<RemoteFileEntry, CloudError> {
        Ok(RemoteFileEntry {
            id: remote_id(&self.id)?,
            content_hash: ContentHash::parse_optional(self.md5.as_deref()),
            size: u64::try_from(self.size).unwrap_or(0),
            is_folder: self.is_folder,
            created_at: self.create_date.as_deref().and_then(parse_provider_time),
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FolderDto {
    #[serde(deserialize_with = "de_id")]
    pub id: String,
    pub name: String,
}

impl FolderDto {
    pub fn into_entry(self) -> Result<FolderEntry, CloudError> {
        Ok(FolderEntry {
            id: remote_id(&self.id)?,
            name: self.name,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListAo {
    /// A missing file list marks a malformed listing
    pub file_list: Option<Vec<FileDto>>,
    #[serde(default)]
    pub folder_list: Vec<FolderDto>,
}

/// Response of `listShareDir.action` and `listFiles.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(rename = "fileListAO")]
    pub file_list_ao: Option<FileListAo>,
}

impl ListingResponse {
    /// Converts to a domain listing; a missing `fileListAO.fileList` is an error
    pub fn into_listing(self) -> Result<FolderListing, CloudError> {
        self.envelope.check()?;
        let ao = self
            .file_list_ao
            .ok_or_else(|| CloudError::InvalidResponse("missing fileListAO".to_string()))?;
        let files = ao
            .file_list
            .ok_or_else(|| CloudError::InvalidResponse("missing fileListAO.fileList".to_string()))?;
        Ok(FolderListing {
            files: files
                .into_iter()
                .map(FileDto::into_entry)
                .collect::<Result<_, _>>()?,
            folders: ao
                .folder_list
                .into_iter()
                .map(FolderDto::into_entry)
                .collect::<Result<_, _>>()?,
        })
    }
}

// ============================================================================
// Share info / access code
// ============================================================================

/// Response of `getShareInfoByCodeV2.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInfoResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub share_id: Option<String>,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub file_id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_folder: bool,
    #[serde(default, deserialize_with = "de_i64")]
    pub share_mode: i64,
}

impl ShareInfoResponse {
    pub fn into_share_info(self) -> Result<ShareInfo, CloudError> {
        self.envelope.check()?;
        let file_id = self
            .file_id
            .ok_or_else(|| CloudError::InvalidResponse("share info without fileId".to_string()))?;
        Ok(ShareInfo {
            share_id: self.share_id.filter(|s| !s.is_empty() && s != "0"),
            file_id: remote_id(&file_id)?,
            file_name: self.file_name.unwrap_or_default(),
            is_folder: self.is_folder,
            share_mode: i32::try_from(self.share_mode).unwrap_or_default(),
        })
    }
}

/// Response of `checkAccessCode.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCodeResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub share_id: Option<String>,
}

// ============================================================================
// Batch operations
// ============================================================================

/// One entry of the `taskInfos` array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfoDto {
    #[serde(deserialize_with = "de_id")]
    pub file_id: String,
    pub file_name: String,
    #[serde(deserialize_with = "de_i64")]
    pub is_folder: i64,
    #[serde(default, deserialize_with = "de_i64", skip_serializing_if = "is_zero")]
    pub is_conflict: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deal_way: Option<i64>,
}

fn is_zero(v: &i64) -> bool {
    *v == 0
}

impl From<&BatchItem> for TaskInfoDto {
    fn from(item: &BatchItem) -> Self {
        Self {
            file_id: item.file_id.to_string(),
            file_name: item.file_name.clone(),
            is_folder: i64::from(item.is_folder),
            is_conflict: 0,
            deal_way: None,
        }
    }
}

impl From<&ResolvedItem> for TaskInfoDto {
    fn from(resolved: &ResolvedItem) -> Self {
        Self {
            file_id: resolved.item.file_id.to_string(),
            file_name: resolved.item.file_name.clone(),
            is_folder: i64::from(resolved.item.is_folder),
            is_conflict: i64::from(resolved.item.is_conflict),
            deal_way: Some(resolved.deal_way.code()),
        }
    }
}

impl TaskInfoDto {
    fn into_conflict_item(self) -> Result<ConflictItem, CloudError> {
        Ok(ConflictItem {
            file_id: remote_id(&self.file_id)?,
            file_name: self.file_name,
            is_folder: self.is_folder != 0,
            is_conflict: self.is_conflict != 0,
        })
    }
}

/// Serializes batch items into the `taskInfos` form field
pub fn task_infos_json(items: &[BatchItem]) -> Result<String, CloudError> {
    let dtos: Vec<TaskInfoDto> = items.iter().map(TaskInfoDto::from).collect();
    serde_json::to_string(&dtos).map_err(|e| CloudError::InvalidResponse(e.to_string()))
}

/// Response of `createBatchTask.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub task_id: Option<String>,
}

/// Response of `checkBatchTask.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckBatchResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_i64")]
    pub task_status: i64,
}

/// Response of `getConflictTaskInfo.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfoResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub target_folder_id: Option<String>,
    #[serde(default)]
    pub task_infos: Vec<TaskInfoDto>,
}

impl ConflictInfoResponse {
    pub fn into_detail(self) -> Result<ConflictDetail, CloudError> {
        self.envelope.check()?;
        let target = self.target_folder_id.ok_or_else(|| {
            CloudError::InvalidResponse("conflict info without targetFolderId".to_string())
        })?;
        Ok(ConflictDetail {
            target_folder_id: remote_id(&target)?,
            items: self
                .task_infos
                .into_iter()
                .map(TaskInfoDto::into_conflict_item)
                .collect::<Result<_, _>>()?,
        })
    }
}

/// Body of `manageBatchTask.action`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManageBatchRequest<'a> {
    pub task_id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub target_folder_id: &'a str,
    pub task_infos: Vec<TaskInfoDto>,
}

/// Body of `getConflictTaskInfo.action`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfoRequest<'a> {
    pub task_id: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

// ============================================================================
// Folder operations
// ============================================================================

/// Response of `createFolder.action`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderResponse {
    #[serde(flatten)]
    pub envelope: Envelope,
    #[serde(default, deserialize_with = "de_opt_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl CreateFolderResponse {
    pub fn into_entry(self, requested_name: &str) -> Result<FolderEntry, CloudError> {
        self.envelope.check()?;
        let id = self
            .id
            .ok_or_else(|| CloudError::InvalidResponse("created folder has no id".to_string()))?;
        Ok(FolderEntry {
            id: remote_id(&id)?,
            name: self.name.unwrap_or_else(|| requested_name.to_string()),
        })
    }
}
