//! In-memory remote share client shared by the unit tests

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use chrono::{TimeZone, Utc};

use sharemirror_core::domain::{
    AccountId, BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDetail, ContentHash,
    FolderEntry, FolderListing, RemoteFileEntry, RemoteId, RenameOutcome, ResolvedItem,
    ShareCode, ShareInfo, ShareLocation, Task, TaskDraft,
};
use sharemirror_core::ports::IRemoteShareClient;

pub(crate) const SHARE_FOLDER: &str = "100";
pub(crate) const TARGET_FOLDER: &str = "200";

pub(crate) fn rid(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

pub(crate) fn file(id: &str, name: &str, hash: &str, size: u64) -> RemoteFileEntry {
    RemoteFileEntry::file(rid(id), name, ContentHash::new(hash).ok(), size)
}

/// A file created at `2024-01-01 00:00 + minute` minutes
pub(crate) fn file_at(id: &str, name: &str, minute: u32) -> RemoteFileEntry {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap();
    file(id, name, &format!("{:04X}", minute + 1), 10).with_created_at(at)
}

pub(crate) fn sample_task() -> Task {
    sample_task_for(AccountId::new())
}

pub(crate) fn sample_task_for(account_id: AccountId) -> Task {
    Task::new(TaskDraft {
        account_id,
        share_link: "https://cloud.189.cn/t/abcDEF".into(),
        share_id: "9001".into(),
        share_file_id: rid(SHARE_FOLDER),
        share_folder_id: rid(SHARE_FOLDER),
        share_folder_name: String::new(),
        share_mode: 0,
        access_code: None,
        target_folder_id: rid(TARGET_FOLDER),
        target_folder_name: "Show".into(),
        resource_name: "Show".into(),
        current_episodes: 0,
        total_episodes: 12,
    })
}

#[derive(Default)]
struct RemoteState {
    share_dirs: HashMap<String, FolderListing>,
    files: HashMap<String, FolderListing>,
    broken_share_dirs: bool,
    submit_code: i64,
    statuses: VecDeque<BatchStatus>,
    polls: u32,
    failing_polls: u32,
    drop_saves: bool,
    conflict: Option<ConflictDetail>,
    resolutions: Vec<Vec<ResolvedItem>>,
    submissions: Vec<(BatchKind, Vec<BatchItem>)>,
    renames: Vec<(String, String)>,
    rename_clashes: HashSet<String>,
    next_op: u32,
}

/// Remote share client backed by in-memory listings
///
/// Accepted saves copy the referenced share entries into the target
/// listing and accepted deletes remove entries, so repeated passes observe
/// their own effects. Status polls pop from a script and report success
/// once it runs dry.
#[derive(Default)]
pub(crate) struct FakeRemote {
    state: Mutex<RemoteState>,
}

impl FakeRemote {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_share_files(&self, files: Vec<RemoteFileEntry>) {
        self.state.lock().unwrap().share_dirs.insert(
            SHARE_FOLDER.into(),
            FolderListing {
                files,
                folders: Vec::new(),
            },
        );
    }

    pub(crate) fn set_target_files(&self, files: Vec<RemoteFileEntry>) {
        self.state.lock().unwrap().files.insert(
            TARGET_FOLDER.into(),
            FolderListing {
                files,
                folders: Vec::new(),
            },
        );
    }

    pub(crate) fn target_files(&self) -> Vec<RemoteFileEntry> {
        self.state
            .lock()
            .unwrap()
            .files
            .get(TARGET_FOLDER)
            .map(|l| l.files.clone())
            .unwrap_or_default()
    }

    pub(crate) fn break_share_listing(&self) {
        self.state.lock().unwrap().broken_share_dirs = true;
    }

    pub(crate) fn reject_submissions(&self, code: i64) {
        self.state.lock().unwrap().submit_code = code;
    }

    pub(crate) fn script_statuses(&self, statuses: impl IntoIterator<Item = BatchStatus>) {
        self.state.lock().unwrap().statuses.extend(statuses);
    }

    /// The next `count` status polls return an error
    pub(crate) fn fail_polls(&self, count: u32) {
        self.state.lock().unwrap().failing_polls = count;
    }

    /// Accepted saves no longer copy anything into the target folder
    pub(crate) fn drop_saved_files(&self, drop: bool) {
        self.state.lock().unwrap().drop_saves = drop;
    }

    pub(crate) fn set_conflict(&self, detail: ConflictDetail) {
        self.state.lock().unwrap().conflict = Some(detail);
    }

    pub(crate) fn clash_on_rename(&self, new_name: &str) {
        self.state
            .lock()
            .unwrap()
            .rename_clashes
            .insert(new_name.to_string());
    }

    pub(crate) fn polls(&self) -> u32 {
        self.state.lock().unwrap().polls
    }

    pub(crate) fn submissions(&self) -> Vec<(BatchKind, Vec<BatchItem>)> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub(crate) fn resolutions(&self) -> Vec<Vec<ResolvedItem>> {
        self.state.lock().unwrap().resolutions.clone()
    }

    pub(crate) fn renames(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().renames.clone()
    }

    fn record(&self, kind: BatchKind, items: &[BatchItem]) -> BatchSubmission {
        let mut state = self.state.lock().unwrap();
        state.submissions.push((kind, items.to_vec()));
        if state.submit_code != 0 {
            return BatchSubmission {
                code: state.submit_code,
                message: Some("rejected".into()),
                operation_id: None,
            };
        }
        state.next_op += 1;
        BatchSubmission {
            code: 0,
            message: None,
            operation_id: Some(format!("op-{}", state.next_op)),
        }
    }
}

#[async_trait::async_trait]
impl IRemoteShareClient for FakeRemote {
    async fn get_share_info(&self, _code: &ShareCode) -> anyhow::Result<ShareInfo> {
        anyhow::bail!("not used by the sync engine")
    }

    async fn check_access_code(
        &self,
        _code: &ShareCode,
        _access_code: &str,
    ) -> anyhow::Result<Option<String>> {
        anyhow::bail!("not used by the sync engine")
    }

    async fn list_share_dir(&self, location: &ShareLocation) -> anyhow::Result<FolderListing> {
        let state = self.state.lock().unwrap();
        if state.broken_share_dirs {
            anyhow::bail!("fileListAO missing");
        }
        state
            .share_dirs
            .get(location.folder_id.as_str())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("share folder {} not found", location.folder_id))
    }

    async fn list_files(&self, folder_id: &RemoteId) -> anyhow::Result<FolderListing> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .files
            .get(folder_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_batch_save(
        &self,
        items: &[BatchItem],
        target_folder_id: &RemoteId,
        _share_id: &str,
    ) -> anyhow::Result<BatchSubmission> {
        let submission = self.record(BatchKind::Save, items);
        if submission.is_accepted() {
            let mut state = self.state.lock().unwrap();
            if state.drop_saves {
                return Ok(submission);
            }
            let copied: Vec<RemoteFileEntry> = state
                .share_dirs
                .values()
                .flat_map(|l| l.files.iter())
                .filter(|f| items.iter().any(|i| i.file_id == f.id))
                .cloned()
                .collect();
            state
                .files
                .entry(target_folder_id.to_string())
                .or_default()
                .files
                .extend(copied);
        }
        Ok(submission)
    }

    async fn submit_batch_delete(&self, items: &[BatchItem]) -> anyhow::Result<BatchSubmission> {
        let submission = self.record(BatchKind::Delete, items);
        if submission.is_accepted() {
            let mut state = self.state.lock().unwrap();
            for listing in state.files.values_mut() {
                listing
                    .files
                    .retain(|f| !items.iter().any(|i| i.file_id == f.id));
            }
        }
        Ok(submission)
    }

    async fn submit_empty_recycle(&self) -> anyhow::Result<BatchSubmission> {
        Ok(self.record(BatchKind::EmptyRecycle, &[]))
    }

    async fn poll_batch_status(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
    ) -> anyhow::Result<BatchStatus> {
        let mut state = self.state.lock().unwrap();
        state.polls += 1;
        if state.failing_polls > 0 {
            state.failing_polls -= 1;
            anyhow::bail!("status endpoint unavailable");
        }
        Ok(state.statuses.pop_front().unwrap_or(BatchStatus::Success))
    }

    async fn get_conflict_detail(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
    ) -> anyhow::Result<ConflictDetail> {
        self.state
            .lock()
            .unwrap()
            .conflict
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no conflict recorded"))
    }

    async fn resolve_conflict(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
        _target_folder_id: &RemoteId,
        items: &[ResolvedItem],
    ) -> anyhow::Result<()> {
        self.state.lock().unwrap().resolutions.push(items.to_vec());
        Ok(())
    }

    async fn create_folder(&self, name: &str, _parent_id: &RemoteId) -> anyhow::Result<FolderEntry> {
        Ok(FolderEntry {
            id: rid("900"),
            name: name.to_string(),
        })
    }

    async fn rename_file(&self, file_id: &RemoteId, new_name: &str) -> anyhow::Result<RenameOutcome> {
        let mut state = self.state.lock().unwrap();
        if state.rename_clashes.contains(new_name) {
            return Ok(RenameOutcome::Rejected {
                code: "FileAlreadyExists".into(),
                message: "file already exists".into(),
            });
        }
        state.renames.push((file_id.to_string(), new_name.to_string()));
        for listing in state.files.values_mut() {
            if let Some(entry) = listing.files.iter_mut().find(|f| &f.id == file_id) {
                entry.name = new_name.to_string();
            }
        }
        Ok(RenameOutcome::Renamed)
    }
}
