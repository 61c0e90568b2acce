//! In-memory port fakes shared by the use case tests

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{
    Account, AccountId, BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDetail,
    ContentHash, FolderEntry, FolderListing, RemoteFileEntry, RemoteId, RenameOutcome,
    ResolvedItem, ShareCode, ShareInfo, ShareLocation, Task, TaskId, TaskLog, TaskStatus,
};
use crate::ports::{IRemoteShareClient, ITaskRepository};

pub(crate) fn rid(s: &str) -> RemoteId {
    RemoteId::new(s).unwrap()
}

pub(crate) fn file(id: &str, name: &str, hash: &str, size: u64) -> RemoteFileEntry {
    RemoteFileEntry::file(rid(id), name, ContentHash::new(hash).ok(), size)
}

pub(crate) fn folder(id: &str, name: &str) -> FolderEntry {
    FolderEntry {
        id: rid(id),
        name: name.to_string(),
    }
}

#[derive(Default)]
struct ClientState {
    share_dirs: HashMap<String, FolderListing>,
    files: HashMap<String, FolderListing>,
    access_codes: HashMap<String, String>,
    created: Vec<(String, String)>,
    next_id: u32,
}

/// Share client serving canned listings
pub(crate) struct FakeShareClient {
    info: ShareInfo,
    state: Mutex<ClientState>,
}

impl FakeShareClient {
    pub(crate) fn new(info: ShareInfo) -> Self {
        Self {
            info,
            state: Mutex::new(ClientState::default()),
        }
    }

    pub(crate) fn set_share_dir(&self, folder_id: &str, listing: FolderListing) {
        self.state
            .lock()
            .unwrap()
            .share_dirs
            .insert(folder_id.to_string(), listing);
    }

    pub(crate) fn set_files(&self, folder_id: &str, listing: FolderListing) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(folder_id.to_string(), listing);
    }

    pub(crate) fn accept_access_code(&self, code: &str, share_id: &str) {
        self.state
            .lock()
            .unwrap()
            .access_codes
            .insert(code.to_string(), share_id.to_string());
    }

    /// `(name, parent_id)` of every folder created, in order
    pub(crate) fn created_folders(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().created.clone()
    }
}

#[async_trait::async_trait]
impl IRemoteShareClient for FakeShareClient {
    async fn get_share_info(&self, _code: &ShareCode) -> anyhow::Result<ShareInfo> {
        Ok(self.info.clone())
    }

    async fn check_access_code(
        &self,
        _code: &ShareCode,
        access_code: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(self.state.lock().unwrap().access_codes.get(access_code).cloned())
    }

    async fn list_share_dir(&self, location: &ShareLocation) -> anyhow::Result<FolderListing> {
        let state = self.state.lock().unwrap();
        Ok(state
            .share_dirs
            .get(location.folder_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn list_files(&self, folder_id: &RemoteId) -> anyhow::Result<FolderListing> {
        let state = self.state.lock().unwrap();
        Ok(state
            .files
            .get(folder_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn submit_batch_save(
        &self,
        _items: &[BatchItem],
        _target_folder_id: &RemoteId,
        _share_id: &str,
    ) -> anyhow::Result<BatchSubmission> {
        anyhow::bail!("not used by task management")
    }

    async fn submit_batch_delete(&self, _items: &[BatchItem]) -> anyhow::Result<BatchSubmission> {
        anyhow::bail!("not used by task management")
    }

    async fn submit_empty_recycle(&self) -> anyhow::Result<BatchSubmission> {
        anyhow::bail!("not used by task management")
    }

    async fn poll_batch_status(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
    ) -> anyhow::Result<BatchStatus> {
        anyhow::bail!("not used by task management")
    }

    async fn get_conflict_detail(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
    ) -> anyhow::Result<ConflictDetail> {
        anyhow::bail!("not used by task management")
    }

    async fn resolve_conflict(
        &self,
        _operation_id: &str,
        _kind: BatchKind,
        _target_folder_id: &RemoteId,
        _items: &[ResolvedItem],
    ) -> anyhow::Result<()> {
        anyhow::bail!("not used by task management")
    }

    async fn create_folder(
        &self,
        name: &str,
        parent_id: &RemoteId,
    ) -> anyhow::Result<FolderEntry> {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        state
            .created
            .push((name.to_string(), parent_id.as_str().to_string()));
        Ok(folder(&format!("f{}", state.next_id), name))
    }

    async fn rename_file(
        &self,
        _file_id: &RemoteId,
        _new_name: &str,
    ) -> anyhow::Result<RenameOutcome> {
        Ok(RenameOutcome::Renamed)
    }
}

/// Repository keeping everything in vectors
#[derive(Default)]
pub(crate) struct MemoryRepo {
    accounts: Mutex<Vec<Account>>,
    tasks: Mutex<Vec<Task>>,
    logs: Mutex<Vec<TaskLog>>,
}

#[async_trait::async_trait]
impl ITaskRepository for MemoryRepo {
    async fn save_account(&self, account: &Account) -> anyhow::Result<()> {
        let mut accounts = self.accounts.lock().unwrap();
        accounts.retain(|a| a.id() != account.id());
        accounts.push(account.clone());
        Ok(())
    }

    async fn get_account(&self, id: &AccountId) -> anyhow::Result<Option<Account>> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id() == id)
            .cloned())
    }

    async fn list_accounts(&self) -> anyhow::Result<Vec<Account>> {
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn remove_account(&self, id: &AccountId) -> anyhow::Result<bool> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id() != id);
        Ok(accounts.len() != before)
    }

    async fn save_task(&self, task: &Task) -> anyhow::Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        match tasks.iter_mut().find(|t| t.id() == task.id()) {
            Some(existing) => *existing = task.clone(),
            None => tasks.push(task.clone()),
        }
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> anyhow::Result<Option<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.id() == id)
            .cloned())
    }

    async fn list_tasks(&self) -> anyhow::Result<Vec<Task>> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    async fn find_tasks_by_status(&self, statuses: &[TaskStatus]) -> anyhow::Result<Vec<Task>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|t| statuses.contains(&t.status()))
            .cloned()
            .collect())
    }

    async fn remove_task(&self, id: &TaskId) -> anyhow::Result<bool> {
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id() != id);
        Ok(tasks.len() != before)
    }

    async fn append_log(&self, entry: &TaskLog) -> anyhow::Result<()> {
        self.logs.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn recent_logs(&self, limit: u32) -> anyhow::Result<Vec<TaskLog>> {
        let logs = self.logs.lock().unwrap();
        Ok(logs.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn logs_for_task(&self, id: &TaskId) -> anyhow::Result<Vec<TaskLog>> {
        let logs = self.logs.lock().unwrap();
        Ok(logs.iter().rev().filter(|l| l.task_id() == id).cloned().collect())
    }
}
