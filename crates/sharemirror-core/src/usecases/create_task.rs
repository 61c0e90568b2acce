//! Task creation use case
//!
//! Resolves a share link, prepares the mirror folder under the chosen
//! target and records one task per mirrored share folder.
//!
//! For a folder share, the share root's own files get a task named
//! `"<share>(root)"` and every sub-folder gets its own task and its own
//! mirror sub-folder. A single-file share (or a folder share with nothing
//! to split) becomes one task covering the whole share.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

use crate::domain::{
    AccountId, FolderEntry, RemoteId, ShareCode, ShareInfo, ShareLocation, Task, TaskDraft,
};
use crate::ports::{IRemoteShareClient, ITaskRepository};

/// Selection token standing for the share root's own files
pub const ROOT_SELECTION: &str = "root";

/// Input for [`CreateTaskUseCase::execute`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTaskRequest {
    pub account_id: AccountId,
    pub share_link: String,
    /// Folder of the operator's drive that receives the mirror folder
    pub target_folder_id: RemoteId,
    pub total_episodes: Option<u32>,
    pub access_code: Option<String>,
    /// Sub-folder ids to mirror; [`ROOT_SELECTION`] picks the root files.
    /// Empty means everything.
    pub selected_folders: Vec<String>,
}

impl CreateTaskRequest {
    pub fn new(account_id: AccountId, share_link: impl Into<String>, target: RemoteId) -> Self {
        Self {
            account_id,
            share_link: share_link.into(),
            target_folder_id: target,
            total_episodes: None,
            access_code: None,
            selected_folders: Vec::new(),
        }
    }

    fn selects(&self, key: &str) -> bool {
        self.selected_folders.is_empty() || self.selected_folders.iter().any(|s| s == key)
    }
}

/// Use case for creating mirror tasks from a share link
pub struct CreateTaskUseCase {
    repository: Arc<dyn ITaskRepository>,
}

/// Share coordinates settled before any task is built
struct ResolvedShare {
    info: ShareInfo,
    share_id: String,
    access_code: Option<String>,
}

impl ResolvedShare {
    fn root_location(&self) -> ShareLocation {
        ShareLocation {
            share_id: self.share_id.clone(),
            folder_id: self.info.file_id.clone(),
            share_mode: self.info.share_mode,
            access_code: self.access_code.clone(),
        }
    }
}

impl CreateTaskUseCase {
    pub fn new(repository: Arc<dyn ITaskRepository>) -> Self {
        Self { repository }
    }

    /// Creates and persists the tasks for a share link
    ///
    /// # Errors
    ///
    /// Fails when the account is unknown, the link cannot be parsed, the
    /// share is protected and no valid access code was given, the target
    /// already holds a folder named after the share, or the share has no
    /// files at all.
    #[tracing::instrument(skip(self, client, request), fields(account_id = %request.account_id))]
    pub async fn execute(
        &self,
        client: &dyn IRemoteShareClient,
        request: CreateTaskRequest,
    ) -> Result<Vec<Task>> {
        self.repository
            .get_account(&request.account_id)
            .await
            .context("Failed to load account")?
            .with_context(|| format!("Account not found: {}", request.account_id))?;

        let code = ShareCode::parse(&request.share_link)?;
        let share = self.resolve_share(client, &code, &request).await?;
        let root_folder = self
            .prepare_root_folder(client, &request.target_folder_id, &share.info.file_name)
            .await?;

        let mut tasks = Vec::new();
        if share.info.is_folder {
            self.split_folder_share(client, &share, &request, &root_folder, &mut tasks)
                .await?;
        }

        if tasks.is_empty() {
            let file_count = count_share_files(client, &share.root_location()).await?;
            if file_count == 0 {
                bail!("Share '{}' contains no files", share.info.file_name);
            }
            tasks.push(Task::new(draft(
                &request,
                &share,
                &root_folder,
                share.info.file_name.clone(),
                None,
                file_count,
            )));
        }

        for task in &tasks {
            self.repository
                .save_task(task)
                .await
                .context("Failed to persist new task")?;
        }

        info!(
            share = %share.info.file_name,
            count = tasks.len(),
            "Created mirror tasks"
        );
        Ok(tasks)
    }

    async fn resolve_share(
        &self,
        client: &dyn IRemoteShareClient,
        code: &ShareCode,
        request: &CreateTaskRequest,
    ) -> Result<ResolvedShare> {
        let info = client
            .get_share_info(code)
            .await
            .context("Failed to fetch share info")?;

        let access_code = request
            .access_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        let share_id = if info.requires_access_code() {
            let Some(access) = access_code.as_deref() else {
                bail!("Share is protected; an access code is required");
            };
            client
                .check_access_code(code, access)
                .await
                .context("Failed to verify access code")?
                .context("Access code rejected")?
        } else {
            info.share_id
                .clone()
                .context("Share info did not include a share id")?
        };

        debug!(share_id = %share_id, is_folder = info.is_folder, "Resolved share");
        Ok(ResolvedShare {
            info,
            share_id,
            access_code,
        })
    }

    async fn prepare_root_folder(
        &self,
        client: &dyn IRemoteShareClient,
        target: &RemoteId,
        name: &str,
    ) -> Result<FolderEntry> {
        let existing = client
            .list_files(target)
            .await
            .context("Failed to list target folder")?;
        if existing.folders.iter().any(|f| f.name == name) {
            bail!("Target already contains a folder named '{name}'");
        }
        client
            .create_folder(name, target)
            .await
            .context("Failed to create mirror folder")
    }

    async fn split_folder_share(
        &self,
        client: &dyn IRemoteShareClient,
        share: &ResolvedShare,
        request: &CreateTaskRequest,
        root_folder: &FolderEntry,
        tasks: &mut Vec<Task>,
    ) -> Result<()> {
        let listing = client
            .list_share_dir(&share.root_location())
            .await
            .context("Failed to list share root")?;

        let root_files = listing.plain_files().count() as u32;
        if root_files > 0 && request.selects(ROOT_SELECTION) {
            tasks.push(Task::new(draft(
                request,
                share,
                root_folder,
                format!("{}(root)", share.info.file_name),
                None,
                root_files,
            )));
        }

        for folder in &listing.folders {
            if !request.selects(folder.id.as_str()) {
                continue;
            }
            let mirror = client
                .create_folder(&folder.name, &root_folder.id)
                .await
                .with_context(|| format!("Failed to create mirror folder '{}'", folder.name))?;
            tasks.push(Task::new(draft(
                request,
                share,
                &mirror,
                share.info.file_name.clone(),
                Some(folder),
                0,
            )));
        }
        Ok(())
    }
}

fn draft(
    request: &CreateTaskRequest,
    share: &ResolvedShare,
    target: &FolderEntry,
    resource_name: String,
    share_folder: Option<&FolderEntry>,
    current_episodes: u32,
) -> TaskDraft {
    let (share_folder_id, share_folder_name) = match share_folder {
        Some(f) => (f.id.clone(), f.name.clone()),
        None => (share.info.file_id.clone(), String::new()),
    };
    TaskDraft {
        account_id: request.account_id,
        share_link: request.share_link.clone(),
        share_id: share.share_id.clone(),
        share_file_id: share.info.file_id.clone(),
        share_folder_id,
        share_folder_name,
        share_mode: share.info.share_mode,
        access_code: share.access_code.clone(),
        target_folder_id: target.id.clone(),
        target_folder_name: target.name.clone(),
        resource_name,
        current_episodes,
        total_episodes: request.total_episodes.unwrap_or(0),
    }
}

/// Counts files in a share sub-tree, descending into every folder
async fn count_share_files(
    client: &dyn IRemoteShareClient,
    root: &ShareLocation,
) -> Result<u32> {
    let mut pending = vec![root.folder_id.clone()];
    let mut count = 0u32;
    while let Some(folder_id) = pending.pop() {
        let listing = client
            .list_share_dir(&root.with_folder(folder_id))
            .await
            .context("Failed to list share folder")?;
        count += listing.plain_files().count() as u32;
        pending.extend(listing.folders.into_iter().map(|f| f.id));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, FolderListing, TaskStatus};
    use crate::usecases::fakes::{file, folder, rid, FakeShareClient, MemoryRepo};

    const LINK: &str = "https://cloud.189.cn/t/abc123";

    async fn setup() -> (Arc<MemoryRepo>, AccountId) {
        let repo = Arc::new(MemoryRepo::default());
        let account = Account::new("alice", "token").unwrap();
        let id = *account.id();
        repo.save_account(&account).await.unwrap();
        (repo, id)
    }

    fn folder_share(mode: i32) -> ShareInfo {
        ShareInfo {
            share_id: Some("555".to_string()),
            file_id: rid("100"),
            file_name: "Show".to_string(),
            is_folder: true,
            share_mode: mode,
        }
    }

    #[tokio::test]
    async fn test_folder_share_splits_root_and_subfolders() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(0));
        client.set_share_dir(
            "100",
            FolderListing {
                files: vec![file("1", "S01E01.mkv", "AA", 1)],
                folders: vec![folder("110", "Season 1"), folder("120", "Season 2")],
            },
        );

        let uc = CreateTaskUseCase::new(repo.clone());
        let tasks = uc
            .execute(&client, CreateTaskRequest::new(account, LINK, rid("-11")))
            .await
            .unwrap();

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].resource_name(), "Show(root)");
        assert_eq!(tasks[0].current_episodes(), 1);
        assert_eq!(tasks[1].share_folder_name(), "Season 1");
        assert_eq!(tasks[1].share_folder_id().as_str(), "110");
        assert_eq!(tasks[2].share_folder_name(), "Season 2");
        assert!(tasks.iter().all(|t| t.status() == TaskStatus::Pending));
        assert!(tasks.iter().all(|t| t.share_id() == "555"));

        // Mirror root under the target, one sub-folder per share folder
        let created = client.created_folders();
        assert_eq!(created[0], ("Show".to_string(), "-11".to_string()));
        assert_eq!(created.len(), 3);
        assert_eq!(repo.list_tasks().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_selected_folders_limit_tasks() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(0));
        client.set_share_dir(
            "100",
            FolderListing {
                files: vec![file("1", "E01.mkv", "AA", 1)],
                folders: vec![folder("110", "A"), folder("120", "B")],
            },
        );

        let mut request = CreateTaskRequest::new(account, LINK, rid("-11"));
        request.selected_folders = vec!["120".to_string()];
        let tasks = CreateTaskUseCase::new(repo)
            .execute(&client, request)
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].share_folder_name(), "B");
    }

    #[tokio::test]
    async fn test_single_file_share_counts_recursively() {
        let (repo, account) = setup().await;
        let mut info = folder_share(0);
        info.is_folder = false;
        let client = FakeShareClient::new(info);
        client.set_share_dir(
            "100",
            FolderListing {
                files: vec![file("1", "Movie.mkv", "AA", 1)],
                folders: vec![],
            },
        );

        let tasks = CreateTaskUseCase::new(repo)
            .execute(&client, CreateTaskRequest::new(account, LINK, rid("-11")))
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].resource_name(), "Show");
        assert_eq!(tasks[0].current_episodes(), 1);
    }

    #[tokio::test]
    async fn test_protected_share_requires_access_code() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(1));

        let err = CreateTaskUseCase::new(repo)
            .execute(&client, CreateTaskRequest::new(account, LINK, rid("-11")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access code"));
    }

    #[tokio::test]
    async fn test_protected_share_uses_unlocked_share_id() {
        let (repo, account) = setup().await;
        let mut info = folder_share(1);
        info.share_id = None;
        let client = FakeShareClient::new(info);
        client.accept_access_code("pw12", "777");
        client.set_share_dir(
            "100",
            FolderListing {
                files: vec![file("1", "E01.mkv", "AA", 1)],
                folders: vec![],
            },
        );

        let mut request = CreateTaskRequest::new(account, LINK, rid("-11"));
        request.access_code = Some("pw12".to_string());
        let tasks = CreateTaskUseCase::new(repo)
            .execute(&client, request)
            .await
            .unwrap();

        assert_eq!(tasks[0].share_id(), "777");
        assert_eq!(tasks[0].access_code(), Some("pw12"));
    }

    #[tokio::test]
    async fn test_wrong_access_code_rejected() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(1));
        client.accept_access_code("right", "777");

        let mut request = CreateTaskRequest::new(account, LINK, rid("-11"));
        request.access_code = Some("wrong".to_string());
        let err = CreateTaskUseCase::new(repo)
            .execute(&client, request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("rejected"));
    }

    #[tokio::test]
    async fn test_existing_folder_name_rejected() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(0));
        client.set_files(
            "-11",
            FolderListing {
                files: vec![],
                folders: vec![folder("900", "Show")],
            },
        );

        let err = CreateTaskUseCase::new(repo)
            .execute(&client, CreateTaskRequest::new(account, LINK, rid("-11")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already contains"));
        assert!(client.created_folders().is_empty());
    }

    #[tokio::test]
    async fn test_empty_share_is_error() {
        let (repo, account) = setup().await;
        let client = FakeShareClient::new(folder_share(0));

        let err = CreateTaskUseCase::new(repo.clone())
            .execute(&client, CreateTaskRequest::new(account, LINK, rid("-11")))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no files"));
        assert!(repo.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_account_rejected() {
        let repo = Arc::new(MemoryRepo::default());
        let client = FakeShareClient::new(folder_share(0));
        let err = CreateTaskUseCase::new(repo)
            .execute(
                &client,
                CreateTaskRequest::new(AccountId::new(), LINK, rid("-11")),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Account not found"));
    }
}
