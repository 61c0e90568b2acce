//! Task command - create, inspect and administer mirror tasks

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use sharemirror_cloud::provider::share_client_for;
use sharemirror_core::domain::{RemoteId, Task, TaskStatus};
use sharemirror_core::usecases::{
    CreateTaskRequest, CreateTaskUseCase, TaskUpdate, UpdateTaskUseCase,
};

use super::{parse_account_id, parse_task_id, CliContext};
use crate::output::{Listing, Render};

#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Create tasks from a share link
    Add(AddArgs),
    /// List tasks, newest first
    List {
        /// Only tasks with this status
        #[arg(long)]
        status: Option<String>,
    },
    /// Show one task in full
    Show {
        /// Task id
        id: String,
    },
    /// Change task settings
    Update(UpdateArgs),
    /// Remove a task and its log
    Remove {
        /// Task id
        id: String,
    },
    /// Put a failed task back into the schedule
    Reset {
        /// Task id
        id: String,
    },
}

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Share link
    pub link: String,
    /// Account id to mirror into
    #[arg(long)]
    pub account: String,
    /// Folder of your drive that receives the mirror folder (-11 is the drive root)
    #[arg(long, allow_hyphen_values = true)]
    pub target: String,
    /// Expected number of episodes
    #[arg(long)]
    pub total: Option<u32>,
    /// Access code of a protected share
    #[arg(long)]
    pub code: Option<String>,
    /// Sub-folder id to mirror (repeatable; "root" for the share's own files)
    #[arg(long = "folder")]
    pub folders: Vec<String>,
}

#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Task id
    pub id: String,
    #[arg(long)]
    pub resource_name: Option<String>,
    #[arg(long)]
    pub target_folder_id: Option<String>,
    #[arg(long)]
    pub target_folder_name: Option<String>,
    #[arg(long)]
    pub share_folder_id: Option<String>,
    #[arg(long)]
    pub share_folder_name: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub current_episodes: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    pub total_episodes: Option<i64>,
    /// pending, processing, completed or failed
    #[arg(long)]
    pub status: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    pub episode_threshold: Option<i64>,
    /// Custom episode pattern; empty clears it
    #[arg(long)]
    pub episode_regex: Option<String>,
    #[arg(long)]
    pub episode_use_regex: Option<bool>,
    /// Comma-separated keywords; empty clears
    #[arg(long)]
    pub whitelist: Option<String>,
    /// Comma-separated keywords; empty clears
    #[arg(long)]
    pub blacklist: Option<String>,
    /// Files to keep in the mirror folder; 0 disables retention
    #[arg(long, allow_hyphen_values = true)]
    pub max_keep: Option<i64>,
    /// Rename pattern; empty removes the rule
    #[arg(long)]
    pub rename_from: Option<String>,
    /// Rename template ($1, ${name})
    #[arg(long)]
    pub rename_to: Option<String>,
    /// Own check interval in seconds; 0 returns to the global tick
    #[arg(long, allow_hyphen_values = true)]
    pub interval: Option<i64>,
}

impl From<&UpdateArgs> for TaskUpdate {
    fn from(args: &UpdateArgs) -> Self {
        TaskUpdate {
            resource_name: args.resource_name.clone(),
            target_folder_id: args.target_folder_id.clone(),
            target_folder_name: args.target_folder_name.clone(),
            share_folder_id: args.share_folder_id.clone(),
            share_folder_name: args.share_folder_name.clone(),
            current_episodes: args.current_episodes,
            total_episodes: args.total_episodes,
            status: args.status.clone(),
            episode_threshold: args.episode_threshold,
            episode_regex: args.episode_regex.clone(),
            episode_use_regex: args.episode_use_regex,
            whitelist_keywords: args.whitelist.clone(),
            blacklist_keywords: args.blacklist.clone(),
            max_keep_save_file: args.max_keep,
            rename_source_regex: args.rename_from.clone(),
            rename_target_template: args.rename_to.clone(),
            check_interval_secs: args.interval,
        }
    }
}

impl Render for Task {
    fn lines(&self) -> Vec<String> {
        vec![summary_line(self)]
    }

    fn json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Every setting of one task, for `task show`
struct TaskDetail<'a>(&'a Task);

impl Render for TaskDetail<'_> {
    fn lines(&self) -> Vec<String> {
        detail_lines(self.0)
    }

    fn json(&self) -> serde_json::Value {
        self.0.json()
    }
}

fn summary_line(task: &Task) -> String {
    let mut line = format!(
        "{}  [{}]  {} -> {}  (episodes {}/{}, threshold {})",
        task.id(),
        task.status(),
        task.display_name(),
        task.target_folder_name(),
        task.current_episodes(),
        task.total_episodes(),
        task.episode_threshold()
    );
    if let Some(secs) = task.check_interval_secs() {
        line.push_str(&format!(", every {secs}s"));
    }
    line
}

fn detail_lines(task: &Task) -> Vec<String> {
    let mut lines = vec![
        format!("id:                {}", task.id()),
        format!("account:           {}", task.account_id()),
        format!("status:            {}", task.status()),
        format!("share link:        {}", task.share_link()),
        format!(
            "share folder:      {} ({})",
            task.share_folder_id(),
            task.share_folder_name()
        ),
        format!(
            "target folder:     {} ({})",
            task.target_folder_id(),
            task.target_folder_name()
        ),
        format!(
            "episodes:          {}/{}",
            task.current_episodes(),
            task.total_episodes()
        ),
        format!("episode threshold: {}", task.episode_threshold()),
        format!(
            "episode pattern:   {}{}",
            task.episode_regex().unwrap_or("-"),
            if task.episode_use_regex() { "" } else { " (heuristics off)" }
        ),
        format!("whitelist:         {}", task.whitelist_keywords().unwrap_or("-")),
        format!("blacklist:         {}", task.blacklist_keywords().unwrap_or("-")),
        format!("keep at most:      {}", task.max_keep_save_file()),
    ];
    if let Some(rule) = task.rename_rule() {
        lines.push(format!(
            "rename:            {} -> {}",
            rule.source_regex, rule.target_template
        ));
    }
    if let Some(at) = task.last_file_update_time() {
        lines.push(format!("last transfer:     {}", at.to_rfc3339()));
    }
    if let Some(error) = task.last_error() {
        lines.push(format!("last error:        {error}"));
    }
    lines
}

impl TaskCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config = ctx.load_config()?;
        let repo = ctx.open_repository(&config).await?;
        let formatter = ctx.formatter();

        match self {
            TaskCommand::Add(args) => {
                let account_id = parse_account_id(&args.account)?;
                let account = repo
                    .get_account(&account_id)
                    .await?
                    .with_context(|| format!("Account not found: {account_id}"))?;
                let client = share_client_for(&config.provider, &account)?;

                let target = RemoteId::new(args.target.as_str())?;
                let mut request = CreateTaskRequest::new(account_id, args.link.as_str(), target);
                request.total_episodes = args.total;
                request.access_code = args.code.clone();
                request.selected_folders = args.folders.clone();

                let tasks = CreateTaskUseCase::new(repo)
                    .execute(client.as_ref(), request)
                    .await?;

                formatter.done(
                    &format!("Created {} task(s)", tasks.len()),
                    &Listing::new(&tasks, "No folders matched"),
                );
            }
            TaskCommand::List { status } => {
                let tasks = match status {
                    Some(raw) => {
                        let status: TaskStatus = raw.parse()?;
                        let mut tasks = repo.find_tasks_by_status(&[status]).await?;
                        tasks.reverse();
                        tasks
                    }
                    None => repo.list_tasks().await?,
                };
                formatter.show(&Listing::new(&tasks, "No tasks"));
            }
            TaskCommand::Show { id } => {
                let id = parse_task_id(id)?;
                let task = repo
                    .get_task(&id)
                    .await?
                    .with_context(|| format!("Task not found: {id}"))?;
                formatter.show(&TaskDetail(&task));
            }
            TaskCommand::Update(args) => {
                let id = parse_task_id(&args.id)?;
                let update = TaskUpdate::from(args);
                if update.is_empty() {
                    formatter.warn("Nothing to update");
                    return Ok(());
                }
                let task = UpdateTaskUseCase::new(repo).execute(&id, &update).await?;
                formatter.done(&format!("Updated {}", task.display_name()), &TaskDetail(&task));
            }
            TaskCommand::Remove { id } => {
                let id = parse_task_id(id)?;
                if repo.remove_task(&id).await? {
                    formatter.success(&format!("Removed task {id}"));
                } else {
                    formatter.error(&format!("Task not found: {id}"));
                }
            }
            TaskCommand::Reset { id } => {
                let id = parse_task_id(id)?;
                let task = UpdateTaskUseCase::new(repo).reset(&id).await?;
                formatter.done(&format!("Reset {}", task.display_name()), &task);
            }
        }
        Ok(())
    }
}
