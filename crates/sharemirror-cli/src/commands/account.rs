//! Account command - manage provider accounts
//!
//! The session token is the value of the provider's login cookie; obtaining
//! it is up to the operator.

use anyhow::{Context, Result};
use clap::Subcommand;

use sharemirror_core::domain::Account;

use super::{parse_account_id, CliContext};
use crate::output::{Listing, Render};

#[derive(Debug, Subcommand)]
pub enum AccountCommand {
    /// Register an account
    Add {
        /// Provider username
        username: String,
        /// Session token (login cookie value)
        #[arg(long)]
        token: String,
    },
    /// List registered accounts
    List,
    /// Remove an account together with its tasks
    Remove {
        /// Account id
        id: String,
    },
}

/// Token shown in listings: first and last four characters only
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

impl Render for Account {
    fn lines(&self) -> Vec<String> {
        vec![format!(
            "{}  {}{}",
            self.id(),
            self.username(),
            if self.is_active() { "" } else { " (inactive)" }
        )]
    }

    /// The token is masked here too
    fn json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id().to_string(),
            "username": self.username(),
            "session_token": mask_token(self.session_token()),
            "is_active": self.is_active(),
            "created_at": self.created_at().to_rfc3339(),
        })
    }
}

impl AccountCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        let config = ctx.load_config()?;
        let repo = ctx.open_repository(&config).await?;
        let formatter = ctx.formatter();

        match self {
            AccountCommand::Add { username, token } => {
                let account = Account::new(username.as_str(), token.as_str())?;
                repo.save_account(&account)
                    .await
                    .context("Failed to save account")?;
                formatter.done(&format!("Added account {}", account.username()), &account);
            }
            AccountCommand::List => {
                let accounts = repo.list_accounts().await?;
                formatter.show(&Listing::new(&accounts, "No accounts registered"));
            }
            AccountCommand::Remove { id } => {
                let id = parse_account_id(id)?;
                if repo.remove_account(&id).await? {
                    formatter.success(&format!("Removed account {id}"));
                } else {
                    formatter.error(&format!("Account not found: {id}"));
                }
            }
        }
        Ok(())
    }
}
