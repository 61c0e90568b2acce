//! Account domain entity
//!
//! An [`Account`] is the operator's login on the storage provider. Tasks
//! reference it to know which session to use for listings and transfers.
//! Obtaining the session token is outside this system; the operator
//! supplies it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{errors::DomainError, newtypes::AccountId};

/// A provider account with its session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier for this account
    id: AccountId,
    /// Provider username (usually a phone number or email)
    username: String,
    /// Session token sent with every provider request
    session_token: String,
    /// Inactive accounts are skipped by the scheduler
    is_active: bool,
    /// When this account was registered
    created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active account
    ///
    /// # Errors
    /// Returns [`DomainError::ValidationFailed`] if username or token is blank
    pub fn new(
        username: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let username = username.into().trim().to_string();
        let session_token = session_token.into().trim().to_string();
        if username.is_empty() {
            return Err(DomainError::ValidationFailed(
                "username cannot be empty".to_string(),
            ));
        }
        if session_token.is_empty() {
            return Err(DomainError::ValidationFailed(
                "session token cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id: AccountId::new(),
            username,
            session_token,
            is_active: true,
            created_at: Utc::now(),
        })
    }

    /// Rebuilds an account from storage
    pub fn with_id(
        id: AccountId,
        username: impl Into<String>,
        session_token: impl Into<String>,
        is_active: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            session_token: session_token.into(),
            is_active,
            created_at,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn session_token(&self) -> &str {
        &self.session_token
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Replaces the session token after the operator logs in again
    pub fn update_session_token(&mut self, token: impl Into<String>) {
        self.session_token = token.into();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
    }
}
