//! Remote client per account
//!
//! Each account gets one [`IRemoteShareClient`] built on first use and
//! reused afterwards. A changed session token rebuilds the client. The
//! registry is passed explicitly to whoever needs it; there is no global
//! instance.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use sharemirror_core::domain::{Account, AccountId};
use sharemirror_core::ports::IRemoteShareClient;

/// Builds a client for an account
pub type ClientFactory =
    Arc<dyn Fn(&Account) -> anyhow::Result<Arc<dyn IRemoteShareClient>> + Send + Sync>;

struct CachedClient {
    session_token: String,
    client: Arc<dyn IRemoteShareClient>,
}

/// Lazily built clients keyed by account id
pub struct ClientRegistry {
    factory: ClientFactory,
    clients: DashMap<AccountId, CachedClient>,
}

impl fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients", &self.clients.len())
            .finish()
    }
}

impl ClientRegistry {
    pub fn new(factory: ClientFactory) -> Self {
        Self {
            factory,
            clients: DashMap::new(),
        }
    }

    /// Returns the account's client, building it if needed
    ///
    /// # Errors
    /// Fails for a deactivated account or when the factory fails.
    pub fn client_for(&self, account: &Account) -> anyhow::Result<Arc<dyn IRemoteShareClient>> {
        if !account.is_active() {
            anyhow::bail!("Account {} is deactivated", account.username());
        }

        if let Some(cached) = self.clients.get(account.id()) {
            if cached.session_token == account.session_token() {
                return Ok(cached.client.clone());
            }
        }

        debug!(account = account.username(), "Building remote client");
        let client = (self.factory)(account)?;
        self.clients.insert(
            *account.id(),
            CachedClient {
                session_token: account.session_token().to_string(),
                client: client.clone(),
            },
        );
        Ok(client)
    }

    /// Drops the cached client of an account
    pub fn invalidate(&self, account_id: &AccountId) {
        self.clients.remove(account_id);
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
