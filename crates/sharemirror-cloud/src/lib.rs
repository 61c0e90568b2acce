//! ShareMirror Cloud - storage provider share API client
//!
//! Provides an async client for the provider's JSON API:
//! - Share discovery (share info, access code verification)
//! - Share and personal folder listings
//! - Batch operations (share save, delete, recycle purge) with status polling
//!   and conflict resolution
//! - Folder creation and file renames
//!
//! ## Modules
//!
//! - [`client`] - HTTP plumbing: session cookie, base URL, envelope checks
//! - [`wire`] - Provider response types and their conversion into domain types
//! - [`provider`] - [`IRemoteShareClient`](sharemirror_core::ports::IRemoteShareClient)
//!   implementation

pub mod client;
pub mod provider;
pub mod wire;

use thiserror::Error;

/// Errors that can occur when talking to the provider API
#[derive(Debug, Error)]
pub enum CloudError {
    /// The session token was refused
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The provider answered with a non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        body: String,
    },

    /// The provider answered with a non-zero `res_code`
    #[error("API error {code}: {message}")]
    Api {
        /// Provider result code
        code: String,
        /// Provider message
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
