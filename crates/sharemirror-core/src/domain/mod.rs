//! Domain entities and business logic
//!
//! This module contains the core domain types for ShareMirror:
//! - Newtypes for type-safe identifiers and validated remote values
//! - Mirror task definition and its processing state
//! - Accounts holding a provider session
//! - Task log entries
//! - Remote listing, share and batch operation value types
//! - Share link parsing
//! - Domain-specific error types

pub mod account;
pub mod batch;
pub mod errors;
pub mod newtypes;
pub mod remote;
pub mod share_link;
pub mod task;
pub mod task_log;

// Re-export commonly used types
pub use account::Account;
pub use batch::{
    BatchItem, BatchKind, BatchStatus, BatchSubmission, ConflictDealWay, ConflictDetail,
    ConflictItem, ResolvedItem,
};
pub use errors::DomainError;
pub use newtypes::*;
pub use remote::{FolderEntry, FolderListing, RemoteFileEntry, RenameOutcome, ShareInfo};
pub use share_link::ShareCode;
pub use task::{RenameRule, ShareLocation, Task, TaskDraft, TaskStatus};
pub use task_log::TaskLog;
