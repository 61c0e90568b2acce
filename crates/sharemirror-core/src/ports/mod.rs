//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IRemoteShareClient`] - Share listings, batch transfers, folder operations
//! - [`ITaskRepository`] - Persistent storage for accounts, tasks and task logs
//! - [`INotificationService`] - Delivery of sync summaries to the operator

pub mod notification;
pub mod share_client;
pub mod task_repository;

pub use notification::{INotificationService, Notification, NotificationPriority};
pub use share_client::IRemoteShareClient;
pub use task_repository::ITaskRepository;
