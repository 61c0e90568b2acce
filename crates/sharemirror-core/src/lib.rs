//! ShareMirror Core - Domain logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `Task`, `Account`, `TaskLog`, share and batch value types
//! - **Use cases** - `CreateTaskUseCase`, `UpdateTaskUseCase`
//! - **Port definitions** - Traits for adapters: `IRemoteShareClient`, `ITaskRepository`,
//!   `INotificationService`
//! - **Configuration** - YAML-backed runtime configuration with validation
//!
//! # Architecture
//!
//! The domain module holds pure business rules with no I/O.
//! Ports define trait interfaces that adapter crates implement.
//! Use cases orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod usecases;
