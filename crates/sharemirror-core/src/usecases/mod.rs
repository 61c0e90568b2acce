//! Use cases (interactors) for ShareMirror
//!
//! This module contains the task-management use cases that orchestrate
//! domain entities and port interfaces. Reconciliation itself lives in
//! the `sharemirror-sync` crate.
//!
//! ## Use Cases
//!
//! - [`CreateTaskUseCase`] - Turn a share link into one or more mirror tasks
//! - [`UpdateTaskUseCase`] - Apply a validated administrative patch to a task

pub mod create_task;
pub mod update_task;

#[cfg(test)]
pub(crate) mod fakes;

pub use create_task::{CreateTaskRequest, CreateTaskUseCase, ROOT_SELECTION};
pub use update_task::{TaskUpdate, UpdateTaskUseCase};
