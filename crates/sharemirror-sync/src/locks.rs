//! Per-task single-flight guard
//!
//! A reconciliation or retention pass holds its task's guard for its whole
//! duration. A second caller for the same task does not wait; it gets
//! `None` and skips the task for that tick. The guard is released when
//! dropped, on every exit path.

use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use sharemirror_core::domain::TaskId;

/// Lock table keyed by task id; clones share the same table
#[derive(Debug, Clone, Default)]
pub struct TaskLocks {
    inner: Arc<DashMap<TaskId, Arc<Mutex<()>>>>,
}

/// Held while a task is being processed
#[derive(Debug)]
pub struct TaskGuard {
    task_id: TaskId,
    _guard: OwnedMutexGuard<()>,
}

impl TaskGuard {
    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }
}

impl TaskLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the task's guard, or returns `None` if it is already held
    pub fn try_acquire(&self, task_id: &TaskId) -> Option<TaskGuard> {
        let lock = self.inner.entry(*task_id).or_default().clone();
        lock.try_lock_owned().ok().map(|guard| TaskGuard {
            task_id: *task_id,
            _guard: guard,
        })
    }

    /// Drops the table entry of a task unless someone holds or is taking it
    ///
    /// Returns true when the entry was removed.
    pub fn forget(&self, task_id: &TaskId) -> bool {
        self.inner
            .remove_if(task_id, |_, lock| Arc::strong_count(lock) == 1)
            .is_some()
    }

    /// Drops every idle entry whose task is not in `live`
    pub fn retain_live(&self, live: &HashSet<TaskId>) {
        self.inner
            .retain(|id, lock| live.contains(id) || Arc::strong_count(lock) > 1);
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.inner.len()
    }
}
