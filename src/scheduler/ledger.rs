//! Append-only record of tasks that reached a resource queue.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::lock;
use crate::domain::Task;

#[derive(Debug, Default)]
struct Entries {
    tasks: Vec<Arc<Task>>,
    ids: HashSet<u64>,
}

/// Routed tasks in the order they were admitted to a queue.
#[derive(Debug, Default)]
pub struct Ledger {
    entries: Mutex<Entries>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a routed task. Returns false, leaving the ledger unchanged,
    /// if a task with the same id is already recorded.
    pub fn append(&self, task: Arc<Task>) -> bool {
        let mut entries = lock(&self.entries);
        if !entries.ids.insert(task.id) {
            tracing::error!(task_id = task.id, "Task already in ledger, not appending");
            return false;
        }
        entries.tasks.push(task);
        true
    }

    /// Copy of the current entries.
    pub fn snapshot(&self) -> Vec<Arc<Task>> {
        lock(&self.entries).tasks.clone()
    }

    pub fn contains(&self, id: u64) -> bool {
        lock(&self.entries).ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
