//! Max-priority structure over pending tasks.
//!
//! Tasks are ordered by |gpu - cpu| intensity, largest first. Equal keys come
//! out in no particular order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use super::lock;
use crate::domain::Task;
use crate::error::{Result, SchedulerError};

/// Heap entry with its key computed once at push time.
#[derive(Debug)]
struct Prioritized {
    key: f64,
    task: Arc<Task>,
}

impl Ord for Prioritized {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.total_cmp(&other.key)
    }
}

impl PartialOrd for Prioritized {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Prioritized {}

impl PartialEq for Prioritized {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

/// Binary max-heap of tasks keyed by priority.
#[derive(Debug, Default)]
pub struct TaskHeap {
    heap: BinaryHeap<Prioritized>,
}

impl TaskHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task. O(log n).
    pub fn push(&mut self, task: Arc<Task>) {
        let key = task.priority_key();
        self.heap.push(Prioritized { key, task });
    }

    /// Remove the task with the largest key. O(log n).
    pub fn pop(&mut self) -> Result<Arc<Task>> {
        self.heap.pop().map(|p| p.task).ok_or(SchedulerError::QueueEmpty)
    }

    /// Key of the next task to pop, if any.
    pub fn peek_key(&self) -> Option<f64> {
        self.heap.peek().map(|p| p.key)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// The heap behind its lock, plus a wake-up signal for the router.
#[derive(Debug, Default)]
pub struct PendingQueue {
    heap: Mutex<TaskHeap>,
    pushed: Notify,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert under the lock, then wake a waiting router.
    pub fn push(&self, task: Arc<Task>) {
        lock(&self.heap).push(task);
        self.pushed.notify_one();
    }

    pub fn pop(&self) -> Result<Arc<Task>> {
        lock(&self.heap).pop()
    }

    pub fn len(&self) -> usize {
        lock(&self.heap).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.heap).is_empty()
    }

    /// Wait for a push, or at most `idle_poll`.
    ///
    /// A push that lands before this call leaves a stored permit, so the
    /// wait returns immediately instead of missing it.
    pub async fn wait_for_push(&self, idle_poll: Duration) {
        let _ = tokio::time::timeout(idle_poll, self.pushed.notified()).await;
    }
}
