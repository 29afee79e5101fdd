//! Router: moves tasks from the priority heap into the resource queues.
//!
//! Each popped task goes to its preferred class's queue if there is room,
//! otherwise to the alternate class's queue, otherwise back into the heap.
//! There is no backoff on that last path: while both queues stay full a task
//! keeps cycling, and because it re-enters the heap under its own key a
//! lower-keyed task may wait behind it indefinitely.
//!
//! Locking: the heap lock is released before any `try_send`, and the ledger
//! lock is only taken after a send succeeds. The two are never held together.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::heap::PendingQueue;
use super::ledger::Ledger;
use crate::domain::{Destination, ResourceClass, Task};

/// Sending half of a resource queue.
pub type TaskSender = mpsc::Sender<Arc<Task>>;

/// Result of one routing attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Placed on a queue and recorded in the ledger
    Routed(Destination),
    /// Both queues were unavailable; task is back in the heap
    Requeued,
}

/// Routes tasks from the pending heap to the CPU and GPU queues.
#[derive(Debug, Clone)]
pub struct Router {
    pending: Arc<PendingQueue>,
    ledger: Arc<Ledger>,
    cpu_tx: TaskSender,
    gpu_tx: TaskSender,
    idle_poll: Duration,
}

impl Router {
    pub fn new(
        pending: Arc<PendingQueue>,
        ledger: Arc<Ledger>,
        cpu_tx: TaskSender,
        gpu_tx: TaskSender,
        idle_poll: Duration,
    ) -> Self {
        Self {
            pending,
            ledger,
            cpu_tx,
            gpu_tx,
            idle_poll,
        }
    }

    fn sender(&self, class: ResourceClass) -> &TaskSender {
        match class {
            ResourceClass::Cpu => &self.cpu_tx,
            ResourceClass::Gpu => &self.gpu_tx,
        }
    }

    /// Non-blocking placement on a class's queue.
    fn try_place(&self, class: ResourceClass, task: &Arc<Task>) -> bool {
        match self.sender(class).try_send(Arc::clone(task)) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Closed(_)) => {
                tracing::warn!(task_id = task.id, class = %class, "Resource queue closed");
                false
            }
        }
    }

    /// Make one routing attempt for `task`.
    pub fn route(&self, task: Arc<Task>) -> RouteOutcome {
        let preferred = task.preferred_class();

        let destination = if self.try_place(preferred, &task) {
            Destination::Preferred(preferred)
        } else if self.try_place(preferred.other(), &task) {
            Destination::fallback_from(preferred)
        } else {
            tracing::trace!(task_id = task.id, "Both queues full, requeueing");
            self.pending.push(task);
            return RouteOutcome::Requeued;
        };

        if let Err(e) = task.set_destination(destination) {
            tracing::error!(task_id = task.id, error = %e, "Destination already set");
        }
        tracing::debug!(task_id = task.id, destination = %destination, "Task routed");
        self.ledger.append(task);

        RouteOutcome::Routed(destination)
    }

    /// Pop and route until cancelled.
    ///
    /// Sleeps only while the heap is empty, waking on the next push or after
    /// the idle poll interval.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("Router started");

        while !cancel.is_cancelled() {
            match self.pending.pop() {
                Ok(task) => {
                    if self.route(task) == RouteOutcome::Requeued {
                        // Let workers drain; this is not a backoff
                        tokio::task::yield_now().await;
                    }
                }
                Err(_) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.pending.wait_for_push(self.idle_poll) => {}
                    }
                }
            }
        }

        tracing::info!(pending = self.pending.len(), "Router stopped");
    }
}
