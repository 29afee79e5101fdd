//! Worker units draining the resource queues.
//!
//! Every unit is bound to one class's queue for its whole life. Units of the
//! same class share the receiver behind an async mutex, so each task is taken
//! by exactly one of them and per-queue FIFO order holds.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::domain::{ResourceClass, Task};

/// Reference scale: 100ms of simulated work per intensity unit.
pub const DEFAULT_MS_PER_INTENSITY: u64 = 100;

/// Receiving half of a resource queue, shared by that class's workers.
pub type TaskReceiver = Arc<Mutex<mpsc::Receiver<Arc<Task>>>>;

/// Maps a task and the class running it to a simulated duration.
pub trait CostModel: Send + Sync {
    fn cost(&self, task: &Task, class: ResourceClass) -> Duration;
}

/// Cost proportional to the class intensity, truncated to whole milliseconds.
#[derive(Debug, Clone, Copy)]
pub struct LinearCost {
    pub ms_per_intensity: u64,
}

impl LinearCost {
    pub fn new(ms_per_intensity: u64) -> Self {
        Self { ms_per_intensity }
    }
}

impl Default for LinearCost {
    fn default() -> Self {
        Self::new(DEFAULT_MS_PER_INTENSITY)
    }
}

impl CostModel for LinearCost {
    fn cost(&self, task: &Task, class: ResourceClass) -> Duration {
        let ms = task.intensity_for(class) * self.ms_per_intensity as f64;
        Duration::from_millis(ms as u64)
    }
}

/// Decrements the active count when a unit exits, including on panic.
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Fixed groups of worker units, one group per resource class.
#[derive(Debug, Default)]
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    active: Arc<AtomicUsize>,
    next_id: usize,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `count` units on `class`'s queue.
    ///
    /// Units are counted as active from this call until they exit.
    pub fn spawn(
        &mut self,
        class: ResourceClass,
        count: usize,
        rx: TaskReceiver,
        cost: Arc<dyn CostModel>,
        cancel: CancellationToken,
    ) {
        for _ in 0..count {
            let worker_id = self.next_id;
            self.next_id += 1;

            self.active.fetch_add(1, Ordering::SeqCst);
            let guard = ActiveGuard(self.active.clone());
            let unit = WorkerUnit {
                worker_id,
                class,
                rx: rx.clone(),
                cost: cost.clone(),
            };
            let cancel = cancel.clone();

            self.handles.push(tokio::spawn(async move {
                let _guard = guard;
                unit.run(cancel).await;
            }));
        }
        tracing::info!(class = %class, count, "Workers spawned");
    }

    /// Units that have been spawned and not yet exited.
    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Units spawned so far, running or not.
    pub fn spawned(&self) -> usize {
        self.next_id
    }

    /// Hand over the join handles of every unit spawned so far.
    pub fn take_handles(&mut self) -> Vec<JoinHandle<()>> {
        std::mem::take(&mut self.handles)
    }
}

/// Await every handle, logging units that panicked.
pub async fn join_all(handles: Vec<JoinHandle<()>>) {
    for result in futures::future::join_all(handles).await {
        if let Err(e) = result {
            tracing::error!(error = ?e, "Worker task panicked");
        }
    }
}

struct WorkerUnit {
    worker_id: usize,
    class: ResourceClass,
    rx: TaskReceiver,
    cost: Arc<dyn CostModel>,
}

impl WorkerUnit {
    async fn recv(&self) -> Option<Arc<Task>> {
        self.rx.lock().await.recv().await
    }

    /// Take tasks until cancelled or the queue closes.
    ///
    /// Cancellation is only observed while waiting for a task; a task already
    /// taken runs its full simulated duration and records its time.
    async fn run(self, cancel: CancellationToken) {
        tracing::debug!(worker_id = self.worker_id, class = %self.class, "Worker started");

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                task = self.recv() => task,
            };
            let Some(task) = next else {
                break;
            };

            let duration = self.cost.cost(&task, self.class);
            tokio::time::sleep(duration).await;

            if let Err(e) = task.record_total_time(duration) {
                tracing::error!(task_id = task.id, error = %e, "Total time already recorded");
                continue;
            }
            tracing::debug!(
                worker_id = self.worker_id,
                class = %self.class,
                task_id = task.id,
                total_ms = duration.as_millis() as u64,
                "Task processed"
            );
        }

        tracing::debug!(worker_id = self.worker_id, class = %self.class, "Worker stopped");
    }
}
