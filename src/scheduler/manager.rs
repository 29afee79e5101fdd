//! Scheduler facade: owns the heap, the two resource queues, the ledger,
//! the router and the worker pool.
//!
//! Typical lifecycle:
//! 1. `Scheduler::new(config)`
//! 2. `start(cancel)` spawns the workers and the router
//! 3. `add_task` feeds the heap, from any thread
//! 4. `cancel.cancel()` then `wait()` for every unit to exit
//! 5. `tasks()` returns what reached a queue

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::heap::PendingQueue;
use super::ledger::Ledger;
use super::lock;
use super::router::{Router, TaskSender};
use super::worker::{self, CostModel, DEFAULT_MS_PER_INTENSITY, LinearCost, TaskReceiver, WorkerPool};
use crate::domain::{ResourceClass, Task};
use crate::error::{Result, SchedulerError};

/// Configuration for the Scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Capacity of each resource queue.
    pub queue_capacity: usize,
    /// Worker units on the CPU-like queue.
    pub cpu_workers: usize,
    /// Worker units on the GPU-like queue.
    pub gpu_workers: usize,
    /// Longest the router sleeps on an empty heap before re-checking.
    pub idle_poll: Duration,
    /// Simulated milliseconds per intensity unit.
    pub ms_per_intensity: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 10,
            cpu_workers: 3,
            gpu_workers: 3,
            idle_poll: Duration::from_millis(10),
            ms_per_intensity: DEFAULT_MS_PER_INTENSITY,
        }
    }
}

impl SchedulerConfig {
    /// Create a config with the given capacity and worker counts.
    pub fn new(queue_capacity: usize, cpu_workers: usize, gpu_workers: usize) -> Self {
        Self {
            queue_capacity,
            cpu_workers,
            gpu_workers,
            ..Self::default()
        }
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_workers(mut self, cpu_workers: usize, gpu_workers: usize) -> Self {
        self.cpu_workers = cpu_workers;
        self.gpu_workers = gpu_workers;
        self
    }

    pub fn with_idle_poll(mut self, idle_poll: Duration) -> Self {
        self.idle_poll = idle_poll;
        self
    }

    pub fn with_ms_per_intensity(mut self, ms: u64) -> Self {
        self.ms_per_intensity = ms;
        self
    }

    /// Reject values the queues cannot be built with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(SchedulerError::InvalidConfig(
                "queue_capacity must be positive".to_string(),
            ));
        }
        if self.idle_poll.is_zero() {
            return Err(SchedulerError::InvalidConfig("idle_poll must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// One bounded FIFO queue per resource class.
struct ResourceQueue {
    tx: TaskSender,
    rx: TaskReceiver,
}

impl ResourceQueue {
    fn bounded(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
        }
    }

    /// Slots currently free for a non-blocking send.
    fn free_slots(&self) -> usize {
        self.tx.capacity()
    }
}

/// Priority scheduler routing tasks between CPU-like and GPU-like queues.
pub struct Scheduler {
    config: SchedulerConfig,
    pending: Arc<PendingQueue>,
    ledger: Arc<Ledger>,
    cpu: ResourceQueue,
    gpu: ResourceQueue,
    cost: Arc<dyn CostModel>,
    workers: Mutex<WorkerPool>,
    router: Mutex<Option<JoinHandle<()>>>,
    router_started: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler with validated config and a linear cost model.
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;
        let cost = Arc::new(LinearCost::new(config.ms_per_intensity));

        Ok(Self {
            cpu: ResourceQueue::bounded(config.queue_capacity),
            gpu: ResourceQueue::bounded(config.queue_capacity),
            config,
            pending: Arc::new(PendingQueue::new()),
            ledger: Arc::new(Ledger::new()),
            cost,
            workers: Mutex::new(WorkerPool::new()),
            router: Mutex::new(None),
            router_started: AtomicBool::new(false),
        })
    }

    /// Replace the cost model used by workers spawned after this call.
    pub fn with_cost_model(mut self, cost: Arc<dyn CostModel>) -> Self {
        self.cost = cost;
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn queue(&self, class: ResourceClass) -> &ResourceQueue {
        match class {
            ResourceClass::Cpu => &self.cpu,
            ResourceClass::Gpu => &self.gpu,
        }
    }

    /// Insert a task into the priority heap.
    pub fn add_task(&self, task: Task) -> Arc<Task> {
        let task = Arc::new(task);
        self.add_shared(task.clone());
        task
    }

    /// Insert an already shared task into the priority heap.
    pub fn add_shared(&self, task: Arc<Task>) {
        tracing::debug!(task_id = task.id, key = task.priority_key(), "Task added");
        self.pending.push(task);
    }

    /// A router over this scheduler's heap, queues and ledger.
    pub fn router(&self) -> Router {
        Router::new(
            self.pending.clone(),
            self.ledger.clone(),
            self.cpu.tx.clone(),
            self.gpu.tx.clone(),
            self.config.idle_poll,
        )
    }

    /// Spawn the routing loop. Only one router may run per scheduler.
    pub fn schedule_tasks(&self, cancel: CancellationToken) -> Result<()> {
        if self.router_started.swap(true, Ordering::SeqCst) {
            return Err(SchedulerError::AlreadyStarted);
        }
        let handle = tokio::spawn(self.router().run(cancel));
        *lock(&self.router) = Some(handle);
        Ok(())
    }

    /// Spawn worker units on each class's queue.
    pub fn add_workers(&self, cpu_workers: usize, gpu_workers: usize, cancel: CancellationToken) {
        let mut pool = lock(&self.workers);
        for (class, count) in [(ResourceClass::Cpu, cpu_workers), (ResourceClass::Gpu, gpu_workers)] {
            let queue = self.queue(class);
            pool.spawn(class, count, queue.rx.clone(), self.cost.clone(), cancel.clone());
        }
    }

    /// Spawn the configured workers, then the router.
    pub fn start(&self, cancel: CancellationToken) -> Result<()> {
        self.add_workers(self.config.cpu_workers, self.config.gpu_workers, cancel.clone());
        self.schedule_tasks(cancel)
    }

    /// Wait for every worker unit and the router to exit.
    ///
    /// Units only exit on cancellation, so cancel the token first.
    pub async fn wait(&self) {
        let mut handles = lock(&self.workers).take_handles();
        if let Some(router) = lock(&self.router).take() {
            handles.push(router);
        }
        worker::join_all(handles).await;
        tracing::info!(routed = self.ledger.len(), pending = self.pending.len(), "Scheduler stopped");
    }

    /// Snapshot of routed tasks, in the order they reached a queue.
    pub fn tasks(&self) -> Vec<Arc<Task>> {
        self.ledger.snapshot()
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Tasks still waiting in the heap.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Worker units spawned and not yet exited.
    pub fn active_workers(&self) -> usize {
        lock(&self.workers).active_count()
    }

    /// Free slots in a class's queue right now.
    pub fn free_slots(&self, class: ResourceClass) -> usize {
        self.queue(class).free_slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.queue_capacity, 10);
        assert_eq!(config.cpu_workers, 3);
        assert_eq!(config.gpu_workers, 3);
        assert_eq!(config.idle_poll, Duration::from_millis(10));
        assert_eq!(config.ms_per_intensity, 100);
    }

    #[test]
    fn test_scheduler_config_builder() {
        let config = SchedulerConfig::default()
            .with_queue_capacity(2)
            .with_workers(1, 4)
            .with_idle_poll(Duration::from_millis(5))
            .with_ms_per_intensity(10);

        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.cpu_workers, 1);
        assert_eq!(config.gpu_workers, 4);
        assert_eq!(config.idle_poll, Duration::from_millis(5));
        assert_eq!(config.ms_per_intensity, 10);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = Scheduler::new(SchedulerConfig::new(0, 1, 1)).err().unwrap();
        assert!(matches!(err, SchedulerError::InvalidConfig(_)));
    }

    #[test]
    fn test_zero_idle_poll_rejected() {
        let config = SchedulerConfig::default().with_idle_poll(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_workers_allowed() {
        assert!(SchedulerConfig::new(1, 0, 0).validate().is_ok());
    }

    #[test]
    fn test_add_task_goes_to_heap() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let task = scheduler.add_task(Task::new(1, 1.0, 2.0).unwrap());

        assert_eq!(scheduler.pending(), 1);
        assert!(task.destination().is_none());
        assert!(scheduler.tasks().is_empty());
    }

    #[test]
    fn test_free_slots_follow_routing() {
        let scheduler = Scheduler::new(SchedulerConfig::new(2, 0, 0)).unwrap();
        let router = scheduler.router();
        assert_eq!(scheduler.free_slots(ResourceClass::Gpu), 2);

        router.route(Arc::new(Task::new(1, 1.0, 2.0).unwrap()));

        assert_eq!(scheduler.free_slots(ResourceClass::Gpu), 1);
        assert_eq!(scheduler.free_slots(ResourceClass::Cpu), 2);
    }

    #[tokio::test]
    async fn test_schedule_tasks_twice_fails() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let cancel = CancellationToken::new();

        scheduler.schedule_tasks(cancel.clone()).unwrap();
        let err = scheduler.schedule_tasks(cancel.clone()).unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyStarted));

        cancel.cancel();
        scheduler.wait().await;
    }

    #[tokio::test]
    async fn test_start_registers_configured_workers() {
        let scheduler = Scheduler::new(SchedulerConfig::new(4, 2, 3)).unwrap();
        let cancel = CancellationToken::new();

        scheduler.start(cancel.clone()).unwrap();
        assert_eq!(scheduler.active_workers(), 5);

        cancel.cancel();
        scheduler.wait().await;
        assert_eq!(scheduler.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_wait_without_units_returns() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        scheduler.wait().await;
        assert_eq!(scheduler.active_workers(), 0);
    }
}
