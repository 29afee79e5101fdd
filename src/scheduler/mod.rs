//! Scheduler module: priority admission, dual-queue routing and workers.
//!
//! This module provides:
//! - **TaskHeap / PendingQueue**: max-heap of pending tasks keyed by
//!   |gpu - cpu| intensity, behind one lock, with a wake-on-push signal.
//! - **Router**: pops the highest-priority task and places it on its
//!   preferred class's bounded queue, else the alternate one, else back in
//!   the heap.
//! - **WorkerPool**: fixed worker units per class draining that class's queue
//!   and simulating the work with a sleep.
//! - **Ledger**: append-only record of routed tasks, for reporting.
//! - **Scheduler**: facade wiring the above together.
//!
//! # Example
//!
//! ```ignore
//! use hetsched::scheduler::{Scheduler, SchedulerConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! let scheduler = Scheduler::new(SchedulerConfig::new(10, 3, 3))?;
//! let cancel = CancellationToken::new();
//! scheduler.start(cancel.clone())?;
//! scheduler.add_task(Task::new(1, 2.0, 7.5)?);
//! cancel.cancel();
//! scheduler.wait().await;
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

mod heap;
mod ledger;
mod manager;
mod router;
mod worker;

pub use heap::{PendingQueue, TaskHeap};
pub use ledger::Ledger;
pub use manager::{Scheduler, SchedulerConfig};
pub use router::{RouteOutcome, Router, TaskSender};
pub use worker::{CostModel, DEFAULT_MS_PER_INTENSITY, LinearCost, TaskReceiver, WorkerPool, join_all};

/// Lock a std mutex, recovering the guard if a holder panicked.
///
/// Every guarded value here (heap, ledger, handle lists) stays consistent
/// between individual operations, so a poisoned lock is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
