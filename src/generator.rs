//! Synthetic task generator.
//!
//! Produces tasks with sequential ids and random intensities, and feeds them
//! to a scheduler with a random inter-arrival delay.

use std::time::Duration;

use rand::Rng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use crate::domain::{Task, TaskFactory};
use crate::scheduler::Scheduler;

/// Default upper bound (exclusive) for the gap between submissions.
pub const DEFAULT_MAX_INTERARRIVAL_MS: u64 = 100;

/// Generates tasks and submits them at a randomized cadence.
#[derive(Debug)]
pub struct TaskGenerator<R: Rng = StdRng> {
    factory: TaskFactory<R>,
    next_id: u64,
    max_interarrival_ms: u64,
}

impl<R: Rng> TaskGenerator<R> {
    /// Generator starting at id 1.
    pub fn new(factory: TaskFactory<R>) -> Self {
        Self {
            factory,
            next_id: 1,
            max_interarrival_ms: DEFAULT_MAX_INTERARRIVAL_MS,
        }
    }

    /// Upper bound (exclusive) for the random gap; zero submits back to back.
    pub fn with_max_interarrival_ms(mut self, ms: u64) -> Self {
        self.max_interarrival_ms = ms;
        self
    }

    /// Next task in sequence.
    pub fn next_task(&mut self) -> Task {
        let id = self.next_id;
        self.next_id += 1;
        self.factory.create_task(id)
    }

    fn next_gap(&mut self) -> Duration {
        Duration::from_millis(self.factory.jitter_ms(self.max_interarrival_ms))
    }

    /// Submit `count` tasks, sleeping a random gap after each.
    ///
    /// Stops early if `cancel` fires during a gap. Returns how many were
    /// submitted.
    pub async fn submit_all(&mut self, scheduler: &Scheduler, count: usize, cancel: &CancellationToken) -> usize {
        let mut submitted = 0;

        while submitted < count && !cancel.is_cancelled() {
            let task = self.next_task();
            tracing::debug!(
                task_id = task.id,
                cpu = task.cpu_intensity,
                gpu = task.gpu_intensity,
                "Generated task"
            );
            scheduler.add_task(task);
            submitted += 1;

            let gap = self.next_gap();
            if gap.is_zero() {
                continue;
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(gap) => {}
            }
        }

        tracing::info!(submitted, "Generator finished");
        submitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerConfig;

    #[test]
    fn test_sequential_ids() {
        let mut generator = TaskGenerator::new(TaskFactory::seeded(3));
        let ids: Vec<u64> = (0..5).map(|_| generator.next_task().id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_same_seed_same_tasks() {
        let mut a = TaskGenerator::new(TaskFactory::seeded(11));
        let mut b = TaskGenerator::new(TaskFactory::seeded(11));
        for _ in 0..5 {
            let (ta, tb) = (a.next_task(), b.next_task());
            assert_eq!(ta.name, tb.name);
            assert_eq!(ta.cpu_intensity, tb.cpu_intensity);
            assert_eq!(ta.gpu_intensity, tb.gpu_intensity);
        }
    }

    #[tokio::test]
    async fn test_submit_all_fills_heap() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let mut generator = TaskGenerator::new(TaskFactory::seeded(5)).with_max_interarrival_ms(0);

        let submitted = generator.submit_all(&scheduler, 8, &CancellationToken::new()).await;

        assert_eq!(submitted, 8);
        assert_eq!(scheduler.pending(), 8);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_all_stops_on_cancel() {
        let scheduler = Scheduler::new(SchedulerConfig::default()).unwrap();
        let mut generator = TaskGenerator::new(TaskFactory::seeded(5)).with_max_interarrival_ms(1_000);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let submitted = generator.submit_all(&scheduler, 8, &cancel).await;

        assert_eq!(submitted, 0);
        assert_eq!(scheduler.pending(), 0);
    }
}
