//! Task records flowing through the scheduler.
//!
//! A task carries two intensity scores, one per resource class. The router
//! writes its destination once, the worker that runs it writes its total time
//! once. Both fields are write-once cells so a task can be shared as
//! `Arc<Task>` between the heap, a resource queue and the ledger.

use std::sync::OnceLock;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::resource::{Destination, ResourceClass};
use crate::error::{Result, SchedulerError};

/// Default upper bound (exclusive) for generated intensities.
pub const DEFAULT_MAX_INTENSITY: f64 = 10.0;

/// A unit of work with per-class intensity scores.
#[derive(Debug)]
pub struct Task {
    /// Unique identifier within a run
    pub id: u64,

    /// Display name, derived from the id
    pub name: String,

    /// Cost score on the CPU-like class
    pub cpu_intensity: f64,

    /// Cost score on the GPU-like class
    pub gpu_intensity: f64,

    total_time: OnceLock<Duration>,
    destination: OnceLock<Destination>,
}

impl Task {
    /// Create a task, rejecting negative or non-finite intensities.
    pub fn new(id: u64, cpu_intensity: f64, gpu_intensity: f64) -> Result<Self> {
        for value in [cpu_intensity, gpu_intensity] {
            if !value.is_finite() || value < 0.0 {
                return Err(SchedulerError::InvalidIntensity { id, value });
            }
        }
        Ok(Self::unchecked(id, cpu_intensity, gpu_intensity))
    }

    fn unchecked(id: u64, cpu_intensity: f64, gpu_intensity: f64) -> Self {
        Self {
            id,
            name: format!("Task-{}", id),
            cpu_intensity,
            gpu_intensity,
            total_time: OnceLock::new(),
            destination: OnceLock::new(),
        }
    }

    /// Priority key: |gpu - cpu|. Larger runs sooner.
    pub fn priority_key(&self) -> f64 {
        (self.gpu_intensity - self.cpu_intensity).abs()
    }

    /// GPU iff strictly faster there; ties go to CPU.
    pub fn preferred_class(&self) -> ResourceClass {
        if self.gpu_intensity > self.cpu_intensity {
            ResourceClass::Gpu
        } else {
            ResourceClass::Cpu
        }
    }

    /// Intensity score on the given class.
    pub fn intensity_for(&self, class: ResourceClass) -> f64 {
        match class {
            ResourceClass::Cpu => self.cpu_intensity,
            ResourceClass::Gpu => self.gpu_intensity,
        }
    }

    pub fn destination(&self) -> Option<Destination> {
        self.destination.get().copied()
    }

    pub fn total_time(&self) -> Option<Duration> {
        self.total_time.get().copied()
    }

    /// True once a worker has recorded the total time.
    pub fn is_processed(&self) -> bool {
        self.total_time.get().is_some()
    }

    /// Record where the router placed this task. Fails if already set.
    pub fn set_destination(&self, destination: Destination) -> Result<()> {
        self.destination
            .set(destination)
            .map_err(|_| SchedulerError::AlreadySet {
                id: self.id,
                field: "destination",
            })
    }

    /// Record the simulated processing time. Fails if already set.
    pub fn record_total_time(&self, total_time: Duration) -> Result<()> {
        self.total_time
            .set(total_time)
            .map_err(|_| SchedulerError::AlreadySet {
                id: self.id,
                field: "total time",
            })
    }
}

/// Synthesizes tasks with random intensities from an injected source.
#[derive(Debug)]
pub struct TaskFactory<R: Rng = StdRng> {
    rng: R,
    max_intensity: f64,
}

impl TaskFactory<StdRng> {
    /// Deterministic factory seeded from `seed`.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            max_intensity: DEFAULT_MAX_INTENSITY,
        }
    }

    /// Factory seeded from the OS entropy source.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
            max_intensity: DEFAULT_MAX_INTENSITY,
        }
    }
}

impl<R: Rng> TaskFactory<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            max_intensity: DEFAULT_MAX_INTENSITY,
        }
    }

    /// Set the exclusive upper bound for intensities.
    pub fn with_max_intensity(mut self, max_intensity: f64) -> Result<Self> {
        if !max_intensity.is_finite() || max_intensity <= 0.0 {
            return Err(SchedulerError::InvalidConfig(format!(
                "max_intensity must be positive and finite, got {}",
                max_intensity
            )));
        }
        self.max_intensity = max_intensity;
        Ok(self)
    }

    pub fn max_intensity(&self) -> f64 {
        self.max_intensity
    }

    /// Create a task with intensities drawn from `[0, max_intensity)`.
    pub fn create_task(&mut self, id: u64) -> Task {
        let cpu = self.rng.random::<f64>() * self.max_intensity;
        let gpu = self.rng.random::<f64>() * self.max_intensity;
        Task::unchecked(id, cpu, gpu)
    }

    /// Draw a value from `[0, upper)`; zero when `upper` is zero.
    pub(crate) fn jitter_ms(&mut self, upper: u64) -> u64 {
        if upper == 0 { 0 } else { self.rng.random_range(0..upper) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_new_derives_name() {
        let task = Task::new(42, 1.0, 2.0).unwrap();
        assert_eq!(task.id, 42);
        assert_eq!(task.name, "Task-42");
        assert!(task.destination().is_none());
        assert!(task.total_time().is_none());
        assert!(!task.is_processed());
    }

    #[test]
    fn test_task_new_rejects_negative() {
        let err = Task::new(1, -0.5, 2.0).unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidIntensity { id: 1, .. }));
    }

    #[test]
    fn test_task_new_rejects_non_finite() {
        assert!(Task::new(1, f64::NAN, 2.0).is_err());
        assert!(Task::new(1, 1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_priority_key_is_absolute_difference() {
        assert_eq!(Task::new(1, 2.0, 7.0).unwrap().priority_key(), 5.0);
        assert_eq!(Task::new(2, 7.0, 2.0).unwrap().priority_key(), 5.0);
        assert_eq!(Task::new(3, 4.0, 4.0).unwrap().priority_key(), 0.0);
    }

    #[test]
    fn test_preferred_class() {
        assert_eq!(Task::new(1, 1.0, 2.0).unwrap().preferred_class(), ResourceClass::Gpu);
        assert_eq!(Task::new(2, 2.0, 1.0).unwrap().preferred_class(), ResourceClass::Cpu);
    }

    #[test]
    fn test_preferred_class_tie_goes_to_cpu() {
        assert_eq!(Task::new(1, 3.0, 3.0).unwrap().preferred_class(), ResourceClass::Cpu);
    }

    #[test]
    fn test_intensity_for() {
        let task = Task::new(1, 1.5, 8.25).unwrap();
        assert_eq!(task.intensity_for(ResourceClass::Cpu), 1.5);
        assert_eq!(task.intensity_for(ResourceClass::Gpu), 8.25);
    }

    #[test]
    fn test_destination_is_write_once() {
        let task = Task::new(1, 1.0, 2.0).unwrap();
        task.set_destination(Destination::Preferred(ResourceClass::Gpu)).unwrap();
        let err = task
            .set_destination(Destination::fallback_from(ResourceClass::Gpu))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadySet { field: "destination", .. }));
        assert_eq!(task.destination(), Some(Destination::Preferred(ResourceClass::Gpu)));
    }

    #[test]
    fn test_total_time_is_write_once() {
        let task = Task::new(1, 1.0, 2.0).unwrap();
        task.record_total_time(Duration::from_millis(100)).unwrap();
        assert!(task.record_total_time(Duration::from_millis(200)).is_err());
        assert_eq!(task.total_time(), Some(Duration::from_millis(100)));
        assert!(task.is_processed());
    }

    #[test]
    fn test_factory_is_deterministic_for_seed() {
        let mut a = TaskFactory::seeded(7);
        let mut b = TaskFactory::seeded(7);
        for id in 1..=10 {
            let ta = a.create_task(id);
            let tb = b.create_task(id);
            assert_eq!(ta.cpu_intensity, tb.cpu_intensity);
            assert_eq!(ta.gpu_intensity, tb.gpu_intensity);
        }
    }

    #[test]
    fn test_factory_respects_range() {
        let mut factory = TaskFactory::seeded(1).with_max_intensity(2.5).unwrap();
        for id in 1..=200 {
            let task = factory.create_task(id);
            assert!((0.0..2.5).contains(&task.cpu_intensity));
            assert!((0.0..2.5).contains(&task.gpu_intensity));
        }
    }

    #[test]
    fn test_factory_rejects_bad_max_intensity() {
        assert!(TaskFactory::seeded(1).with_max_intensity(0.0).is_err());
        assert!(TaskFactory::seeded(1).with_max_intensity(f64::NAN).is_err());
    }

    #[test]
    fn test_jitter_zero_upper() {
        let mut factory = TaskFactory::seeded(1);
        assert_eq!(factory.jitter_ms(0), 0);
        assert!(factory.jitter_ms(100) < 100);
    }
}
