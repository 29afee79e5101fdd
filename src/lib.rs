//! hetsched - priority scheduling across heterogeneous resource classes
//!
//! Tasks carry a CPU-like and a GPU-like intensity. The ones with the biggest
//! gap between the two are routed first, each to the class it runs faster
//! on, falling back to the other class when the preferred queue is full.

pub mod domain;
pub mod error;
pub mod generator;
pub mod report;
pub mod scheduler;

pub use error::{Result, SchedulerError};
