//! Domain types for hetsched
//!
//! - Task: identity, intensity scores and the write-once outcome fields
//! - TaskFactory: synthesizes tasks from an injected random source
//! - ResourceClass / Destination: the two pools and where a task ended up

pub mod resource;
pub mod task;

pub use resource::{Destination, ResourceClass};
pub use task::{DEFAULT_MAX_INTENSITY, Task, TaskFactory};
