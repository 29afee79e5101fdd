//! Resource classes and routing destinations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two execution pools a task can run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    /// Fast-on-CPU-like pool
    Cpu,
    /// Fast-on-GPU-like pool
    Gpu,
}

impl ResourceClass {
    /// Both classes, CPU first.
    pub const ALL: [ResourceClass; 2] = [ResourceClass::Cpu, ResourceClass::Gpu];

    /// The alternate class used for fallback.
    pub fn other(self) -> Self {
        match self {
            Self::Cpu => Self::Gpu,
            Self::Gpu => Self::Cpu,
        }
    }

    /// Short uppercase label used in destinations and reports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Gpu => "GPU",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the router placed a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Admitted to the preferred class's queue
    Preferred(ResourceClass),
    /// Preferred queue was full, admitted to the alternate one
    Fallback { ran_on: ResourceClass, full: ResourceClass },
}

impl Destination {
    /// Build the fallback destination for a task that preferred `preferred`.
    pub fn fallback_from(preferred: ResourceClass) -> Self {
        Self::Fallback {
            ran_on: preferred.other(),
            full: preferred,
        }
    }

    /// The class whose queue actually received the task.
    pub fn class(self) -> ResourceClass {
        match self {
            Self::Preferred(class) => class,
            Self::Fallback { ran_on, .. } => ran_on,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preferred(class) => write!(f, "{}", class),
            Self::Fallback { ran_on, full } => write!(f, "{} ({} full)", ran_on, full),
        }
    }
}
