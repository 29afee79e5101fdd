//! Reporting over a ledger snapshot.
//!
//! Everything here is a pure function of the tasks passed in, so rendering
//! the same snapshot twice gives the same output.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::domain::Task;
use crate::error::Result;

const HEADERS: [&str; 6] = [
    "Task ID",
    "Task Name",
    "CPU Intensity",
    "GPU Intensity",
    "Destination",
    "Total Time",
];

/// One reporting row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: u64,
    pub name: String,
    pub cpu_intensity: String,
    pub gpu_intensity: String,
    pub destination: String,
    /// Milliseconds; `None` if no worker finished it
    pub total_time_ms: Option<u64>,
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            cpu_intensity: format!("{:.2}", task.cpu_intensity),
            gpu_intensity: format!("{:.2}", task.gpu_intensity),
            destination: task.destination().map(|d| d.to_string()).unwrap_or_default(),
            total_time_ms: task.total_time().map(|t| t.as_millis() as u64),
        }
    }
}

impl TaskRecord {
    fn cells(&self) -> [String; 6] {
        [
            self.id.to_string(),
            self.name.clone(),
            self.cpu_intensity.clone(),
            self.gpu_intensity.clone(),
            self.destination.clone(),
            self.total_time_ms.map(|ms| format!("{}ms", ms)).unwrap_or_else(|| "-".to_string()),
        ]
    }
}

pub fn records(tasks: &[Arc<Task>]) -> Vec<TaskRecord> {
    tasks.iter().map(|t| TaskRecord::from(t.as_ref())).collect()
}

/// Render tasks as a bordered, column-aligned text table.
pub fn render_table(tasks: &[Arc<Task>]) -> String {
    let rows: Vec<[String; 6]> = records(tasks).iter().map(TaskRecord::cells).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }

    let border = widths
        .iter()
        .map(|w| "-".repeat(w + 2))
        .collect::<Vec<_>>()
        .join("+");
    let border = format!("+{}+\n", border);

    let line = |cells: &[String]| {
        let inner = cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!(" {:<w$} ", cell, w = *w))
            .collect::<Vec<_>>()
            .join("|");
        format!("|{}|\n", inner)
    };

    let mut out = String::new();
    out.push_str(&border);
    out.push_str(&line(&HEADERS.map(String::from)[..]));
    out.push_str(&border);
    for row in &rows {
        out.push_str(&line(&row[..]));
    }
    out.push_str(&border);
    out
}

/// Count of tasks per destination label.
pub fn summary(tasks: &[Arc<Task>]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for task in tasks {
        if let Some(destination) = task.destination() {
            *counts.entry(destination.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Pretty JSON array of task records.
pub fn to_json(tasks: &[Arc<Task>]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&records(tasks))?)
}
