use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{Category, Priority, Task};

pub const DASHBOARD_PREVIEW_LEN: usize = 5;

/// In-memory view filter over one day's tasks.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskFilter {
    pub show_completed: bool,
    pub category: Option<Category>,
    pub priority: Option<Priority>,
}

impl Default for TaskFilter {
    fn default() -> Self {
        Self {
            show_completed: true,
            category: None,
            priority: None,
        }
    }
}

impl TaskFilter {
    pub fn matches(&self, task: &Task) -> bool {
        (self.show_completed || !task.is_completed)
            && self.category.map_or(true, |category| task.category == category)
            && self.priority.map_or(true, |priority| task.priority == priority)
    }

    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks.into_iter().filter(|task| self.matches(task)).collect()
    }
}

/// completed / total, or 0.0 for an empty list.
pub fn completion_rate(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|task| task.is_completed).count();
    completed as f64 / tasks.len() as f64
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: usize,
    pub completed: usize,
    pub completion_rate: f64,
    pub total_work_minutes: u32,
    pub preview: Vec<Task>,
}

impl DaySummary {
    /// `tasks` is expected in display order; the preview keeps that order.
    pub fn from_tasks(date: NaiveDate, tasks: &[Task]) -> Self {
        Self {
            date,
            total: tasks.len(),
            completed: tasks.iter().filter(|task| task.is_completed).count(),
            completion_rate: completion_rate(tasks),
            total_work_minutes: tasks.iter().map(|task| task.total_work_minutes).sum(),
            preview: tasks.iter().take(DASHBOARD_PREVIEW_LEN).cloned().collect(),
        }
    }
}
