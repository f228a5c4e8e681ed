//! Daily task data models.
//!
//! A task belongs to exactly one partition: the (owner, calendar date) pair.
//! `display_order` only means something inside that partition, and gaps or
//! ties between values are tolerated.

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const MAX_TASKS_PER_DAY: i64 = 20;
pub const MAX_TASK_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Exercise,
    Study,
    Health,
    SelfImprovement,
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Exercise,
        Category::Study,
        Category::Health,
        Category::SelfImprovement,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Exercise => "exercise",
            Category::Study => "study",
            Category::Health => "health",
            Category::SelfImprovement => "self_improvement",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| {
                format!(
                    "unknown category '{value}' (expected one of: exercise, study, health, self_improvement, other)"
                )
            })
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" | "h" => Ok(Priority::High),
            "medium" | "med" | "m" => Ok(Priority::Medium),
            "low" | "l" => Ok(Priority::Low),
            _ => Err(format!(
                "unknown priority '{value}' (expected high, medium or low)"
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub task_date: NaiveDate,
    pub display_order: i64,
    pub total_work_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task. The display order is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub priority: Priority,
    pub task_date: NaiveDate,
}

/// Full replacement of the user-editable fields of a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

impl NewTask {
    pub fn normalized(self) -> AppResult<Self> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            description: normalize_description(self.description),
            ..self
        })
    }
}

impl TaskUpdate {
    pub fn normalized(self) -> AppResult<Self> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            description: normalize_description(self.description),
            ..self
        })
    }
}

fn normalize_title(title: &str) -> AppResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(AppError::validation("task title must not be empty"));
    }
    if title.chars().count() > MAX_TASK_TITLE_LENGTH {
        return Err(AppError::validation(format!(
            "task title must be at most {MAX_TASK_TITLE_LENGTH} characters"
        )));
    }
    Ok(title.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    fn new_task(title: &str, description: Option<&str>) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: description.map(str::to_string),
            category: Category::Study,
            priority: Priority::High,
            task_date: NaiveDate::from_ymd_opt(2026, 10, 16).unwrap(),
        }
    }

    #[test]
    fn normalizes_title_and_blank_description() {
        let task = new_task("  read chapter 3  ", Some("   ")).normalized().unwrap();
        assert_eq!(task.title, "read chapter 3");
        assert_eq!(task.description, None);
    }

    #[test]
    fn rejects_empty_and_overlong_titles() {
        assert!(matches!(
            new_task("   ", None).normalized(),
            Err(AppError::Validation(_))
        ));
        let long = "x".repeat(MAX_TASK_TITLE_LENGTH + 1);
        assert!(matches!(
            new_task(&long, None).normalized(),
            Err(AppError::Validation(_))
        ));
        let exact = "x".repeat(MAX_TASK_TITLE_LENGTH);
        assert!(new_task(&exact, None).normalized().is_ok());
    }

    #[test]
    fn parses_categories_and_priorities() {
        assert_eq!("Self-Improvement".parse::<Category>(), Ok(Category::SelfImprovement));
        assert_eq!("exercise".parse::<Category>(), Ok(Category::Exercise));
        assert!("gardening".parse::<Category>().is_err());
        assert_eq!("H".parse::<Priority>(), Ok(Priority::High));
        assert_eq!("low".parse::<Priority>(), Ok(Priority::Low));
        assert!("urgent".parse::<Priority>().is_err());
    }
}
