use chrono::{Days, NaiveDate};

use crate::{
    db::models::{MoveDirection, NewTask, Task, TaskUpdate},
    session::require_user,
    tasks::{DaySummary, TaskFilter},
    AppState,
};

const ENABLE_LOGS: bool = true;

fn report(action: &str, err: impl std::fmt::Display) -> String {
    let message = err.to_string();
    crate::log_error!("{} failed: {}", action, message);
    message
}

pub async fn list_tasks(
    state: &AppState,
    date: NaiveDate,
    filter: TaskFilter,
) -> Result<Vec<Task>, String> {
    let ctx = require_user(state).await?;
    let tasks = state
        .db
        .get_tasks_by_date(&ctx.user.id, date)
        .await
        .map_err(|e| report("load tasks", e))?;
    Ok(filter.apply(tasks))
}

pub async fn get_task(state: &AppState, task_id: String) -> Result<Task, String> {
    let ctx = require_user(state).await?;
    state
        .db
        .get_task(&ctx.user.id, &task_id)
        .await
        .map_err(|e| report("load task", e))
}

pub async fn add_task(state: &AppState, new_task: NewTask) -> Result<Task, String> {
    let ctx = require_user(state).await?;
    state
        .db
        .create_task(&ctx.user.id, new_task)
        .await
        .map_err(|e| report("add task", e))
}

pub async fn edit_task(state: &AppState, task_id: String, update: TaskUpdate) -> Result<Task, String> {
    let ctx = require_user(state).await?;
    state
        .db
        .update_task(&ctx.user.id, &task_id, update)
        .await
        .map_err(|e| report("edit task", e))
}

pub async fn toggle_task(state: &AppState, task_id: String) -> Result<Task, String> {
    let ctx = require_user(state).await?;
    state
        .db
        .toggle_task_completion(&ctx.user.id, &task_id)
        .await
        .map_err(|e| report("toggle task", e))
}

/// Delete a task. If the timer was crediting it, the selection is cleared.
pub async fn delete_task(state: &AppState, task_id: String) -> Result<(), String> {
    let ctx = require_user(state).await?;
    state
        .db
        .delete_task(&ctx.user.id, &task_id)
        .await
        .map_err(|e| report("delete task", e))?;

    if ctx.timer.get_snapshot().await.task_id.as_deref() == Some(task_id.as_str()) {
        ctx.timer.select_task(None).await;
    }
    Ok(())
}

/// Returns `false` when the task is already first (up) or last (down).
pub async fn move_task(
    state: &AppState,
    task_id: String,
    direction: MoveDirection,
) -> Result<bool, String> {
    let ctx = require_user(state).await?;
    let task = state
        .db
        .get_task(&ctx.user.id, &task_id)
        .await
        .map_err(|e| report("move task", e))?;
    let moved = state
        .db
        .move_task(&ctx.user.id, task.task_date, &task_id, direction)
        .await
        .map_err(|e| report("move task", e))?;
    if !moved {
        crate::log_debug!("Task {} has no neighbour {:?}", task_id, direction);
    }
    Ok(moved)
}

/// Incomplete tasks from the day before `today`.
pub async fn pending_carryover(state: &AppState, today: NaiveDate) -> Result<Vec<Task>, String> {
    let ctx = require_user(state).await?;
    let Some(yesterday) = today.checked_sub_days(Days::new(1)) else {
        return Ok(Vec::new());
    };
    state
        .db
        .get_incomplete_tasks(&ctx.user.id, yesterday)
        .await
        .map_err(|e| report("load carryover candidates", e))
}

/// Move the given tasks to `today`. An empty list carries over every pending
/// task from yesterday.
pub async fn carry_over(
    state: &AppState,
    task_ids: Vec<String>,
    today: NaiveDate,
) -> Result<usize, String> {
    let ctx = require_user(state).await?;
    let task_ids = if task_ids.is_empty() {
        pending_carryover(state, today)
            .await?
            .into_iter()
            .map(|task| task.id)
            .collect()
    } else {
        task_ids
    };
    if task_ids.is_empty() {
        return Ok(0);
    }

    state
        .db
        .carryover_tasks(&ctx.user.id, &task_ids, today)
        .await
        .map_err(|e| report("carry over tasks", e))
}

pub async fn get_day_summary(state: &AppState, date: NaiveDate) -> Result<DaySummary, String> {
    let ctx = require_user(state).await?;
    let tasks = state
        .db
        .get_tasks_by_date(&ctx.user.id, date)
        .await
        .map_err(|e| report("load dashboard", e))?;
    Ok(DaySummary::from_tasks(date, &tasks))
}
