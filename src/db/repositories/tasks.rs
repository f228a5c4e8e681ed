use anyhow::Result;
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::{
    db::{
        connection::Database,
        helpers::{
            format_date, format_timestamp, parse_category, parse_date, parse_datetime,
            parse_optional_datetime, parse_priority, stored_now, to_u32,
        },
        models::{task::MAX_TASKS_PER_DAY, MoveDirection, NewTask, Task, TaskUpdate},
    },
    error::{AppError, AppResult},
};

const ENABLE_LOGS: bool = true;

const TASK_COLUMNS: &str = "id, user_id, title, description, category, priority, is_completed, completed_at, task_date, display_order, total_work_minutes, created_at, updated_at";

fn row_to_task(row: &Row) -> Result<Task> {
    let category: String = row.get("category")?;
    let priority: String = row.get("priority")?;
    let completed_at: Option<String> = row.get("completed_at")?;
    let task_date: String = row.get("task_date")?;
    let total_work_minutes: i64 = row.get("total_work_minutes")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Task {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: parse_category(&category)?,
        priority: parse_priority(&priority)?,
        is_completed: row.get("is_completed")?,
        completed_at: parse_optional_datetime(completed_at, "completed_at")?,
        task_date: parse_date(&task_date, "task_date")?,
        display_order: row.get("display_order")?,
        total_work_minutes: to_u32(total_work_minutes, "total_work_minutes")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

fn query_tasks(conn: &Connection, sql: &str, params: impl rusqlite::Params) -> Result<Vec<Task>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params)?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(row_to_task(row)?);
    }
    Ok(tasks)
}

fn fetch_owned_task(conn: &Connection, task_id: &str, user_id: &str) -> Result<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM daily_tasks WHERE id = ?1 AND user_id = ?2"
    ))?;
    let mut rows = stmt.query(params![task_id, user_id])?;
    match rows.next()? {
        Some(row) => Ok(Some(row_to_task(row)?)),
        None => Ok(None),
    }
}

fn task_not_found(task_id: &str) -> anyhow::Error {
    AppError::not_found(format!("task {task_id}")).into()
}

impl Database {
    /// Tasks of one partition in display order; ties fall back to creation time.
    pub async fn get_tasks_by_date(&self, user_id: &str, task_date: NaiveDate) -> AppResult<Vec<Task>> {
        let user_id = user_id.to_string();
        let tasks = self
            .execute(move |conn| {
                query_tasks(
                    conn,
                    &format!(
                        "SELECT {TASK_COLUMNS} FROM daily_tasks
                         WHERE user_id = ?1 AND task_date = ?2
                         ORDER BY display_order ASC, created_at ASC"
                    ),
                    params![user_id, format_date(&task_date)],
                )
            })
            .await?;
        Ok(tasks)
    }

    pub async fn get_incomplete_tasks(&self, user_id: &str, task_date: NaiveDate) -> AppResult<Vec<Task>> {
        let user_id = user_id.to_string();
        let tasks = self
            .execute(move |conn| {
                query_tasks(
                    conn,
                    &format!(
                        "SELECT {TASK_COLUMNS} FROM daily_tasks
                         WHERE user_id = ?1 AND task_date = ?2 AND is_completed = 0
                         ORDER BY display_order ASC, created_at ASC"
                    ),
                    params![user_id, format_date(&task_date)],
                )
            })
            .await?;
        Ok(tasks)
    }

    pub async fn get_task(&self, user_id: &str, task_id: &str) -> AppResult<Task> {
        let user_id = user_id.to_string();
        let task_id = task_id.to_string();
        let task = self
            .execute(move |conn| {
                fetch_owned_task(conn, &task_id, &user_id)?.ok_or_else(|| task_not_found(&task_id))
            })
            .await?;
        Ok(task)
    }

    /// Insert a task at the end of its partition (max order + 1, or 0 when empty).
    pub async fn create_task(&self, user_id: &str, new_task: NewTask) -> AppResult<Task> {
        let new_task = new_task.normalized()?;
        let user_id = user_id.to_string();

        let task = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let task_date = format_date(&new_task.task_date);

                // Cap and order are computed in the same DB task as the insert.
                let (count, max_order): (i64, Option<i64>) = tx.query_row(
                    "SELECT COUNT(*), MAX(display_order) FROM daily_tasks
                     WHERE user_id = ?1 AND task_date = ?2",
                    params![user_id, task_date],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                if count >= MAX_TASKS_PER_DAY {
                    return Err(AppError::validation(format!(
                        "a day can hold at most {MAX_TASKS_PER_DAY} tasks"
                    ))
                    .into());
                }

                let now = stored_now();
                let task = Task {
                    id: Uuid::new_v4().to_string(),
                    user_id: user_id.clone(),
                    title: new_task.title,
                    description: new_task.description,
                    category: new_task.category,
                    priority: new_task.priority,
                    is_completed: false,
                    completed_at: None,
                    task_date: new_task.task_date,
                    display_order: max_order.map_or(0, |order| order + 1),
                    total_work_minutes: 0,
                    created_at: now,
                    updated_at: now,
                };

                tx.execute(
                    "INSERT INTO daily_tasks (id, user_id, title, description, category, priority, is_completed, completed_at, task_date, display_order, total_work_minutes, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?8, 0, ?9, ?10)",
                    params![
                        task.id,
                        task.user_id,
                        task.title,
                        task.description,
                        task.category.as_str(),
                        task.priority.as_str(),
                        task_date,
                        task.display_order,
                        format_timestamp(&task.created_at),
                        format_timestamp(&task.updated_at),
                    ],
                )?;
                tx.commit()?;
                Ok(task)
            })
            .await?;

        crate::log_info!("Created task {} (order {})", task.id, task.display_order);
        Ok(task)
    }

    pub async fn update_task(&self, user_id: &str, task_id: &str, update: TaskUpdate) -> AppResult<Task> {
        let update = update.normalized()?;
        let user_id = user_id.to_string();
        let task_id = task_id.to_string();

        let task = self
            .execute(move |conn| {
                let rows_affected = conn.execute(
                    "UPDATE daily_tasks
                     SET title = ?1,
                         description = ?2,
                         category = ?3,
                         priority = ?4,
                         updated_at = ?5
                     WHERE id = ?6 AND user_id = ?7",
                    params![
                        update.title,
                        update.description,
                        update.category.as_str(),
                        update.priority.as_str(),
                        format_timestamp(&Utc::now()),
                        task_id,
                        user_id,
                    ],
                )?;
                if rows_affected == 0 {
                    return Err(task_not_found(&task_id));
                }
                fetch_owned_task(conn, &task_id, &user_id)?.ok_or_else(|| task_not_found(&task_id))
            })
            .await?;

        crate::log_info!("Updated task {}", task.id);
        Ok(task)
    }

    pub async fn delete_task(&self, user_id: &str, task_id: &str) -> AppResult<()> {
        let user_id = user_id.to_string();
        let task_id = task_id.to_string();
        let deleted_id = task_id.clone();

        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "DELETE FROM daily_tasks WHERE id = ?1 AND user_id = ?2",
                params![task_id, user_id],
            )?;
            if rows_affected == 0 {
                return Err(task_not_found(&task_id));
            }
            Ok(())
        })
        .await?;

        crate::log_info!("Deleted task {}", deleted_id);
        Ok(())
    }

    /// Flip completion. `completed_at` is stamped on completion and cleared on undo.
    pub async fn toggle_task_completion(&self, user_id: &str, task_id: &str) -> AppResult<Task> {
        let user_id = user_id.to_string();
        let task_id = task_id.to_string();

        let task = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let current: Option<bool> = tx
                    .query_row(
                        "SELECT is_completed FROM daily_tasks WHERE id = ?1 AND user_id = ?2",
                        params![task_id, user_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(current) = current else {
                    return Err(task_not_found(&task_id));
                };

                let completed = !current;
                let now = format_timestamp(&Utc::now());
                tx.execute(
                    "UPDATE daily_tasks
                     SET is_completed = ?1,
                         completed_at = ?2,
                         updated_at = ?3
                     WHERE id = ?4",
                    params![completed, completed.then(|| now.clone()), now, task_id],
                )?;
                let task = fetch_owned_task(&tx, &task_id, &user_id)?
                    .ok_or_else(|| task_not_found(&task_id))?;
                tx.commit()?;
                Ok(task)
            })
            .await?;

        crate::log_info!("Toggled task {}: completed={}", task.id, task.is_completed);
        Ok(task)
    }

    /// Swap display order with the nearest neighbour above or below in the
    /// task's partition. Returns `false` when there is no neighbour.
    ///
    /// The neighbour lookup and both writes share one transaction on the DB
    /// thread, so no other writer can interleave between the two updates.
    pub async fn move_task(
        &self,
        user_id: &str,
        task_date: NaiveDate,
        task_id: &str,
        direction: MoveDirection,
    ) -> AppResult<bool> {
        let user_id = user_id.to_string();
        let task_id = task_id.to_string();
        let moved_id = task_id.clone();

        let moved = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let task_date = format_date(&task_date);

                let current_order: Option<i64> = tx
                    .query_row(
                        "SELECT display_order FROM daily_tasks
                         WHERE id = ?1 AND user_id = ?2 AND task_date = ?3",
                        params![task_id, user_id, task_date],
                        |row| row.get(0),
                    )
                    .optional()?;
                let Some(current_order) = current_order else {
                    return Err(task_not_found(&task_id));
                };

                let neighbour_sql = match direction {
                    MoveDirection::Up => {
                        "SELECT id, display_order FROM daily_tasks
                         WHERE user_id = ?1 AND task_date = ?2 AND display_order < ?3
                         ORDER BY display_order DESC
                         LIMIT 1"
                    }
                    MoveDirection::Down => {
                        "SELECT id, display_order FROM daily_tasks
                         WHERE user_id = ?1 AND task_date = ?2 AND display_order > ?3
                         ORDER BY display_order ASC
                         LIMIT 1"
                    }
                };
                let neighbour: Option<(String, i64)> = tx
                    .query_row(neighbour_sql, params![user_id, task_date, current_order], |row| {
                        Ok((row.get(0)?, row.get(1)?))
                    })
                    .optional()?;
                let Some((neighbour_id, neighbour_order)) = neighbour else {
                    return Ok(false);
                };

                tx.execute(
                    "UPDATE daily_tasks SET display_order = ?1 WHERE id = ?2",
                    params![neighbour_order, task_id],
                )?;
                tx.execute(
                    "UPDATE daily_tasks SET display_order = ?1 WHERE id = ?2",
                    params![current_order, neighbour_id],
                )?;
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if moved {
            crate::log_info!("Moved task {} {:?}", moved_id, direction);
        }
        Ok(moved)
    }

    /// Move tasks to `new_date`. Only the date (and `updated_at`) changes:
    /// order, completion and work time are carried as they are.
    pub async fn carryover_tasks(
        &self,
        user_id: &str,
        task_ids: &[String],
        new_date: NaiveDate,
    ) -> AppResult<usize> {
        let user_id = user_id.to_string();
        let task_ids = task_ids.to_vec();

        let moved = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let now = format_timestamp(&Utc::now());
                let new_date = format_date(&new_date);
                let mut moved = 0usize;
                {
                    let mut stmt = tx.prepare(
                        "UPDATE daily_tasks
                         SET task_date = ?1,
                             updated_at = ?2
                         WHERE id = ?3 AND user_id = ?4",
                    )?;
                    for task_id in &task_ids {
                        moved += stmt.execute(params![new_date, now, task_id, user_id])?;
                    }
                }
                tx.commit()?;
                Ok(moved)
            })
            .await?;

        crate::log_info!("Carried over {} tasks to {}", moved, new_date);
        Ok(moved)
    }

    /// Add worked minutes to a task's running total.
    pub async fn update_task_work_time(&self, task_id: &str, minutes: u32) -> AppResult<()> {
        let task_id = task_id.to_string();
        let updated_id = task_id.clone();

        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE daily_tasks
                 SET total_work_minutes = total_work_minutes + ?1
                 WHERE id = ?2",
                params![i64::from(minutes), task_id],
            )?;
            if rows_affected == 0 {
                return Err(task_not_found(&task_id));
            }
            Ok(())
        })
        .await?;

        crate::log_info!("Updated task {} work time: +{} min", updated_id, minutes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        models::{Category, Priority},
        test_support::{insert_user, test_db},
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    fn new_task(title: &str, task_date: NaiveDate) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            category: Category::Study,
            priority: Priority::Medium,
            task_date,
        }
    }

    async fn orders(db: &Database, user_id: &str, date: NaiveDate) -> Vec<(String, i64)> {
        db.get_tasks_by_date(user_id, date)
            .await
            .unwrap()
            .into_iter()
            .map(|task| (task.title, task.display_order))
            .collect()
    }

    #[tokio::test]
    async fn create_assigns_increasing_display_order() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;

        let first = db.create_task(&user, new_task("first", day(16))).await.unwrap();
        let second = db.create_task(&user, new_task("second", day(16))).await.unwrap();
        let other_day = db.create_task(&user, new_task("other", day(17))).await.unwrap();

        assert_eq!(first.display_order, 0);
        assert_eq!(second.display_order, 1);
        assert_eq!(other_day.display_order, 0);
        assert_eq!(first.total_work_minutes, 0);
        assert!(!first.is_completed);

        db.delete_task(&user, &first.id).await.unwrap();
        let third = db.create_task(&user, new_task("third", day(16))).await.unwrap();
        assert_eq!(third.display_order, 2);
    }

    #[tokio::test]
    async fn created_task_matches_what_is_stored() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let created = db.create_task(&user, new_task("exact", day(16))).await.unwrap();

        let stored = db.get_task(&user, &created.id).await.unwrap();
        assert_eq!(stored, created);
        assert_eq!(stored.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[tokio::test]
    async fn create_enforces_daily_cap() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        for i in 0..MAX_TASKS_PER_DAY {
            db.create_task(&user, new_task(&format!("task {i}"), day(16)))
                .await
                .unwrap();
        }
        let overflow = db.create_task(&user, new_task("one too many", day(16))).await;
        assert!(matches!(overflow, Err(AppError::Validation(_))));
        assert!(db.create_task(&user, new_task("tomorrow", day(17))).await.is_ok());
    }

    #[tokio::test]
    async fn tasks_are_scoped_to_their_owner() {
        let db = test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let task = db.create_task(&alice, new_task("private", day(16))).await.unwrap();

        assert!(db.get_tasks_by_date(&bob, day(16)).await.unwrap().is_empty());
        assert!(matches!(db.get_task(&bob, &task.id).await, Err(AppError::NotFound(_))));
        assert!(matches!(db.delete_task(&bob, &task.id).await, Err(AppError::NotFound(_))));
        assert!(db.get_task(&alice, &task.id).await.is_ok());
    }

    #[tokio::test]
    async fn update_replaces_editable_fields() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let task = db.create_task(&user, new_task("draft", day(16))).await.unwrap();

        let updated = db
            .update_task(
                &user,
                &task.id,
                TaskUpdate {
                    title: " final ".into(),
                    description: Some("with notes".into()),
                    category: Category::Exercise,
                    priority: Priority::High,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.title, "final");
        assert_eq!(updated.description.as_deref(), Some("with notes"));
        assert_eq!(updated.category, Category::Exercise);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.display_order, task.display_order);
        assert!(updated.updated_at >= task.updated_at);

        let missing = db
            .update_task(
                &user,
                "missing",
                TaskUpdate {
                    title: "x".into(),
                    description: None,
                    category: Category::Other,
                    priority: Priority::Low,
                },
            )
            .await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn toggle_sets_and_clears_completion_timestamp() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let task = db.create_task(&user, new_task("stretch", day(16))).await.unwrap();

        let done = db.toggle_task_completion(&user, &task.id).await.unwrap();
        assert!(done.is_completed);
        assert!(done.completed_at.is_some());

        let undone = db.toggle_task_completion(&user, &task.id).await.unwrap();
        assert!(!undone.is_completed);
        assert!(undone.completed_at.is_none());
    }

    #[tokio::test]
    async fn move_swaps_exactly_two_orders() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        db.create_task(&user, new_task("a", day(16))).await.unwrap();
        let b = db.create_task(&user, new_task("b", day(16))).await.unwrap();
        db.create_task(&user, new_task("c", day(16))).await.unwrap();

        assert!(db.move_task(&user, day(16), &b.id, MoveDirection::Up).await.unwrap());
        assert_eq!(
            orders(&db, &user, day(16)).await,
            vec![("b".to_string(), 0), ("a".to_string(), 1), ("c".to_string(), 2)]
        );

        assert!(db.move_task(&user, day(16), &b.id, MoveDirection::Down).await.unwrap());
        assert!(db.move_task(&user, day(16), &b.id, MoveDirection::Down).await.unwrap());
        assert_eq!(
            orders(&db, &user, day(16)).await,
            vec![("a".to_string(), 0), ("c".to_string(), 1), ("b".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn move_at_partition_edges_is_a_noop() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let first = db.create_task(&user, new_task("first", day(16))).await.unwrap();
        let last = db.create_task(&user, new_task("last", day(16))).await.unwrap();
        // A task on another day must not count as a neighbour.
        db.create_task(&user, new_task("elsewhere", day(17))).await.unwrap();

        assert!(!db.move_task(&user, day(16), &first.id, MoveDirection::Up).await.unwrap());
        assert!(!db.move_task(&user, day(16), &last.id, MoveDirection::Down).await.unwrap());
        assert_eq!(
            orders(&db, &user, day(16)).await,
            vec![("first".to_string(), 0), ("last".to_string(), 1)]
        );

        let wrong_partition = db.move_task(&user, day(17), &first.id, MoveDirection::Down).await;
        assert!(matches!(wrong_partition, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn move_skips_over_gaps() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let a = db.create_task(&user, new_task("a", day(16))).await.unwrap();
        let b = db.create_task(&user, new_task("b", day(16))).await.unwrap();
        let c = db.create_task(&user, new_task("c", day(16))).await.unwrap();
        db.delete_task(&user, &b.id).await.unwrap();

        assert!(db.move_task(&user, day(16), &c.id, MoveDirection::Up).await.unwrap());
        let tasks = db.get_tasks_by_date(&user, day(16)).await.unwrap();
        assert_eq!(tasks[0].id, c.id);
        assert_eq!(tasks[0].display_order, a.display_order);
        assert_eq!(tasks[1].id, a.id);
        assert_eq!(tasks[1].display_order, 2);
    }

    #[tokio::test]
    async fn carryover_moves_only_the_date() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        db.create_task(&user, new_task("done yesterday", day(15))).await.unwrap();
        let pending = db.create_task(&user, new_task("pending", day(15))).await.unwrap();
        db.create_task(&user, new_task("today", day(16))).await.unwrap();
        let today_second = db.create_task(&user, new_task("today 2", day(16))).await.unwrap();
        db.update_task_work_time(&pending.id, 25).await.unwrap();

        let candidates = db.get_incomplete_tasks(&user, day(15)).await.unwrap();
        assert_eq!(candidates.len(), 2);
        let done = &candidates[0];
        db.toggle_task_completion(&user, &done.id).await.unwrap();
        assert_eq!(db.get_incomplete_tasks(&user, day(15)).await.unwrap().len(), 1);

        let moved = db
            .carryover_tasks(&user, &[pending.id.clone()], day(16))
            .await
            .unwrap();
        assert_eq!(moved, 1);

        let carried = db.get_task(&user, &pending.id).await.unwrap();
        assert_eq!(carried.task_date, day(16));
        assert_eq!(carried.title, pending.title);
        assert_eq!(carried.display_order, pending.display_order);
        assert_eq!(carried.is_completed, pending.is_completed);
        assert_eq!(carried.total_work_minutes, 25);

        // The carried order is kept even though it ties with a task already there.
        assert_eq!(carried.display_order, today_second.display_order);
        assert_eq!(db.get_tasks_by_date(&user, day(16)).await.unwrap().len(), 3);
        assert_eq!(db.get_tasks_by_date(&user, day(15)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn carryover_ignores_unknown_ids() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let moved = db
            .carryover_tasks(&user, &["nope".to_string()], day(16))
            .await
            .unwrap();
        assert_eq!(moved, 0);
    }

    #[tokio::test]
    async fn work_time_accumulates() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let task = db.create_task(&user, new_task("deep work", day(16))).await.unwrap();

        db.update_task_work_time(&task.id, 25).await.unwrap();
        db.update_task_work_time(&task.id, 30).await.unwrap();
        assert_eq!(db.get_task(&user, &task.id).await.unwrap().total_work_minutes, 55);
        assert!(matches!(
            db.update_task_work_time("missing", 5).await,
            Err(AppError::NotFound(_))
        ));
    }
}
