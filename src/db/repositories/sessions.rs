use anyhow::Result;
use chrono::NaiveDate;
use rusqlite::{params, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_timestamp, local_day_bounds, parse_datetime, parse_session_kind, to_u32},
        models::PomodoroSession,
    },
    error::AppResult,
};

const ENABLE_LOGS: bool = true;

fn row_to_session(row: &Row) -> Result<PomodoroSession> {
    let session_type: String = row.get("session_type")?;
    let duration_minutes: i64 = row.get("duration_minutes")?;
    let started_at: String = row.get("started_at")?;
    let ended_at: String = row.get("ended_at")?;

    Ok(PomodoroSession {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        session_kind: parse_session_kind(&session_type)?,
        duration_minutes: to_u32(duration_minutes, "duration_minutes")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_datetime(&ended_at, "ended_at")?,
        completed: row.get("completed")?,
        task_id: row.get("task_id")?,
    })
}

impl Database {
    pub async fn insert_pomodoro_session(&self, session: &PomodoroSession) -> AppResult<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO pomodoro_sessions (id, user_id, session_type, duration_minutes, started_at, ended_at, completed, task_id)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id,
                    record.user_id,
                    record.session_kind.as_str(),
                    i64::from(record.duration_minutes),
                    format_timestamp(&record.started_at),
                    format_timestamp(&record.ended_at),
                    record.completed,
                    record.task_id,
                ],
            )?;
            Ok(())
        })
        .await?;

        crate::log_info!(
            "Saved pomodoro session {} ({})",
            session.id,
            session.session_kind.as_str()
        );
        Ok(())
    }

    /// Sessions that started on `date` (local calendar day), newest first.
    pub async fn get_pomodoro_sessions_by_date(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> AppResult<Vec<PomodoroSession>> {
        let user_id = user_id.to_string();
        let (start, end) = local_day_bounds(date)?;

        let sessions = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, user_id, session_type, duration_minutes, started_at, ended_at, completed, task_id
                     FROM pomodoro_sessions
                     WHERE user_id = ?1 AND started_at >= ?2 AND started_at < ?3
                     ORDER BY started_at DESC",
                )?;

                let mut rows = stmt.query(params![
                    user_id,
                    format_timestamp(&start),
                    format_timestamp(&end),
                ])?;
                let mut sessions = Vec::new();
                while let Some(row) = rows.next()? {
                    sessions.push(row_to_session(row)?);
                }
                Ok(sessions)
            })
            .await?;
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Local, TimeZone, Utc};
    use uuid::Uuid;

    use super::*;
    use crate::db::{
        models::SessionKind,
        test_support::{insert_user, test_db},
    };

    fn session_at(user_id: &str, kind: SessionKind, started_at: chrono::DateTime<Utc>) -> PomodoroSession {
        PomodoroSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            session_kind: kind,
            duration_minutes: 25,
            started_at,
            ended_at: started_at + Duration::minutes(25),
            completed: true,
            task_id: None,
        }
    }

    fn local_noon(date: NaiveDate) -> chrono::DateTime<Utc> {
        Local
            .from_local_datetime(&date.and_hms_opt(12, 0, 0).unwrap())
            .earliest()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[tokio::test]
    async fn sessions_are_filtered_by_local_day_newest_first() {
        let db = test_db().await;
        let user = insert_user(&db, "a@example.com").await;
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let yesterday = today.pred_opt().unwrap();

        let morning = session_at(&user, SessionKind::Work, local_noon(today) - Duration::hours(3));
        let noon = session_at(&user, SessionKind::ShortBreak, local_noon(today));
        let old = session_at(&user, SessionKind::Work, local_noon(yesterday));
        for session in [&morning, &noon, &old] {
            db.insert_pomodoro_session(session).await.unwrap();
        }

        let sessions = db.get_pomodoro_sessions_by_date(&user, today).await.unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].id, noon.id);
        assert_eq!(sessions[0].session_kind, SessionKind::ShortBreak);
        assert_eq!(sessions[1].id, morning.id);

        let earlier = db.get_pomodoro_sessions_by_date(&user, yesterday).await.unwrap();
        assert_eq!(earlier, vec![old]);
    }

    #[tokio::test]
    async fn sessions_are_scoped_to_their_owner() {
        let db = test_db().await;
        let alice = insert_user(&db, "alice@example.com").await;
        let bob = insert_user(&db, "bob@example.com").await;
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        db.insert_pomodoro_session(&session_at(&alice, SessionKind::Work, local_noon(today)))
            .await
            .unwrap();

        assert!(db.get_pomodoro_sessions_by_date(&bob, today).await.unwrap().is_empty());
    }
}
