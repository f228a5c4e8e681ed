use std::{sync::Arc, time::Instant};

use chrono::Duration as ChronoDuration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    db::{
        helpers::stored_now,
        models::{PomodoroSession, SessionKind},
        Database,
    },
    error::AppResult,
};

use super::state::{CompletedSession, PomodoroState, TimerDurations, TimerSnapshot};

const ENABLE_LOGS: bool = true;

/// Async front for one user's [`PomodoroState`]. Cloning shares the state.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<PomodoroState>>,
    db: Database,
    user_id: String,
}

impl TimerController {
    pub fn new(db: Database, user_id: String, durations: TimerDurations) -> Self {
        Self {
            state: Arc::new(Mutex::new(PomodoroState::new(durations))),
            db,
            user_id,
        }
    }

    pub async fn get_snapshot(&self) -> TimerSnapshot {
        self.state.lock().await.snapshot(Instant::now())
    }

    pub async fn start(&self) -> AppResult<TimerSnapshot> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.start(now)?;
        crate::log_info!("Timer started ({} min work)", state.durations.work_minutes);
        Ok(state.snapshot(now))
    }

    pub async fn pause(&self) -> AppResult<TimerSnapshot> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.pause(now)?;
        crate::log_debug!("Timer paused with {}s left", state.state.remaining_secs(now));
        Ok(state.snapshot(now))
    }

    pub async fn resume(&self) -> AppResult<TimerSnapshot> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        state.resume(now)?;
        Ok(state.snapshot(now))
    }

    pub async fn reset(&self) -> TimerSnapshot {
        let mut state = self.state.lock().await;
        state.reset();
        crate::log_info!("Timer reset");
        state.snapshot(Instant::now())
    }

    pub async fn skip(&self) -> AppResult<TimerSnapshot> {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let skipped = state.kind;
        let next = state.skip(now)?;
        crate::log_info!("Skipped {} session, now {}", skipped.as_str(), next.as_str());
        Ok(state.snapshot(now))
    }

    /// Complete the expired session, record it and move on.
    pub async fn complete(&self) -> AppResult<TimerSnapshot> {
        let (finished, snapshot) = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            let finished = state.complete(now)?;
            (finished, state.snapshot(now))
        };

        self.record(finished).await;
        Ok(snapshot)
    }

    /// Complete the current session only if it has run out. Used by the
    /// refresh loop; returns the kind that finished.
    pub async fn complete_if_expired(&self) -> Option<SessionKind> {
        let finished = {
            let mut state = self.state.lock().await;
            let now = Instant::now();
            if !state.state.is_expired(now) {
                return None;
            }
            state.complete(now).ok()?
        };

        let kind = finished.kind;
        self.record(finished).await;
        Some(kind)
    }

    /// Attach the timer to a task (or detach with `None`). Work minutes are
    /// credited to whatever task is selected when a work session completes.
    pub async fn select_task(&self, task_id: Option<String>) -> TimerSnapshot {
        let mut state = self.state.lock().await;
        state.task_id = task_id;
        state.snapshot(Instant::now())
    }

    pub async fn set_durations(&self, durations: TimerDurations) -> AppResult<TimerSnapshot> {
        let mut state = self.state.lock().await;
        state.set_durations(durations)?;
        Ok(state.snapshot(Instant::now()))
    }

    /// Persist a finished session. Failures are logged and swallowed so the
    /// cycle keeps going.
    async fn record(&self, finished: CompletedSession) {
        let ended_at = stored_now();
        let started_at = ended_at - ChronoDuration::minutes(i64::from(finished.duration_minutes));

        let session = PomodoroSession {
            id: Uuid::new_v4().to_string(),
            user_id: self.user_id.clone(),
            session_kind: finished.kind,
            duration_minutes: finished.duration_minutes,
            started_at,
            ended_at,
            completed: true,
            task_id: finished.task_id.clone(),
        };

        if let Err(e) = self.db.insert_pomodoro_session(&session).await {
            crate::log_error!("Failed to save {} session: {}", finished.kind.as_str(), e);
        }

        if finished.kind == SessionKind::Work {
            if let Some(task_id) = finished.task_id.as_deref() {
                if let Err(e) = self
                    .db
                    .update_task_work_time(task_id, finished.duration_minutes)
                    .await
                {
                    crate::log_error!("Failed to credit work time to task {}: {}", task_id, e);
                }
            }
        }
    }
}
