use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    db::models::{PomodoroSession, SessionKind},
    session::require_user,
    settings::AutoRefreshSettings,
    timer::{HistoryStats, TimerDurations, TimerSnapshot},
    AppState,
};

const ENABLE_LOGS: bool = true;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayHistory {
    pub date: NaiveDate,
    pub sessions: Vec<PomodoroSession>,
    pub stats: HistoryStats,
}

fn report(action: &str, err: impl std::fmt::Display) -> String {
    let message = err.to_string();
    crate::log_error!("{} failed: {}", action, message);
    message
}

pub async fn get_timer_state(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    Ok(ctx.timer.get_snapshot().await)
}

pub async fn start_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    ctx.timer.start().await.map_err(|e| report("start timer", e))
}

pub async fn pause_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    ctx.timer.pause().await.map_err(|e| report("pause timer", e))
}

pub async fn resume_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    ctx.timer.resume().await.map_err(|e| report("resume timer", e))
}

pub async fn skip_session(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    ctx.timer.skip().await.map_err(|e| report("skip session", e))
}

pub async fn complete_session(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    ctx.timer
        .complete()
        .await
        .map_err(|e| report("complete session", e))
}

pub async fn reset_timer(state: &AppState) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    Ok(ctx.timer.reset().await)
}

/// One refresh tick: completes the session if it has run out.
pub async fn refresh_timer(state: &AppState) -> Result<(TimerSnapshot, Option<SessionKind>), String> {
    let ctx = require_user(state).await?;
    let finished = ctx.timer.complete_if_expired().await;
    Ok((ctx.timer.get_snapshot().await, finished))
}

/// Select the task that work minutes are credited to. The task must belong
/// to the signed-in user.
pub async fn select_timer_task(
    state: &AppState,
    task_id: Option<String>,
) -> Result<TimerSnapshot, String> {
    let ctx = require_user(state).await?;
    if let Some(id) = task_id.as_deref() {
        state
            .db
            .get_task(&ctx.user.id, id)
            .await
            .map_err(|e| report("select timer task", e))?;
    }
    Ok(ctx.timer.select_task(task_id).await)
}

pub async fn get_timer_durations(state: &AppState) -> Result<TimerDurations, String> {
    Ok(state.settings.timer_durations())
}

/// Change the configured durations. Applies to the live timer (idle only)
/// and is saved for future logins.
pub async fn set_timer_durations(
    state: &AppState,
    durations: TimerDurations,
) -> Result<TimerDurations, String> {
    if let Some(ctx) = state.session.lock().await.clone() {
        ctx.timer
            .set_durations(durations)
            .await
            .map_err(|e| report("set timer durations", e))?;
    }
    state
        .settings
        .update_timer_durations(durations)
        .map_err(|e| report("save timer durations", format!("{e:#}")))?;
    crate::log_info!(
        "Timer durations set to {}/{}/{} min",
        durations.work_minutes,
        durations.short_break_minutes,
        durations.long_break_minutes
    );
    Ok(durations)
}

pub async fn get_auto_refresh(state: &AppState) -> Result<AutoRefreshSettings, String> {
    Ok(state.settings.auto_refresh())
}

pub async fn set_auto_refresh(
    state: &AppState,
    settings: AutoRefreshSettings,
) -> Result<AutoRefreshSettings, String> {
    state
        .settings
        .update_auto_refresh(settings.clone())
        .map_err(|e| report("save auto-refresh", format!("{e:#}")))?;
    Ok(settings)
}

pub async fn get_history(state: &AppState, date: NaiveDate) -> Result<DayHistory, String> {
    let ctx = require_user(state).await?;
    let sessions = state
        .db
        .get_pomodoro_sessions_by_date(&ctx.user.id, date)
        .await
        .map_err(|e| report("load session history", e))?;
    let stats = HistoryStats::from_sessions(&sessions);
    Ok(DayHistory {
        date,
        sessions,
        stats,
    })
}
