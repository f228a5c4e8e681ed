use serde::Serialize;

use crate::db::models::{PomodoroSession, SessionKind};

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub work_sessions: usize,
    pub total_work_minutes: u32,
    pub break_sessions: usize,
}

impl HistoryStats {
    pub fn from_sessions(sessions: &[PomodoroSession]) -> Self {
        sessions
            .iter()
            .filter(|session| session.completed)
            .fold(Self::default(), |mut stats, session| {
                match session.session_kind {
                    SessionKind::Work => {
                        stats.work_sessions += 1;
                        stats.total_work_minutes += session.duration_minutes;
                    }
                    SessionKind::ShortBreak | SessionKind::LongBreak => stats.break_sessions += 1,
                }
                stats
            })
    }
}

/// Render seconds as `MM:SS`.
pub fn format_time(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
