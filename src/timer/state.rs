use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::{
    db::models::SessionKind,
    error::{AppError, AppResult},
};

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_SHORT_BREAK_MINUTES: u32 = 5;
pub const DEFAULT_LONG_BREAK_MINUTES: u32 = 15;
pub const SESSIONS_UNTIL_LONG_BREAK: u32 = 4;

/// Configured length of each session kind, in whole minutes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerDurations {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for TimerDurations {
    fn default() -> Self {
        Self {
            work_minutes: DEFAULT_WORK_MINUTES,
            short_break_minutes: DEFAULT_SHORT_BREAK_MINUTES,
            long_break_minutes: DEFAULT_LONG_BREAK_MINUTES,
        }
    }
}

impl TimerDurations {
    pub fn validate(&self) -> AppResult<()> {
        check_range("work", self.work_minutes, 60)?;
        check_range("short break", self.short_break_minutes, 30)?;
        check_range("long break", self.long_break_minutes, 60)
    }

    pub fn minutes_for(&self, kind: SessionKind) -> u32 {
        match kind {
            SessionKind::Work => self.work_minutes,
            SessionKind::ShortBreak => self.short_break_minutes,
            SessionKind::LongBreak => self.long_break_minutes,
        }
    }

    pub fn secs_for(&self, kind: SessionKind) -> u64 {
        u64::from(self.minutes_for(kind)) * 60
    }
}

fn check_range(name: &str, minutes: u32, max: u32) -> AppResult<()> {
    if (1..=max).contains(&minutes) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "{name} duration must be between 1 and {max} minutes, got {minutes}"
        )))
    }
}

/// Countdown state. `Running` is anchored on a monotonic instant; expiry is
/// derived from it rather than stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimerState {
    #[default]
    Idle,
    Running { started_at: Instant, duration_secs: u64 },
    Paused { remaining_secs: u64 },
}

impl TimerState {
    /// Whole seconds left, floored and never negative.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        match *self {
            TimerState::Idle => 0,
            TimerState::Paused { remaining_secs } => remaining_secs,
            TimerState::Running {
                started_at,
                duration_secs,
            } => Duration::from_secs(duration_secs)
                .saturating_sub(now.saturating_duration_since(started_at))
                .as_secs(),
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        match *self {
            TimerState::Running {
                started_at,
                duration_secs,
            } => now.saturating_duration_since(started_at) >= Duration::from_secs(duration_secs),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub status: TimerStatus,
    pub kind: SessionKind,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub completed_work_sessions: u32,
    pub task_id: Option<String>,
    pub durations: TimerDurations,
}

impl TimerSnapshot {
    /// Elapsed fraction of the current session, 0.0 to 1.0.
    pub fn progress(&self) -> f64 {
        if self.total_secs == 0 {
            return 0.0;
        }
        let elapsed = self.total_secs.saturating_sub(self.remaining_secs) as f64;
        (elapsed / self.total_secs as f64).clamp(0.0, 1.0)
    }
}

/// What a natural completion produced; the caller persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub kind: SessionKind,
    pub duration_minutes: u32,
    pub task_id: Option<String>,
}

/// One user's Pomodoro cycle: the countdown, the kind of the current session
/// and the count of work sessions completed since the last reset.
#[derive(Debug, Clone)]
pub struct PomodoroState {
    pub state: TimerState,
    pub kind: SessionKind,
    pub completed_work_sessions: u32,
    pub durations: TimerDurations,
    pub task_id: Option<String>,
    /// Length of the session as started, for progress display. Pausing
    /// shrinks the stored duration but not this.
    total_secs: u64,
}

impl PomodoroState {
    pub fn new(durations: TimerDurations) -> Self {
        Self {
            state: TimerState::default(),
            kind: SessionKind::default(),
            completed_work_sessions: 0,
            durations,
            task_id: None,
            total_secs: 0,
        }
    }

    pub fn status(&self, now: Instant) -> TimerStatus {
        match self.state {
            TimerState::Idle => TimerStatus::Idle,
            TimerState::Paused { .. } => TimerStatus::Paused,
            TimerState::Running { .. } if self.state.is_expired(now) => TimerStatus::Expired,
            TimerState::Running { .. } => TimerStatus::Running,
        }
    }

    pub fn snapshot(&self, now: Instant) -> TimerSnapshot {
        let (remaining_secs, total_secs) = match self.state {
            TimerState::Idle => {
                let secs = self.durations.secs_for(SessionKind::Work);
                (secs, secs)
            }
            _ => (self.state.remaining_secs(now), self.total_secs),
        };

        TimerSnapshot {
            status: self.status(now),
            kind: self.kind,
            remaining_secs,
            total_secs,
            completed_work_sessions: self.completed_work_sessions,
            task_id: self.task_id.clone(),
            durations: self.durations,
        }
    }

    /// idle → running, always with a work session.
    pub fn start(&mut self, now: Instant) -> AppResult<()> {
        if self.state != TimerState::Idle {
            return Err(AppError::validation("timer is already active"));
        }
        self.begin(SessionKind::Work, now);
        Ok(())
    }

    /// running → paused; the remaining time becomes the stored duration.
    pub fn pause(&mut self, now: Instant) -> AppResult<()> {
        match self.state {
            TimerState::Running { .. } => {
                self.state = TimerState::Paused {
                    remaining_secs: self.state.remaining_secs(now),
                };
                Ok(())
            }
            _ => Err(AppError::validation("timer is not running")),
        }
    }

    /// paused → running with the frozen duration and a fresh anchor.
    pub fn resume(&mut self, now: Instant) -> AppResult<()> {
        match self.state {
            TimerState::Paused { remaining_secs } => {
                self.state = TimerState::Running {
                    started_at: now,
                    duration_secs: remaining_secs,
                };
                Ok(())
            }
            _ => Err(AppError::validation("timer is not paused")),
        }
    }

    /// Back to idle; the completed-session counter starts over.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.kind = SessionKind::Work;
        self.completed_work_sessions = 0;
        self.total_secs = 0;
    }

    /// Finish an expired session and start the next one.
    ///
    /// Work completions bump the counter; every `SESSIONS_UNTIL_LONG_BREAK`th
    /// one is followed by a long break, the rest by a short break. Breaks are
    /// always followed by work.
    pub fn complete(&mut self, now: Instant) -> AppResult<CompletedSession> {
        if !self.state.is_expired(now) {
            return Err(AppError::validation("the current session has not finished yet"));
        }

        let finished = CompletedSession {
            kind: self.kind,
            duration_minutes: self.durations.minutes_for(self.kind),
            task_id: match self.kind {
                SessionKind::Work => self.task_id.clone(),
                _ => None,
            },
        };

        let next = match self.kind {
            SessionKind::Work => {
                self.completed_work_sessions += 1;
                if self.completed_work_sessions % SESSIONS_UNTIL_LONG_BREAK == 0 {
                    SessionKind::LongBreak
                } else {
                    SessionKind::ShortBreak
                }
            }
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        };
        self.begin(next, now);

        Ok(finished)
    }

    /// Drop the current session unrecorded and start the next one. The
    /// counter is untouched, so skipped work always leads to a short break.
    pub fn skip(&mut self, now: Instant) -> AppResult<SessionKind> {
        if self.state == TimerState::Idle {
            return Err(AppError::validation("timer is not active"));
        }
        let next = match self.kind {
            SessionKind::Work => SessionKind::ShortBreak,
            SessionKind::ShortBreak | SessionKind::LongBreak => SessionKind::Work,
        };
        self.begin(next, now);
        Ok(next)
    }

    pub fn set_durations(&mut self, durations: TimerDurations) -> AppResult<()> {
        durations.validate()?;
        if self.state != TimerState::Idle {
            return Err(AppError::validation(
                "durations can only be changed while the timer is idle",
            ));
        }
        self.durations = durations;
        Ok(())
    }

    fn begin(&mut self, kind: SessionKind, now: Instant) {
        let duration_secs = self.durations.secs_for(kind);
        self.kind = kind;
        self.total_secs = duration_secs;
        self.state = TimerState::Running {
            started_at: now,
            duration_secs,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn timer() -> PomodoroState {
        PomodoroState::new(TimerDurations::default())
    }

    /// Let the current session run out and complete it.
    fn finish(state: &mut PomodoroState, now: &mut Instant) -> CompletedSession {
        let TimerState::Running { duration_secs, .. } = state.state else {
            panic!("timer not running: {:?}", state.state);
        };
        *now += secs(duration_secs);
        state.complete(*now).unwrap()
    }

    #[test]
    fn fresh_machine_is_an_idle_work_session() {
        let state = timer();
        assert_eq!(TimerState::default(), TimerState::Idle);
        assert_eq!(state.state, TimerState::Idle);
        assert_eq!(state.kind, SessionKind::default());
        assert_eq!(state.kind, SessionKind::Work);
        assert_eq!(state.completed_work_sessions, 0);
    }

    #[test]
    fn pause_right_after_start_keeps_full_duration() {
        let now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();
        state.pause(now).unwrap();
        assert_eq!(state.state, TimerState::Paused { remaining_secs: 1500 });
    }

    #[test]
    fn pause_floors_partial_seconds() {
        let now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();
        state.pause(now + Duration::from_millis(300)).unwrap();
        assert_eq!(state.state, TimerState::Paused { remaining_secs: 1499 });
    }

    #[test]
    fn resume_restarts_with_frozen_duration() {
        let start = Instant::now();
        let mut state = timer();
        state.start(start).unwrap();
        state.pause(start + secs(100)).unwrap();

        let later = start + secs(5000);
        state.resume(later).unwrap();
        assert_eq!(
            state.state,
            TimerState::Running {
                started_at: later,
                duration_secs: 1400
            }
        );
        assert_eq!(state.state.remaining_secs(later + secs(400)), 1000);
        let snapshot = state.snapshot(later + secs(400));
        assert_eq!(snapshot.total_secs, 1500);
        assert!((snapshot.progress() - (500.0 / 1500.0)).abs() < 1e-9);
    }

    #[test]
    fn remaining_never_goes_negative() {
        let start = Instant::now();
        let mut state = timer();
        state.start(start).unwrap();
        let way_later = start + secs(10_000);
        assert_eq!(state.state.remaining_secs(way_later), 0);
        assert!(state.state.is_expired(way_later));
        assert_eq!(state.status(way_later), TimerStatus::Expired);
        assert_eq!(state.state.remaining_secs(start), 1500);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let now = Instant::now();
        let mut state = timer();
        assert!(state.pause(now).is_err());
        assert!(state.resume(now).is_err());
        assert!(state.skip(now).is_err());
        assert!(state.complete(now).is_err());

        state.start(now).unwrap();
        assert!(state.start(now).is_err());
        assert!(state.resume(now).is_err());
        assert!(matches!(state.complete(now + secs(10)), Err(AppError::Validation(_))));
    }

    #[test]
    fn fourth_completed_work_session_earns_long_break() {
        let mut now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();

        for round in 1..=4 {
            let work = finish(&mut state, &mut now);
            assert_eq!(work.kind, SessionKind::Work);
            assert_eq!(work.duration_minutes, 25);
            assert_eq!(state.completed_work_sessions, round);

            let expected = if round == 4 {
                SessionKind::LongBreak
            } else {
                SessionKind::ShortBreak
            };
            assert_eq!(state.kind, expected, "after work session {round}");

            let rest = finish(&mut state, &mut now);
            assert_eq!(rest.kind, expected);
            assert_eq!(state.kind, SessionKind::Work);
        }
    }

    #[test]
    fn breaks_are_recorded_with_their_configured_length() {
        let mut now = Instant::now();
        let mut state = PomodoroState::new(TimerDurations {
            work_minutes: 50,
            short_break_minutes: 10,
            long_break_minutes: 30,
        });
        state.task_id = Some("task-1".into());
        state.start(now).unwrap();

        let work = finish(&mut state, &mut now);
        assert_eq!(work.duration_minutes, 50);
        assert_eq!(work.task_id.as_deref(), Some("task-1"));

        let rest = finish(&mut state, &mut now);
        assert_eq!(rest.kind, SessionKind::ShortBreak);
        assert_eq!(rest.duration_minutes, 10);
        assert_eq!(rest.task_id, None);
        assert_eq!(state.completed_work_sessions, 1);
    }

    #[test]
    fn skips_never_touch_the_counter() {
        let mut now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();

        for _ in 0..4 {
            assert_eq!(state.skip(now).unwrap(), SessionKind::ShortBreak);
            assert_eq!(state.skip(now).unwrap(), SessionKind::Work);
        }
        assert_eq!(state.completed_work_sessions, 0);

        finish(&mut state, &mut now);
        assert_eq!(state.completed_work_sessions, 1);
        assert_eq!(state.kind, SessionKind::ShortBreak);
    }

    #[test]
    fn skipped_work_session_is_not_counted() {
        let mut now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();
        for _ in 0..3 {
            finish(&mut state, &mut now);
            finish(&mut state, &mut now);
        }
        assert_eq!(state.completed_work_sessions, 3);

        assert_eq!(state.skip(now).unwrap(), SessionKind::ShortBreak);
        state.skip(now).unwrap();
        finish(&mut state, &mut now);
        assert_eq!(state.kind, SessionKind::LongBreak);
    }

    #[test]
    fn skip_works_from_pause() {
        let now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();
        state.pause(now).unwrap();
        assert_eq!(state.skip(now).unwrap(), SessionKind::ShortBreak);
        assert_eq!(state.status(now), TimerStatus::Running);
        assert_eq!(state.state.remaining_secs(now), 300);
    }

    #[test]
    fn reset_clears_counter_and_state() {
        let mut now = Instant::now();
        let mut state = timer();
        state.start(now).unwrap();
        finish(&mut state, &mut now);
        state.reset();

        assert_eq!(state.state, TimerState::Idle);
        assert_eq!(state.kind, SessionKind::Work);
        assert_eq!(state.completed_work_sessions, 0);
        let snapshot = state.snapshot(now);
        assert_eq!(snapshot.status, TimerStatus::Idle);
        assert_eq!(snapshot.remaining_secs, 1500);
    }

    #[test]
    fn durations_are_validated_and_locked_while_active() {
        let now = Instant::now();
        let mut state = timer();
        let too_long_break = TimerDurations {
            short_break_minutes: 31,
            ..TimerDurations::default()
        };
        assert!(state.set_durations(too_long_break).is_err());
        let zero_work = TimerDurations {
            work_minutes: 0,
            ..TimerDurations::default()
        };
        assert!(state.set_durations(zero_work).is_err());

        let custom = TimerDurations {
            work_minutes: 60,
            short_break_minutes: 30,
            long_break_minutes: 60,
        };
        state.set_durations(custom).unwrap();
        state.start(now).unwrap();
        assert_eq!(state.state.remaining_secs(now), 3600);
        assert!(state.set_durations(TimerDurations::default()).is_err());
    }
}
