use std::fmt::Write;

use crate::{
    db::models::{CurrentUser, Priority, Task},
    tasks::DaySummary,
    timer::{commands::DayHistory, format_time, TimerSnapshot, TimerStatus},
};

const PROGRESS_WIDTH: usize = 20;

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!!",
        Priority::Medium => "!! ",
        Priority::Low => "!  ",
    }
}

fn bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * PROGRESS_WIDTH as f64).round()) as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(PROGRESS_WIDTH - filled))
}

pub fn task_line(position: usize, task: &Task, selected: Option<&str>) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let mut line = format!(
        "{position:>2}. [{check}] {} {} ({})",
        priority_marker(task.priority),
        task.title,
        task.category
    );
    if task.total_work_minutes > 0 {
        let _ = write!(line, " {}m", task.total_work_minutes);
    }
    if selected == Some(task.id.as_str()) {
        line.push_str(" <- timer");
    }
    line
}

pub fn task_list(tasks: &[Task], selected: Option<&str>) -> String {
    if tasks.is_empty() {
        return "No tasks.".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| task_line(index + 1, task, selected))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn task_detail(task: &Task) -> String {
    let mut out = format!(
        "{}\n  id:        {}\n  category:  {}\n  priority:  {}\n  date:      {}\n  worked:    {} min",
        task.title, task.id, task.category, task.priority, task.task_date, task.total_work_minutes
    );
    if let Some(description) = &task.description {
        let _ = write!(out, "\n  notes:     {description}");
    }
    if let Some(done) = task.completed_at {
        let _ = write!(out, "\n  completed: {}", done.format("%Y-%m-%d %H:%M UTC"));
    }
    out
}

pub fn timer(snapshot: &TimerSnapshot) -> String {
    let status = match snapshot.status {
        TimerStatus::Idle => "idle",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
        TimerStatus::Expired => "finished (run `timer complete`)",
    };
    let mut out = format!(
        "{} {} {} {}  | completed work sessions: {}",
        snapshot.kind,
        format_time(snapshot.remaining_secs),
        bar(snapshot.progress()),
        status,
        snapshot.completed_work_sessions
    );
    if let Some(task_id) = &snapshot.task_id {
        let _ = write!(out, "\n  crediting task {task_id}");
    }
    out
}

pub fn summary(user: &CurrentUser, day: &DaySummary, pending: usize) -> String {
    let mut out = format!(
        "Hello, {}. {}\n  tasks: {}/{} done {} {:.0}%\n  worked: {} min",
        user.display_name,
        day.date,
        day.completed,
        day.total,
        bar(day.completion_rate),
        day.completion_rate * 100.0,
        day.total_work_minutes
    );
    if !day.preview.is_empty() {
        out.push('\n');
        out.push_str(&task_list(&day.preview, None));
        if day.total > day.preview.len() {
            let _ = write!(out, "\n    ... and {} more", day.total - day.preview.len());
        }
    }
    if pending > 0 {
        let _ = write!(
            out,
            "\n  {pending} unfinished task(s) from yesterday: `tasks pending`, `tasks carryover`"
        );
    }
    out
}

pub fn history(day: &DayHistory) -> String {
    let mut out = format!(
        "{}: {} work session(s), {} min focused, {} break(s)",
        day.date, day.stats.work_sessions, day.stats.total_work_minutes, day.stats.break_sessions
    );
    for session in &day.sessions {
        let local = session.started_at.with_timezone(&chrono::Local);
        let _ = write!(
            out,
            "\n  {} {:<11} {:>3} min",
            local.format("%H:%M"),
            session.session_kind.label(),
            session.duration_minutes
        );
    }
    out
}
