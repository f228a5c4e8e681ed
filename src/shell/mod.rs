//! Line-oriented front end. Each line is parsed with clap, dispatched to the
//! command layer and rendered from freshly fetched state.

pub mod cli;
mod render;

use std::{io::Write, time::Duration};

use chrono::{Local, NaiveDate};
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    time,
};

use crate::{
    auth,
    db::models::{MoveDirection, NewTask, Task, TaskUpdate},
    settings::AutoRefreshSettings,
    tasks::{self, TaskFilter},
    timer::{self, TimerDurations, TimerStatus},
    AppState,
};

use cli::{ShellCommand, ShellLine, TaskCommand, TimerCommand};

const ENABLE_LOGS: bool = true;

/// What the loop should do after a command ran.
#[derive(Debug, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Watch,
    Quit,
}

pub async fn run_shell(state: &AppState) -> anyhow::Result<()> {
    println!("monkmode: daily tasks and Pomodoro. Type `help` for commands.");
    crate::log_debug!("Database at {}", state.config.db_path.display());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}", prompt(state).await);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match execute_line(state, &line).await {
            Ok(Reply::Text(text)) => println!("{text}"),
            Ok(Reply::Watch) => {
                if let Err(message) = watch(state).await {
                    println!("error: {message}");
                }
            }
            Ok(Reply::Quit) => break,
            Err(message) => println!("error: {message}"),
        }
    }
    Ok(())
}

async fn prompt(state: &AppState) -> String {
    match state.session.lock().await.as_ref() {
        Some(ctx) => format!("{}> ", ctx.user.display_name),
        None => "> ".to_string(),
    }
}

/// Parse and run one line. Parse errors (and `--help`) come back as text.
pub async fn execute_line(state: &AppState, line: &str) -> Result<Reply, String> {
    let words = cli::split_words(line)?;
    match ShellLine::try_parse_from(words) {
        Ok(parsed) => dispatch(state, parsed.command).await,
        Err(err) => Ok(Reply::Text(err.render().to_string().trim_end().to_string())),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn dispatch(state: &AppState, command: ShellCommand) -> Result<Reply, String> {
    let text = match command {
        ShellCommand::Signup {
            email,
            password,
            display_name,
        } => {
            let user =
                auth::commands::sign_up(state, email, password, display_name.join(" ")).await?;
            format!("Welcome, {}. You are signed in.", user.display_name)
        }
        ShellCommand::Login { email, password } => {
            auth::commands::sign_in(state, email, password).await?;
            dashboard(state, today()).await?
        }
        ShellCommand::Logout => {
            if auth::commands::sign_out(state).await? {
                "Signed out.".to_string()
            } else {
                "Not signed in.".to_string()
            }
        }
        ShellCommand::Whoami => match auth::commands::current_user(state).await? {
            Some(user) => format!("{} <{}>", user.display_name, user.email),
            None => "Not signed in.".to_string(),
        },
        ShellCommand::Dashboard { date } => dashboard(state, date.unwrap_or_else(today)).await?,
        ShellCommand::Tasks(command) => run_task_command(state, command).await?,
        ShellCommand::Timer(TimerCommand::Watch) => return Ok(Reply::Watch),
        ShellCommand::Timer(command) => run_timer_command(state, command).await?,
        ShellCommand::History { date } => {
            let day = timer::commands::get_history(state, date.unwrap_or_else(today)).await?;
            render::history(&day)
        }
        ShellCommand::Help => cli::help().trim_end().to_string(),
        ShellCommand::Quit => return Ok(Reply::Quit),
    };
    Ok(Reply::Text(text))
}

async fn dashboard(state: &AppState, date: NaiveDate) -> Result<String, String> {
    let user = auth::commands::current_user(state)
        .await?
        .ok_or("please sign in first")?;
    let summary = tasks::commands::get_day_summary(state, date).await?;
    let pending = if date == today() {
        tasks::commands::pending_carryover(state, date).await?.len()
    } else {
        0
    };
    let snapshot = timer::commands::get_timer_state(state).await?;
    Ok(format!(
        "{}\n{}",
        render::summary(&user, &summary, pending),
        render::timer(&snapshot)
    ))
}

/// Resolve a task reference against `candidates`. A number is only ever a
/// 1-based position; anything else is an id or a unique id prefix. Unknown
/// ids are passed through so the store reports them as not found.
fn resolve_task(candidates: &[Task], reference: &str) -> Result<String, String> {
    if let Ok(position) = reference.parse::<usize>() {
        return position
            .checked_sub(1)
            .and_then(|index| candidates.get(index))
            .map(|task| task.id.clone())
            .ok_or_else(|| format!("no task #{position}"));
    }
    let matches: Vec<&Task> = candidates
        .iter()
        .filter(|task| task.id.starts_with(reference))
        .collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Ok(reference.to_string()),
        _ => Err(format!("'{reference}' matches more than one task")),
    }
}

async fn resolve_on(state: &AppState, date: NaiveDate, reference: &str) -> Result<String, String> {
    let candidates = tasks::commands::list_tasks(state, date, TaskFilter::default()).await?;
    resolve_task(&candidates, reference)
}

async fn selected_task(state: &AppState) -> Option<String> {
    timer::commands::get_timer_state(state)
        .await
        .ok()
        .and_then(|snapshot| snapshot.task_id)
}

async fn run_task_command(state: &AppState, command: TaskCommand) -> Result<String, String> {
    match command {
        TaskCommand::List {
            date,
            hide_completed,
            category,
            priority,
        } => {
            let filter = TaskFilter {
                show_completed: !hide_completed,
                category,
                priority,
            };
            let list =
                tasks::commands::list_tasks(state, date.unwrap_or_else(today), filter).await?;
            let selected = selected_task(state).await;
            Ok(render::task_list(&list, selected.as_deref()))
        }
        TaskCommand::Add {
            title,
            description,
            category,
            priority,
            date,
        } => {
            let task = tasks::commands::add_task(
                state,
                NewTask {
                    title: title.join(" "),
                    description,
                    category,
                    priority,
                    task_date: date.unwrap_or_else(today),
                },
            )
            .await?;
            Ok(format!("Added: {}", render::task_detail(&task)))
        }
        TaskCommand::Edit {
            task,
            title,
            description,
            category,
            priority,
            date,
        } => {
            let task_id = resolve_on(state, date.unwrap_or_else(today), &task).await?;
            let current = tasks::commands::get_task(state, task_id.clone()).await?;
            let update = TaskUpdate {
                title: title.unwrap_or(current.title),
                description: description.or(current.description),
                category: category.unwrap_or(current.category),
                priority: priority.unwrap_or(current.priority),
            };
            let task = tasks::commands::edit_task(state, task_id, update).await?;
            Ok(format!("Updated: {}", render::task_detail(&task)))
        }
        TaskCommand::Done { task, date } => {
            let task_id = resolve_on(state, date.unwrap_or_else(today), &task).await?;
            let task = tasks::commands::toggle_task(state, task_id).await?;
            let verb = if task.is_completed { "Completed" } else { "Reopened" };
            Ok(format!("{verb}: {}", task.title))
        }
        TaskCommand::Rm { task, date } => {
            let task_id = resolve_on(state, date.unwrap_or_else(today), &task).await?;
            tasks::commands::delete_task(state, task_id).await?;
            Ok("Deleted.".to_string())
        }
        TaskCommand::Up { task, date } => {
            move_task(state, date.unwrap_or_else(today), &task, MoveDirection::Up).await
        }
        TaskCommand::Down { task, date } => {
            move_task(state, date.unwrap_or_else(today), &task, MoveDirection::Down).await
        }
        TaskCommand::Pending => {
            let pending = tasks::commands::pending_carryover(state, today()).await?;
            if pending.is_empty() {
                Ok("Nothing left over from yesterday.".to_string())
            } else {
                Ok(render::task_list(&pending, None))
            }
        }
        TaskCommand::Carryover { tasks: references } => {
            let day = today();
            let pending = tasks::commands::pending_carryover(state, day).await?;
            let task_ids = references
                .iter()
                .map(|reference| resolve_task(&pending, reference))
                .collect::<Result<Vec<_>, _>>()?;
            let moved = tasks::commands::carry_over(state, task_ids, day).await?;
            Ok(format!("Carried over {moved} task(s) to {day}."))
        }
    }
}

async fn move_task(
    state: &AppState,
    date: NaiveDate,
    reference: &str,
    direction: MoveDirection,
) -> Result<String, String> {
    let task_id = resolve_on(state, date, reference).await?;
    let moved = tasks::commands::move_task(state, task_id, direction).await?;
    if moved {
        let list = tasks::commands::list_tasks(state, date, TaskFilter::default()).await?;
        let selected = selected_task(state).await;
        Ok(render::task_list(&list, selected.as_deref()))
    } else {
        let edge = match direction {
            MoveDirection::Up => "top",
            MoveDirection::Down => "bottom",
        };
        Ok(format!("Already at the {edge}."))
    }
}

async fn run_timer_command(state: &AppState, command: TimerCommand) -> Result<String, String> {
    let snapshot = match command {
        TimerCommand::Status => timer::commands::get_timer_state(state).await?,
        TimerCommand::Start => timer::commands::start_timer(state).await?,
        TimerCommand::Pause => timer::commands::pause_timer(state).await?,
        TimerCommand::Resume => timer::commands::resume_timer(state).await?,
        TimerCommand::Skip => timer::commands::skip_session(state).await?,
        TimerCommand::Complete => timer::commands::complete_session(state).await?,
        TimerCommand::Reset => timer::commands::reset_timer(state).await?,
        TimerCommand::Task { task } => {
            let task_id = match task {
                Some(reference) => Some(resolve_on(state, today(), &reference).await?),
                None => None,
            };
            timer::commands::select_timer_task(state, task_id).await?
        }
        TimerCommand::Durations {
            work,
            short_break,
            long_break,
        } => {
            let current = timer::commands::get_timer_durations(state).await?;
            let durations = if work.is_none() && short_break.is_none() && long_break.is_none() {
                current
            } else {
                timer::commands::set_timer_durations(
                    state,
                    TimerDurations {
                        work_minutes: work.unwrap_or(current.work_minutes),
                        short_break_minutes: short_break.unwrap_or(current.short_break_minutes),
                        long_break_minutes: long_break.unwrap_or(current.long_break_minutes),
                    },
                )
                .await?
            };
            return Ok(format!(
                "work {} min, short break {} min, long break {} min",
                durations.work_minutes, durations.short_break_minutes, durations.long_break_minutes
            ));
        }
        TimerCommand::Refresh { on, off, every } => {
            let mut settings = timer::commands::get_auto_refresh(state).await?;
            if on || off || every.is_some() {
                settings = timer::commands::set_auto_refresh(
                    state,
                    AutoRefreshSettings {
                        enabled: if off { false } else { on || settings.enabled },
                        interval_secs: every.unwrap_or(settings.interval_secs),
                    },
                )
                .await?;
            }
            let status = if settings.enabled { "on" } else { "off" };
            return Ok(format!(
                "auto-refresh {status}, every {}s",
                settings.interval_secs
            ));
        }
        TimerCommand::Watch => return Err("`timer watch` runs from the prompt".into()),
    };
    Ok(render::timer(&snapshot))
}

/// Poll the timer on the auto-refresh interval until the session ends, the
/// timer stops or Ctrl-C. With auto-refresh on, an expired session is
/// completed and recorded.
async fn watch(state: &AppState) -> Result<(), String> {
    let refresh = timer::commands::get_auto_refresh(state).await?;
    let mut ticker = time::interval(Duration::from_secs(refresh.interval_secs.max(1)));
    println!("Watching the timer (Ctrl-C to stop).");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (snapshot, finished) = if refresh.enabled {
                    timer::commands::refresh_timer(state).await?
                } else {
                    (timer::commands::get_timer_state(state).await?, None)
                };
                if let Some(kind) = finished {
                    println!("{kind} finished. Next up:");
                    println!("{}", render::timer(&snapshot));
                    break;
                }
                println!("{}", render::timer(&snapshot));
                if snapshot.status != TimerStatus::Running {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        }
    }
    Ok(())
}
