use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};

use crate::db::models::{Category, Priority};

/// One line typed at the prompt.
#[derive(Parser, Debug)]
#[command(
    name = "monkmode",
    no_binary_name = true,
    disable_version_flag = true,
    disable_help_subcommand = true
)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Subcommand, Debug)]
pub enum ShellCommand {
    /// Create an account and sign in
    Signup {
        email: String,
        password: String,
        /// Name shown on the dashboard
        #[arg(num_args = 1.., required = true)]
        display_name: Vec<String>,
    },

    /// Sign in with email and password
    Login { email: String, password: String },

    /// Sign out and drop the running timer
    Logout,

    /// Show who is signed in
    Whoami,

    /// Today's progress, timer and carryover candidates
    Dashboard {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Manage daily tasks
    #[command(subcommand)]
    Tasks(TaskCommand),

    /// Pomodoro timer
    #[command(subcommand)]
    Timer(TimerCommand),

    /// Completed Pomodoro sessions for a day
    History {
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show available commands
    Help,

    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
}

/// Task references accept a 1-based position in the day's list, a full id
/// or a unique id prefix.
#[derive(Subcommand, Debug)]
pub enum TaskCommand {
    /// List tasks for a day
    List {
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        hide_completed: bool,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        priority: Option<Priority>,
    },

    /// Add a task
    Add {
        #[arg(num_args = 1.., required = true)]
        title: Vec<String>,
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short, default_value = "other")]
        category: Category,
        #[arg(long, short, default_value = "medium")]
        priority: Priority,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Edit a task's fields
    Edit {
        task: String,
        #[arg(long, short)]
        title: Option<String>,
        /// Pass an empty string to clear
        #[arg(long, short)]
        description: Option<String>,
        #[arg(long, short)]
        category: Option<Category>,
        #[arg(long, short)]
        priority: Option<Priority>,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Toggle completion
    Done {
        task: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Delete a task
    Rm {
        task: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Move a task one place up
    Up {
        task: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Move a task one place down
    Down {
        task: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show yesterday's unfinished tasks
    Pending,

    /// Bring yesterday's unfinished tasks to today (all of them if no ids)
    Carryover { tasks: Vec<String> },
}

#[derive(Subcommand, Debug)]
pub enum TimerCommand {
    Status,
    Start,
    Pause,
    Resume,
    /// Drop the current session without recording it
    Skip,
    /// Record the finished session and start the next one
    Complete,
    /// Stop and clear the work-session count
    Reset,
    /// Credit work sessions to a task (omit to clear)
    Task { task: Option<String> },
    /// Refresh every few seconds until the session ends (Ctrl-C stops)
    Watch,
    /// Show or change session lengths in minutes
    Durations {
        #[arg(long)]
        work: Option<u32>,
        #[arg(long)]
        short_break: Option<u32>,
        #[arg(long)]
        long_break: Option<u32>,
    },
    /// Show or change auto-refresh used by `timer watch`
    Refresh {
        #[arg(long, conflicts_with = "off")]
        on: bool,
        #[arg(long)]
        off: bool,
        /// Polling interval in seconds
        #[arg(long)]
        every: Option<u64>,
    },
}

/// Split a prompt line into words with POSIX shell quoting rules.
pub fn split_words(line: &str) -> Result<Vec<String>, String> {
    shell_words::split(line).map_err(|err| err.to_string())
}

/// Long help for every prompt command, generated from the parser.
pub fn help() -> String {
    ShellLine::command().render_long_help().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> ShellCommand {
        ShellLine::try_parse_from(split_words(line).unwrap())
            .unwrap()
            .command
    }

    #[test]
    fn splits_quoted_words() {
        assert_eq!(
            split_words(r#"tasks add "read a book" -d 'two chapters'"#).unwrap(),
            ["tasks", "add", "read a book", "-d", "two chapters"]
        );
        assert_eq!(split_words(r#"a\ b """#).unwrap(), ["a b", ""]);
        assert_eq!(split_words("   ").unwrap(), Vec::<String>::new());
        assert!(split_words(r#"tasks add "oops"#).is_err());
    }

    #[test]
    fn single_quotes_keep_backslashes() {
        assert_eq!(
            split_words(r"tasks add notes -d 'C:\notes\todo'").unwrap(),
            ["tasks", "add", "notes", "-d", r"C:\notes\todo"]
        );
        assert_eq!(split_words(r#""say \"hi\"""#).unwrap(), [r#"say "hi""#]);
    }

    #[test]
    fn help_lists_every_command() {
        let help = help();
        for name in ["signup", "login", "dashboard", "tasks", "timer", "history", "quit"] {
            assert!(help.contains(name), "help is missing {name}:\n{help}");
        }
        assert!(help.contains("Leave the shell"));
    }

    #[test]
    fn parses_task_add_with_defaults() {
        match parse("tasks add Morning run --category exercise") {
            ShellCommand::Tasks(TaskCommand::Add {
                title,
                category,
                priority,
                date,
                ..
            }) => {
                assert_eq!(title.join(" "), "Morning run");
                assert_eq!(category, Category::Exercise);
                assert_eq!(priority, Priority::Medium);
                assert_eq!(date, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_dates_and_filters() {
        match parse("tasks list --date 2024-03-01 --hide-completed --priority h") {
            ShellCommand::Tasks(TaskCommand::List {
                date,
                hide_completed,
                priority,
                category,
            }) => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1));
                assert!(hide_completed);
                assert_eq!(priority, Some(Priority::High));
                assert_eq!(category, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn parses_timer_durations() {
        match parse("timer durations --work 50 --short-break 10") {
            ShellCommand::Timer(TimerCommand::Durations {
                work,
                short_break,
                long_break,
            }) => {
                assert_eq!(work, Some(50));
                assert_eq!(short_break, Some(10));
                assert_eq!(long_break, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_category() {
        let words = split_words("tasks add x --category chores").unwrap();
        assert!(ShellLine::try_parse_from(words).is_err());
    }

    #[test]
    fn exit_is_an_alias_for_quit() {
        assert!(matches!(parse("exit"), ShellCommand::Quit));
    }
}
