pub mod commands;
pub mod controller;
pub mod history;
pub mod state;

pub use controller::TimerController;
pub use history::{format_time, HistoryStats};
pub use state::{PomodoroState, TimerDurations, TimerSnapshot, TimerState, TimerStatus};
