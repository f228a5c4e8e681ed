pub mod commands;
pub mod filter;

pub use filter::{completion_rate, DaySummary, TaskFilter};
