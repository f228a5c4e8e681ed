pub mod session;
pub mod task;
pub mod user;

pub use session::{PomodoroSession, SessionKind};
pub use task::{Category, MoveDirection, NewTask, Priority, Task, TaskUpdate};
pub use user::{Credentials, CurrentUser, UserProfile};
