use crate::{
    db::{models::CurrentUser, Database},
    error::AppError,
    timer::{TimerController, TimerDurations},
    AppState,
};

/// Everything that belongs to the signed-in user. Built at login, dropped at
/// logout along with any running timer.
#[derive(Clone)]
pub struct UserContext {
    pub user: CurrentUser,
    pub timer: TimerController,
}

impl UserContext {
    pub fn new(db: Database, user: CurrentUser, durations: TimerDurations) -> Self {
        let timer = TimerController::new(db, user.id.clone(), durations);
        Self { user, timer }
    }
}

/// The signed-in user's context, or an error telling them to sign in.
pub(crate) async fn require_user(state: &AppState) -> Result<UserContext, String> {
    state
        .session
        .lock()
        .await
        .clone()
        .ok_or_else(|| AppError::Auth("please sign in first".into()).to_string())
}
