use crate::{
    auth::Authenticator,
    db::models::CurrentUser,
    session::UserContext,
    AppState,
};

const ENABLE_LOGS: bool = true;

async fn open_session(state: &AppState, user: CurrentUser) -> CurrentUser {
    let context = UserContext::new(state.db.clone(), user.clone(), state.settings.timer_durations());
    *state.session.lock().await = Some(context);
    user
}

pub async fn sign_up(
    state: &AppState,
    email: String,
    password: String,
    display_name: String,
) -> Result<CurrentUser, String> {
    let user = Authenticator::new(state.db.clone())
        .sign_up(&email, &password, &display_name)
        .await
        .map_err(|e| {
            crate::log_warn!("Sign-up failed: {}", e);
            e.to_string()
        })?;
    Ok(open_session(state, user).await)
}

pub async fn sign_in(state: &AppState, email: String, password: String) -> Result<CurrentUser, String> {
    let user = Authenticator::new(state.db.clone())
        .sign_in(&email, &password)
        .await
        .map_err(|e| {
            crate::log_warn!("Sign-in failed: {}", e);
            e.to_string()
        })?;
    Ok(open_session(state, user).await)
}

/// Drop the session context. Returns whether anyone was signed in.
pub async fn sign_out(state: &AppState) -> Result<bool, String> {
    let previous = state.session.lock().await.take();
    if let Some(ctx) = &previous {
        crate::log_info!("User {} signed out", ctx.user.id);
    }
    Ok(previous.is_some())
}

pub async fn current_user(state: &AppState) -> Result<Option<CurrentUser>, String> {
    Ok(state
        .session
        .lock()
        .await
        .as_ref()
        .map(|ctx| ctx.user.clone()))
}
