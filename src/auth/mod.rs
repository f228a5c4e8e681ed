//! Local email/password accounts.
//!
//! Passwords are stored as Argon2id PHC strings. The salt and cost
//! parameters travel inside the string, so there is no separate salt column.

pub mod commands;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use uuid::Uuid;

use crate::{
    db::{
        models::{Credentials, CurrentUser},
        Database,
    },
    error::{AppError, AppResult},
};

const ENABLE_LOGS: bool = true;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_DISPLAY_NAME_LENGTH: usize = 100;

#[derive(Clone)]
pub struct Authenticator {
    db: Database,
}

impl Authenticator {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> AppResult<CurrentUser> {
        let email = normalize_email(email)?;
        validate_password(password)?;
        let display_name = normalize_display_name(display_name)?;

        let credentials = Credentials {
            user_id: Uuid::new_v4().to_string(),
            email: email.clone(),
            password_hash: hash_password(password)?,
        };

        let profile = self.db.insert_user(&credentials, &display_name).await?;
        crate::log_info!("Registered user {}", profile.id);

        Ok(CurrentUser {
            id: profile.id,
            email,
            display_name: profile.display_name,
        })
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<CurrentUser> {
        let email = normalize_email(email)?;
        let credentials = self
            .db
            .get_credentials_by_email(&email)
            .await?
            .filter(|stored| verify(stored, password))
            .ok_or_else(|| AppError::Auth("invalid email or password".into()))?;

        let profile = self.db.get_user_profile(&credentials.user_id).await?;
        crate::log_info!("User {} signed in", credentials.user_id);

        Ok(CurrentUser {
            id: credentials.user_id,
            email: credentials.email,
            display_name: profile.display_name,
        })
    }
}

fn normalize_email(email: &str) -> AppResult<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::validation("please enter a valid email address"));
    }
    Ok(email)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn normalize_display_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("display name is required"));
    }
    if name.chars().count() > MAX_DISPLAY_NAME_LENGTH {
        return Err(AppError::validation(format!(
            "display name must be at most {MAX_DISPLAY_NAME_LENGTH} characters"
        )));
    }
    Ok(name.to_string())
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Database(anyhow::anyhow!("failed to hash password: {err}")))
}

fn verify(credentials: &Credentials, password: &str) -> bool {
    match PasswordHash::new(&credentials.password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            crate::log_warn!("Unreadable password hash for {}: {}", credentials.user_id, err);
            false
        }
    }
}
