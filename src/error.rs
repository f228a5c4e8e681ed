use thiserror::Error;

/// Typed failure returned by every fallible store, auth and timer operation.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("database error: {0:#}")]
    Database(anyhow::Error),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }
}

// Closures running on the DB thread return `anyhow::Result`; an `AppError`
// raised inside them travels through anyhow and is recovered here intact.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<AppError>() {
            Ok(app_error) => app_error,
            Err(other) => AppError::Database(other),
        }
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::Database(anyhow::Error::new(err))
    }
}
