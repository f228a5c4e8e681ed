use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use crate::{
    db::{
        connection::Database,
        helpers::{format_timestamp, parse_datetime, stored_now},
        models::{Credentials, UserProfile},
    },
    error::{AppError, AppResult},
};

fn row_to_credentials(row: &Row) -> rusqlite::Result<Credentials> {
    Ok(Credentials {
        user_id: row.get("id")?,
        email: row.get("email")?,
        password_hash: row.get("password_hash")?,
    })
}

fn row_to_profile(row: &Row) -> Result<UserProfile> {
    let created_at: String = row.get("created_at")?;
    Ok(UserProfile {
        id: row.get("id")?,
        display_name: row.get("display_name")?,
        created_at: parse_datetime(&created_at, "created_at")?,
    })
}

impl Database {
    /// Store credentials and the matching profile row together.
    pub async fn insert_user(&self, credentials: &Credentials, display_name: &str) -> AppResult<UserProfile> {
        let credentials = credentials.clone();
        let display_name = display_name.to_string();

        let profile = self
            .execute(move |conn| {
                let tx = conn.transaction()?;
                let existing: Option<String> = tx
                    .query_row(
                        "SELECT id FROM users WHERE email = ?1",
                        params![credentials.email],
                        |row| row.get(0),
                    )
                    .optional()?;
                if existing.is_some() {
                    return Err(AppError::Auth("this email address is already registered".into()).into());
                }

                let now = stored_now();
                tx.execute(
                    "INSERT INTO users (id, email, password_hash, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        credentials.user_id,
                        credentials.email,
                        credentials.password_hash,
                        format_timestamp(&now),
                    ],
                )?;
                tx.execute(
                    "INSERT INTO user_profiles (id, display_name, created_at) VALUES (?1, ?2, ?3)",
                    params![credentials.user_id, display_name, format_timestamp(&now)],
                )?;
                tx.commit()?;

                Ok(UserProfile {
                    id: credentials.user_id,
                    display_name,
                    created_at: now,
                })
            })
            .await?;
        Ok(profile)
    }

    pub async fn get_credentials_by_email(&self, email: &str) -> AppResult<Option<Credentials>> {
        let email = email.to_string();
        let credentials = self
            .execute(move |conn| {
                Ok(conn
                    .query_row(
                        "SELECT id, email, password_hash FROM users WHERE email = ?1",
                        params![email],
                        row_to_credentials,
                    )
                    .optional()?)
            })
            .await?;
        Ok(credentials)
    }

    pub async fn get_user_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let user_id = user_id.to_string();
        let profile = self
            .execute(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, display_name, created_at FROM user_profiles WHERE id = ?1",
                )?;
                let mut rows = stmt.query(params![user_id])?;
                match rows.next()? {
                    Some(row) => row_to_profile(row),
                    None => Err(AppError::not_found(format!("profile for user {user_id}")).into()),
                }
            })
            .await?;
        Ok(profile)
    }
}
