use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Stored login material. Never leaves the auth layer.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    pub email: String,
    /// Argon2 PHC string; carries its own salt and parameters.
    pub password_hash: String,
}

/// The signed-in user as seen by the rest of the app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
}
