use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String, // login identifier, unique
    #[serde(skip_serializing)]
    pub credential: String, // opaque, compared for equality only
    pub has_voted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Values for a user row that does not exist yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub credential: String,
}

impl NewUser {
    /// Display name defaults to the part of the identifier before `@`.
    pub fn from_identifier(email: &str, credential: &str) -> Self {
        Self {
            name: display_name(email),
            email: email.to_string(),
            credential: credential.to_string(),
        }
    }
}

pub fn display_name(email: &str) -> String {
    match email.split_once('@') {
        Some((local, _)) if !local.is_empty() => local.to_string(),
        _ => email.to_string(),
    }
}
