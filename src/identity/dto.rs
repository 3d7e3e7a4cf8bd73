use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::repo_types::User;

/// Request body for login (identity resolution).
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for explicit provisioning.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: Option<String>,
    pub email: String,
    pub password: String,
}

/// User fields that are safe to hand out.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub has_voted: bool,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            has_voted: u.has_voted,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub access_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<PublicUser>,
}
