use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    error::EngineError,
    identity::{
        dto::{CreateUserRequest, LoginRequest, LoginResponse, PublicUser, UsersResponse},
        jwt::{AuthUser, JwtKeys},
        repo_types::{display_name, NewUser},
        services::{provision_user, resolve_identity},
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/login", post(login))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", get(list_users).post(create_user))
}

fn normalize_identifier(raw: &str) -> Result<String, (StatusCode, String)> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "email is required".into()));
    }
    Ok(email)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let email = normalize_identifier(&payload.email)?;

    let user = resolve_identity(
        state.store.as_ref(),
        &email,
        &payload.password,
        state.config.auto_provision_users.into(),
    )
    .await
    .map_err(|e| {
        match &e {
            EngineError::InvalidCredentials => warn!(%email, "login rejected"),
            _ => error!(error = %e, %email, "resolve_identity failed"),
        }
        e
    })?;

    let access_token = JwtKeys::from_ref(&state).sign(user.id).map_err(|e| {
        error!(error = %e, "jwt sign failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(user_id = %user.id, %email, "user logged in");
    Ok(Json(LoginResponse {
        success: true,
        access_token,
        user: user.into(),
    }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    match state.store.find_user(user_id).await? {
        Some(user) => Ok(Json(user.into())),
        None => {
            error!(%user_id, "user not found");
            Err((StatusCode::UNAUTHORIZED, "User not found".into()))
        }
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<UsersResponse>, (StatusCode, String)> {
    let users = state.store.list_users().await.map_err(|e| {
        error!(error = %e, "list_users failed");
        e
    })?;
    Ok(Json(UsersResponse {
        users: users.into_iter().map(PublicUser::from).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), (StatusCode, String)> {
    let email = normalize_identifier(&payload.email)?;
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| display_name(&email));

    let new = NewUser {
        name,
        email,
        credential: payload.password,
    };
    let user = provision_user(state.store.as_ref(), &new)
        .await
        .map_err(|e| match e {
            EngineError::StorageConflict(_) => {
                warn!(email = %new.email, "identifier already registered");
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            other => other.into(),
        })?;

    Ok((StatusCode::CREATED, Json(user.into())))
}
