use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument, warn};

use crate::{
    ballot::{
        dto::{MyVotesResponse, VoteRequest, VoteResponse},
        services::cast_ballot,
    },
    error::EngineError,
    identity::jwt::AuthUser,
    state::AppState,
};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/me/votes", get(my_votes))
}

pub fn write_routes() -> Router<AppState> {
    Router::new().route("/vote", post(vote))
}

/// POST /vote
#[instrument(skip(state, body))]
pub async fn vote(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(body): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, (StatusCode, String)> {
    if let Some(claimed) = body.user_id {
        if claimed != user_id {
            warn!(%user_id, %claimed, "ballot for another user");
            return Err((StatusCode::FORBIDDEN, "user_id does not match session".into()));
        }
    }

    cast_ballot(state.store.as_ref(), user_id, &body.votes)
        .await
        .map_err(|e| {
            if matches!(e, EngineError::InvalidBallot(_)) {
                warn!(error = %e, %user_id, "ballot refused");
            } else {
                error!(error = %e, %user_id, "saving ballot failed");
            }
            e
        })?;

    Ok(Json(VoteResponse { success: true }))
}

/// GET /me/votes
#[instrument(skip(state))]
pub async fn my_votes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MyVotesResponse>, (StatusCode, String)> {
    let Some(user) = state.store.find_user(user_id).await? else {
        return Err((StatusCode::UNAUTHORIZED, "User not found".into()));
    };
    let votes = state.store.votes_for_user(user_id).await?;
    Ok(Json(MyVotesResponse {
        has_voted: user.has_voted,
        votes,
    }))
}
