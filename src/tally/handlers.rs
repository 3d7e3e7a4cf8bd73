use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::{error, instrument};

use crate::{
    state::AppState,
    tally::{repo_types::TallyRow, services::tally},
};

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<TallyRow>,
}

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/results", get(results))
}

#[instrument(skip(state))]
pub async fn results(
    State(state): State<AppState>,
) -> Result<Json<ResultsResponse>, (StatusCode, String)> {
    let results = tally(state.store.as_ref()).await.map_err(|e| {
        error!(error = %e, "tally failed");
        e
    })?;
    Ok(Json(ResultsResponse { results }))
}
