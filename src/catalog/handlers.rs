use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use tracing::{error, instrument};

use crate::{catalog::dto::PositionsResponse, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new().route("/positions", get(list_positions))
}

#[instrument(skip(state))]
pub async fn list_positions(
    State(state): State<AppState>,
) -> Result<Json<PositionsResponse>, (StatusCode, String)> {
    let catalog = state.store.catalog().await.map_err(|e| {
        error!(error = %e, "load catalog failed");
        e
    })?;
    Ok(Json(catalog.into()))
}
