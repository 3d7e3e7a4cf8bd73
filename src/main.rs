mod app;
mod ballot;
mod catalog;
mod config;
mod error;
mod identity;
mod seed;
mod state;
mod store;
mod tally;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "ballotbox=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    if app_state.config.seed_sample_data {
        if let Err(e) = seed::seed_sample_data(app_state.store.as_ref()).await {
            tracing::warn!(error = %e, "seeding sample data failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}
