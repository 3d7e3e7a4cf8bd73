use crate::config::{AppConfig, StoreBackend};
use crate::store::{BallotStore, MemoryStore, PgStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn BallotStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = match &config.store {
            StoreBackend::Postgres(db) => {
                let pg = PgStore::connect(db).await?;
                if let Err(e) = pg.migrate().await {
                    tracing::warn!(error = %e, "migration failed; continuing");
                }
                Arc::new(pg) as Arc<dyn BallotStore>
            }
            StoreBackend::Memory => {
                tracing::warn!("using in-memory store; votes are lost on restart");
                Arc::new(MemoryStore::new()) as Arc<dyn BallotStore>
            }
        };

        Ok(Self { config, store })
    }

    /// State over a fresh in-memory store with fixed test settings.
    #[cfg(test)]
    pub fn fake() -> Self {
        let config = Arc::new(AppConfig {
            store: StoreBackend::Memory,
            jwt: crate::config::JwtConfig {
                secret: "test".into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            auto_provision_users: true,
            seed_sample_data: false,
        });

        let store = Arc::new(MemoryStore::new()) as Arc<dyn BallotStore>;
        Self { config, store }
    }
}
