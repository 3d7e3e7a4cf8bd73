use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Where ballots are kept.
#[derive(Debug, Clone, Deserialize)]
pub enum StoreBackend {
    Postgres(DbConfig),
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreBackend,
    pub jwt: JwtConfig,
    /// Unknown identifiers get an account on first login.
    pub auto_provision_users: bool,
    pub seed_sample_data: bool,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("BALLOT_STORE")
            .unwrap_or_else(|_| "postgres".into())
            .as_str()
        {
            "postgres" => StoreBackend::Postgres(DbConfig {
                url: std::env::var("DATABASE_URL")?,
                max_connections: env_or("DB_MAX_CONNECTIONS", 10),
                acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
            }),
            "memory" => StoreBackend::Memory,
            other => anyhow::bail!("unknown BALLOT_STORE {other:?}, expected postgres or memory"),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "ballotbox".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "ballotbox-voters".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
        };
        Ok(Self {
            store,
            jwt,
            auto_provision_users: env_or("AUTO_PROVISION_USERS", true),
            seed_sample_data: env_or("SEED_SAMPLE_DATA", false),
        })
    }
}
