use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

use super::BallotStore;
use crate::ballot::repo::{list_all_votes, list_votes_by_user, mark_voted_tx, upsert_vote_tx};
use crate::ballot::repo_types::{Ballot, Vote};
use crate::catalog::repo::{insert_candidate, insert_position, load_catalog};
use crate::catalog::repo_types::{Candidate, Catalog, Position};
use crate::config::DbConfig;
use crate::error::EngineError;
use crate::identity::repo_types::{NewUser, User};
use crate::tally::repo::count_votes;
use crate::tally::repo_types::TallyRow;

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
            .connect(&cfg.url)
            .await
            .context("connect to database")?;
        info!(max_connections = cfg.max_connections, "postgres pool ready");
        Ok(Self { db })
    }

    #[cfg(test)]
    pub fn from_pool(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[async_trait]
impl BallotStore for PgStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, EngineError> {
        Ok(User::find_by_email(&self.db, email).await?)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, EngineError> {
        Ok(User::find_by_id(&self.db, id).await?)
    }

    async fn insert_user(&self, new: &NewUser) -> Result<User, EngineError> {
        Ok(User::create(&self.db, new).await?)
    }

    async fn list_users(&self) -> Result<Vec<User>, EngineError> {
        Ok(User::list(&self.db).await?)
    }

    async fn catalog(&self) -> Result<Catalog, EngineError> {
        Ok(load_catalog(&self.db).await?)
    }

    async fn insert_position(&self, name: &str, category: &str) -> Result<Position, EngineError> {
        Ok(insert_position(&self.db, name, category).await?)
    }

    async fn insert_candidate(
        &self,
        position_id: Uuid,
        name: &str,
        image: Option<&str>,
    ) -> Result<Candidate, EngineError> {
        Ok(insert_candidate(&self.db, position_id, name, image).await?)
    }

    async fn apply_ballot(&self, user_id: Uuid, ballot: &Ballot) -> Result<(), EngineError> {
        // Any early return drops `tx`, which rolls the whole ballot back.
        let mut tx = self.db.begin().await?;
        for (position_id, candidate_id) in ballot {
            upsert_vote_tx(&mut tx, user_id, *position_id, *candidate_id).await?;
            debug!(%user_id, %position_id, %candidate_id, "vote upserted");
        }
        if !mark_voted_tx(&mut tx, user_id).await? {
            return Err(EngineError::StorageConflict(format!(
                "user {user_id} vanished while recording"
            )));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn votes_for_user(&self, user_id: Uuid) -> Result<Vec<Vote>, EngineError> {
        Ok(list_votes_by_user(&self.db, user_id).await?)
    }

    async fn all_votes(&self) -> Result<Vec<Vote>, EngineError> {
        Ok(list_all_votes(&self.db).await?)
    }

    async fn tally(&self) -> Result<Vec<TallyRow>, EngineError> {
        Ok(count_votes(&self.db).await?)
    }
}
