use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::BallotStore;
use crate::ballot::repo_types::{Ballot, Vote};
use crate::catalog::repo_types::{Candidate, Catalog, Position};
use crate::error::EngineError;
use crate::identity::repo_types::{NewUser, User};
use crate::tally::repo_types::TallyRow;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    positions: Vec<Position>,
    candidates: Vec<Candidate>,
    votes: BTreeMap<(Uuid, Uuid), Vote>, // keyed by (user, position)
}

/// Process-local store with the same constraints as the postgres schema.
/// Writers hold the lock for the whole unit of work, so readers only ever
/// see committed state.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(msg: String) -> EngineError {
    EngineError::StorageConflict(msg)
}

#[async_trait]
impl BallotStore for MemoryStore {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, EngineError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, EngineError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn insert_user(&self, new: &NewUser) -> Result<User, EngineError> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(conflict(format!(
                "duplicate key value violates unique constraint (users_email_key): {}",
                new.email
            )));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: new.name.clone(),
            email: new.email.clone(),
            credential: new.credential.clone(),
            has_voted: false,
            created_at: OffsetDateTime::now_utc(),
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, EngineError> {
        Ok(self.tables.read().await.users.clone())
    }

    async fn catalog(&self) -> Result<Catalog, EngineError> {
        let t = self.tables.read().await;
        Ok(Catalog {
            positions: t.positions.clone(),
            candidates: t.candidates.clone(),
        })
    }

    async fn insert_position(&self, name: &str, category: &str) -> Result<Position, EngineError> {
        let position = Position {
            id: Uuid::new_v4(),
            name: name.to_string(),
            category: category.to_string(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.tables.write().await.positions.push(position.clone());
        Ok(position)
    }

    async fn insert_candidate(
        &self,
        position_id: Uuid,
        name: &str,
        image: Option<&str>,
    ) -> Result<Candidate, EngineError> {
        let mut t = self.tables.write().await;
        if !t.positions.iter().any(|p| p.id == position_id) {
            return Err(conflict(format!(
                "candidate references missing position {position_id}"
            )));
        }
        let candidate = Candidate {
            id: Uuid::new_v4(),
            position_id,
            name: name.to_string(),
            image: image.map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        t.candidates.push(candidate.clone());
        Ok(candidate)
    }

    async fn apply_ballot(&self, user_id: Uuid, ballot: &Ballot) -> Result<(), EngineError> {
        let mut guard = self.tables.write().await;
        let t = &mut *guard;

        let Some(user_idx) = t.users.iter().position(|u| u.id == user_id) else {
            return Err(conflict(format!("vote references missing user {user_id}")));
        };

        // Work on a copy; it only replaces the live table once every row passed.
        let mut staged = t.votes.clone();
        let now = OffsetDateTime::now_utc();
        for (&position_id, &candidate_id) in ballot {
            if !t.positions.iter().any(|p| p.id == position_id) {
                return Err(conflict(format!(
                    "vote references missing position {position_id}"
                )));
            }
            let stands_here = t
                .candidates
                .iter()
                .any(|c| c.id == candidate_id && c.position_id == position_id);
            if !stands_here {
                return Err(conflict(format!(
                    "vote references missing (candidate, position) ({candidate_id}, {position_id})"
                )));
            }
            staged
                .entry((user_id, position_id))
                .and_modify(|v| {
                    v.candidate_id = candidate_id;
                    v.voted_at = now;
                })
                .or_insert_with(|| Vote {
                    id: Uuid::new_v4(),
                    user_id,
                    position_id,
                    candidate_id,
                    voted_at: now,
                });
        }

        t.votes = staged;
        t.users[user_idx].has_voted = true;
        Ok(())
    }

    async fn votes_for_user(&self, user_id: Uuid) -> Result<Vec<Vote>, EngineError> {
        let t = self.tables.read().await;
        Ok(t
            .votes
            .values()
            .filter(|v| v.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn all_votes(&self) -> Result<Vec<Vote>, EngineError> {
        Ok(self.tables.read().await.votes.values().cloned().collect())
    }

    async fn tally(&self) -> Result<Vec<TallyRow>, EngineError> {
        let t = self.tables.read().await;
        let mut rows = Vec::with_capacity(t.candidates.len());
        for p in &t.positions {
            for c in t.candidates.iter().filter(|c| c.position_id == p.id) {
                let votes = t
                    .votes
                    .values()
                    .filter(|v| v.position_id == p.id && v.candidate_id == c.id)
                    .count() as i64;
                rows.push(TallyRow {
                    position_id: p.id,
                    position_name: p.name.clone(),
                    candidate_id: c.id,
                    candidate_name: c.name.clone(),
                    votes,
                });
            }
        }
        Ok(rows)
    }
}
