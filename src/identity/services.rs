use tracing::{debug, info, instrument, warn};

use crate::error::EngineError;
use crate::identity::repo_types::{NewUser, User};
use crate::store::BallotStore;

/// What to do with an identifier nobody has used before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioning {
    /// Create the account on the spot.
    Auto,
    /// Treat it like a wrong secret.
    Strict,
}

impl From<bool> for Provisioning {
    fn from(auto: bool) -> Self {
        if auto {
            Provisioning::Auto
        } else {
            Provisioning::Strict
        }
    }
}

fn check_secret(user: User, secret: &str) -> Result<User, EngineError> {
    if user.credential == secret {
        Ok(user)
    } else {
        warn!(user_id = %user.id, "credential mismatch");
        Err(EngineError::InvalidCredentials)
    }
}

/// Map a credential pair to a user, creating the user when the identifier
/// is new and `provisioning` allows it.
///
/// Two callers racing on the same new identifier both end up with the one
/// row that won the insert: the loser's insert hits the unique constraint
/// and falls back to reading the winner's row.
#[instrument(skip(store, secret))]
pub async fn resolve_identity(
    store: &dyn BallotStore,
    email: &str,
    secret: &str,
    provisioning: Provisioning,
) -> Result<User, EngineError> {
    if let Some(user) = store.find_user_by_email(email).await? {
        return check_secret(user, secret);
    }

    if provisioning == Provisioning::Strict {
        warn!(email, "unknown identifier, provisioning disabled");
        return Err(EngineError::InvalidCredentials);
    }

    match store.insert_user(&NewUser::from_identifier(email, secret)).await {
        Ok(user) => {
            info!(user_id = %user.id, email, "user provisioned on first login");
            Ok(user)
        }
        Err(EngineError::StorageConflict(reason)) => {
            debug!(email, %reason, "lost provisioning race, re-reading");
            match store.find_user_by_email(email).await? {
                Some(user) => check_secret(user, secret),
                None => Err(EngineError::StorageConflict(reason)),
            }
        }
        Err(e) => Err(e),
    }
}

/// Explicit provisioning. A taken identifier is a conflict, not a login.
#[instrument(skip(store, new), fields(email = %new.email))]
pub async fn provision_user(store: &dyn BallotStore, new: &NewUser) -> Result<User, EngineError> {
    let user = store.insert_user(new).await?;
    info!(user_id = %user.id, "user provisioned");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use uuid::Uuid;

    use super::*;
    use crate::ballot::repo_types::{Ballot, Vote};
    use crate::catalog::repo_types::{Candidate, Catalog, Position};
    use crate::store::MemoryStore;
    use crate::tally::repo_types::TallyRow;

    #[tokio::test]
    async fn unknown_identifier_is_provisioned() {
        let store = MemoryStore::new();
        let user = resolve_identity(&store, "john@example.com", "pw", Provisioning::Auto)
            .await
            .unwrap();
        assert_eq!(user.name, "john");
        assert_eq!(user.email, "john@example.com");
        assert!(!user.has_voted);

        let again = resolve_identity(&store, "john@example.com", "pw", Provisioning::Auto)
            .await
            .unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let store = MemoryStore::new();
        resolve_identity(&store, "jane@example.com", "right", Provisioning::Auto)
            .await
            .unwrap();
        let err = resolve_identity(&store, "jane@example.com", "wrong", Provisioning::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
    }

    #[tokio::test]
    async fn strict_mode_does_not_provision() {
        let store = MemoryStore::new();
        let err = resolve_identity(&store, "new@example.com", "pw", Provisioning::Strict)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
        assert!(store.list_users().await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_logins_share_one_row() {
        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                resolve_identity(store.as_ref(), "race@example.com", "pw", Provisioning::Auto)
                    .await
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    /// Pretends another request inserts the same identifier between our
    /// lookup and our insert.
    struct RacingStore {
        inner: MemoryStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl BallotStore for RacingStore {
        async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, EngineError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .insert_user(&NewUser::from_identifier(email, "pw"))
                    .await?;
                return Ok(None);
            }
            self.inner.find_user_by_email(email).await
        }
        async fn find_user(&self, id: Uuid) -> Result<Option<User>, EngineError> {
            self.inner.find_user(id).await
        }
        async fn insert_user(&self, new: &NewUser) -> Result<User, EngineError> {
            self.inner.insert_user(new).await
        }
        async fn list_users(&self) -> Result<Vec<User>, EngineError> {
            self.inner.list_users().await
        }
        async fn catalog(&self) -> Result<Catalog, EngineError> {
            self.inner.catalog().await
        }
        async fn insert_position(&self, n: &str, c: &str) -> Result<Position, EngineError> {
            self.inner.insert_position(n, c).await
        }
        async fn insert_candidate(
            &self,
            p: Uuid,
            n: &str,
            i: Option<&str>,
        ) -> Result<Candidate, EngineError> {
            self.inner.insert_candidate(p, n, i).await
        }
        async fn apply_ballot(&self, u: Uuid, b: &Ballot) -> Result<(), EngineError> {
            self.inner.apply_ballot(u, b).await
        }
        async fn votes_for_user(&self, u: Uuid) -> Result<Vec<Vote>, EngineError> {
            self.inner.votes_for_user(u).await
        }
        async fn all_votes(&self) -> Result<Vec<Vote>, EngineError> {
            self.inner.all_votes().await
        }
        async fn tally(&self) -> Result<Vec<TallyRow>, EngineError> {
            self.inner.tally().await
        }
    }

    #[tokio::test]
    async fn lost_race_falls_back_to_existing_row() {
        let store = RacingStore {
            inner: MemoryStore::new(),
            raced: AtomicBool::new(false),
        };
        let user = resolve_identity(&store, "late@example.com", "pw", Provisioning::Auto)
            .await
            .unwrap();
        let users = store.list_users().await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].id, user.id);

        // The winner registered a different secret; the loser must not get in.
        let store = RacingStore {
            inner: MemoryStore::new(),
            raced: AtomicBool::new(false),
        };
        let err = resolve_identity(&store, "late@example.com", "other", Provisioning::Auto)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidCredentials));
    }

    #[tokio::test]
    async fn explicit_provisioning_rejects_taken_identifier() {
        let store = MemoryStore::new();
        let new = NewUser::from_identifier("dup@example.com", "pw");
        provision_user(&store, &new).await.unwrap();
        let err = provision_user(&store, &new).await.unwrap_err();
        assert!(matches!(err, EngineError::StorageConflict(_)));
    }
}
