use async_trait::async_trait;
use uuid::Uuid;

use crate::ballot::repo_types::{Ballot, Vote};
use crate::catalog::repo_types::{Candidate, Catalog, Position};
use crate::error::EngineError;
use crate::identity::repo_types::{NewUser, User};
use crate::tally::repo_types::TallyRow;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable home of users, positions, candidates and votes.
///
/// Implementations enforce the same integrity rules:
/// - identifiers (`users.email`) are unique; a duplicate insert is
///   [`EngineError::StorageConflict`],
/// - at most one vote per (user, position),
/// - a vote's candidate stands for the vote's position,
/// - [`BallotStore::apply_ballot`] lands completely or not at all, and
///   readers never observe it half-applied.
#[async_trait]
pub trait BallotStore: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, EngineError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, EngineError>;
    async fn insert_user(&self, new: &NewUser) -> Result<User, EngineError>;
    async fn list_users(&self) -> Result<Vec<User>, EngineError>;

    async fn catalog(&self) -> Result<Catalog, EngineError>;
    async fn insert_position(&self, name: &str, category: &str) -> Result<Position, EngineError>;
    async fn insert_candidate(
        &self,
        position_id: Uuid,
        name: &str,
        image: Option<&str>,
    ) -> Result<Candidate, EngineError>;

    /// Upsert every (position, candidate) entry for the user, then set
    /// `has_voted`, as one unit of work.
    async fn apply_ballot(&self, user_id: Uuid, ballot: &Ballot) -> Result<(), EngineError>;
    async fn votes_for_user(&self, user_id: Uuid) -> Result<Vec<Vote>, EngineError>;
    async fn all_votes(&self) -> Result<Vec<Vote>, EngineError>;

    /// Vote counts for every (position, candidate) pair, zero-filled, in
    /// catalog order.
    async fn tally(&self) -> Result<Vec<TallyRow>, EngineError>;
}
