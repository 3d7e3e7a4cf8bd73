use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// position id -> chosen candidate id. Ordered so writes always touch
/// positions in the same sequence.
pub type Ballot = BTreeMap<Uuid, Uuid>;

/// Vote record in the database. One row per (user, position).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Vote {
    pub id: Uuid,
    pub user_id: Uuid,
    pub position_id: Uuid,
    pub candidate_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub voted_at: OffsetDateTime,
}
