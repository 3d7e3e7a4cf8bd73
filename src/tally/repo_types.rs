use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Vote count for one (position, candidate) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct TallyRow {
    pub position_id: Uuid,
    pub position_name: String,
    pub candidate_id: Uuid,
    pub candidate_name: String,
    pub votes: i64,
}
