use std::collections::HashMap;

use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Position {
    pub id: Uuid,
    pub name: String,
    pub category: String, // display grouping only
    #[serde(skip_serializing)]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Candidate {
    pub id: Uuid,
    pub position_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    #[serde(skip_serializing)]
    pub created_at: OffsetDateTime,
}

/// All positions and candidates, each list in creation order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub positions: Vec<Position>,
    pub candidates: Vec<Candidate>,
}

impl Catalog {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn position_index(&self) -> HashMap<Uuid, &Position> {
        self.positions.iter().map(|p| (p.id, p)).collect()
    }

    pub fn candidate_index(&self) -> HashMap<Uuid, &Candidate> {
        self.candidates.iter().map(|c| (c.id, c)).collect()
    }

    pub fn candidates_for(&self, position_id: Uuid) -> impl Iterator<Item = &Candidate> {
        self.candidates
            .iter()
            .filter(move |c| c.position_id == position_id)
    }
}
