use serde::Serialize;
use uuid::Uuid;

use crate::catalog::repo_types::{Candidate, Catalog};

#[derive(Debug, Serialize)]
pub struct PositionView {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub positions: Vec<PositionView>,
}

impl From<Catalog> for PositionsResponse {
    fn from(catalog: Catalog) -> Self {
        let positions = catalog
            .positions
            .iter()
            .map(|p| PositionView {
                id: p.id,
                name: p.name.clone(),
                category: p.category.clone(),
                candidates: catalog.candidates_for(p.id).cloned().collect(),
            })
            .collect();
        Self { positions }
    }
}
