use tracing::{debug, instrument};

use crate::error::EngineError;
use crate::store::BallotStore;
use crate::tally::repo_types::TallyRow;

/// Vote count for every (position, candidate) pair in the catalog.
/// Candidates nobody voted for are listed with 0; row order follows the
/// catalog and is the same for the same data.
#[instrument(skip(store))]
pub async fn tally(store: &dyn BallotStore) -> Result<Vec<TallyRow>, EngineError> {
    let rows = store.tally().await?;
    debug!(rows = rows.len(), "tally computed");
    Ok(rows)
}
