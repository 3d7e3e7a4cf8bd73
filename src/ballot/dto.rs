use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ballot::repo_types::{Ballot, Vote};

/// Request body for casting a ballot: `{ "votes": { position_id: candidate_id } }`.
#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Older clients send their own id; when present it must match the token.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub votes: Ballot,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct MyVotesResponse {
    pub has_voted: bool,
    pub votes: Vec<Vote>,
}
