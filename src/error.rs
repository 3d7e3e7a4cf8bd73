use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

/// Why a ballot was refused before anything was written.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BallotRejection {
    #[error("user {0} does not exist")]
    UnknownUser(Uuid),
    #[error("position {0} does not exist")]
    UnknownPosition(Uuid),
    #[error("candidate {candidate_id} for position {position_id} does not exist")]
    UnknownCandidate { position_id: Uuid, candidate_id: Uuid },
    #[error(
        "candidate {candidate_id} stands for position {actual_position_id}, not {position_id}"
    )]
    CandidatePositionMismatch {
        position_id: Uuid,
        candidate_id: Uuid,
        actual_position_id: Uuid,
    },
}

/// Errors returned by the ballot engine. None of them is fatal to the process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid ballot: {0}")]
    InvalidBallot(#[from] BallotRejection),
    /// A constraint fired that validation did not anticipate. Retry the whole operation.
    #[error("storage conflict: {0}")]
    StorageConflict(String),
    /// Connection or transport failure. Retryable by the caller.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
}

impl EngineError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EngineError::StorageConflict(_) | EngineError::StorageUnavailable(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            EngineError::InvalidBallot(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::StorageConflict(_) => StatusCode::CONFLICT,
            EngineError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

// SQLSTATE codes that postgres raises when concurrent transactions collide.
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) => {
                let collided = db
                    .code()
                    .map(|c| c == SERIALIZATION_FAILURE || c == DEADLOCK_DETECTED)
                    .unwrap_or(false);
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation()
                    || collided
                {
                    let constraint = db.constraint().unwrap_or("-");
                    EngineError::StorageConflict(format!("{} ({})", db.message(), constraint))
                } else {
                    EngineError::StorageUnavailable(e.to_string())
                }
            }
            _ => EngineError::StorageUnavailable(e.to_string()),
        }
    }
}

impl From<EngineError> for (StatusCode, String) {
    fn from(e: EngineError) -> Self {
        (e.status(), e.to_string())
    }
}
