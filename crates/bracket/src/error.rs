use storage::error::StorageError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BracketError>;

#[derive(Debug, Error)]
pub enum BracketError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("At least two performers are required, got {0}")]
    InsufficientParticipants(usize),

    #[error("Performer {0} is listed more than once")]
    DuplicatePerformer(i64),

    #[error("Match is still waiting on an earlier result")]
    NotReady,

    #[error("Performer {0} is not part of this match")]
    InvalidChoice(i64),

    #[error("Voting is closed for this match")]
    VotingClosed,

    #[error("Votes are tied; an explicit winner is required")]
    AmbiguousResult,

    #[error("Voting duration must be positive, got {0} minutes")]
    InvalidDuration(i32),

    #[error("Inconsistent bracket: {0}")]
    InvalidBracket(String),

    #[error("Persistence failure: {0}")]
    Persistence(StorageError),
}

impl From<StorageError> for BracketError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound => Self::NotFound("Record"),
            StorageError::Conflict(reason) => Self::InvalidState(reason),
            other => Self::Persistence(other),
        }
    }
}

/// Maps a store lookup failure onto a named missing entity
pub(crate) fn missing(entity: &'static str) -> impl Fn(StorageError) -> BracketError {
    move |error| match error {
        StorageError::NotFound => BracketError::NotFound(entity),
        other => other.into(),
    }
}
