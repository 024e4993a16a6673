use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Vote {
    pub vote_id: i64,
    pub match_id: i64,
    pub voter_token: String,
    pub performer_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVote {
    pub match_id: i64,
    pub voter_token: String,
    pub performer_id: i64,
}

/// What the store did with a submitted vote
#[derive(Debug, Clone, PartialEq)]
pub enum VoteRecord {
    /// The vote was stored and the counter incremented. Carries the match as
    /// it reads after the increment.
    Counted(super::Match),
    /// The voter token already voted on this match; nothing changed.
    Duplicate,
}
