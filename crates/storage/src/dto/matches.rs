use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Body of `POST /competitions/{id}/generate`
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct GenerateBracketRequest {
    /// Performer ids in seed order (seed 1 first)
    #[validate(length(min = 2, message = "At least two performers are required"))]
    pub performer_ids: Vec<i64>,
}

/// Body of `POST /matches/{id}/start`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct StartVotingRequest {
    /// Voting window in minutes; falls back to the competition's default
    #[validate(range(min = 1, max = 10080, message = "duration must be 1..=10080 minutes"))]
    pub duration: Option<i32>,
}

/// Body of `POST /matches/{id}/vote`
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VoteRequest {
    pub performer_id: i64,

    #[validate(length(min = 1, max = 255))]
    pub voter_id: Option<String>,
}

/// Body of `POST /matches/{id}/complete`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CompleteMatchRequest {
    pub winner_id: Option<i64>,
}
