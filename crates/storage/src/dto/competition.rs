use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{
    Competition, CompetitionChanges, CompetitionStatus, CompetitionType, NewCompetition,
    VotingMethod,
};

/// Request payload for creating a new competition
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateCompetitionRequest {
    #[validate(range(min = 1, message = "festival_id must be a positive id"))]
    pub festival_id: i64,

    #[validate(length(
        min = 1,
        max = 255,
        message = "Name must be between 1 and 255 characters"
    ))]
    pub name: String,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[serde(default = "default_competition_type")]
    pub competition_type: CompetitionType,

    #[serde(default = "default_voting_method")]
    pub voting_method: VotingMethod,

    /// Default voting window in minutes; the server default when absent
    #[validate(range(min = 1, max = 10080, message = "voting_duration must be 1..=10080 minutes"))]
    pub voting_duration: Option<i32>,

    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
}

/// Request payload for updating an existing competition
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateCompetitionRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    pub competition_type: Option<CompetitionType>,

    pub voting_method: Option<VotingMethod>,

    #[validate(range(min = 1, max = 10080))]
    pub voting_duration: Option<i32>,

    #[schema(value_type = Option<Object>)]
    pub config: Option<serde_json::Value>,
}

/// Response containing competition details
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompetitionResponse {
    pub competition_id: i64,
    pub festival_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub competition_type: CompetitionType,
    pub voting_method: VotingMethod,
    pub voting_duration: i32,
    pub status: CompetitionStatus,
    pub rounds_count: i32,
    pub current_round: i32,
    pub winner_performer_id: Option<i64>,
    #[schema(value_type = Object)]
    pub config: serde_json::Value,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

fn default_competition_type() -> CompetitionType {
    CompetitionType::SingleElimination
}

fn default_voting_method() -> VotingMethod {
    VotingMethod::HeadToHead
}

impl CreateCompetitionRequest {
    pub fn into_new_competition(self, default_voting_duration: i32) -> NewCompetition {
        NewCompetition {
            festival_id: self.festival_id,
            name: self.name,
            description: self.description,
            competition_type: self.competition_type,
            voting_method: self.voting_method,
            voting_duration: self.voting_duration.unwrap_or(default_voting_duration),
            config: self.config.unwrap_or_else(|| serde_json::json!({})),
        }
    }
}

impl From<UpdateCompetitionRequest> for CompetitionChanges {
    fn from(req: UpdateCompetitionRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            competition_type: req.competition_type,
            voting_method: req.voting_method,
            voting_duration: req.voting_duration,
            config: req.config,
        }
    }
}

impl From<Competition> for CompetitionResponse {
    fn from(comp: Competition) -> Self {
        Self {
            competition_id: comp.competition_id,
            festival_id: comp.festival_id,
            name: comp.name,
            description: comp.description,
            competition_type: comp.competition_type,
            voting_method: comp.voting_method,
            voting_duration: comp.voting_duration,
            status: comp.status,
            rounds_count: comp.rounds_count,
            current_round: comp.current_round,
            winner_performer_id: comp.winner_performer_id,
            config: comp.config.0,
            created_at: comp.created_at,
            updated_at: comp.updated_at,
        }
    }
}
