use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Tournament format of a competition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "competition_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompetitionType {
    SingleElimination,
    DoubleElimination,
    RoundRobin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "voting_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum VotingMethod {
    HeadToHead,
    Ranked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "competition_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CompetitionStatus {
    Setup,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Competition {
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
    pub config: sqlx::types::Json<serde_json::Value>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Competition {
    /// Marks the competition finished with its champion.
    pub fn finish(&mut self, champion: i64) {
        self.status = CompetitionStatus::Completed;
        self.winner_performer_id = Some(champion);
    }

    /// Whether a bracket has been generated for this competition
    pub fn has_bracket(&self) -> bool {
        self.rounds_count > 0
    }
}

/// Organizer-editable fields. `None` leaves the column as it is.
///
/// Progress columns (status, rounds, winner) are not part of this: only
/// the bracket engine moves them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetitionChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub competition_type: Option<CompetitionType>,
    pub voting_method: Option<VotingMethod>,
    pub voting_duration: Option<i32>,
    pub config: Option<serde_json::Value>,
}

impl CompetitionChanges {
    /// A format change is only allowed before a bracket exists
    pub fn allowed_on(&self, competition: &Competition) -> bool {
        match self.competition_type {
            Some(format) if format != competition.competition_type => {
                competition.status == CompetitionStatus::Setup && !competition.has_bracket()
            }
            _ => true,
        }
    }

    pub fn apply_to(&self, competition: &mut Competition) {
        if let Some(name) = &self.name {
            competition.name = name.clone();
        }
        if let Some(description) = &self.description {
            competition.description = Some(description.clone());
        }
        if let Some(competition_type) = self.competition_type {
            competition.competition_type = competition_type;
        }
        if let Some(voting_method) = self.voting_method {
            competition.voting_method = voting_method;
        }
        if let Some(voting_duration) = self.voting_duration {
            competition.voting_duration = voting_duration;
        }
        if let Some(config) = &self.config {
            competition.config = sqlx::types::Json(config.clone());
        }
    }
}

/// Fields needed to insert a competition row
#[derive(Debug, Clone)]
pub struct NewCompetition {
    pub festival_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub competition_type: CompetitionType,
    pub voting_method: VotingMethod,
    pub voting_duration: i32,
    pub config: serde_json::Value,
}
