use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "bracket_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BracketType {
    Winners,
    Losers,
    GrandFinals,
    GrandFinalsReset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "match_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Voting,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Match {
    pub match_id: i64,
    pub competition_id: i64,
    pub match_number: i32,
    pub round_number: i32,
    pub bracket_type: BracketType,
    pub bracket_position: String,
    pub performer_1_id: Option<i64>,
    pub performer_2_id: Option<i64>,
    pub performer_1_seed: Option<i32>,
    pub performer_2_seed: Option<i32>,
    pub votes_performer_1: i64,
    pub votes_performer_2: i64,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub status: MatchStatus,
    pub scheduled_time: Option<chrono::DateTime<chrono::Utc>>,
    pub voting_closes_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Match {
    pub fn has_performer(&self, performer_id: i64) -> bool {
        self.performer_1_id == Some(performer_id) || self.performer_2_id == Some(performer_id)
    }

    /// Both slots are filled, so the match can be voted on
    pub fn is_ready(&self) -> bool {
        self.performer_1_id.is_some() && self.performer_2_id.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// The performer facing `performer_id` in this match, if any
    pub fn opponent_of(&self, performer_id: i64) -> Option<i64> {
        if self.performer_1_id == Some(performer_id) {
            self.performer_2_id
        } else if self.performer_2_id == Some(performer_id) {
            self.performer_1_id
        } else {
            None
        }
    }

    /// The columns a conditional write compares against
    pub fn version(&self) -> MatchVersion {
        MatchVersion {
            status: self.status,
            performer_1_id: self.performer_1_id,
            performer_2_id: self.performer_2_id,
            votes_performer_1: self.votes_performer_1,
            votes_performer_2: self.votes_performer_2,
        }
    }
}

/// State a stored match must still be in for `update_match` to apply.
///
/// Status, slots and vote counters are everything completion and
/// advancement decide on; a write only lands if none of them moved since
/// the row was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchVersion {
    pub status: MatchStatus,
    pub performer_1_id: Option<i64>,
    pub performer_2_id: Option<i64>,
    pub votes_performer_1: i64,
    pub votes_performer_2: i64,
}

/// A match built in memory by the bracket generator, before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewMatch {
    pub match_number: i32,
    pub round_number: i32,
    pub bracket_type: BracketType,
    pub bracket_position: String,
    pub performer_1_id: Option<i64>,
    pub performer_2_id: Option<i64>,
    pub performer_1_seed: Option<i32>,
    pub performer_2_seed: Option<i32>,
    pub winner_id: Option<i64>,
    pub loser_id: Option<i64>,
    pub status: MatchStatus,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl NewMatch {
    pub fn pending(
        match_number: i32,
        round_number: i32,
        bracket_type: BracketType,
        bracket_position: String,
    ) -> Self {
        Self {
            match_number,
            round_number,
            bracket_type,
            bracket_position,
            performer_1_id: None,
            performer_2_id: None,
            performer_1_seed: None,
            performer_2_seed: None,
            winner_id: None,
            loser_id: None,
            status: MatchStatus::Pending,
            completed_at: None,
        }
    }

    /// Materializes the row with the id and competition assigned by the store
    pub fn into_match(self, match_id: i64, competition_id: i64) -> Match {
        Match {
            match_id,
            competition_id,
            match_number: self.match_number,
            round_number: self.round_number,
            bracket_type: self.bracket_type,
            bracket_position: self.bracket_position,
            performer_1_id: self.performer_1_id,
            performer_2_id: self.performer_2_id,
            performer_1_seed: self.performer_1_seed,
            performer_2_seed: self.performer_2_seed,
            votes_performer_1: 0,
            votes_performer_2: 0,
            winner_id: self.winner_id,
            loser_id: self.loser_id,
            status: self.status,
            scheduled_time: None,
            voting_closes_at: None,
            completed_at: self.completed_at,
        }
    }
}
