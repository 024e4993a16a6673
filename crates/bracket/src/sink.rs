//! Outbound match snapshots for live displays.
//!
//! The engine publishes after every persisted match change. Delivery to
//! clients (websockets, pub/sub) is the sink implementor's business.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storage::models::{Match, MatchStatus};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchSnapshot {
    pub competition_id: i64,
    pub match_id: i64,
    pub bracket_position: String,
    pub status: MatchStatus,
    pub performer_1_id: Option<i64>,
    pub performer_2_id: Option<i64>,
    pub votes_performer_1: i64,
    pub votes_performer_2: i64,
    pub winner_id: Option<i64>,
    pub published_at: DateTime<Utc>,
}

impl MatchSnapshot {
    pub fn of(m: &Match, published_at: DateTime<Utc>) -> Self {
        Self {
            competition_id: m.competition_id,
            match_id: m.match_id,
            bracket_position: m.bracket_position.clone(),
            status: m.status,
            performer_1_id: m.performer_1_id,
            performer_2_id: m.performer_2_id,
            votes_performer_1: m.votes_performer_1,
            votes_performer_2: m.votes_performer_2,
            winner_id: m.winner_id,
            published_at,
        }
    }
}

pub trait SnapshotSink: Send + Sync {
    /// Must not block; failures are the sink's to log.
    fn publish(&self, snapshot: &MatchSnapshot);
}

/// Default sink: writes snapshots to the log at debug level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SnapshotSink for TracingSink {
    fn publish(&self, snapshot: &MatchSnapshot) {
        tracing::debug!(
            competition_id = snapshot.competition_id,
            match_id = snapshot.match_id,
            position = %snapshot.bracket_position,
            status = ?snapshot.status,
            votes_performer_1 = snapshot.votes_performer_1,
            votes_performer_2 = snapshot.votes_performer_2,
            "Match snapshot"
        );
    }
}
