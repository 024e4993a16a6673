use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    Competition, CompetitionChanges, CompetitionType, Match, MatchVersion, NewCompetition,
    NewMatch, NewVote, Performer, Vote, VoteRecord,
};

/// Persistence collaborator for competitions, matches and votes.
///
/// Implementations must make `insert_bracket` and `record_vote` atomic: a
/// bracket is stored completely or not at all, and a counted vote always
/// inserts its row and bumps the matching counter together.
///
/// Every write that moves a bracket forward is conditional on the state the
/// caller read, and fails with `StorageError::Conflict` instead of
/// overwriting a concurrent change. Several engines (the API server and the
/// expiry sweep, say) can share one store without a common lock.
#[async_trait]
pub trait BracketStore: Send + Sync {
    async fn list_competitions(&self, festival_id: Option<i64>) -> Result<Vec<Competition>>;

    async fn find_competition(&self, competition_id: i64) -> Result<Competition>;

    async fn create_competition(&self, competition: &NewCompetition) -> Result<Competition>;

    /// Writes the organizer-editable fields. A format change fails with
    /// `Conflict` once the competition has left setup or has a bracket.
    async fn update_competition_details(
        &self,
        competition_id: i64,
        changes: &CompetitionChanges,
    ) -> Result<Competition>;

    /// Moves setup to active and raises `current_round` to at least `round`.
    /// Fails with `Conflict` on a completed competition.
    async fn activate_competition(&self, competition_id: i64, round: i32) -> Result<Competition>;

    /// Completes the competition with its champion. Fails with `Conflict`
    /// if it is already completed.
    async fn finish_competition(&self, competition_id: i64, champion: i64) -> Result<Competition>;

    /// Deletes the competition with its matches and votes
    async fn delete_competition(&self, competition_id: i64) -> Result<()>;

    /// Matches of a competition ordered by match number
    async fn list_matches(&self, competition_id: i64) -> Result<Vec<Match>>;

    async fn find_match(&self, match_id: i64) -> Result<Match>;

    /// Voting matches whose window closed at or before `now`
    async fn list_expired_matches(
        &self,
        competition_id: Option<i64>,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<Match>>;

    /// Persists a freshly generated bracket and its round counters in one
    /// transaction. Fails with `ConstraintViolation` when the competition is
    /// no longer in setup or already has matches, and with `Conflict` when
    /// its format is no longer `format`.
    async fn insert_bracket(
        &self,
        competition_id: i64,
        format: CompetitionType,
        rounds_count: i32,
        matches: &[NewMatch],
    ) -> Result<Vec<Match>>;

    /// Removes all matches and votes of a competition still in setup and
    /// resets its round counters. Fails with `Conflict` outside setup.
    async fn clear_bracket(&self, competition_id: i64) -> Result<u64>;

    /// Writes slot, status, result and timing columns if the stored row is
    /// still at `expected`. Vote counters are never written here; they only
    /// move through `record_vote`.
    async fn update_match(&self, m: &Match, expected: MatchVersion) -> Result<Match>;

    /// Counts a vote on a voting match. Fails with `Conflict` when the match
    /// is not voting.
    async fn record_vote(&self, vote: &NewVote) -> Result<VoteRecord>;

    async fn list_votes(&self, match_id: i64) -> Result<Vec<Vote>>;
}

/// Read-only lookup of performer profiles
#[async_trait]
pub trait PerformerDirectory: Send + Sync {
    async fn find_performer(&self, performer_id: i64) -> Result<Option<Performer>>;

    async fn find_performers(&self, performer_ids: &[i64]) -> Result<Vec<Performer>>;
}
