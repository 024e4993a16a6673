//! In-process implementation of the collaborator traits.
//!
//! Mirrors the PostgreSQL semantics closely enough for engine tests and for
//! running the API without a database: bracket inserts are all-or-nothing,
//! vote tokens are unique per match, counters only move through
//! `record_vote`, and progress writes are compare-and-set under the table
//! lock.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{Result, StorageError};
use crate::models::{
    Competition, CompetitionChanges, CompetitionStatus, CompetitionType, Match, MatchStatus,
    MatchVersion, NewCompetition, NewMatch, NewVote, Performer, Vote, VoteRecord,
};
use crate::store::{BracketStore, PerformerDirectory};

const FORMAT_LOCKED: &str = "Competition type cannot change once a bracket exists";
const ALREADY_COMPLETED: &str = "Competition is already completed";

#[derive(Default)]
struct Tables {
    competitions: BTreeMap<i64, Competition>,
    matches: BTreeMap<i64, Match>,
    votes: BTreeMap<i64, Vote>,
    voters: HashSet<(i64, String)>,
    performers: HashMap<i64, Performer>,
    next_competition_id: i64,
    next_match_id: i64,
    next_vote_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a performer profile for directory lookups
    pub fn add_performer(&self, performer_id: i64, name: impl Into<String>) -> Result<()> {
        let mut tables = self.lock()?;
        tables.performers.insert(
            performer_id,
            Performer {
                performer_id,
                name: name.into(),
                photo_url: None,
                bio: None,
            },
        );
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl BracketStore for MemoryStore {
    async fn list_competitions(&self, festival_id: Option<i64>) -> Result<Vec<Competition>> {
        let tables = self.lock()?;
        Ok(tables
            .competitions
            .values()
            .rev()
            .filter(|c| festival_id.is_none_or(|id| c.festival_id == id))
            .cloned()
            .collect())
    }

    async fn find_competition(&self, competition_id: i64) -> Result<Competition> {
        let tables = self.lock()?;
        tables
            .competitions
            .get(&competition_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn create_competition(&self, new: &NewCompetition) -> Result<Competition> {
        let mut tables = self.lock()?;
        tables.next_competition_id += 1;
        let now = Utc::now();
        let competition = Competition {
            competition_id: tables.next_competition_id,
            festival_id: new.festival_id,
            name: new.name.clone(),
            description: new.description.clone(),
            competition_type: new.competition_type,
            voting_method: new.voting_method,
            voting_duration: new.voting_duration,
            status: CompetitionStatus::Setup,
            rounds_count: 0,
            current_round: 0,
            winner_performer_id: None,
            config: sqlx::types::Json(new.config.clone()),
            created_at: now,
            updated_at: now,
        };
        tables
            .competitions
            .insert(competition.competition_id, competition.clone());
        Ok(competition)
    }

    async fn update_competition_details(
        &self,
        competition_id: i64,
        changes: &CompetitionChanges,
    ) -> Result<Competition> {
        let mut tables = self.lock()?;
        let stored = tables
            .competitions
            .get_mut(&competition_id)
            .ok_or(StorageError::NotFound)?;

        if !changes.allowed_on(stored) {
            return Err(StorageError::Conflict(FORMAT_LOCKED.to_string()));
        }
        changes.apply_to(stored);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn activate_competition(&self, competition_id: i64, round: i32) -> Result<Competition> {
        let mut tables = self.lock()?;
        let stored = tables
            .competitions
            .get_mut(&competition_id)
            .ok_or(StorageError::NotFound)?;

        match stored.status {
            CompetitionStatus::Completed => {
                return Err(StorageError::Conflict(ALREADY_COMPLETED.to_string()));
            }
            CompetitionStatus::Setup => stored.status = CompetitionStatus::Active,
            CompetitionStatus::Active => {}
        }
        stored.current_round = stored.current_round.max(round);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn finish_competition(&self, competition_id: i64, champion: i64) -> Result<Competition> {
        let mut tables = self.lock()?;
        let stored = tables
            .competitions
            .get_mut(&competition_id)
            .ok_or(StorageError::NotFound)?;

        if stored.status == CompetitionStatus::Completed {
            return Err(StorageError::Conflict(ALREADY_COMPLETED.to_string()));
        }
        stored.finish(champion);
        stored.updated_at = Utc::now();
        Ok(stored.clone())
    }

    async fn delete_competition(&self, competition_id: i64) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.competitions.remove(&competition_id).is_none() {
            return Err(StorageError::NotFound);
        }

        let removed: HashSet<i64> = tables
            .matches
            .values()
            .filter(|m| m.competition_id == competition_id)
            .map(|m| m.match_id)
            .collect();
        tables.matches.retain(|id, _| !removed.contains(id));
        tables.votes.retain(|_, v| !removed.contains(&v.match_id));
        tables.voters.retain(|(match_id, _)| !removed.contains(match_id));
        Ok(())
    }

    async fn list_matches(&self, competition_id: i64) -> Result<Vec<Match>> {
        let tables = self.lock()?;
        let mut matches: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| m.competition_id == competition_id)
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.match_number);
        Ok(matches)
    }

    async fn find_match(&self, match_id: i64) -> Result<Match> {
        let tables = self.lock()?;
        tables
            .matches
            .get(&match_id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_expired_matches(
        &self,
        competition_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Match>> {
        let tables = self.lock()?;
        let mut matches: Vec<Match> = tables
            .matches
            .values()
            .filter(|m| competition_id.is_none_or(|id| m.competition_id == id))
            .filter(|m| m.status == MatchStatus::Voting)
            .filter(|m| m.voting_closes_at.is_some_and(|closes| closes <= now))
            .cloned()
            .collect();
        matches.sort_by_key(|m| (m.competition_id, m.match_number));
        Ok(matches)
    }

    async fn insert_bracket(
        &self,
        competition_id: i64,
        format: CompetitionType,
        rounds_count: i32,
        matches: &[NewMatch],
    ) -> Result<Vec<Match>> {
        let mut tables = self.lock()?;
        let competition = tables
            .competitions
            .get(&competition_id)
            .ok_or(StorageError::NotFound)?;

        if competition.status != CompetitionStatus::Setup {
            return Err(StorageError::ConstraintViolation(
                "Competition is no longer in setup".to_string(),
            ));
        }
        if competition.competition_type != format {
            return Err(StorageError::Conflict(
                "Competition type changed while the bracket was generated".to_string(),
            ));
        }
        if tables
            .matches
            .values()
            .any(|m| m.competition_id == competition_id)
        {
            return Err(StorageError::ConstraintViolation(
                "Bracket already generated".to_string(),
            ));
        }

        let mut inserted = Vec::with_capacity(matches.len());
        for new in matches {
            tables.next_match_id += 1;
            let row = new.clone().into_match(tables.next_match_id, competition_id);
            tables.matches.insert(row.match_id, row.clone());
            inserted.push(row);
        }

        if let Some(competition) = tables.competitions.get_mut(&competition_id) {
            competition.rounds_count = rounds_count;
            competition.current_round = 1;
            competition.updated_at = Utc::now();
        }

        Ok(inserted)
    }

    async fn clear_bracket(&self, competition_id: i64) -> Result<u64> {
        let mut tables = self.lock()?;
        let competition = tables
            .competitions
            .get_mut(&competition_id)
            .ok_or(StorageError::NotFound)?;
        if competition.status != CompetitionStatus::Setup {
            return Err(StorageError::Conflict(
                "Competition is no longer in setup".to_string(),
            ));
        }
        competition.rounds_count = 0;
        competition.current_round = 0;
        competition.updated_at = Utc::now();

        let removed: HashSet<i64> = tables
            .matches
            .values()
            .filter(|m| m.competition_id == competition_id)
            .map(|m| m.match_id)
            .collect();
        tables.matches.retain(|id, _| !removed.contains(id));
        tables.votes.retain(|_, v| !removed.contains(&v.match_id));
        tables.voters.retain(|(match_id, _)| !removed.contains(match_id));
        Ok(removed.len() as u64)
    }

    async fn update_match(&self, m: &Match, expected: MatchVersion) -> Result<Match> {
        let mut tables = self.lock()?;
        let stored = tables
            .matches
            .get_mut(&m.match_id)
            .ok_or(StorageError::NotFound)?;

        if stored.version() != expected {
            return Err(StorageError::Conflict(format!(
                "match {} changed since it was read",
                m.match_id
            )));
        }

        stored.performer_1_id = m.performer_1_id;
        stored.performer_2_id = m.performer_2_id;
        stored.performer_1_seed = m.performer_1_seed;
        stored.performer_2_seed = m.performer_2_seed;
        stored.winner_id = m.winner_id;
        stored.loser_id = m.loser_id;
        stored.status = m.status;
        stored.scheduled_time = m.scheduled_time;
        stored.voting_closes_at = m.voting_closes_at;
        stored.completed_at = m.completed_at;
        Ok(stored.clone())
    }

    async fn record_vote(&self, vote: &NewVote) -> Result<VoteRecord> {
        let mut tables = self.lock()?;
        let status = tables
            .matches
            .get(&vote.match_id)
            .map(|m| m.status)
            .ok_or(StorageError::NotFound)?;
        if !tables
            .voters
            .contains(&(vote.match_id, vote.voter_token.clone()))
            && status != MatchStatus::Voting
        {
            return Err(StorageError::Conflict(format!(
                "match {} is not open for voting",
                vote.match_id
            )));
        }
        if !tables
            .voters
            .insert((vote.match_id, vote.voter_token.clone()))
        {
            return Ok(VoteRecord::Duplicate);
        }

        tables.next_vote_id += 1;
        let vote_id = tables.next_vote_id;
        tables.votes.insert(
            vote_id,
            Vote {
                vote_id,
                match_id: vote.match_id,
                voter_token: vote.voter_token.clone(),
                performer_id: vote.performer_id,
                created_at: Utc::now(),
            },
        );

        let stored = tables
            .matches
            .get_mut(&vote.match_id)
            .ok_or(StorageError::NotFound)?;
        if stored.performer_1_id == Some(vote.performer_id) {
            stored.votes_performer_1 += 1;
        } else if stored.performer_2_id == Some(vote.performer_id) {
            stored.votes_performer_2 += 1;
        }
        Ok(VoteRecord::Counted(stored.clone()))
    }

    async fn list_votes(&self, match_id: i64) -> Result<Vec<Vote>> {
        let tables = self.lock()?;
        Ok(tables
            .votes
            .values()
            .filter(|v| v.match_id == match_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PerformerDirectory for MemoryStore {
    async fn find_performer(&self, performer_id: i64) -> Result<Option<Performer>> {
        let tables = self.lock()?;
        Ok(tables.performers.get(&performer_id).cloned())
    }

    async fn find_performers(&self, performer_ids: &[i64]) -> Result<Vec<Performer>> {
        let tables = self.lock()?;
        Ok(performer_ids
            .iter()
            .filter_map(|id| tables.performers.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BracketType, VotingMethod};

    const SINGLE: CompetitionType = CompetitionType::SingleElimination;

    fn new_competition() -> NewCompetition {
        NewCompetition {
            festival_id: 7,
            name: "Battle of the Bands".to_string(),
            description: None,
            competition_type: CompetitionType::SingleElimination,
            voting_method: VotingMethod::HeadToHead,
            voting_duration: 10,
            config: serde_json::json!({}),
        }
    }

    fn final_match(p1: i64, p2: i64) -> NewMatch {
        let mut m = NewMatch::pending(1, 1, BracketType::Winners, "W_R1M1".to_string());
        m.performer_1_id = Some(p1);
        m.performer_2_id = Some(p2);
        m
    }

    fn voting_final(p1: i64, p2: i64) -> NewMatch {
        let mut m = final_match(p1, p2);
        m.status = MatchStatus::Voting;
        m
    }

    #[tokio::test]
    async fn test_insert_bracket_sets_round_counters() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();

        let inserted = store
            .insert_bracket(competition.competition_id, SINGLE, 1, &[final_match(1, 2)])
            .await
            .unwrap();
        assert_eq!(inserted.len(), 1);

        let reloaded = store
            .find_competition(competition.competition_id)
            .await
            .unwrap();
        assert_eq!(reloaded.rounds_count, 1);
        assert_eq!(reloaded.current_round, 1);
    }

    #[tokio::test]
    async fn test_insert_bracket_twice_is_rejected() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;

        store.insert_bracket(id, SINGLE, 1, &[final_match(1, 2)]).await.unwrap();
        let second = store.insert_bracket(id, SINGLE, 1, &[final_match(1, 2)]).await;

        assert!(matches!(second, Err(StorageError::ConstraintViolation(_))));
        assert_eq!(store.list_matches(id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_voter_token_is_not_counted() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let inserted = store
            .insert_bracket(competition.competition_id, SINGLE, 1, &[voting_final(1, 2)])
            .await
            .unwrap();
        let match_id = inserted[0].match_id;

        let vote = NewVote {
            match_id,
            voter_token: "t1".to_string(),
            performer_id: 2,
        };
        let first = store.record_vote(&vote).await.unwrap();
        let second = store.record_vote(&vote).await.unwrap();

        match first {
            VoteRecord::Counted(m) => assert_eq!(m.votes_performer_2, 1),
            VoteRecord::Duplicate => panic!("first vote should count"),
        }
        assert_eq!(second, VoteRecord::Duplicate);
        assert_eq!(store.list_votes(match_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_matches_and_votes() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;
        let inserted = store.insert_bracket(id, SINGLE, 1, &[voting_final(1, 2)]).await.unwrap();
        store
            .record_vote(&NewVote {
                match_id: inserted[0].match_id,
                voter_token: "t1".to_string(),
                performer_id: 1,
            })
            .await
            .unwrap();

        store.delete_competition(id).await.unwrap();

        assert!(matches!(
            store.find_match(inserted[0].match_id).await,
            Err(StorageError::NotFound)
        ));
        assert!(store.list_votes(inserted[0].match_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stale_match_write_is_a_conflict() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let inserted = store
            .insert_bracket(competition.competition_id, SINGLE, 1, &[final_match(1, 2)])
            .await
            .unwrap();
        let read = inserted[0].clone();

        let mut first = read.clone();
        first.status = MatchStatus::Voting;
        store.update_match(&first, read.version()).await.unwrap();

        let mut second = read.clone();
        second.status = MatchStatus::Completed;
        second.winner_id = Some(1);
        let stale = store.update_match(&second, read.version()).await;

        assert!(matches!(stale, Err(StorageError::Conflict(_))));
        let stored = store.find_match(read.match_id).await.unwrap();
        assert_eq!(stored.status, MatchStatus::Voting);
        assert_eq!(stored.winner_id, None);
    }

    #[tokio::test]
    async fn test_vote_on_closed_match_is_a_conflict() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let inserted = store
            .insert_bracket(competition.competition_id, SINGLE, 1, &[final_match(1, 2)])
            .await
            .unwrap();
        let match_id = inserted[0].match_id;

        let result = store
            .record_vote(&NewVote {
                match_id,
                voter_token: "t1".to_string(),
                performer_id: 1,
            })
            .await;

        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(store.list_votes(match_id).await.unwrap().is_empty());
        assert_eq!(store.find_match(match_id).await.unwrap().votes_performer_1, 0);
    }

    #[tokio::test]
    async fn test_details_update_leaves_progress_alone() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;
        store
            .insert_bracket(id, SINGLE, 1, &[final_match(1, 2)])
            .await
            .unwrap();
        store.activate_competition(id, 1).await.unwrap();
        store.finish_competition(id, 2).await.unwrap();

        let renamed = store
            .update_competition_details(
                id,
                &CompetitionChanges {
                    name: Some("Finals".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(renamed.name, "Finals");
        assert_eq!(renamed.status, CompetitionStatus::Completed);
        assert_eq!(renamed.winner_performer_id, Some(2));
    }

    #[tokio::test]
    async fn test_format_change_rejected_once_bracket_exists() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;
        store
            .insert_bracket(id, SINGLE, 1, &[final_match(1, 2)])
            .await
            .unwrap();

        let result = store
            .update_competition_details(
                id,
                &CompetitionChanges {
                    competition_type: Some(CompetitionType::DoubleElimination),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert_eq!(
            store.find_competition(id).await.unwrap().competition_type,
            SINGLE
        );
    }

    #[tokio::test]
    async fn test_bracket_insert_rejects_changed_format() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;

        let result = store
            .insert_bracket(
                id,
                CompetitionType::DoubleElimination,
                1,
                &[final_match(1, 2)],
            )
            .await;

        assert!(matches!(result, Err(StorageError::Conflict(_))));
        assert!(store.list_matches(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_competition_finishes_once() {
        let store = MemoryStore::new();
        let competition = store.create_competition(&new_competition()).await.unwrap();
        let id = competition.competition_id;

        store.finish_competition(id, 1).await.unwrap();
        let second = store.finish_competition(id, 2).await;

        assert!(matches!(second, Err(StorageError::Conflict(_))));
        assert_eq!(
            store.find_competition(id).await.unwrap().winner_performer_id,
            Some(1)
        );
    }
}
