use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::error::Result;
use crate::models::{
    Competition, CompetitionChanges, CompetitionType, Match, MatchVersion, NewCompetition,
    NewMatch, NewVote, Performer, Vote, VoteRecord,
};
use crate::repository::{
    CompetitionRepository, MatchRepository, PerformerRepository, VoteRepository,
};
use crate::store::{BracketStore, PerformerDirectory};

/// PostgreSQL handle backing both collaborator traits
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl BracketStore for Database {
    async fn list_competitions(&self, festival_id: Option<i64>) -> Result<Vec<Competition>> {
        CompetitionRepository::new(&self.pool).list(festival_id).await
    }

    async fn find_competition(&self, competition_id: i64) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .find_by_id(competition_id)
            .await
    }

    async fn create_competition(&self, competition: &NewCompetition) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .create(competition)
            .await
    }

    async fn update_competition_details(
        &self,
        competition_id: i64,
        changes: &CompetitionChanges,
    ) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .update_details(competition_id, changes)
            .await
    }

    async fn activate_competition(&self, competition_id: i64, round: i32) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .activate(competition_id, round)
            .await
    }

    async fn finish_competition(&self, competition_id: i64, champion: i64) -> Result<Competition> {
        CompetitionRepository::new(&self.pool)
            .finish(competition_id, champion)
            .await
    }

    async fn delete_competition(&self, competition_id: i64) -> Result<()> {
        CompetitionRepository::new(&self.pool)
            .delete(competition_id)
            .await
    }

    async fn list_matches(&self, competition_id: i64) -> Result<Vec<Match>> {
        MatchRepository::new(&self.pool)
            .list_by_competition(competition_id)
            .await
    }

    async fn find_match(&self, match_id: i64) -> Result<Match> {
        MatchRepository::new(&self.pool).find_by_id(match_id).await
    }

    async fn list_expired_matches(
        &self,
        competition_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Match>> {
        MatchRepository::new(&self.pool)
            .list_expired(competition_id, now)
            .await
    }

    async fn insert_bracket(
        &self,
        competition_id: i64,
        format: CompetitionType,
        rounds_count: i32,
        matches: &[NewMatch],
    ) -> Result<Vec<Match>> {
        MatchRepository::new(&self.pool)
            .insert_bracket(competition_id, format, rounds_count, matches)
            .await
    }

    async fn clear_bracket(&self, competition_id: i64) -> Result<u64> {
        MatchRepository::new(&self.pool)
            .clear_bracket(competition_id)
            .await
    }

    async fn update_match(&self, m: &Match, expected: MatchVersion) -> Result<Match> {
        MatchRepository::new(&self.pool).update(m, expected).await
    }

    async fn record_vote(&self, vote: &NewVote) -> Result<VoteRecord> {
        VoteRepository::new(&self.pool).record(vote).await
    }

    async fn list_votes(&self, match_id: i64) -> Result<Vec<Vote>> {
        VoteRepository::new(&self.pool).list_by_match(match_id).await
    }
}

#[async_trait]
impl PerformerDirectory for Database {
    async fn find_performer(&self, performer_id: i64) -> Result<Option<Performer>> {
        PerformerRepository::new(&self.pool)
            .find_by_id(performer_id)
            .await
    }

    async fn find_performers(&self, performer_ids: &[i64]) -> Result<Vec<Performer>> {
        PerformerRepository::new(&self.pool)
            .find_many(performer_ids)
            .await
    }
}
