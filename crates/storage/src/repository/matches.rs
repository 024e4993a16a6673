use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::error::{Result, StorageError};
use crate::models::{CompetitionStatus, CompetitionType, Match, MatchVersion, NewMatch};

const MATCH_COLUMNS: &str = r#"
    match_id, competition_id, match_number, round_number, bracket_type, bracket_position,
    performer_1_id, performer_2_id, performer_1_seed, performer_2_seed,
    votes_performer_1, votes_performer_2, winner_id, loser_id, status,
    scheduled_time, voting_closes_at, completed_at
"#;

/// Repository for bracket match database operations
pub struct MatchRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> MatchRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// All matches of a competition in match-number order
    pub async fn list_by_competition(&self, competition_id: i64) -> Result<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE competition_id = $1
            ORDER BY match_number
            "#
        ))
        .bind(competition_id)
        .fetch_all(self.pool)
        .await?;

        Ok(matches)
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Match> {
        let found = sqlx::query_as::<_, Match>(&format!(
            "SELECT {MATCH_COLUMNS} FROM matches WHERE match_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(found)
    }

    /// Voting matches whose window has elapsed
    pub async fn list_expired(
        &self,
        competition_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Match>> {
        let matches = sqlx::query_as::<_, Match>(&format!(
            r#"
            SELECT {MATCH_COLUMNS}
            FROM matches
            WHERE status = 'voting'
              AND voting_closes_at <= $1
              AND ($2::BIGINT IS NULL OR competition_id = $2)
            ORDER BY competition_id, match_number
            "#
        ))
        .bind(now)
        .bind(competition_id)
        .fetch_all(self.pool)
        .await?;

        Ok(matches)
    }

    /// Insert a whole bracket atomically.
    ///
    /// The competition row is locked for the duration of the transaction so
    /// two concurrent generations cannot both pass the setup check, and a
    /// format edit cannot slip in between generation and insert.
    pub async fn insert_bracket(
        &self,
        competition_id: i64,
        format: CompetitionType,
        rounds_count: i32,
        matches: &[NewMatch],
    ) -> Result<Vec<Match>> {
        let mut tx = self.pool.begin().await?;

        let (status, stored_format): (CompetitionStatus, CompetitionType) = sqlx::query_as(
            "SELECT status, competition_type FROM competitions WHERE competition_id = $1 FOR UPDATE",
        )
        .bind(competition_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        if status != CompetitionStatus::Setup {
            return Err(StorageError::ConstraintViolation(
                "Competition is no longer in setup".to_string(),
            ));
        }
        if stored_format != format {
            return Err(StorageError::Conflict(
                "Competition type changed while the bracket was generated".to_string(),
            ));
        }

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM matches WHERE competition_id = $1")
                .bind(competition_id)
                .fetch_one(&mut *tx)
                .await?;

        if existing > 0 {
            return Err(StorageError::ConstraintViolation(
                "Bracket already generated".to_string(),
            ));
        }

        let mut inserted = Vec::with_capacity(matches.len());
        for m in matches {
            let row = sqlx::query_as::<_, Match>(&format!(
                r#"
                INSERT INTO matches (
                    competition_id, match_number, round_number, bracket_type, bracket_position,
                    performer_1_id, performer_2_id, performer_1_seed, performer_2_seed,
                    winner_id, loser_id, status, completed_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                RETURNING {MATCH_COLUMNS}
                "#
            ))
            .bind(competition_id)
            .bind(m.match_number)
            .bind(m.round_number)
            .bind(m.bracket_type)
            .bind(&m.bracket_position)
            .bind(m.performer_1_id)
            .bind(m.performer_2_id)
            .bind(m.performer_1_seed)
            .bind(m.performer_2_seed)
            .bind(m.winner_id)
            .bind(m.loser_id)
            .bind(m.status)
            .bind(m.completed_at)
            .fetch_one(&mut *tx)
            .await?;
            inserted.push(row);
        }

        sqlx::query(
            r#"
            UPDATE competitions
            SET rounds_count = $2, current_round = 1, updated_at = NOW()
            WHERE competition_id = $1
            "#,
        )
        .bind(competition_id)
        .bind(rounds_count)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(inserted)
    }

    /// Delete every match (and through cascade, vote) of a setup competition
    /// and reset its round counters in the same transaction
    pub async fn clear_bracket(&self, competition_id: i64) -> Result<u64> {
        let mut tx = self.pool.begin().await?;

        let status: CompetitionStatus = sqlx::query_scalar(
            "SELECT status FROM competitions WHERE competition_id = $1 FOR UPDATE",
        )
        .bind(competition_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(StorageError::NotFound)?;

        if status != CompetitionStatus::Setup {
            return Err(StorageError::Conflict(
                "Competition is no longer in setup".to_string(),
            ));
        }

        let removed = sqlx::query("DELETE FROM matches WHERE competition_id = $1")
            .bind(competition_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query(
            r#"
            UPDATE competitions
            SET rounds_count = 0, current_round = 0, updated_at = NOW()
            WHERE competition_id = $1
            "#,
        )
        .bind(competition_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(removed)
    }

    /// Update slots, result and timing if the row still matches `expected`.
    ///
    /// Vote counters are left untouched. A row that moved on since it was
    /// read yields `Conflict` and nothing is written.
    pub async fn update(&self, m: &Match, expected: MatchVersion) -> Result<Match> {
        let updated = sqlx::query_as::<_, Match>(&format!(
            r#"
            UPDATE matches
            SET
                performer_1_id = $2,
                performer_2_id = $3,
                performer_1_seed = $4,
                performer_2_seed = $5,
                winner_id = $6,
                loser_id = $7,
                status = $8,
                scheduled_time = $9,
                voting_closes_at = $10,
                completed_at = $11
            WHERE match_id = $1
              AND status = $12
              AND performer_1_id IS NOT DISTINCT FROM $13
              AND performer_2_id IS NOT DISTINCT FROM $14
              AND votes_performer_1 = $15
              AND votes_performer_2 = $16
            RETURNING {MATCH_COLUMNS}
            "#
        ))
        .bind(m.match_id)
        .bind(m.performer_1_id)
        .bind(m.performer_2_id)
        .bind(m.performer_1_seed)
        .bind(m.performer_2_seed)
        .bind(m.winner_id)
        .bind(m.loser_id)
        .bind(m.status)
        .bind(m.scheduled_time)
        .bind(m.voting_closes_at)
        .bind(m.completed_at)
        .bind(expected.status)
        .bind(expected.performer_1_id)
        .bind(expected.performer_2_id)
        .bind(expected.votes_performer_1)
        .bind(expected.votes_performer_2)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(updated) => Ok(updated),
            None if self.exists(m.match_id).await? => Err(StorageError::Conflict(format!(
                "match {} changed since it was read",
                m.match_id
            ))),
            None => Err(StorageError::NotFound),
        }
    }

    pub async fn exists(&self, id: i64) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM matches WHERE match_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
