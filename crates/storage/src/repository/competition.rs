use sqlx::PgPool;

use crate::error::{Result, StorageError};
use crate::models::{Competition, CompetitionChanges, NewCompetition};

const FORMAT_LOCKED: &str = "Competition type cannot change once a bracket exists";
const ALREADY_COMPLETED: &str = "Competition is already completed";

const COMPETITION_COLUMNS: &str = r#"
    competition_id, festival_id, name, description, competition_type, voting_method,
    voting_duration, status, rounds_count, current_round, winner_performer_id, config,
    created_at, updated_at
"#;

/// Repository for Competition database operations
pub struct CompetitionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CompetitionRepository<'a> {
    /// Create a new CompetitionRepository
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List competitions, optionally restricted to one festival
    pub async fn list(&self, festival_id: Option<i64>) -> Result<Vec<Competition>> {
        let competitions = sqlx::query_as::<_, Competition>(&format!(
            r#"
            SELECT {COMPETITION_COLUMNS}
            FROM competitions
            WHERE ($1::BIGINT IS NULL OR festival_id = $1)
            ORDER BY created_at DESC, competition_id DESC
            "#
        ))
        .bind(festival_id)
        .fetch_all(self.pool)
        .await?;

        Ok(competitions)
    }

    /// Get a competition by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Competition> {
        let competition = sqlx::query_as::<_, Competition>(&format!(
            "SELECT {COMPETITION_COLUMNS} FROM competitions WHERE competition_id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?
        .ok_or(StorageError::NotFound)?;

        Ok(competition)
    }

    /// Create a new competition in setup status
    pub async fn create(&self, new: &NewCompetition) -> Result<Competition> {
        let competition = sqlx::query_as::<_, Competition>(&format!(
            r#"
            INSERT INTO competitions (
                festival_id, name, description, competition_type, voting_method,
                voting_duration, config
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COMPETITION_COLUMNS}
            "#
        ))
        .bind(new.festival_id)
        .bind(&new.name)
        .bind(&new.description)
        .bind(new.competition_type)
        .bind(new.voting_method)
        .bind(new.voting_duration)
        .bind(sqlx::types::Json(&new.config))
        .fetch_one(self.pool)
        .await?;

        Ok(competition)
    }

    /// Write organizer-editable fields only.
    ///
    /// A `competition_type` change is guarded in the statement itself: it
    /// applies only while the row is in setup with no generated rounds, so it
    /// cannot interleave with bracket generation or progress writes.
    pub async fn update_details(
        &self,
        id: i64,
        changes: &CompetitionChanges,
    ) -> Result<Competition> {
        let updated = sqlx::query_as::<_, Competition>(&format!(
            r#"
            UPDATE competitions
            SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                competition_type = COALESCE($4, competition_type),
                voting_method = COALESCE($5, voting_method),
                voting_duration = COALESCE($6, voting_duration),
                config = COALESCE($7, config),
                updated_at = NOW()
            WHERE competition_id = $1
              AND (
                  $4::competition_type IS NULL
                  OR competition_type = $4
                  OR (status = 'setup' AND rounds_count = 0)
              )
            RETURNING {COMPETITION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.description)
        .bind(changes.competition_type)
        .bind(changes.voting_method)
        .bind(changes.voting_duration)
        .bind(changes.config.as_ref().map(sqlx::types::Json))
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(competition) => Ok(competition),
            None => Err(self.missing_or_conflict(id, FORMAT_LOCKED).await),
        }
    }

    /// Move a setup competition to active and raise `current_round`
    pub async fn activate(&self, id: i64, round: i32) -> Result<Competition> {
        let updated = sqlx::query_as::<_, Competition>(&format!(
            r#"
            UPDATE competitions
            SET
                status = CASE
                    WHEN status = 'setup' THEN 'active'::competition_status
                    ELSE status
                END,
                current_round = GREATEST(current_round, $2),
                updated_at = NOW()
            WHERE competition_id = $1
              AND status <> 'completed'
            RETURNING {COMPETITION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(round)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(competition) => Ok(competition),
            None => Err(self.missing_or_conflict(id, ALREADY_COMPLETED).await),
        }
    }

    /// Record the champion. Only the first finish of a competition applies.
    pub async fn finish(&self, id: i64, champion: i64) -> Result<Competition> {
        let updated = sqlx::query_as::<_, Competition>(&format!(
            r#"
            UPDATE competitions
            SET
                status = 'completed',
                winner_performer_id = $2,
                updated_at = NOW()
            WHERE competition_id = $1
              AND status <> 'completed'
            RETURNING {COMPETITION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(champion)
        .fetch_optional(self.pool)
        .await?;

        match updated {
            Some(competition) => Ok(competition),
            None => Err(self.missing_or_conflict(id, ALREADY_COMPLETED).await),
        }
    }

    async fn missing_or_conflict(&self, id: i64, reason: &str) -> StorageError {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM competitions WHERE competition_id = $1)",
        )
        .bind(id)
        .fetch_one(self.pool)
        .await;

        match exists {
            Ok(true) => StorageError::Conflict(reason.to_string()),
            Ok(false) => StorageError::NotFound,
            Err(e) => e.into(),
        }
    }

    /// Delete a competition by ID; matches and votes cascade
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM competitions
            WHERE competition_id = $1
            "#,
        )
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        Ok(())
    }
}
