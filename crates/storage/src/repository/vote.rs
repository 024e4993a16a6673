use sqlx::PgPool;

use crate::error::{Result, StorageError};
use crate::models::{Match, NewVote, Vote, VoteRecord};
use crate::repository::MatchRepository;

pub struct VoteRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VoteRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert the vote row and bump the matching counter in one transaction.
    ///
    /// The unique (match_id, voter_token) index rejects repeat voters; that
    /// case rolls back and reports `VoteRecord::Duplicate`. The counter only
    /// moves while the match is voting; otherwise the vote is rolled back
    /// with `Conflict`.
    pub async fn record(&self, vote: &NewVote) -> Result<VoteRecord> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO votes (match_id, voter_token, performer_id)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(vote.match_id)
        .bind(&vote.voter_token)
        .bind(vote.performer_id)
        .execute(&mut *tx)
        .await
        .map_err(StorageError::from);

        match inserted {
            Ok(_) => {}
            Err(e) if e.is_unique_violation() => {
                tx.rollback().await?;
                return Ok(VoteRecord::Duplicate);
            }
            Err(e) => return Err(e),
        }

        let updated = sqlx::query_as::<_, Match>(
            r#"
            UPDATE matches
            SET
                votes_performer_1 = votes_performer_1
                    + CASE WHEN performer_1_id = $2 THEN 1 ELSE 0 END,
                votes_performer_2 = votes_performer_2
                    + CASE WHEN performer_2_id = $2 THEN 1 ELSE 0 END
            WHERE match_id = $1
              AND status = 'voting'
            RETURNING match_id, competition_id, match_number, round_number, bracket_type,
                      bracket_position, performer_1_id, performer_2_id, performer_1_seed,
                      performer_2_seed, votes_performer_1, votes_performer_2, winner_id,
                      loser_id, status, scheduled_time, voting_closes_at, completed_at
            "#,
        )
        .bind(vote.match_id)
        .bind(vote.performer_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return if MatchRepository::new(self.pool).exists(vote.match_id).await? {
                Err(StorageError::Conflict(format!(
                    "match {} is not open for voting",
                    vote.match_id
                )))
            } else {
                Err(StorageError::NotFound)
            };
        };

        tx.commit().await?;

        Ok(VoteRecord::Counted(updated))
    }

    pub async fn list_by_match(&self, match_id: i64) -> Result<Vec<Vote>> {
        let votes = sqlx::query_as::<_, Vote>(
            r#"
            SELECT vote_id, match_id, voter_token, performer_id, created_at
            FROM votes
            WHERE match_id = $1
            ORDER BY created_at, vote_id
            "#,
        )
        .bind(match_id)
        .fetch_all(self.pool)
        .await?;

        Ok(votes)
    }
}
