use sqlx::PgPool;

use crate::error::Result;
use crate::models::Performer;

/// Read access to the festival's performer table
pub struct PerformerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PerformerRepository<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Performer>> {
        let performer = sqlx::query_as::<_, Performer>(
            r#"
            SELECT performer_id, name, photo_url, bio
            FROM performers
            WHERE performer_id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(performer)
    }

    pub async fn find_many(&self, ids: &[i64]) -> Result<Vec<Performer>> {
        let performers = sqlx::query_as::<_, Performer>(
            r#"
            SELECT performer_id, name, photo_url, bio
            FROM performers
            WHERE performer_id = ANY($1)
            ORDER BY performer_id
            "#,
        )
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        Ok(performers)
    }
}
