use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Performer {
    pub performer_id: i64,
    pub name: String,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
}
