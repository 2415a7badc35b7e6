use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlanRow {
    pub id: i64,
    pub title: String,
    pub job_id: i64,
    pub description: Option<String>,
    pub strategy: Option<String>,
    /// Resume ids, in recommendation order.
    pub candidate_ids: Json<Vec<i64>>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
