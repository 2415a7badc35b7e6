use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Scored pairing of one resume and one job. Unique per (resume_id, job_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct MatchRow {
    pub id: i64,
    pub resume_id: i64,
    pub job_id: i64,
    pub match_score: f64,
    pub match_explanation: Option<String>,
    pub created_at: DateTime<Utc>,
}
