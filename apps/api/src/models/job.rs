use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct JobRow {
    pub id: i64,
    pub position_name: String,
    pub department: Option<String>,
    pub responsibilities: String,
    pub requirements: String,
    pub salary_range: Option<String>,
    pub location: Option<String>,
    /// Extracted from position, responsibilities and requirements on every change to them.
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
