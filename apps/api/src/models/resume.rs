use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub id: i64,
    pub candidate_name: String,
    pub file_url: String,
    pub file_type: String,
    pub ocr_content: Option<String>,
    /// JSON document produced by resume parsing.
    pub parsed_content: Option<String>,
    pub talent_portrait: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResumeRow {
    /// Text used for tagging and match scoring.
    pub fn searchable_text(&self) -> &str {
        [&self.ocr_content, &self.parsed_content, &self.talent_portrait]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .find(|text| !text.trim().is_empty())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TagRow {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
}

/// A resume together with its linked tags, as returned to callers.
#[derive(Debug, Clone, Serialize)]
pub struct ResumeDetail {
    #[serde(flatten)]
    pub resume: ResumeRow,
    pub tags: Vec<TagRow>,
}
