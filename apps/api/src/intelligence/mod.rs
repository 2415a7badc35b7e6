//! Document intelligence: parsing, tagging, scoring and plan drafting behind one trait.
//!
//! Two backends implement [`DocumentIntelligence`]:
//! - `LlmIntelligence` calls Claude through the shared `LlmClient`.
//! - `OfflineIntelligence` is deterministic and never touches the network.
//!
//! `AppState` holds an `Arc<dyn DocumentIntelligence>`, chosen once at startup.
//! Operations never fail across this boundary: a backend that cannot answer
//! returns the empty value for the operation.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::llm_client::LlmClient;
use crate::models::job::JobRow;

pub mod live;
pub mod offline;
pub mod prompts;

pub use live::LlmIntelligence;
pub use offline::OfflineIntelligence;

/// Upper bound on candidate recommendations in a drafted plan.
pub const MAX_RECOMMENDATIONS: usize = 3;
/// Upper bound on talent portrait length, in characters.
pub const MAX_PORTRAIT_CHARS: usize = 200;

// ────────────────────────────────────────────────────────────────────────────
// Provider selection
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Live,
    Offline,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Live => "live",
            ProviderKind::Offline => "offline",
        }
    }
}

/// Maximum number of labels returned by the tagging operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagLimits {
    pub resume: usize,
    pub job: usize,
}

impl Default for TagLimits {
    fn default() -> Self {
        Self {
            resume: 10,
            job: 10,
        }
    }
}

/// Builds the provider selected by configuration.
pub fn from_config(config: &Config) -> anyhow::Result<Arc<dyn DocumentIntelligence>> {
    match config.provider {
        ProviderKind::Offline => {
            info!("Document intelligence: offline provider");
            Ok(Arc::new(OfflineIntelligence::new(config.tag_limits)))
        }
        ProviderKind::Live => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| anyhow::anyhow!("ANTHROPIC_API_KEY is required for the live provider"))?;
            let timeout = Duration::from_secs(config.llm_timeout_secs);
            let llm = LlmClient::new(
                api_key,
                config.llm_model.clone(),
                config.llm_api_url.clone(),
                timeout,
            )?;
            info!("Document intelligence: live provider ({})", llm.model());
            Ok(Arc::new(LlmIntelligence::new(llm, config.tag_limits, timeout)))
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Data carried across the provider boundary
// ────────────────────────────────────────────────────────────────────────────

/// Structured fields pulled out of a resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsedResume {
    #[serde(deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub education: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub skills: Vec<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub experience: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub contact: Option<String>,
}

impl ParsedResume {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.education.is_none()
            && self.skills.is_empty()
            && self.experience.is_none()
            && self.contact.is_none()
    }
}

/// Descriptive fields of a job posting. Produced by `parse_job_requirement`
/// and used as the job input to plan drafting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobFields {
    #[serde(deserialize_with = "lenient_text")]
    pub position_name: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub department: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub responsibilities: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub requirements: Option<String>,
    #[serde(deserialize_with = "lenient_text", alias = "salary")]
    pub salary_range: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub location: Option<String>,
}

impl JobFields {
    pub fn is_empty(&self) -> bool {
        self.position_name.is_none()
            && self.department.is_none()
            && self.responsibilities.is_none()
            && self.requirements.is_none()
            && self.salary_range.is_none()
            && self.location.is_none()
    }

    /// Text the job tags are extracted from.
    pub fn tag_source(&self) -> String {
        job_text(
            self.position_name.as_deref(),
            self.responsibilities.as_deref(),
            self.requirements.as_deref(),
        )
    }
}

impl From<&JobRow> for JobFields {
    fn from(job: &JobRow) -> Self {
        Self {
            position_name: Some(job.position_name.clone()),
            department: job.department.clone(),
            responsibilities: Some(job.responsibilities.clone()),
            requirements: Some(job.requirements.clone()),
            salary_range: job.salary_range.clone(),
            location: job.location.clone(),
        }
    }
}

/// Score in [0, 100] plus a short justification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAssessment {
    pub score: f64,
    #[serde(default)]
    pub explanation: String,
}

impl MatchAssessment {
    pub fn insufficient() -> Self {
        Self {
            score: 0.0,
            explanation: "Insufficient information to assess the match: resume or job text is empty."
                .to_string(),
        }
    }

    /// Clamps the score into [0, 100]; a non-finite score becomes 0.
    pub fn clamped(mut self) -> Self {
        self.score = if self.score.is_finite() {
            self.score.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self
    }
}

/// One ranked candidate handed to plan drafting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateSummary {
    pub resume_id: i64,
    pub candidate_name: String,
    pub talent_portrait: Option<String>,
    pub match_score: f64,
    pub match_explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecommendation {
    pub candidate_id: i64,
    #[serde(default, alias = "recommendation_reason")]
    pub reason: String,
}

/// Plan content drafted by a provider. `Default` is the empty plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecruitmentPlanDraft {
    pub description: String,
    #[serde(alias = "recruitment_strategy")]
    pub strategy: String,
    pub candidate_recommendations: Vec<CandidateRecommendation>,
    pub interview_suggestions: String,
}

impl RecruitmentPlanDraft {
    pub fn is_empty(&self) -> bool {
        self.description.is_empty()
            && self.strategy.is_empty()
            && self.candidate_recommendations.is_empty()
            && self.interview_suggestions.is_empty()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The document intelligence capability. Implement this to swap backends
/// without touching the workflows or handlers.
#[async_trait]
pub trait DocumentIntelligence: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Calls that fell back to an empty result since startup.
    fn degraded_calls(&self) -> u64 {
        0
    }

    async fn parse_resume(&self, raw_text: &str) -> ParsedResume;

    async fn generate_talent_portrait(&self, resume: &ParsedResume) -> String;

    async fn generate_resume_tags(&self, raw_text: &str) -> Vec<String>;

    async fn extract_job_tags(&self, description: &str) -> Vec<String>;

    async fn match_resume_to_job(&self, resume_text: &str, job_text: &str) -> MatchAssessment;

    async fn generate_recruitment_plan(
        &self,
        job: &JobFields,
        candidates: &[CandidateSummary],
    ) -> RecruitmentPlanDraft;

    async fn parse_job_requirement(&self, raw_text: &str) -> JobFields;
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

/// Position, responsibilities and requirements joined by newlines, blanks skipped.
pub fn job_text(
    position_name: Option<&str>,
    responsibilities: Option<&str>,
    requirements: Option<&str>,
) -> String {
    [position_name, responsibilities, requirements]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trims labels, drops blanks and case-insensitive duplicates, keeps the first `cap`.
pub fn normalize_labels<I, S>(labels: I, cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter_map(|label| {
            let label = label.as_ref().trim();
            if label.is_empty() || !seen.insert(label.to_lowercase()) {
                None
            } else {
                Some(label.to_string())
            }
        })
        .take(cap)
        .collect()
}

pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Renders a JSON scalar or container as display text. Null and blank yield `None`.
fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(value_text)
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| value_text(v).map(|v| format!("{k}: {v}")))
            .collect::<Vec<_>>()
            .join(", "),
    };
    (!text.is_empty()).then_some(text)
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_text))
}

/// Accepts a JSON array or a delimited string.
fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items.iter().filter_map(value_text).collect(),
        Some(Value::String(s)) => split_list(&s),
        Some(other) => value_text(&other).into_iter().collect(),
        None => Vec::new(),
    })
}

/// Splits on ASCII and full-width list separators.
pub fn split_list(text: &str) -> Vec<String> {
    text.split([',', '，', ';', '；', '、'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
