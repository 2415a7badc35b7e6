//! Recruitment plan workflows.

use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::queries::{self, NewPlan};
use crate::errors::AppError;
use crate::intelligence::{CandidateSummary, DocumentIntelligence, JobFields};
use crate::jobs::queries::find_job;
use crate::matching::queries::qualifying_matches;
use crate::models::job::JobRow;
use crate::models::next_timestamp;
use crate::models::plan::PlanRow;
use crate::resumes::queries::find_resume;
use crate::routes::params::non_blank;

pub const DEFAULT_MIN_SCORE: f64 = 70.0;

fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}

#[derive(Debug, Deserialize)]
pub struct GeneratePlanRequest {
    pub job_id: i64,
    pub title: String,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreatePlanRequest {
    pub title: String,
    pub job_id: i64,
    pub description: Option<String>,
    pub strategy: Option<String>,
    #[serde(default)]
    pub candidate_ids: Vec<i64>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePlanRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub strategy: Option<String>,
    pub candidate_ids: Option<Vec<i64>>,
}

fn required_title(title: &str) -> Result<String, AppError> {
    non_blank(Some(title))
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation("title must not be empty".to_string()))
}

async fn require_job(db: &SqlitePool, job_id: i64) -> Result<JobRow, AppError> {
    find_job(db, job_id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", job_id))
}

/// Builds a plan from the job's matches scoring at least `min_score`.
/// Recommended candidate ids are kept in the provider's order.
pub async fn generate_plan(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    req: GeneratePlanRequest,
    created_by: Option<i64>,
) -> Result<PlanRow, AppError> {
    let title = required_title(&req.title)?;
    if !(0.0..=100.0).contains(&req.min_score) {
        return Err(AppError::Validation("min_score must be between 0 and 100".to_string()));
    }
    let job = require_job(db, req.job_id).await?;

    let matches = qualifying_matches(db, job.id, req.min_score).await?;
    let mut candidates = Vec::with_capacity(matches.len());
    for m in matches {
        let Some(resume) = find_resume(db, m.resume_id).await? else {
            warn!("Match {} points at missing resume {}, skipping", m.id, m.resume_id);
            continue;
        };
        candidates.push(CandidateSummary {
            resume_id: resume.id,
            candidate_name: resume.candidate_name,
            talent_portrait: resume.talent_portrait,
            match_score: m.match_score,
            match_explanation: m.match_explanation,
        });
    }
    if candidates.is_empty() {
        return Err(AppError::UnprocessableEntity(format!(
            "No qualifying candidates for job {} with match score >= {}",
            job.id, req.min_score
        )));
    }
    info!(
        "Generating plan for job {} from {} candidate(s)",
        job.id,
        candidates.len()
    );

    let draft = provider
        .generate_recruitment_plan(&JobFields::from(&job), &candidates)
        .await;
    if draft.is_empty() {
        warn!("Plan draft for job {} came back empty", job.id);
    }

    let candidate_ids: Vec<i64> = draft
        .candidate_recommendations
        .iter()
        .map(|rec| rec.candidate_id)
        .filter(|id| candidates.iter().any(|c| c.resume_id == *id))
        .collect();

    let mut description = draft.description.trim().to_string();
    let interviews = draft.interview_suggestions.trim();
    if !interviews.is_empty() {
        if !description.is_empty() {
            description.push_str("\n\n");
        }
        description.push_str("Interview suggestions: ");
        description.push_str(interviews);
    }

    let plan = queries::insert_plan(
        db,
        &NewPlan {
            title,
            job_id: job.id,
            description: Some(description).filter(|d| !d.is_empty()),
            strategy: Some(draft.strategy).filter(|s| !s.trim().is_empty()),
            candidate_ids,
            created_by,
        },
    )
    .await?;
    info!(
        "Created plan {} for job {} recommending {:?}",
        plan.id, plan.job_id, plan.candidate_ids.0
    );
    Ok(plan)
}

pub async fn create_plan(
    db: &SqlitePool,
    req: CreatePlanRequest,
    created_by: Option<i64>,
) -> Result<PlanRow, AppError> {
    let title = required_title(&req.title)?;
    let job = require_job(db, req.job_id).await?;

    let plan = queries::insert_plan(
        db,
        &NewPlan {
            title,
            job_id: job.id,
            description: req.description,
            strategy: req.strategy,
            candidate_ids: req.candidate_ids,
            created_by,
        },
    )
    .await?;
    info!("Created plan {} for job {}", plan.id, plan.job_id);
    Ok(plan)
}

pub async fn update_plan(db: &SqlitePool, id: i64, req: UpdatePlanRequest) -> Result<PlanRow, AppError> {
    let mut plan = queries::find_plan(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan", id))?;

    if let Some(title) = &req.title {
        plan.title = required_title(title)?;
    }
    if req.description.is_some() {
        plan.description = req.description;
    }
    if req.strategy.is_some() {
        plan.strategy = req.strategy;
    }
    if let Some(ids) = req.candidate_ids {
        plan.candidate_ids.0 = ids;
    }
    plan.updated_at = next_timestamp(plan.updated_at);

    let plan = queries::save_plan(db, &plan).await?;
    info!("Updated plan {id}");
    Ok(plan)
}

pub async fn delete_plan(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    if !queries::delete_plan(db, id).await? {
        return Err(AppError::not_found("Plan", id));
    }
    info!("Deleted plan {id}");
    Ok(())
}
