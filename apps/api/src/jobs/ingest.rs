//! Job ingestion: direct create, document parse, document create, update and delete.
//!
//! Tags are always extracted from position + responsibilities + requirements
//! of the row as it is written.

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::queries::{self, NewJob};
use crate::errors::AppError;
use crate::intelligence::{job_text, DocumentIntelligence, JobFields};
use crate::models::job::JobRow;
use crate::models::next_timestamp;
use crate::routes::params::non_blank;

pub const UNTITLED_POSITION: &str = "Untitled position";

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub position_name: String,
    pub department: Option<String>,
    pub responsibilities: String,
    pub requirements: String,
    pub salary_range: Option<String>,
    pub location: Option<String>,
}

/// Partial update: only supplied fields change.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateJobRequest {
    pub position_name: Option<String>,
    pub department: Option<String>,
    pub responsibilities: Option<String>,
    pub requirements: Option<String>,
    pub salary_range: Option<String>,
    pub location: Option<String>,
    /// Honoured only when no descriptive field is part of the same update.
    pub tags: Option<Vec<String>>,
}

/// Parsed posting plus the tags it would be stored with. Nothing is persisted.
#[derive(Debug, Serialize)]
pub struct JobParseResult {
    #[serde(flatten)]
    pub fields: JobFields,
    pub tags: Vec<String>,
}

/// Values from the upload form that take precedence over parsed ones.
#[derive(Debug, Default)]
pub struct JobOverrides {
    pub position_name: Option<String>,
    pub department: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{field} must not be empty")));
    }
    Ok(value.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    non_blank(value).map(str::to_string)
}

async fn tags_for(
    provider: &dyn DocumentIntelligence,
    position_name: &str,
    responsibilities: &str,
    requirements: &str,
) -> Vec<String> {
    let text = job_text(Some(position_name), Some(responsibilities), Some(requirements));
    provider.extract_job_tags(&text).await
}

pub async fn create_job(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    req: CreateJobRequest,
) -> Result<JobRow, AppError> {
    let position_name = required("position_name", &req.position_name)?;
    let responsibilities = required("responsibilities", &req.responsibilities)?;
    let requirements = required("requirements", &req.requirements)?;

    let tags = tags_for(provider, &position_name, &responsibilities, &requirements).await;

    let job = queries::insert_job(
        db,
        &NewJob {
            position_name,
            department: optional(req.department.as_deref()),
            responsibilities,
            requirements,
            salary_range: optional(req.salary_range.as_deref()),
            location: optional(req.location.as_deref()),
            tags,
        },
    )
    .await?;

    info!("Created job {} ({}) with {} tag(s)", job.id, job.position_name, job.tags.len());
    Ok(job)
}

pub async fn parse_job_document(provider: &dyn DocumentIntelligence, raw_text: &str) -> JobParseResult {
    let fields = provider.parse_job_requirement(raw_text).await;
    let tags = provider.extract_job_tags(&fields.tag_source()).await;
    JobParseResult { fields, tags }
}

pub async fn create_job_from_document(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    raw_text: &str,
    overrides: JobOverrides,
) -> Result<JobRow, AppError> {
    if raw_text.trim().is_empty() {
        return Err(AppError::Validation("Job document contains no text".to_string()));
    }

    let fields = provider.parse_job_requirement(raw_text).await;
    if fields.is_empty() {
        warn!("Job document parsed to no fields; creating from overrides only");
    }

    let position_name = optional(overrides.position_name.as_deref())
        .or(fields.position_name)
        .unwrap_or_else(|| UNTITLED_POSITION.to_string());
    let department = optional(overrides.department.as_deref()).or(fields.department);
    let responsibilities = fields.responsibilities.unwrap_or_default();
    let requirements = fields.requirements.unwrap_or_default();

    let tags = tags_for(provider, &position_name, &responsibilities, &requirements).await;

    let job = queries::insert_job(
        db,
        &NewJob {
            position_name,
            department,
            responsibilities,
            requirements,
            salary_range: fields.salary_range,
            location: fields.location,
            tags,
        },
    )
    .await?;

    info!("Created job {} from uploaded document", job.id);
    Ok(job)
}

pub async fn update_job(
    db: &SqlitePool,
    provider: &dyn DocumentIntelligence,
    id: i64,
    req: UpdateJobRequest,
) -> Result<JobRow, AppError> {
    let mut job = queries::find_job(db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", id))?;

    let descriptive_change =
        req.position_name.is_some() || req.responsibilities.is_some() || req.requirements.is_some();

    if let Some(position_name) = &req.position_name {
        job.position_name = required("position_name", position_name)?;
    }
    if let Some(responsibilities) = &req.responsibilities {
        job.responsibilities = required("responsibilities", responsibilities)?;
    }
    if let Some(requirements) = &req.requirements {
        job.requirements = required("requirements", requirements)?;
    }
    if let Some(department) = &req.department {
        job.department = optional(Some(department));
    }
    if let Some(salary_range) = &req.salary_range {
        job.salary_range = optional(Some(salary_range));
    }
    if let Some(location) = &req.location {
        job.location = optional(Some(location));
    }

    if descriptive_change {
        job.tags = Json(
            tags_for(provider, &job.position_name, &job.responsibilities, &job.requirements).await,
        );
    } else if let Some(tags) = req.tags {
        job.tags = Json(tags);
    }
    job.updated_at = next_timestamp(job.updated_at);

    let job = queries::save_job(db, &job).await?;
    info!("Updated job {id}");
    Ok(job)
}

/// Refused with Conflict while matches or plans reference the job.
pub async fn delete_job(db: &SqlitePool, id: i64) -> Result<(), AppError> {
    if queries::delete_unreferenced_job(db, id).await? {
        info!("Deleted job {id}");
        return Ok(());
    }

    if queries::find_job(db, id).await?.is_none() {
        return Err(AppError::not_found("Job", id));
    }
    let (matches, plans) = queries::count_dependents(db, id).await?;
    Err(AppError::conflict(
        format!("Job {id} is referenced by {matches} match(es) and {plans} plan(s)"),
        None,
    ))
}
