use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::ingest::{self, CreateJobRequest, JobOverrides, JobParseResult, UpdateJobRequest};
use super::queries::{self, JobFilter};
use crate::errors::AppError;
use crate::models::job::JobRow;
use crate::routes::params::{non_blank, Page};
use crate::routes::upload::UploadForm;
use crate::state::AppState;
use crate::storage::extract::extract_text;

#[derive(Debug, Deserialize)]
pub struct JobListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub position_name: Option<String>,
    pub department: Option<String>,
}

/// POST /api/v1/jobs
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let job = ingest::create_job(&state.db, state.intelligence.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
    Query(params): Query<JobListQuery>,
) -> Result<Json<Vec<JobRow>>, AppError> {
    let filter = JobFilter {
        position_name: non_blank(params.position_name.as_deref()).map(str::to_string),
        department: non_blank(params.department.as_deref()).map(str::to_string),
    };
    let jobs = queries::list_jobs(&state.db, &filter, Page::new(params.skip, params.limit)).await?;
    Ok(Json(jobs))
}

/// GET /api/v1/jobs/:id
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<JobRow>, AppError> {
    let job = queries::find_job(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Job", id))?;
    Ok(Json(job))
}

/// PUT /api/v1/jobs/:id
pub async fn handle_update_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobRow>, AppError> {
    let job = ingest::update_job(&state.db, state.intelligence.as_ref(), id, req).await?;
    Ok(Json(job))
}

/// DELETE /api/v1/jobs/:id
pub async fn handle_delete_job(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ingest::delete_job(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/jobs/parse
/// Parses an uploaded posting and returns its fields and tags without storing anything.
pub async fn handle_parse_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<JobParseResult>, AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;
    let text = extract_text(upload.bytes.clone(), &upload.file_type(), &upload.file_name).await;
    Ok(Json(ingest::parse_job_document(state.intelligence.as_ref(), &text).await))
}

/// POST /api/v1/jobs/upload
/// Creates a job from an uploaded posting. Optional `position_name` and
/// `department` form fields override the parsed values.
pub async fn handle_upload_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<JobRow>), AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;
    let text = extract_text(upload.bytes.clone(), &upload.file_type(), &upload.file_name).await;
    let overrides = JobOverrides {
        position_name: form.text("position_name"),
        department: form.text("department"),
    };
    let job =
        ingest::create_job_from_document(&state.db, state.intelligence.as_ref(), &text, overrides)
            .await?;
    Ok((StatusCode::CREATED, Json(job)))
}
