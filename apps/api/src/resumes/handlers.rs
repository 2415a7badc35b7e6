use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::ingest::{self, CreateResumeRequest, UpdateResumeRequest};
use super::queries::{self, ResumeFilter};
use crate::errors::AppError;
use crate::models::resume::ResumeDetail;
use crate::routes::params::{non_blank, Page};
use crate::routes::upload::UploadForm;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResumeListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub candidate_name: Option<String>,
    pub tag: Option<String>,
}

/// POST /api/v1/resumes
pub async fn handle_create_resume(
    State(state): State<AppState>,
    Json(req): Json<CreateResumeRequest>,
) -> Result<(StatusCode, Json<ResumeDetail>), AppError> {
    let detail = ingest::create_resume(&state.db, req).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// POST /api/v1/resumes/upload
/// Multipart: a `file` part and an optional `candidate_name` text part.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResumeDetail>), AppError> {
    let mut form = UploadForm::read(multipart).await?;
    let upload = form.require_file()?;
    let detail = ingest::ingest_resume_upload(
        &state.db,
        state.intelligence.as_ref(),
        state.files.as_ref(),
        upload,
        form.text("candidate_name"),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// GET /api/v1/resumes
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(params): Query<ResumeListQuery>,
) -> Result<Json<Vec<ResumeDetail>>, AppError> {
    let filter = ResumeFilter {
        candidate_name: non_blank(params.candidate_name.as_deref()).map(str::to_string),
        tag: non_blank(params.tag.as_deref()).map(str::to_string),
    };
    let rows = queries::list_resumes(&state.db, &filter, Page::new(params.skip, params.limit)).await?;

    let mut resumes = Vec::with_capacity(rows.len());
    for resume in rows {
        let tags = queries::tags_for_resume(&state.db, resume.id).await?;
        resumes.push(ResumeDetail { resume, tags });
    }
    Ok(Json(resumes))
}

/// GET /api/v1/resumes/:id
pub async fn handle_get_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ResumeDetail>, AppError> {
    Ok(Json(ingest::load_detail(&state.db, id).await?))
}

/// PUT /api/v1/resumes/:id
pub async fn handle_update_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateResumeRequest>,
) -> Result<Json<ResumeDetail>, AppError> {
    Ok(Json(ingest::update_resume(&state.db, id, req).await?))
}

/// DELETE /api/v1/resumes/:id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    ingest::delete_resume(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
