use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::queries::{self, MatchFilter};
use super::workflow::{self, BatchMatchRequest, MatchRequest};
use crate::errors::AppError;
use crate::models::matching::MatchRow;
use crate::routes::params::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub resume_id: Option<i64>,
    pub job_id: Option<i64>,
    pub min_score: Option<f64>,
}

/// POST /api/v1/matches
pub async fn handle_create_match(
    State(state): State<AppState>,
    Json(req): Json<MatchRequest>,
) -> Result<(StatusCode, Json<MatchRow>), AppError> {
    let row = workflow::compute_match(&state.db, state.intelligence.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// POST /api/v1/matches/batch
pub async fn handle_batch_match(
    State(state): State<AppState>,
    Json(req): Json<BatchMatchRequest>,
) -> Result<Json<Vec<MatchRow>>, AppError> {
    if req.resume_ids.is_empty() {
        return Err(AppError::Validation("resume_ids must not be empty".to_string()));
    }
    let rows = workflow::compute_batch(&state.db, state.intelligence.as_ref(), req).await?;
    Ok(Json(rows))
}

/// GET /api/v1/matches
pub async fn handle_list_matches(
    State(state): State<AppState>,
    Query(params): Query<MatchListQuery>,
) -> Result<Json<Vec<MatchRow>>, AppError> {
    let filter = MatchFilter {
        resume_id: params.resume_id,
        job_id: params.job_id,
        min_score: params.min_score,
    };
    let rows = queries::list_matches(&state.db, &filter, Page::new(params.skip, params.limit)).await?;
    Ok(Json(rows))
}

/// GET /api/v1/matches/:id
pub async fn handle_get_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MatchRow>, AppError> {
    let row = queries::find_match(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Match", id))?;
    Ok(Json(row))
}

/// DELETE /api/v1/matches/:id
pub async fn handle_delete_match(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    workflow::delete_match(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
