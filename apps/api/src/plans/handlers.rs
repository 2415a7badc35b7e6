use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::queries;
use super::workflow::{self, CreatePlanRequest, GeneratePlanRequest, UpdatePlanRequest};
use crate::auth::MaybeUser;
use crate::errors::AppError;
use crate::models::plan::PlanRow;
use crate::routes::params::Page;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanListQuery {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub job_id: Option<i64>,
}

/// POST /api/v1/plans
pub async fn handle_create_plan(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<CreatePlanRequest>,
) -> Result<(StatusCode, Json<PlanRow>), AppError> {
    let plan = workflow::create_plan(&state.db, req, user.map(|u| u.id)).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// POST /api/v1/plans/generate
pub async fn handle_generate_plan(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Json(req): Json<GeneratePlanRequest>,
) -> Result<(StatusCode, Json<PlanRow>), AppError> {
    let plan = workflow::generate_plan(
        &state.db,
        state.intelligence.as_ref(),
        req,
        user.map(|u| u.id),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

/// GET /api/v1/plans
pub async fn handle_list_plans(
    State(state): State<AppState>,
    Query(params): Query<PlanListQuery>,
) -> Result<Json<Vec<PlanRow>>, AppError> {
    let plans = queries::list_plans(&state.db, params.job_id, Page::new(params.skip, params.limit)).await?;
    Ok(Json(plans))
}

/// GET /api/v1/plans/:id
pub async fn handle_get_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PlanRow>, AppError> {
    let plan = queries::find_plan(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Plan", id))?;
    Ok(Json(plan))
}

/// PUT /api/v1/plans/:id
pub async fn handle_update_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdatePlanRequest>,
) -> Result<Json<PlanRow>, AppError> {
    Ok(Json(workflow::update_plan(&state.db, id, req).await?))
}

/// DELETE /api/v1/plans/:id
pub async fn handle_delete_plan(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    workflow::delete_plan(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
