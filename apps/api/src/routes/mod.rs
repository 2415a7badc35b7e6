pub mod health;
pub mod params;
pub mod upload;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;
use crate::{auth, jobs, matching, plans, resumes};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Auth
        .route("/api/v1/auth/register", post(auth::handlers::handle_register))
        .route("/api/v1/auth/login", post(auth::handlers::handle_login))
        .route("/api/v1/auth/me", get(auth::handlers::handle_me))
        // Jobs
        .route(
            "/api/v1/jobs",
            post(jobs::handlers::handle_create_job).get(jobs::handlers::handle_list_jobs),
        )
        .route("/api/v1/jobs/parse", post(jobs::handlers::handle_parse_job))
        .route("/api/v1/jobs/upload", post(jobs::handlers::handle_upload_job))
        .route(
            "/api/v1/jobs/:id",
            get(jobs::handlers::handle_get_job)
                .put(jobs::handlers::handle_update_job)
                .delete(jobs::handlers::handle_delete_job),
        )
        // Resumes
        .route(
            "/api/v1/resumes",
            post(resumes::handlers::handle_create_resume).get(resumes::handlers::handle_list_resumes),
        )
        .route("/api/v1/resumes/upload", post(resumes::handlers::handle_upload_resume))
        .route(
            "/api/v1/resumes/:id",
            get(resumes::handlers::handle_get_resume)
                .put(resumes::handlers::handle_update_resume)
                .delete(resumes::handlers::handle_delete_resume),
        )
        // Matches
        .route(
            "/api/v1/matches",
            post(matching::handlers::handle_create_match).get(matching::handlers::handle_list_matches),
        )
        .route("/api/v1/matches/batch", post(matching::handlers::handle_batch_match))
        .route(
            "/api/v1/matches/:id",
            get(matching::handlers::handle_get_match).delete(matching::handlers::handle_delete_match),
        )
        // Plans
        .route(
            "/api/v1/plans",
            post(plans::handlers::handle_create_plan).get(plans::handlers::handle_list_plans),
        )
        .route("/api/v1/plans/generate", post(plans::handlers::handle_generate_plan))
        .route(
            "/api/v1/plans/:id",
            get(plans::handlers::handle_get_plan)
                .put(plans::handlers::handle_update_plan)
                .delete(plans::handlers::handle_delete_plan),
        )
        .with_state(state)
}
