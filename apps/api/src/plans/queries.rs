use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::models::plan::PlanRow;
use crate::routes::params::Page;

pub struct NewPlan {
    pub title: String,
    pub job_id: i64,
    pub description: Option<String>,
    pub strategy: Option<String>,
    pub candidate_ids: Vec<i64>,
    pub created_by: Option<i64>,
}

pub async fn insert_plan<'c, E>(db: E, plan: &NewPlan) -> Result<PlanRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let now = Utc::now();
    sqlx::query_as::<_, PlanRow>(
        "INSERT INTO plans (title, job_id, description, strategy, candidate_ids, created_by, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&plan.title)
    .bind(plan.job_id)
    .bind(&plan.description)
    .bind(&plan.strategy)
    .bind(Json(&plan.candidate_ids))
    .bind(plan.created_by)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
}

pub async fn find_plan<'c, E>(db: E, id: i64) -> Result<Option<PlanRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, PlanRow>("SELECT * FROM plans WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Newest first.
pub async fn list_plans<'c, E>(db: E, job_id: Option<i64>, page: Page) -> Result<Vec<PlanRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM plans");
    if let Some(job_id) = job_id {
        query.push(" WHERE job_id = ").push_bind(job_id);
    }
    query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    query.build_query_as::<PlanRow>().fetch_all(db).await
}

pub async fn save_plan<'c, E>(db: E, plan: &PlanRow) -> Result<PlanRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, PlanRow>(
        "UPDATE plans
         SET title = ?, description = ?, strategy = ?, candidate_ids = ?, updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&plan.title)
    .bind(&plan.description)
    .bind(&plan.strategy)
    .bind(&plan.candidate_ids)
    .bind(plan.updated_at)
    .bind(plan.id)
    .fetch_one(db)
    .await
}

pub async fn delete_plan<'c, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let result = sqlx::query("DELETE FROM plans WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
