use chrono::Utc;
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::db::like_contains;
use crate::models::job::JobRow;
use crate::routes::params::Page;

pub struct NewJob {
    pub position_name: String,
    pub department: Option<String>,
    pub responsibilities: String,
    pub requirements: String,
    pub salary_range: Option<String>,
    pub location: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
pub struct JobFilter {
    /// Case-insensitive substring of the position name.
    pub position_name: Option<String>,
    /// Exact department.
    pub department: Option<String>,
}

pub async fn insert_job<'c, E>(db: E, job: &NewJob) -> Result<JobRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let now = Utc::now();
    sqlx::query_as::<_, JobRow>(
        "INSERT INTO job_requirements
             (position_name, department, responsibilities, requirements, salary_range, location, tags, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&job.position_name)
    .bind(&job.department)
    .bind(&job.responsibilities)
    .bind(&job.requirements)
    .bind(&job.salary_range)
    .bind(&job.location)
    .bind(Json(&job.tags))
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
}

pub async fn find_job<'c, E>(db: E, id: i64) -> Result<Option<JobRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, JobRow>("SELECT * FROM job_requirements WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Newest first.
pub async fn list_jobs<'c, E>(db: E, filter: &JobFilter, page: Page) -> Result<Vec<JobRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM job_requirements WHERE 1 = 1");
    if let Some(position) = &filter.position_name {
        query
            .push(" AND position_name LIKE ")
            .push_bind(like_contains(position))
            .push(" ESCAPE '\\'");
    }
    if let Some(department) = &filter.department {
        query.push(" AND department = ").push_bind(department.clone());
    }
    query
        .push(" ORDER BY created_at DESC, id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    query.build_query_as::<JobRow>().fetch_all(db).await
}

/// Writes every mutable column of `job` back to its row.
pub async fn save_job<'c, E>(db: E, job: &JobRow) -> Result<JobRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, JobRow>(
        "UPDATE job_requirements
         SET position_name = ?, department = ?, responsibilities = ?, requirements = ?,
             salary_range = ?, location = ?, tags = ?, updated_at = ?
         WHERE id = ?
         RETURNING *",
    )
    .bind(&job.position_name)
    .bind(&job.department)
    .bind(&job.responsibilities)
    .bind(&job.requirements)
    .bind(&job.salary_range)
    .bind(&job.location)
    .bind(&job.tags)
    .bind(job.updated_at)
    .bind(job.id)
    .fetch_one(db)
    .await
}

/// Number of (matches, plans) that reference the job.
pub async fn count_dependents<'c, E>(db: E, job_id: i64) -> Result<(i64, i64), sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, (i64, i64)>(
        "SELECT (SELECT COUNT(*) FROM matches WHERE job_id = ?),
                (SELECT COUNT(*) FROM plans WHERE job_id = ?)",
    )
    .bind(job_id)
    .bind(job_id)
    .fetch_one(db)
    .await
}

/// Deletes the job only while no match or plan references it.
/// False when the row is missing or still referenced.
pub async fn delete_unreferenced_job<'c, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let result = sqlx::query(
        "DELETE FROM job_requirements
         WHERE id = ?
           AND NOT EXISTS (SELECT 1 FROM matches WHERE job_id = ?)
           AND NOT EXISTS (SELECT 1 FROM plans WHERE job_id = ?)",
    )
    .bind(id)
    .bind(id)
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
