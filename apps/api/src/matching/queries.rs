use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use crate::intelligence::MatchAssessment;
use crate::models::matching::MatchRow;
use crate::routes::params::Page;

#[derive(Debug, Default)]
pub struct MatchFilter {
    pub resume_id: Option<i64>,
    pub job_id: Option<i64>,
    pub min_score: Option<f64>,
}

pub async fn find_match<'c, E>(db: E, id: i64) -> Result<Option<MatchRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_pair<'c, E>(db: E, resume_id: i64, job_id: i64) -> Result<Option<MatchRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, MatchRow>("SELECT * FROM matches WHERE resume_id = ? AND job_id = ?")
        .bind(resume_id)
        .bind(job_id)
        .fetch_optional(db)
        .await
}

/// Returns `None` when the pair already has a row.
pub async fn insert_match<'c, E>(
    db: E,
    resume_id: i64,
    job_id: i64,
    assessment: &MatchAssessment,
) -> Result<Option<MatchRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, MatchRow>(
        "INSERT INTO matches (resume_id, job_id, match_score, match_explanation, created_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT (resume_id, job_id) DO NOTHING
         RETURNING *",
    )
    .bind(resume_id)
    .bind(job_id)
    .bind(assessment.score)
    .bind(&assessment.explanation)
    .bind(Utc::now())
    .fetch_optional(db)
    .await
}

/// Highest score first.
pub async fn list_matches<'c, E>(db: E, filter: &MatchFilter, page: Page) -> Result<Vec<MatchRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM matches WHERE 1 = 1");
    if let Some(resume_id) = filter.resume_id {
        query.push(" AND resume_id = ").push_bind(resume_id);
    }
    if let Some(job_id) = filter.job_id {
        query.push(" AND job_id = ").push_bind(job_id);
    }
    if let Some(min_score) = filter.min_score {
        query.push(" AND match_score >= ").push_bind(min_score);
    }
    query
        .push(" ORDER BY match_score DESC, id ASC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    query.build_query_as::<MatchRow>().fetch_all(db).await
}

/// Matches for `job_id` scoring at least `min_score`, best first.
pub async fn qualifying_matches<'c, E>(db: E, job_id: i64, min_score: f64) -> Result<Vec<MatchRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, MatchRow>(
        "SELECT * FROM matches
         WHERE job_id = ? AND match_score >= ?
         ORDER BY match_score DESC, id ASC",
    )
    .bind(job_id)
    .bind(min_score)
    .fetch_all(db)
    .await
}

pub async fn delete_match<'c, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let result = sqlx::query("DELETE FROM matches WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
