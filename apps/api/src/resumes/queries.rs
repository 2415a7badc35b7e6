use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqliteExecutor};

use crate::db::like_contains;
use crate::models::resume::{ResumeRow, TagRow};
use crate::routes::params::Page;

pub struct NewResume {
    pub candidate_name: String,
    pub file_url: String,
    pub file_type: String,
    pub ocr_content: Option<String>,
    pub parsed_content: Option<String>,
    pub talent_portrait: Option<String>,
}

/// Columns an update may overwrite. `None` keeps the stored value.
#[derive(Debug, Default)]
pub struct ResumeChanges {
    pub candidate_name: Option<String>,
    pub ocr_content: Option<String>,
    pub parsed_content: Option<String>,
    pub talent_portrait: Option<String>,
}

#[derive(Debug, Default)]
pub struct ResumeFilter {
    /// Case-insensitive substring of the candidate name.
    pub candidate_name: Option<String>,
    /// Exact tag name the resume must be linked to.
    pub tag: Option<String>,
}

pub async fn insert_resume(conn: &mut SqliteConnection, resume: &NewResume) -> Result<ResumeRow, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, ResumeRow>(
        "INSERT INTO resumes
             (candidate_name, file_url, file_type, ocr_content, parsed_content, talent_portrait, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         RETURNING *",
    )
    .bind(&resume.candidate_name)
    .bind(&resume.file_url)
    .bind(&resume.file_type)
    .bind(&resume.ocr_content)
    .bind(&resume.parsed_content)
    .bind(&resume.talent_portrait)
    .bind(now)
    .bind(now)
    .fetch_one(conn)
    .await
}

pub async fn find_resume<'c, E>(db: E, id: i64) -> Result<Option<ResumeRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Newest first.
pub async fn list_resumes<'c, E>(db: E, filter: &ResumeFilter, page: Page) -> Result<Vec<ResumeRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT r.* FROM resumes r WHERE 1 = 1");
    if let Some(name) = &filter.candidate_name {
        query
            .push(" AND r.candidate_name LIKE ")
            .push_bind(like_contains(name))
            .push(" ESCAPE '\\'");
    }
    if let Some(tag) = &filter.tag {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM resume_tags rt JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.resume_id = r.id AND t.name = ",
            )
            .push_bind(tag.clone())
            .push(")");
    }
    query
        .push(" ORDER BY r.created_at DESC, r.id DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset);

    query.build_query_as::<ResumeRow>().fetch_all(db).await
}

pub async fn tags_for_resume<'c, E>(db: E, resume_id: i64) -> Result<Vec<TagRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, TagRow>(
        "SELECT t.* FROM tags t
         JOIN resume_tags rt ON rt.tag_id = t.id
         WHERE rt.resume_id = ?
         ORDER BY t.id",
    )
    .bind(resume_id)
    .fetch_all(db)
    .await
}

/// Overwrites the supplied columns and returns the row, or `None` if there is no such resume.
pub async fn apply_resume_changes<'c, E>(
    db: E,
    id: i64,
    changes: &ResumeChanges,
) -> Result<Option<ResumeRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, ResumeRow>(
        "UPDATE resumes
         SET candidate_name = COALESCE(?, candidate_name),
             ocr_content = COALESCE(?, ocr_content),
             parsed_content = COALESCE(?, parsed_content),
             talent_portrait = COALESCE(?, talent_portrait)
         WHERE id = ?
         RETURNING *",
    )
    .bind(&changes.candidate_name)
    .bind(&changes.ocr_content)
    .bind(&changes.parsed_content)
    .bind(&changes.talent_portrait)
    .bind(id)
    .fetch_optional(db)
    .await
}

pub async fn set_resume_updated_at<'c, E>(db: E, id: i64, updated_at: DateTime<Utc>) -> Result<ResumeRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, ResumeRow>("UPDATE resumes SET updated_at = ? WHERE id = ? RETURNING *")
        .bind(updated_at)
        .bind(id)
        .fetch_one(db)
        .await
}

pub async fn unlink_tags<'c, E>(db: E, resume_id: i64) -> Result<(), sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query("DELETE FROM resume_tags WHERE resume_id = ?")
        .bind(resume_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn count_matches<'c, E>(db: E, resume_id: i64) -> Result<i64, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM matches WHERE resume_id = ?")
        .bind(resume_id)
        .fetch_one(db)
        .await
}

/// Deletes the resume only while no match references it. Tag links go with
/// the resume; tag rows stay. False when the row is missing or still matched.
pub async fn delete_unmatched_resume<'c, E>(db: E, id: i64) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let result = sqlx::query(
        "DELETE FROM resumes
         WHERE id = ? AND NOT EXISTS (SELECT 1 FROM matches WHERE resume_id = ?)",
    )
    .bind(id)
    .bind(id)
    .execute(db)
    .await?;
    Ok(result.rows_affected() > 0)
}
