//! Tag rows: globally unique names, created on first use.

use sqlx::{SqliteConnection, SqliteExecutor};
use tracing::debug;

use crate::models::resume::TagRow;

/// Category given to tags produced by resume tagging.
pub const SKILL_CATEGORY: &str = "skill";

pub async fn find_tag_by_name<'c, E>(db: E, name: &str) -> Result<Option<TagRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, TagRow>("SELECT * FROM tags WHERE name = ?")
        .bind(name)
        .fetch_optional(db)
        .await
}

/// Returns the tag named `name`, creating it if it does not exist yet.
pub async fn resolve_or_create_tag(
    conn: &mut SqliteConnection,
    name: &str,
    category: &str,
) -> Result<TagRow, sqlx::Error> {
    if let Some(tag) = find_tag_by_name(&mut *conn, name).await? {
        return Ok(tag);
    }
    insert_or_reuse(conn, name, category).await
}

/// Inserts the tag. If another writer created it since the lookup, their row is returned instead.
async fn insert_or_reuse(conn: &mut SqliteConnection, name: &str, category: &str) -> Result<TagRow, sqlx::Error> {
    let inserted = sqlx::query_as::<_, TagRow>(
        "INSERT INTO tags (name, category) VALUES (?, ?)
         ON CONFLICT (name) DO NOTHING
         RETURNING *",
    )
    .bind(name)
    .bind(category)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(tag) => {
            debug!("Created tag {} ({})", tag.name, tag.id);
            Ok(tag)
        }
        None => {
            debug!("Tag {name} already exists, reusing it");
            find_tag_by_name(&mut *conn, name)
                .await?
                .ok_or(sqlx::Error::RowNotFound)
        }
    }
}

/// Links each named tag to the resume, creating missing tags. Duplicate names link once.
pub async fn attach_tags(
    conn: &mut SqliteConnection,
    resume_id: i64,
    names: &[String],
) -> Result<Vec<TagRow>, sqlx::Error> {
    let mut attached: Vec<TagRow> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let tag = resolve_or_create_tag(conn, name, SKILL_CATEGORY).await?;
        sqlx::query("INSERT OR IGNORE INTO resume_tags (resume_id, tag_id) VALUES (?, ?)")
            .bind(resume_id)
            .bind(tag.id)
            .execute(&mut *conn)
            .await?;
        if !attached.iter().any(|t| t.id == tag.id) {
            attached.push(tag);
        }
    }
    Ok(attached)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{file_pool, test_pool};

    #[tokio::test]
    async fn test_resolve_creates_once() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let first = resolve_or_create_tag(&mut conn, "Python", SKILL_CATEGORY).await.unwrap();
        let second = resolve_or_create_tag(&mut conn, "Python", SKILL_CATEGORY).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.category.as_deref(), Some(SKILL_CATEGORY));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(&mut *conn)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_resolve_keeps_existing_category() {
        let pool = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        sqlx::query("INSERT INTO tags (name, category) VALUES ('SQL', 'database')")
            .execute(&mut *conn)
            .await
            .unwrap();
        let tag = resolve_or_create_tag(&mut conn, "SQL", SKILL_CATEGORY).await.unwrap();
        assert_eq!(tag.category.as_deref(), Some("database"));
    }

    #[tokio::test]
    async fn test_insert_after_another_writer_returns_their_row() {
        let dir = tempfile::tempdir().unwrap();
        let pool = file_pool(dir.path()).await;
        let mut ours = pool.acquire().await.unwrap();
        let mut theirs = pool.acquire().await.unwrap();

        assert!(find_tag_by_name(&mut *ours, "Go").await.unwrap().is_none());
        let winner: TagRow =
            sqlx::query_as("INSERT INTO tags (name, category) VALUES ('Go', 'language') RETURNING *")
                .fetch_one(&mut *theirs)
                .await
                .unwrap();

        let tag = insert_or_reuse(&mut ours, "Go", SKILL_CATEGORY).await.unwrap();
        assert_eq!(tag, winner);
        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE name = 'Go'")
            .fetch_one(&mut *ours)
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }
}
