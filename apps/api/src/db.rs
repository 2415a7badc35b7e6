use std::str::FromStr;

use anyhow::Result;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Creates the SQLite connection pool and brings the schema up to date.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    info!("Connecting to SQLite at {database_url}...");

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;

    info!("SQLite connection pool established, migrations applied");
    Ok(pool)
}

/// True when the store rejected a write because of a UNIQUE constraint.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

/// `LIKE` pattern matching `fragment` anywhere in the column. Use with `ESCAPE '\\'`.
pub fn like_contains(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// In-memory database with the full schema. One connection, kept alive for the
/// lifetime of the pool, so every query sees the same database.
#[cfg(test)]
pub async fn test_pool() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

/// File-backed database in `dir` behind the production pool settings, for tests
/// that need several connections writing at once.
#[cfg(test)]
pub async fn file_pool(dir: &std::path::Path) -> SqlitePool {
    let url = format!("sqlite://{}", dir.join("recruit.db").display());
    create_pool(&url).await.unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_contains_escapes_wildcards() {
        assert_eq!(like_contains("Ada"), "%Ada%");
        assert_eq!(like_contains("100%"), "%100\\%%");
        assert_eq!(like_contains("snake_case"), "%snake\\_case%");
        assert_eq!(like_contains("C:\\dev"), "%C:\\\\dev%");
    }

    #[tokio::test]
    async fn test_like_contains_matches_literally() {
        let pool = test_pool().await;
        for name in ["100% remote", "1000 remote", "a_b", "axb"] {
            sqlx::query("INSERT INTO tags (name) VALUES (?)")
                .bind(name)
                .execute(&pool)
                .await
                .unwrap();
        }
        let find = |fragment: &'static str| {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar::<_, String>("SELECT name FROM tags WHERE name LIKE ? ESCAPE '\\' ORDER BY name")
                    .bind(like_contains(fragment))
                    .fetch_all(&pool)
                    .await
                    .unwrap()
            }
        };
        assert_eq!(find("0%").await, vec!["100% remote"]);
        assert_eq!(find("_").await, vec!["a_b"]);
        assert_eq!(find("REMOTE").await, vec!["100% remote", "1000 remote"]);
    }

    #[tokio::test]
    async fn test_schema_enforces_unique_tag_names() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO tags (name, category) VALUES ('Rust', 'skill')")
            .execute(&pool)
            .await
            .unwrap();
        let err = sqlx::query("INSERT INTO tags (name, category) VALUES ('Rust', 'skill')")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn test_non_unique_errors_are_not_misreported() {
        let pool = test_pool().await;
        let err = sqlx::query("SELECT * FROM no_such_table")
            .execute(&pool)
            .await
            .unwrap_err();
        assert!(!is_unique_violation(&err));
    }
}
