use chrono::Utc;
use sqlx::SqliteExecutor;

use crate::models::user::UserRow;

pub async fn find_by_id<'c, E>(db: E, id: i64) -> Result<Option<UserRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_username<'c, E>(db: E, username: &str) -> Result<Option<UserRow>, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(db)
        .await
}

pub async fn email_taken<'c, E>(db: E, email: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
        .bind(email)
        .fetch_one(db)
        .await
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub hashed_password: &'a str,
    pub full_name: Option<&'a str>,
}

/// New accounts are active and never superusers.
pub async fn insert_user<'c, E>(db: E, user: &NewUser<'_>) -> Result<UserRow, sqlx::Error>
where
    E: SqliteExecutor<'c>,
{
    let now = Utc::now();
    sqlx::query_as::<_, UserRow>(
        "INSERT INTO users (username, email, hashed_password, full_name, is_active, is_superuser, created_at, updated_at)
         VALUES (?, ?, ?, ?, 1, 0, ?, ?)
         RETURNING *",
    )
    .bind(user.username)
    .bind(user.email)
    .bind(user.hashed_password)
    .bind(user.full_name)
    .bind(now)
    .bind(now)
    .fetch_one(db)
    .await
}
