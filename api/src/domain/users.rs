//! User domain - DB queries for users
//!
//! Users are created by the auth gateway on first social sign-in and are
//! never deleted by this application. Functions take a generic Executor so
//! they work with both `&PgPool` and `&mut PgConnection` (transactions).

use sqlx::{Executor, PgPool, Postgres};

/// Public profile fields exposed on listing and profile endpoints
#[derive(Debug, sqlx::FromRow)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

/// Create or refresh a user from a GitHub profile, keyed on github_id.
/// Returns the application user id.
pub async fn upsert_user(
    db: &PgPool,
    github_id: i64,
    username: &str,
    display_name: Option<&str>,
    avatar_url: Option<&str>,
    email: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO users (github_id, username, display_name, avatar_url, email)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (github_id) DO UPDATE SET
            username = $2,
            display_name = $3,
            avatar_url = $4,
            email = COALESCE($5, users.email),
            updated_at = NOW()
        RETURNING id
        "#,
    )
    .bind(github_id)
    .bind(username)
    .bind(display_name)
    .bind(avatar_url)
    .bind(email)
    .fetch_one(db)
    .await?;

    Ok(row.0)
}

/// Get public user info by id
pub async fn get_user_by_id<'e, E>(executor: E, user_id: i64) -> Result<Option<UserInfo>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        r#"
        SELECT id, username, display_name, email, avatar_url
        FROM users WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Set a user's API token (used by the native capture client)
pub async fn set_user_api_token(
    db: &PgPool,
    user_id: i64,
    api_token: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users SET api_token = $2, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(api_token)
    .execute(db)
    .await?;
    Ok(())
}

/// Get a user's current API token
pub async fn get_user_api_token(db: &PgPool, user_id: i64) -> Result<Option<String>, sqlx::Error> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT api_token FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;
    Ok(row.and_then(|r| r.0))
}

/// Look up the user id owning an API token (for bearer auth)
pub async fn get_user_by_api_token(
    db: &PgPool,
    api_token: &str,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE api_token = $1")
        .bind(api_token)
        .fetch_optional(db)
        .await?;
    Ok(row.map(|r| r.0))
}
