//! Video domain - DB queries for the video library
//!
//! Single-query functions use the generic Executor pattern, allowing them
//! to work with both `&PgPool` and `&mut PgConnection` (transactions).
//! The listing entry point needs a follow-up count query, so it takes the
//! pool directly.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};

/// Sort keys for library listings. Each key maps to a fixed
/// column+direction; anything unrecognized falls back to newest-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoSort {
    MostRecent,
    Oldest,
    MostViewed,
    LeastViewed,
}

impl VideoSort {
    /// Parse a sort key from its query-string form
    pub fn parse(filter: Option<&str>) -> Self {
        match filter.map(|f| f.trim().to_lowercase()).as_deref() {
            Some("oldest") => VideoSort::Oldest,
            Some("most-viewed") => VideoSort::MostViewed,
            Some("least-viewed") => VideoSort::LeastViewed,
            _ => VideoSort::MostRecent,
        }
    }

    /// ORDER BY clause for this sort key. Values are fixed strings from
    /// this enum, never caller input.
    fn order_clause(&self) -> &'static str {
        match self {
            VideoSort::MostRecent => "v.created_at DESC",
            VideoSort::Oldest => "v.created_at ASC",
            VideoSort::MostViewed => "v.views DESC",
            VideoSort::LeastViewed => "v.views ASC",
        }
    }
}

/// A video row joined with its owner's public info
#[derive(Debug, sqlx::FromRow)]
pub struct VideoWithUser {
    pub id: i64,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub duration: i32,
    pub visibility: String,
    pub views: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
}

/// Listing row with the total match count from a window function
#[derive(Debug, sqlx::FromRow)]
struct VideoWithUserAndTotal {
    pub id: i64,
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: String,
    pub video_url: String,
    pub duration: i32,
    pub visibility: String,
    pub views: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_id: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_image: Option<String>,
    pub total_count: i64,
}

impl From<VideoWithUserAndTotal> for VideoWithUser {
    fn from(r: VideoWithUserAndTotal) -> Self {
        VideoWithUser {
            id: r.id,
            video_id: r.video_id,
            title: r.title,
            description: r.description,
            thumbnail_url: r.thumbnail_url,
            video_url: r.video_url,
            duration: r.duration,
            visibility: r.visibility,
            views: r.views,
            user_id: r.user_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            owner_id: r.owner_id,
            owner_name: r.owner_name,
            owner_image: r.owner_image,
        }
    }
}

const VIDEO_WITH_USER_COLUMNS: &str = r#"
    v.id, v.video_id, v.title, v.description, v.thumbnail_url, v.video_url,
    v.duration, v.visibility, v.views, v.user_id, v.created_at, v.updated_at,
    u.id AS owner_id, u.username AS owner_name, u.avatar_url AS owner_image
"#;

/// Fields persisted when the upload pipeline completes
#[derive(Debug)]
pub struct NewVideo<'a> {
    pub video_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub thumbnail_url: &'a str,
    pub video_url: &'a str,
    pub duration: i32,
    pub visibility: &'a str,
    pub user_id: i64,
}

/// Insert a metadata row for a fully uploaded video
pub async fn insert_video<'e, E>(executor: E, video: NewVideo<'_>) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        INSERT INTO videos
            (video_id, title, description, thumbnail_url, video_url,
             duration, visibility, user_id)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(video.video_id)
    .bind(video.title)
    .bind(video.description)
    .bind(video.thumbnail_url)
    .bind(video.video_url)
    .bind(video.duration)
    .bind(video.visibility)
    .bind(video.user_id)
    .fetch_one(executor)
    .await?;

    Ok(row.0)
}

/// Page of videos visible to the viewer (public, or owned by them),
/// optionally filtered by a case-insensitive title substring, plus the
/// total match count. The count rides along as a window function so the
/// page and total come from one snapshot; an out-of-range page returns no
/// rows, so the total falls back to a dedicated count query there.
pub async fn list_videos_with_count(
    db: &sqlx::PgPool,
    viewer_id: Option<i64>,
    search: Option<&str>,
    sort: VideoSort,
    limit: i64,
    offset: i64,
) -> Result<(Vec<VideoWithUser>, i64), sqlx::Error> {
    let query = format!(
        r#"
        SELECT {columns},
               COUNT(*) OVER() AS total_count
        FROM videos v
        LEFT JOIN users u ON u.id = v.user_id
        WHERE (v.visibility = 'public' OR v.user_id = $1)
          AND ($2::text IS NULL OR v.title ILIKE '%' || $2 || '%')
        ORDER BY {order}
        LIMIT $3 OFFSET $4
        "#,
        columns = VIDEO_WITH_USER_COLUMNS,
        order = sort.order_clause(),
    );

    let rows: Vec<VideoWithUserAndTotal> = sqlx::query_as(&query)
        .bind(viewer_id)
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await?;

    let total = match rows.first() {
        Some(row) => row.total_count,
        None => count_visible_videos(db, viewer_id, search).await?,
    };
    let videos = rows.into_iter().map(VideoWithUser::from).collect();

    Ok((videos, total))
}

/// Total videos visible to the viewer under the given search filter
async fn count_visible_videos(
    db: &sqlx::PgPool,
    viewer_id: Option<i64>,
    search: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*)
        FROM videos v
        WHERE (v.visibility = 'public' OR v.user_id = $1)
          AND ($2::text IS NULL OR v.title ILIKE '%' || $2 || '%')
        "#,
    )
    .bind(viewer_id)
    .bind(search)
    .fetch_one(db)
    .await?;

    Ok(row.0)
}

/// All of one user's videos, newest-first by default. Non-owners see only
/// public videos; the owner sees everything.
pub async fn list_user_videos<'e, E>(
    executor: E,
    owner_id: i64,
    include_private: bool,
    search: Option<&str>,
    sort: VideoSort,
) -> Result<Vec<VideoWithUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        SELECT {columns}
        FROM videos v
        LEFT JOIN users u ON u.id = v.user_id
        WHERE v.user_id = $1
          AND ($2 OR v.visibility = 'public')
          AND ($3::text IS NULL OR v.title ILIKE '%' || $3 || '%')
        ORDER BY {order}
        "#,
        columns = VIDEO_WITH_USER_COLUMNS,
        order = sort.order_clause(),
    );

    sqlx::query_as(&query)
        .bind(owner_id)
        .bind(include_private)
        .bind(search)
        .fetch_all(executor)
        .await
}

/// Fetch one video with its owner by CDN GUID
pub async fn get_video_by_guid<'e, E>(
    executor: E,
    video_id: &str,
) -> Result<Option<VideoWithUser>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let query = format!(
        r#"
        SELECT {columns}
        FROM videos v
        LEFT JOIN users u ON u.id = v.user_id
        WHERE v.video_id = $1
        "#,
        columns = VIDEO_WITH_USER_COLUMNS,
    );

    sqlx::query_as(&query)
        .bind(video_id)
        .fetch_optional(executor)
        .await
}

/// Fields needed before mutating or deleting a video
#[derive(Debug, sqlx::FromRow)]
pub struct VideoOwnership {
    pub user_id: i64,
    pub thumbnail_url: String,
}

pub async fn get_video_ownership<'e, E>(
    executor: E,
    video_id: &str,
) -> Result<Option<VideoOwnership>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT user_id, thumbnail_url FROM videos WHERE video_id = $1")
        .bind(video_id)
        .fetch_optional(executor)
        .await
}

/// Flip a video's visibility flag
pub async fn update_visibility<'e, E>(
    executor: E,
    video_id: &str,
    visibility: &str,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE videos SET visibility = $2, updated_at = NOW()
        WHERE video_id = $1
        "#,
    )
    .bind(video_id)
    .bind(visibility)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the view counter. Not deduplicated by viewer; the counter is
/// monotonic but not exactly-once.
pub async fn increment_views<'e, E>(executor: E, video_id: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        r#"
        UPDATE videos SET views = views + 1, updated_at = NOW()
        WHERE video_id = $1
        "#,
    )
    .bind(video_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Delete a video row. Zero rows affected is a no-op, not an error.
pub async fn delete_video<'e, E>(executor: E, video_id: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query("DELETE FROM videos WHERE video_id = $1")
        .bind(video_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parse() {
        assert_eq!(VideoSort::parse(None), VideoSort::MostRecent);
        assert_eq!(VideoSort::parse(Some("oldest")), VideoSort::Oldest);
        assert_eq!(VideoSort::parse(Some("Most-Viewed")), VideoSort::MostViewed);
        assert_eq!(
            VideoSort::parse(Some("least-viewed")),
            VideoSort::LeastViewed
        );
        assert_eq!(VideoSort::parse(Some("nonsense")), VideoSort::MostRecent);
        assert_eq!(VideoSort::parse(Some("")), VideoSort::MostRecent);
    }

    #[test]
    fn test_sort_order_clause() {
        assert_eq!(VideoSort::MostRecent.order_clause(), "v.created_at DESC");
        assert_eq!(VideoSort::MostViewed.order_clause(), "v.views DESC");
        assert_eq!(VideoSort::Oldest.order_clause(), "v.created_at ASC");
        assert_eq!(VideoSort::LeastViewed.order_clause(), "v.views ASC");
    }
}
