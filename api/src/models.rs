//! Shared data models used across modules

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::videos::VideoWithUser;

/// Per-video access flag controlling listing inclusion for non-owners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Parse a visibility value from its wire form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Visibility::Public),
            "private" => Some(Visibility::Private),
            _ => None,
        }
    }
}

/// Video owner info embedded in listing and detail responses
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub image: Option<String>,
}

/// Video API response DTO
#[derive(Debug, Serialize)]
pub struct VideoResponse {
    pub id: i64,
    #[serde(rename = "videoId")]
    pub video_id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "thumbnailUrl")]
    pub thumbnail_url: String,
    #[serde(rename = "videoUrl")]
    pub video_url: String,
    pub duration: i32,
    pub visibility: String,
    pub views: i64,
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
    pub user: UserSummary,
}

impl From<VideoWithUser> for VideoResponse {
    fn from(row: VideoWithUser) -> Self {
        Self {
            id: row.id,
            video_id: row.video_id,
            title: row.title,
            description: row.description,
            thumbnail_url: row.thumbnail_url,
            video_url: row.video_url,
            duration: row.duration,
            visibility: row.visibility,
            views: row.views,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: row.owner_id,
                name: row.owner_name,
                image: row.owner_image,
            },
        }
    }
}

/// Pagination block returned alongside listing pages
#[derive(Debug, Serialize)]
pub struct Pagination {
    #[serde(rename = "currentPage")]
    pub current_page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    #[serde(rename = "totalVideos")]
    pub total_videos: i64,
    #[serde(rename = "totalPages")]
    pub total_pages: i64,
}

/// Total page count for a listing: ceil(total / page_size)
pub fn page_count(total: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total + page_size - 1) / page_size
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visibility_round_trip() {
        assert_eq!(Visibility::parse("public"), Some(Visibility::Public));
        assert_eq!(Visibility::parse("private"), Some(Visibility::Private));
        assert_eq!(Visibility::parse("unlisted"), None);
        assert_eq!(Visibility::Private.as_str(), "private");
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0, 8), 0);
        assert_eq!(page_count(5, 8), 1);
        assert_eq!(page_count(8, 8), 1);
        assert_eq!(page_count(9, 8), 2);
        assert_eq!(page_count(17, 8), 3);
    }
}
