//! Profile endpoints (/users/*)

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::domain::videos::VideoSort;
use crate::domain::{users as users_domain, videos as videos_domain};
use crate::models::VideoResponse;
use crate::services::error::LogErr;

use super::auth::OptionalAuthUser;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/users/{user_id}/videos", get(get_user_videos))
}

#[derive(Deserialize)]
struct UserVideosQuery {
    query: Option<String>,
    filter: Option<String>,
}

#[derive(Serialize)]
struct ProfileUser {
    id: i64,
    name: String,
    image: Option<String>,
    email: Option<String>,
}

#[derive(Serialize)]
struct UserVideosResponse {
    user: ProfileUser,
    videos: Vec<VideoResponse>,
    count: usize,
}

/// GET /users/:id/videos - A user's profile plus their videos. Non-owners
/// see only public videos; the owner sees everything.
async fn get_user_videos(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(viewer_id): OptionalAuthUser,
    Path(user_id): Path<i64>,
    Query(query): Query<UserVideosQuery>,
) -> Result<Json<UserVideosResponse>, StatusCode> {
    let user = users_domain::get_user_by_id(&state.db, user_id)
        .await
        .log_500("Get user by ID error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    let is_owner = viewer_id == Some(user_id);
    let search = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let sort = VideoSort::parse(query.filter.as_deref());

    let videos = videos_domain::list_user_videos(&state.db, user_id, is_owner, search, sort)
        .await
        .log_500("List user videos error")?;

    let videos: Vec<VideoResponse> = videos.into_iter().map(VideoResponse::from).collect();

    Ok(Json(UserVideosResponse {
        user: ProfileUser {
            id: user.id,
            name: user.display_name.unwrap_or(user.username),
            image: user.avatar_url,
            email: user.email,
        },
        count: videos.len(),
        videos,
    }))
}
