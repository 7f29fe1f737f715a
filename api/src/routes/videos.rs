//! Video endpoints: upload coordination, library listing, detail,
//! processing status, visibility, view counts, deletion.
//!
//! Binary payloads never pass through these handlers; the upload
//! endpoints hand out CDN credentials and the caller PUTs directly to
//! the vendor.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PENDING_VIDEO_TITLE};
use crate::domain::videos as videos_domain;
use crate::domain::videos::{NewVideo, VideoSort};
use crate::models::{Pagination, Visibility, VideoResponse, page_count};
use crate::services::bunny;
use crate::services::{error::LogErr, rate_limit::UPLOAD_RATE_LIMITER};

use super::auth::{AuthUser, OptionalAuthUser};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/videos", get(list_videos).post(save_video))
        .route("/videos/upload", post(upload_credentials))
        .route(
            "/videos/{video_id}/thumbnail-upload",
            get(thumbnail_credentials),
        )
        .route("/videos/{video_id}", get(get_video).delete(delete_video))
        .route("/videos/{video_id}/status", get(processing_status))
        .route("/videos/{video_id}/transcript", get(get_transcript))
        .route("/videos/{video_id}/visibility", patch(update_visibility))
        .route("/videos/{video_id}/view", post(increment_view))
}

// ============================================================================
// Upload coordination
// ============================================================================

#[derive(Serialize)]
struct UploadCredentialsResponse {
    #[serde(rename = "videoId")]
    video_id: String,
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    #[serde(rename = "accessKey")]
    access_key: String,
}

/// POST /videos/upload - Create a CDN video container and return
/// credentials for the direct binary upload
async fn upload_credentials(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UploadCredentialsResponse>, StatusCode> {
    // Every allowed request creates a CDN resource
    if !UPLOAD_RATE_LIMITER.check(user_id) {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }

    let video_id = state
        .bunny
        .create_video(PENDING_VIDEO_TITLE)
        .await
        .log_status("Create video container error", StatusCode::BAD_GATEWAY)?;

    Ok(Json(UploadCredentialsResponse {
        upload_url: state.bunny.upload_url(&video_id),
        access_key: state.bunny.stream_access_key().to_string(),
        video_id,
    }))
}

#[derive(Serialize)]
struct ThumbnailCredentialsResponse {
    #[serde(rename = "uploadUrl")]
    upload_url: String,
    #[serde(rename = "cdnUrl")]
    cdn_url: String,
    #[serde(rename = "accessKey")]
    access_key: String,
}

/// GET /videos/:id/thumbnail-upload - Derive a thumbnail object key and
/// return storage credentials for it
async fn thumbnail_credentials(
    State(state): State<Arc<AppState>>,
    AuthUser(_user_id): AuthUser,
    Path(video_id): Path<String>,
) -> Json<ThumbnailCredentialsResponse> {
    let key = bunny::thumbnail_object_key(&video_id, Utc::now().timestamp_millis());

    Json(ThumbnailCredentialsResponse {
        upload_url: state.bunny.thumbnail_upload_url(&key),
        cdn_url: state.bunny.thumbnail_cdn_url(&key),
        access_key: state.bunny.storage_access_key().to_string(),
    })
}

#[derive(Deserialize)]
struct SaveVideoRequest {
    #[serde(rename = "videoId")]
    video_id: String,
    title: String,
    description: String,
    #[serde(rename = "thumbnailUrl")]
    thumbnail_url: String,
    visibility: String,
    #[serde(default)]
    duration: i32,
}

#[derive(Serialize)]
struct SaveVideoResponse {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Serialize)]
struct ValidationError {
    error: &'static str,
}

fn validation_error(message: &'static str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ValidationError { error: message }),
    )
        .into_response()
}

/// POST /videos - Persist the metadata row once both binaries are on the
/// CDN. Pushes the final title/description to the video container first.
async fn save_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<SaveVideoRequest>,
) -> Result<Response, StatusCode> {
    if req.title.trim().is_empty() || req.description.trim().is_empty() {
        return Ok(validation_error("Please fill in all the details"));
    }
    if req.video_id.trim().is_empty() || req.thumbnail_url.trim().is_empty() {
        return Ok(validation_error("Please upload video and thumbnail"));
    }
    let Some(visibility) = Visibility::parse(&req.visibility) else {
        return Ok(validation_error("Visibility must be public or private"));
    };

    state
        .bunny
        .update_video(&req.video_id, &req.title, &req.description)
        .await
        .log_status("Update video container error", StatusCode::BAD_GATEWAY)?;

    let video_url = state.bunny.embed_url(&req.video_id);
    videos_domain::insert_video(
        &state.db,
        NewVideo {
            video_id: &req.video_id,
            title: &req.title,
            description: &req.description,
            thumbnail_url: &req.thumbnail_url,
            video_url: &video_url,
            duration: req.duration,
            visibility: visibility.as_str(),
            user_id,
        },
    )
    .await
    .log_500("Insert video error")?;

    Ok((
        StatusCode::CREATED,
        Json(SaveVideoResponse {
            video_id: req.video_id,
        }),
    )
        .into_response())
}

// ============================================================================
// Listing & detail
// ============================================================================

#[derive(Deserialize)]
struct ListVideosQuery {
    query: Option<String>,
    filter: Option<String>,
    page: Option<i64>,
    #[serde(rename = "pageSize")]
    page_size: Option<i64>,
}

#[derive(Serialize)]
struct ListVideosResponse {
    videos: Vec<VideoResponse>,
    pagination: Pagination,
}

/// GET /videos - Page of videos visible to the requester: public ones,
/// plus their own. Out-of-range pages return an empty list, not an error.
async fn list_videos(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(viewer_id): OptionalAuthUser,
    Query(query): Query<ListVideosQuery>,
) -> Result<Json<ListVideosResponse>, StatusCode> {
    let page = query.page.unwrap_or(1).max(1);
    let page_size = query
        .page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = (page - 1) * page_size;

    let search = query
        .query
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let sort = VideoSort::parse(query.filter.as_deref());

    let (videos, total) = videos_domain::list_videos_with_count(
        &state.db, viewer_id, search, sort, page_size, offset,
    )
    .await
    .log_500("List videos error")?;

    Ok(Json(ListVideosResponse {
        videos: videos.into_iter().map(VideoResponse::from).collect(),
        pagination: Pagination {
            current_page: page,
            page_size,
            total_videos: total,
            total_pages: page_count(total, page_size),
        },
    }))
}

/// GET /videos/:id - Video detail with owner info
async fn get_video(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<VideoResponse>, StatusCode> {
    let video = videos_domain::get_video_by_guid(&state.db, &video_id)
        .await
        .log_500("Get video error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(VideoResponse::from(video)))
}

// ============================================================================
// Processing status & transcript
// ============================================================================

#[derive(Serialize)]
struct ProcessingStatusResponse {
    #[serde(rename = "isProcessed")]
    is_processed: bool,
    #[serde(rename = "encodingProgress")]
    encoding_progress: i32,
    status: i32,
}

/// GET /videos/:id/status - Transcode status straight from the CDN.
/// Clients poll this until `isProcessed` flips.
async fn processing_status(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<Json<ProcessingStatusResponse>, StatusCode> {
    let info = state
        .bunny
        .get_video(&video_id)
        .await
        .log_status("Get processing status error", StatusCode::BAD_GATEWAY)?;

    Ok(Json(ProcessingStatusResponse {
        is_processed: bunny::is_processed(info.status),
        encoding_progress: info.encode_progress.unwrap_or(0),
        status: info.status,
    }))
}

/// GET /videos/:id/transcript - Auto-generated captions as plain text.
/// Best-effort: missing captions yield an empty body.
async fn get_transcript(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<String, StatusCode> {
    let transcript = state
        .bunny
        .fetch_transcript(&video_id)
        .await
        .log_status("Fetch transcript error", StatusCode::BAD_GATEWAY)?;

    Ok(transcript.unwrap_or_default())
}

// ============================================================================
// Mutation
// ============================================================================

#[derive(Deserialize)]
struct UpdateVisibilityRequest {
    visibility: String,
}

/// PATCH /videos/:id/visibility - Owner-only visibility flip. The owner
/// check compares the session user to the stored owner; concurrent
/// updates are last-write-wins.
async fn update_visibility(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<String>,
    Json(req): Json<UpdateVisibilityRequest>,
) -> Result<StatusCode, StatusCode> {
    let Some(visibility) = Visibility::parse(&req.visibility) else {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    };

    let ownership = videos_domain::get_video_ownership(&state.db, &video_id)
        .await
        .log_500("Get video ownership error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    if ownership.user_id != user_id {
        return Err(StatusCode::FORBIDDEN);
    }

    videos_domain::update_visibility(&state.db, &video_id, visibility.as_str())
        .await
        .log_500("Update visibility error")?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /videos/:id/view - Bump the view counter. Unauthenticated and
/// not deduplicated by viewer.
async fn increment_view(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    videos_domain::increment_views(&state.db, &video_id)
        .await
        .log_500("Increment views error")?;

    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /videos/:id - Remove the CDN video asset, the CDN thumbnail
/// object, then the database row, in that order. An error at any step
/// aborts the rest and surfaces; there is no rollback of earlier steps.
/// A CDN 404 counts as already-deleted and does not abort.
async fn delete_video(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(video_id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let ownership = videos_domain::get_video_ownership(&state.db, &video_id)
        .await
        .log_500("Get video ownership error")?
        .ok_or(StatusCode::NOT_FOUND)?;

    if ownership.user_id != user_id {
        return Err(StatusCode::FORBIDDEN);
    }

    state
        .bunny
        .delete_video(&video_id)
        .await
        .log_status("Delete video asset error", StatusCode::BAD_GATEWAY)?;

    if let Some(key) = bunny::thumbnail_key_from_url(&ownership.thumbnail_url) {
        state
            .bunny
            .delete_thumbnail(&key)
            .await
            .log_status("Delete thumbnail object error", StatusCode::BAD_GATEWAY)?;
    }

    videos_domain::delete_video(&state.db, &video_id)
        .await
        .log_500("Delete video row error")?;

    Ok(StatusCode::NO_CONTENT)
}
