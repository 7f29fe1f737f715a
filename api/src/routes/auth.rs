//! Authentication and session management endpoints
//!
//! GitHub OAuth sign-in, JWT cookie sessions with refresh token rotation,
//! and per-user API tokens for the native capture client.

use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, header::SET_COOKIE, request::Parts},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_extra::extract::CookieJar;
use base64::Engine;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};

use crate::AppState;
use crate::domain::users;
use crate::services::{cookies, github, session};

pub fn routes() -> Router<Arc<AppState>> {
    // IP rate limit on auth endpoints to slow brute force and OAuth abuse:
    // burst of 10, then 1 request per 6 seconds
    let rate_limit_config = GovernorConfigBuilder::default()
        .per_second(6)
        .burst_size(10)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
        .expect("Failed to build rate limit config");

    let rate_limit_layer = GovernorLayer {
        config: rate_limit_config.into(),
    };

    Router::new()
        .route("/auth/github", get(auth_github))
        .route("/auth/github/token", post(auth_github_token))
        .route("/auth/refresh", post(refresh_session))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(get_me))
        .route("/auth/token", get(get_api_token).post(generate_api_token))
        .layer(rate_limit_layer)
}

// ============================================================================
// Auth extractors
// ============================================================================

/// Extractor yielding the authenticated user id, from either the
/// access_token JWT cookie (browser sessions) or an API bearer token
/// (the native capture client).
pub struct AuthUser(pub i64);

/// Extractor yielding `Some(user_id)` for authenticated requests and
/// `None` otherwise; used on listing endpoints that serve anonymous
/// visitors too.
pub struct OptionalAuthUser(pub Option<i64>);

async fn authenticate(parts: &mut Parts, state: &Arc<AppState>) -> Result<i64, StatusCode> {
    // Cookie session first
    let jar = CookieJar::from_request_parts(parts, state)
        .await
        .map_err(|e| {
            eprintln!("Cookie extraction error: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    if let Some(cookie) = jar.get(cookies::ACCESS_TOKEN_NAME) {
        return session::validate_access_token(cookie.value(), &state.jwt_secret)
            .map_err(|_| StatusCode::UNAUTHORIZED);
    }

    // Fall back to an API bearer token
    let bearer = parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    users::get_user_by_api_token(&state.db, bearer)
        .await
        .map_err(|e| {
            eprintln!("Get user by API token error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::UNAUTHORIZED)
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state).await.map(AuthUser)
    }
}

impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuthUser(authenticate(parts, state).await.ok()))
    }
}

// ============================================================================
// GitHub OAuth
// ============================================================================

#[derive(Serialize)]
struct AuthUrlResponse {
    url: String,
}

/// GET /auth/github - Start the OAuth flow, returns the URL to redirect
/// the user to
async fn auth_github(State(state): State<Arc<AppState>>) -> Json<AuthUrlResponse> {
    let oauth_state = github::GithubClient::generate_state();

    if let Err(e) = github::save_oauth_state(&state.db, &oauth_state).await {
        eprintln!("Failed to save OAuth state: {}", e);
        // Return the URL anyway; the exchange will fail when the state
        // isn't found, which beats blocking login outright
    }

    Json(AuthUrlResponse {
        url: state.github.authorize_url(&oauth_state),
    })
}

#[derive(Deserialize)]
struct TokenRequest {
    code: String,
    state: String,
}

#[derive(Serialize)]
struct LoginResponse {
    username: String,
}

/// POST /auth/github/token - Exchange the OAuth code for a session.
/// Sets HttpOnly cookies for access_token (JWT) and refresh_token.
async fn auth_github_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<Response, StatusCode> {
    // CSRF state must exist and be fresh; it is consumed atomically
    let valid = github::take_oauth_state(&state.db, &req.state)
        .await
        .map_err(|e| {
            eprintln!("Get OAuth state error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    if !valid {
        return Err(StatusCode::BAD_REQUEST);
    }

    let access_token = state.github.exchange_code(&req.code).await.map_err(|e| {
        eprintln!("Code exchange error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let gh_user = state.github.get_user(&access_token).await.map_err(|e| {
        eprintln!("Get user error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let user_id = users::upsert_user(
        &state.db,
        gh_user.id,
        &gh_user.login,
        gh_user.name.as_deref(),
        gh_user.avatar_url.as_deref(),
        gh_user.email.as_deref(),
    )
    .await
    .map_err(|e| {
        eprintln!("Upsert user error: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let access_jwt = session::create_access_token(user_id, &state.jwt_secret).map_err(|e| {
        eprintln!("Failed to create access token: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let refresh_token = session::create_refresh_token(user_id, &state.db)
        .await
        .map_err(|e| {
            eprintln!("Failed to create refresh token: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let body = Json(LoginResponse {
        username: gh_user.login,
    });

    let mut response = body.into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_access_cookie(&access_jwt)?);
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_refresh_cookie(&refresh_token)?);

    Ok(response)
}

// ============================================================================
// Session endpoints
// ============================================================================

/// POST /auth/refresh - Refresh the access token using the refresh token
/// cookie. The old refresh token is invalidated and a new one issued.
async fn refresh_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<Response, StatusCode> {
    let old_refresh_token = jar
        .get(cookies::REFRESH_TOKEN_NAME)
        .map(|c| c.value().to_string())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Silent on failure - expired sessions presenting stale tokens are
    // routine, not noteworthy
    let (user_id, new_refresh_token) = session::rotate_refresh_token(&old_refresh_token, &state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let access_token = session::create_access_token(user_id, &state.jwt_secret).map_err(|e| {
        eprintln!("Failed to create access token: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_access_cookie(&access_token)?);
    response.headers_mut().append(
        SET_COOKIE,
        cookies::build_refresh_cookie(&new_refresh_token)?,
    );

    Ok(response)
}

/// POST /auth/logout - Clear the session and revoke the refresh token
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(refresh_token) = jar.get(cookies::REFRESH_TOKEN_NAME) {
        if let Err(e) = session::revoke_refresh_token(refresh_token.value(), &state.db).await {
            // Log but don't fail logout - the cookies are cleared either way
            eprintln!("Failed to revoke refresh token during logout: {}", e);
        }
    }

    let mut response = StatusCode::NO_CONTENT.into_response();
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_clear_access_cookie());
    response
        .headers_mut()
        .append(SET_COOKIE, cookies::build_clear_refresh_cookie());

    response
}

#[derive(Serialize)]
struct MeResponse {
    id: i64,
    username: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    image: Option<String>,
    email: Option<String>,
}

/// GET /auth/me - Current user info (validates the session)
async fn get_me(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MeResponse>, StatusCode> {
    let user = users::get_user_by_id(&state.db, user_id)
        .await
        .map_err(|e| {
            eprintln!("Get user by ID error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        // A valid JWT for a missing user is still unauthorized
        .ok_or(StatusCode::UNAUTHORIZED)?;

    Ok(Json(MeResponse {
        id: user.id,
        username: user.username,
        display_name: user.display_name,
        image: user.avatar_url,
        email: user.email,
    }))
}

// ============================================================================
// API token endpoints (capture client auth)
// ============================================================================

/// Generate a new API token for the capture client
fn new_api_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    format!(
        "kast_{}",
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    )
}

#[derive(Serialize)]
struct ApiTokenResponse {
    api_token: String,
}

/// POST /auth/token - Generate a new API token
async fn generate_api_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<(StatusCode, Json<ApiTokenResponse>), StatusCode> {
    let token = new_api_token();
    users::set_user_api_token(&state.db, user_id, &token)
        .await
        .map_err(|e| {
            eprintln!("Set user API token error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiTokenResponse { api_token: token }),
    ))
}

/// GET /auth/token - Current API token (if one exists)
async fn get_api_token(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Option<String>>, StatusCode> {
    let token = users::get_user_api_token(&state.db, user_id)
        .await
        .map_err(|e| {
            eprintln!("Get user API token error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_token_prefix_and_uniqueness() {
        let a = new_api_token();
        let b = new_api_token();
        assert!(a.starts_with("kast_"));
        assert_ne!(a, b);
    }
}
