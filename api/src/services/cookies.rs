//! Session cookie construction
//!
//! Both session tokens travel as HttpOnly cookies; this module keeps the
//! formatting in one place so login, refresh, and logout stay consistent.

use axum::http::{HeaderValue, StatusCode};

/// Access token cookie name
pub const ACCESS_TOKEN_NAME: &str = "access_token";
/// Refresh token cookie name
pub const REFRESH_TOKEN_NAME: &str = "refresh_token";
/// Access token max-age in seconds (10 minutes)
pub const ACCESS_TOKEN_MAX_AGE_SECS: u32 = 600;
/// Refresh token max-age in seconds (30 days)
pub const REFRESH_TOKEN_MAX_AGE_SECS: u32 = 30 * 24 * 60 * 60;

fn is_dev() -> bool {
    std::env::var("ENV").as_deref() != Ok("prod")
}

fn same_site() -> &'static str {
    match std::env::var("COOKIE_SAMESITE")
        .unwrap_or_else(|_| "Lax".to_string())
        .to_lowercase()
        .as_str()
    {
        "none" => "None",
        "strict" => "Strict",
        _ => "Lax",
    }
}

fn build_cookie(name: &str, value: &str, max_age: u32) -> Result<HeaderValue, StatusCode> {
    let secure = if is_dev() { "" } else { " Secure;" };
    let cookie = format!(
        "{}={}; HttpOnly;{} SameSite={}; Path=/; Max-Age={}",
        name,
        value,
        secure,
        same_site(),
        max_age
    );
    cookie.parse().map_err(|_| {
        eprintln!("Failed to parse {} cookie header", name);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

/// Set-Cookie value carrying a fresh access token
pub fn build_access_cookie(token: &str) -> Result<HeaderValue, StatusCode> {
    build_cookie(ACCESS_TOKEN_NAME, token, ACCESS_TOKEN_MAX_AGE_SECS)
}

/// Set-Cookie value carrying a fresh refresh token
pub fn build_refresh_cookie(token: &str) -> Result<HeaderValue, StatusCode> {
    build_cookie(REFRESH_TOKEN_NAME, token, REFRESH_TOKEN_MAX_AGE_SECS)
}

/// Set-Cookie value that clears the access token
pub fn build_clear_access_cookie() -> HeaderValue {
    clear_cookie(ACCESS_TOKEN_NAME)
}

/// Set-Cookie value that clears the refresh token
pub fn build_clear_refresh_cookie() -> HeaderValue {
    clear_cookie(REFRESH_TOKEN_NAME)
}

fn clear_cookie(name: &str) -> HeaderValue {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        name
    )
    .parse()
    .expect("static cookie string should always parse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_cookie_attributes() {
        let value = build_access_cookie("abc123").unwrap();
        let s = value.to_str().unwrap();
        assert!(s.starts_with("access_token=abc123;"));
        assert!(s.contains("HttpOnly"));
        assert!(s.contains("Max-Age=600"));
    }

    #[test]
    fn test_clear_cookie_zeroes_max_age() {
        let s = build_clear_refresh_cookie();
        let s = s.to_str().unwrap();
        assert!(s.starts_with("refresh_token=;"));
        assert!(s.contains("Max-Age=0"));
    }
}
