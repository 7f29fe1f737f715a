//! GitHub OAuth 2.0 client for social sign-in

use base64::Engine;
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use sqlx::PgPool;

const AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
const TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
const USER_URL: &str = "https://api.github.com/user";

/// GitHub requires a User-Agent on every API request
const USER_AGENT: &str = "kast-api";

#[derive(Clone)]
pub struct GithubClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    http: Client,
}

/// Authenticated user's profile as reported by GitHub
#[derive(Debug, Deserialize)]
pub struct GithubUser {
    pub id: i64,
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

impl GithubClient {
    pub fn new(client_id: &str, client_secret: &str, redirect_uri: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
            http: Client::new(),
        }
    }

    /// Random state for CSRF protection
    pub fn generate_state() -> String {
        let bytes: [u8; 16] = rand::rng().random();
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Step 1: authorization URL the user is redirected to
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&scope=read:user%20user:email&state={}",
            AUTHORIZE_URL,
            percent_encode(&self.client_id),
            percent_encode(&self.redirect_uri),
            percent_encode(state)
        )
    }

    /// Step 2: exchange the authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let resp = self
            .http
            .post(TOKEN_URL)
            .header("Accept", "application/json")
            .form(&params)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(GithubError::Api(text));
        }

        // GitHub reports bad codes with a 200 and an error payload
        let token: AccessTokenResponse = resp.json().await?;
        match token.access_token {
            Some(t) => Ok(t),
            None => Err(GithubError::Api(
                token
                    .error_description
                    .unwrap_or_else(|| "no access token in response".to_string()),
            )),
        }
    }

    /// Step 3: fetch the authenticated user's profile
    pub async fn get_user(&self, access_token: &str) -> Result<GithubUser, GithubError> {
        let resp = self
            .http
            .get(USER_URL)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", USER_AGENT)
            .send()
            .await?;

        if !resp.status().is_success() {
            let text = resp.text().await?;
            return Err(GithubError::Api(text));
        }

        Ok(resp.json().await?)
    }
}

fn percent_encode(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

#[derive(Debug)]
pub enum GithubError {
    Http(reqwest::Error),
    Api(String),
}

impl From<reqwest::Error> for GithubError {
    fn from(e: reqwest::Error) -> Self {
        GithubError::Http(e)
    }
}

impl std::fmt::Display for GithubError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GithubError::Http(e) => write!(f, "HTTP error: {}", e),
            GithubError::Api(s) => write!(f, "GitHub API error: {}", s),
        }
    }
}

impl std::error::Error for GithubError {}

// OAuth state storage

pub async fn save_oauth_state(db: &PgPool, state: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO oauth_states (state)
        VALUES ($1)
        "#,
    )
    .bind(state)
    .execute(db)
    .await?;
    Ok(())
}

/// Consume a stored OAuth state. The atomic DELETE ... RETURNING means two
/// callbacks presenting the same state race and only one succeeds; states
/// older than ten minutes are dead.
pub async fn take_oauth_state(db: &PgPool, state: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(String,)> = sqlx::query_as(
        r#"
        DELETE FROM oauth_states
        WHERE state = $1 AND created_at > NOW() - INTERVAL '10 minutes'
        RETURNING state
        "#,
    )
    .bind(state)
    .fetch_optional(db)
    .await?;

    Ok(row.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorize_url_carries_params() {
        let client = GithubClient::new("cid", "secret", "http://localhost:3000/callback");
        let url = client.authorize_url("st4te");
        assert!(url.starts_with("https://github.com/login/oauth/authorize?"));
        assert!(url.contains("client_id=cid"));
        assert!(url.contains("state=st4te"));
        assert!(url.contains("scope=read:user%20user:email"));
        // redirect_uri value must be percent-encoded
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcallback"));
    }

    #[test]
    fn test_state_is_unique() {
        assert_ne!(GithubClient::generate_state(), GithubClient::generate_state());
    }
}
