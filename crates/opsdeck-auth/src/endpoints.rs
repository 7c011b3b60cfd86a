//! Authentication Service endpoint calls
//!
//! Handles the four auth interactions:
//! 1. Login (email + password)
//! 2. Registration (email + name + password)
//! 3. Token refresh (request-time, after a 401)
//! 4. Current user lookup (`/users/me`, bearer-authenticated)
//!
//! All paths are relative to the platform API base URL. The server reports
//! failures as `{"detail": "..."}` bodies; the detail string is surfaced in
//! the returned error where present.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Access/refresh token pair returned by login, register, and refresh.
///
/// The access token is short-lived and attached as a bearer header to every
/// authenticated request; the refresh token is longer-lived and only ever
/// sent to `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Profile of the authenticated user, from `GET /users/me`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    name: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Exchange email/password for a token pair.
///
/// 401 and 400/422 responses mean the credentials or the request payload
/// were rejected; both map to `InvalidCredentials` so the caller never
/// retries them.
pub async fn login(client: &reqwest::Client, base_url: &str, email: &str, password: &str) -> Result<TokenPair> {
    let response = client
        .post(auth_url(base_url, "/auth/login"))
        .json(&LoginRequest { email, password })
        .send()
        .await
        .map_err(|e| Error::Http(format!("login request failed: {e}")))?;

    read_token_pair(response, "login").await
}

/// Register a new account and receive its initial token pair.
pub async fn register(
    client: &reqwest::Client,
    base_url: &str,
    email: &str,
    name: &str,
    password: &str,
) -> Result<TokenPair> {
    let response = client
        .post(auth_url(base_url, "/auth/register"))
        .json(&RegisterRequest { email, name, password })
        .send()
        .await
        .map_err(|e| Error::Http(format!("register request failed: {e}")))?;

    read_token_pair(response, "register").await
}

/// Rotate the token pair using a refresh token.
///
/// Called reactively by the gateway after a domain request comes back 401.
/// A 401/403 here means the refresh token itself is revoked or expired and
/// the session cannot be recovered.
pub async fn refresh(client: &reqwest::Client, base_url: &str, refresh_token: &str) -> Result<TokenPair> {
    let response = client
        .post(auth_url(base_url, "/auth/refresh"))
        .json(&RefreshRequest { refresh_token })
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 401/403 means the refresh token is revoked or invalid
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {}",
                error_detail(&body)
            )));
        }

        return Err(Error::Endpoint(format!(
            "token refresh returned {status}: {}",
            error_detail(&body)
        )));
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| Error::Endpoint(format!("invalid refresh response: {e}")))
}

/// Fetch the current user's profile with the given access token.
pub async fn current_user(client: &reqwest::Client, base_url: &str, access_token: &str) -> Result<UserProfile> {
    let response = client
        .get(auth_url(base_url, "/users/me"))
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| Error::Http(format!("current user request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        if status.as_u16() == 401 {
            return Err(Error::InvalidCredentials(format!(
                "access token rejected: {}",
                error_detail(&body)
            )));
        }
        return Err(Error::Endpoint(format!(
            "current user returned {status}: {}",
            error_detail(&body)
        )));
    }

    response
        .json::<UserProfile>()
        .await
        .map_err(|e| Error::Endpoint(format!("invalid user profile response: {e}")))
}

fn auth_url(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}

async fn read_token_pair(response: reqwest::Response, operation: &str) -> Result<TokenPair> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        // 400 = validation failure (e.g. email already registered),
        // 401 = wrong password, 422 = malformed payload. None are retryable.
        if matches!(status.as_u16(), 400 | 401 | 422) {
            return Err(Error::InvalidCredentials(format!(
                "{operation} rejected ({status}): {}",
                error_detail(&body)
            )));
        }

        return Err(Error::Endpoint(format!(
            "{operation} returned {status}: {}",
            error_detail(&body)
        )));
    }

    response
        .json::<TokenPair>()
        .await
        .map_err(|e| Error::Endpoint(format!("invalid {operation} response: {e}")))
}

/// Pull the `detail` field out of a JSON error body, falling back to the
/// raw body when it isn't the expected shape.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}
