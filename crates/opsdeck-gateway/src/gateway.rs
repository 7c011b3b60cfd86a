//! The authenticated request gateway
//!
//! Owns the token pair lifecycle around every outbound call: bearer header
//! attachment, 401 detection, single-flight refresh, one replay, and session
//! teardown when the refresh token is rejected.
//!
//! The refresh decision is a critical section. All requests that see a 401
//! serialize on `refresh_flight`; whichever acquires it first performs the
//! refresh, and the rest observe the rotated (or cleared) pair when the lock
//! releases instead of fanning out their own refresh calls.

use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use opsdeck_auth::{CredentialStore, TokenPair, UserProfile, endpoints};

use crate::error::{Error, Result};
use crate::session::{self, SessionAction, SessionEvent, SessionState};

/// An outbound request before transmission: method, path relative to the API
/// base, query pairs, and an optional JSON body.
///
/// The gateway rebuilds the wire request from the descriptor on every
/// attempt, so a replay after refresh is identical to the original except
/// for the rotated bearer token.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl RequestDescriptor {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Append a query parameter.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body.
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body)
            .map_err(|e| Error::Transport(format!("serializing request body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }
}

/// Authenticated API gateway.
///
/// Shared process-wide (wrap in `Arc` for concurrent callers). The credential
/// store is the single source of truth for the token pair; the session state
/// machine tracks the lifecycle and the cached user profile rides alongside.
pub struct Gateway {
    http: reqwest::Client,
    base_url: String,
    credentials: Arc<CredentialStore>,
    session: RwLock<SessionState>,
    user: RwLock<Option<UserProfile>>,
    /// In-flight refresh handle. Held across the whole re-check + refresh +
    /// store sequence so check-then-act on "is a refresh pending" cannot race.
    refresh_flight: Mutex<()>,
}

impl Gateway {
    /// Create a gateway over the given credential store.
    ///
    /// A pair already present in the store yields an optimistically
    /// authenticated session; it is not revalidated until the first request.
    pub async fn new(
        base_url: impl Into<String>,
        credentials: Arc<CredentialStore>,
        http: reqwest::Client,
    ) -> Self {
        let gateway = Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            session: RwLock::new(SessionState::Anonymous),
            user: RwLock::new(None),
            refresh_flight: Mutex::new(()),
        };
        if gateway.credentials.is_present().await {
            gateway.transition(SessionEvent::CredentialsLoaded).await;
            info!("session restored from stored credentials");
        }
        gateway
    }

    /// The API base URL (no trailing slash).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Current session state snapshot.
    pub async fn session_state(&self) -> SessionState {
        *self.session.read().await
    }

    /// Whether a credential pair currently backs the session.
    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// The user profile cached by the last login/register/whoami, if any.
    pub async fn cached_user(&self) -> Option<UserProfile> {
        self.user.read().await.clone()
    }

    /// Send a request, transparently recovering from an expired access token.
    ///
    /// Returns the response for any status except the 401s the refresh
    /// protocol absorbs. A replayed request's response is returned whatever
    /// its outcome; at most one refresh and one replay happen per call, so
    /// this never loops on repeated 401s.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<reqwest::Response> {
        let pair = self.credentials.get().await;
        let response = self
            .transmit(descriptor, pair.as_ref().map(|p| p.access_token.as_str()))
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        // No refresh token stored: nothing to recover with.
        let Some(pair) = pair else {
            debug!(path = %descriptor.path, "401 without stored credentials");
            return Err(Error::SessionExpired);
        };

        debug!(path = %descriptor.path, "401, entering refresh protocol");
        let access = self.refreshed_access_token(&pair.access_token).await?;

        // Single replay with the rotated token; its response is final.
        self.transmit(descriptor, Some(&access)).await
    }

    /// Log in, store the returned pair, and return the user profile.
    ///
    /// The profile is fetched before the pair is persisted so a broken
    /// `/users/me` leaves the store untouched.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile> {
        let pair = endpoints::login(&self.http, &self.base_url, email, password).await?;
        let profile =
            endpoints::current_user(&self.http, &self.base_url, &pair.access_token).await?;

        self.credentials
            .store(pair)
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        *self.user.write().await = Some(profile.clone());
        self.transition(SessionEvent::LoginSucceeded).await;
        info!(email, "logged in");
        Ok(profile)
    }

    /// Register a new account, store the returned pair, and return the
    /// user profile. Same storage guarantee as `login`.
    pub async fn register(&self, email: &str, name: &str, password: &str) -> Result<UserProfile> {
        let pair = endpoints::register(&self.http, &self.base_url, email, name, password).await?;
        let profile =
            endpoints::current_user(&self.http, &self.base_url, &pair.access_token).await?;

        self.credentials
            .store(pair)
            .await
            .map_err(|e| Error::Credential(e.to_string()))?;
        *self.user.write().await = Some(profile.clone());
        self.transition(SessionEvent::LoginSucceeded).await;
        info!(email, "registered");
        Ok(profile)
    }

    /// End the session: clear the pair and the cached profile.
    ///
    /// No network call. Idempotent from `Anonymous`; in-flight requests that
    /// complete after logout are not retried or re-authenticated.
    pub async fn logout(&self) {
        let was_authenticated = self.is_authenticated().await;
        self.transition(SessionEvent::LoggedOut).await;
        if was_authenticated {
            info!("logged out");
        }
    }

    /// Fetch the current user's profile through the gateway (so an expired
    /// access token is recovered like any other request) and refresh the
    /// cache.
    pub async fn whoami(&self) -> Result<UserProfile> {
        let profile: UserProfile = self.get_json("/users/me").await?;
        *self.user.write().await = Some(profile.clone());
        Ok(profile)
    }

    // --- Typed helpers used by the domain clients ---

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let descriptor = RequestDescriptor::new(Method::GET, path);
        let response = self.send(&descriptor).await?;
        read_json(response).await
    }

    pub async fn get_json_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut descriptor = RequestDescriptor::new(Method::GET, path);
        for (name, value) in query {
            descriptor = descriptor.query(*name, value.clone());
        }
        let response = self.send(&descriptor).await?;
        read_json(response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let descriptor = RequestDescriptor::new(Method::POST, path).json(body)?;
        let response = self.send(&descriptor).await?;
        read_json(response).await
    }

    pub async fn patch_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let descriptor = RequestDescriptor::new(Method::PATCH, path).json(body)?;
        let response = self.send(&descriptor).await?;
        read_json(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        let descriptor = RequestDescriptor::new(Method::DELETE, path);
        let response = self.send(&descriptor).await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    // --- Internals ---

    /// Build and transmit one wire request from the descriptor.
    async fn transmit(
        &self,
        descriptor: &RequestDescriptor,
        access_token: Option<&str>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, descriptor.path);
        let mut request = self.http.request(descriptor.method.clone(), url);
        if !descriptor.query.is_empty() {
            request = request.query(&descriptor.query);
        }
        if let Some(body) = &descriptor.body {
            request = request.json(body);
        }
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))
    }

    /// Obtain a usable access token after a 401, refreshing at most once
    /// across all concurrent callers.
    ///
    /// `stale_access` is the token the failing request was sent with. After
    /// acquiring the flight lock the store is re-read: a pair that no longer
    /// matches means another request already completed the refresh and its
    /// result is reused; an empty store means the refresh already failed (or
    /// a logout raced in) and the session is void.
    async fn refreshed_access_token(&self, stale_access: &str) -> Result<String> {
        let _flight = self.refresh_flight.lock().await;

        let pair = match self.credentials.get().await {
            None => return Err(Error::SessionExpired),
            Some(pair) if pair.access_token != stale_access => {
                debug!("reusing token rotated by a concurrent request");
                return Ok(pair.access_token);
            }
            Some(pair) => pair,
        };

        self.transition(SessionEvent::AuthorizationFailed).await;

        match endpoints::refresh(&self.http, &self.base_url, &pair.refresh_token).await {
            Ok(rotated) => {
                let access = rotated.access_token.clone();
                self.credentials
                    .store(rotated)
                    .await
                    .map_err(|e| Error::Credential(e.to_string()))?;
                self.transition(SessionEvent::RefreshSucceeded).await;
                info!("access token refreshed");
                Ok(access)
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed, ending session");
                self.transition(SessionEvent::RefreshFailed).await;
                Err(Error::SessionExpired)
            }
        }
    }

    /// Apply a session event and execute the action it implies.
    async fn transition(&self, event: SessionEvent) {
        let action = {
            let mut state = self.session.write().await;
            let (next, action) = session::handle_event(*state, event);
            if next != *state {
                debug!(from = state.label(), to = next.label(), "session transition");
            }
            *state = next;
            action
        };

        if action == SessionAction::ClearCredentials {
            self.user.write().await.take();
            if let Err(e) = self.credentials.clear().await {
                warn!(error = %e, "failed to clear credential store");
            }
        }
    }

    /// Expose the stored pair (primarily for tests and diagnostics).
    pub async fn stored_pair(&self) -> Option<TokenPair> {
        self.credentials.get().await
    }
}

/// Deserialize a success body, or map a failure status to `Error::Api`.
async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        response.json().await.map_err(|e| Error::Api {
            status: status.as_u16(),
            message: format!("invalid response body: {e}"),
        })
    } else {
        Err(api_error(response).await)
    }
}

async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<no body>"));
    Error::Api {
        status,
        message: error_detail(&body),
    }
}

/// Pull the `detail` field out of a JSON error body, falling back to the
/// raw body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(String::from))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_accumulates_query_pairs() {
        let descriptor = RequestDescriptor::new(Method::GET, "/audit")
            .query("action", "CONFIG_CREATED")
            .query("limit", "50");
        assert_eq!(descriptor.query.len(), 2);
        assert_eq!(descriptor.query[0], ("action".into(), "CONFIG_CREATED".into()));
    }

    #[test]
    fn descriptor_json_body_round_trips() {
        #[derive(Serialize)]
        struct Body {
            name: String,
        }
        let descriptor = RequestDescriptor::new(Method::POST, "/projects")
            .json(&Body { name: "demo".into() })
            .unwrap();
        assert_eq!(descriptor.body.unwrap()["name"], "demo");
    }

    #[test]
    fn error_detail_prefers_detail_field() {
        assert_eq!(error_detail(r#"{"detail":"Project not found"}"#), "Project not found");
        assert_eq!(error_detail("gateway timeout"), "gateway timeout");
        assert_eq!(error_detail(r#"{"other":"shape"}"#), r#"{"other":"shape"}"#);
    }
}
