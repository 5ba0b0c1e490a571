// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP client for the hosted backend.
//!
//! Handles:
//! - Password auth (sign up, token grant, logout, recovery)
//! - Row reads/inserts against the REST endpoint
//! - Storage listing and public URL resolution
//! - Mapping HTTP failures onto [`AppError`], including the single-row
//!   "no rows" signal used for the missing-account check

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::gateway::{
    AuthEvent, Gateway, Query, Row, SignUpAttributes, SignUpOutcome, StoredObject,
};
use crate::models::{Identity, Session};
use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Error code the REST layer returns when a single-object request did not
/// match exactly one row. The row count is in the body's `details`.
const NO_ROWS_CODE: &str = "PGRST116";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const STORAGE_PAGE_SIZE: u32 = 100;
const EVENT_CAPACITY: usize = 16;

/// Gateway backed by the hosted REST API.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpGateway {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build HTTP client: {}", e)))?;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Ok(Self {
            http,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            anon_key: config.gateway_anon_key.clone(),
            session: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// Seed a session the host app persisted from a previous run.
    pub fn with_session(self, session: Session) -> Self {
        self.set_session(Some(session));
        self
    }

    /// Session currently used for authenticated requests.
    pub fn current_session(&self) -> Option<Session> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_session(&self, session: Option<Session>) {
        match self.session.write() {
            Ok(mut guard) => *guard = session,
            Err(poisoned) => *poisoned.into_inner() = session,
        }
    }

    /// Bearer token: the session's access token, or the anon key when signed out.
    fn bearer(&self) -> String {
        self.current_session()
            .map(|s| s.access_token)
            .unwrap_or_else(|| self.anon_key.clone())
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, urlencoding::encode(table))
    }

    fn announce(&self, event: AuthEvent) {
        // No subscribers is fine.
        self.events.send(event).ok();
    }

    /// Check response status and return error if not successful.
    async fn check_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(error_from_response(status, &body))
    }

    /// Check response and parse JSON body.
    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        self.check_response(response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::Gateway(format!("JSON parse error: {}", e)))
    }
}

impl Gateway for HttpGateway {
    async fn create_account(
        &self,
        email: &str,
        password: &str,
        attrs: &SignUpAttributes,
    ) -> Result<SignUpOutcome> {
        let body = json!({
            "email": email,
            "password": password,
            "data": {
                "first_name": attrs.first_name,
                "last_name": attrs.last_name,
            }
        });

        let response = self
            .http
            .post(self.auth_url("signup"))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Sign-up request failed: {}", e)))?;

        let parsed: SignUpResponse = self.check_response_json(response).await?;
        parsed.into_outcome()
    }

    async fn begin_session(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .http
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Sign-in request failed: {}", e)))?;

        let token: TokenResponse = self.check_response_json(response).await?;
        let session = token.into_session(Utc::now());

        self.set_session(Some(session.clone()));
        tracing::info!(identity = %session.identity.id, "Session started");
        self.announce(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn end_session(&self, session: &Session) -> Result<()> {
        let result = match self
            .http
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await
        {
            Ok(response) => self.check_response(response).await.map(|_| ()),
            Err(e) => Err(AppError::Gateway(format!("Sign-out request failed: {}", e))),
        };

        // The local copy is dropped even when the server call fails.
        let was_current = self
            .current_session()
            .is_some_and(|current| current.access_token == session.access_token);
        if was_current {
            self.set_session(None);
            self.announce(AuthEvent::SignedOut);
        }

        result
    }

    async fn request_password_reset(&self, email: &str) -> Result<()> {
        let response = self
            .http
            .post(self.auth_url("recover"))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email }))
            .send()
            .await
            .map_err(|e| AppError::Gateway(format!("Password reset request failed: {}", e)))?;

        self.check_response(response).await?;
        Ok(())
    }

    async fn restore_session(&self) -> Result<Option<Session>> {
        Ok(self.current_session())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn query_one(&self, table: &str, query: &Query) -> Result<Row> {
        let response = self
            .http
            .get(self.rest_url(table))
            .query(&query.to_params())
            .header("apikey", &self.anon_key)
            .header(reqwest::header::ACCEPT, SINGLE_OBJECT)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn query_many(&self, table: &str, query: &Query) -> Result<Vec<Row>> {
        let response = self
            .http
            .get(self.rest_url(table))
            .query(&query.to_params())
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        self.check_response_json(response).await
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row> {
        let response = self
            .http
            .post(self.rest_url(table))
            .header("apikey", &self.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(&[row])
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        let mut rows: Vec<Row> = self.check_response_json(response).await?;
        if rows.is_empty() {
            return Err(AppError::Gateway(format!(
                "Insert into {} returned no rows",
                table
            )));
        }
        Ok(rows.swap_remove(0))
    }

    async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<StoredObject>> {
        let url = format!(
            "{}/storage/v1/object/list/{}",
            self.base_url,
            urlencoding::encode(bucket)
        );
        let body = json!({
            "prefix": prefix,
            "limit": STORAGE_PAGE_SIZE,
            "offset": 0,
            "sortBy": { "column": "name", "order": "asc" },
        });

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .bearer_auth(self.bearer())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway(e.to_string()))?;

        self.check_response_json(response).await
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        let encoded: Vec<String> = path
            .trim_start_matches('/')
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            urlencoding::encode(bucket),
            encoded.join("/")
        )
    }
}

/// Map a failed HTTP response onto the crate error type.
pub fn error_from_response(status: StatusCode, body: &str) -> AppError {
    let parsed: Option<ErrorBody> = serde_json::from_str(body).ok();
    let code = parsed.as_ref().and_then(|b| b.code.clone());
    let rows = parsed
        .as_ref()
        .and_then(|b| b.details.as_deref())
        .and_then(matched_rows);
    let message = parsed
        .and_then(ErrorBody::message)
        .unwrap_or_else(|| format!("HTTP {}", status));

    if code.as_deref() == Some(NO_ROWS_CODE) || status == StatusCode::NOT_ACCEPTABLE {
        // Only an empty result means the row is missing.
        return match rows {
            Some(0) => AppError::NotFound(message),
            Some(n) => AppError::Gateway(format!("Expected one row, found {}", n)),
            None => AppError::Gateway(message),
        };
    }

    match status {
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AppError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => {
            tracing::warn!("Gateway rate limit hit (429)");
            AppError::Gateway("Too many requests, please try again later".to_string())
        }
        _ => AppError::Gateway(message),
    }
}

/// Row count from a details string like "The result contains 2 rows".
fn matched_rows(details: &str) -> Option<u64> {
    let (_, rest) = details.split_once("contains ")?;
    rest.split_whitespace().next()?.parse().ok()
}

// ─── Wire Types ──────────────────────────────────────────────────────────────

/// Error body; auth and rest endpoints use different field names.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl From<WireUser> for Identity {
    fn from(user: WireUser) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

/// Token grant response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    expires_in: Option<i64>,
    /// Unix timestamp
    #[serde(default)]
    expires_at: Option<i64>,
    user: WireUser,
}

impl TokenResponse {
    fn into_session(self, now: DateTime<Utc>) -> Session {
        let expires_at = self
            .expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)));

        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
            identity: self.user.into(),
        }
    }
}

/// Sign-up response: a bare user when confirmation is required, otherwise a
/// full token grant.
#[derive(Debug, Deserialize)]
struct SignUpResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    user: Option<WireUser>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

impl SignUpResponse {
    fn into_outcome(self) -> Result<SignUpOutcome> {
        match (self.access_token, self.user) {
            (Some(access_token), Some(user)) => {
                let session = TokenResponse {
                    access_token,
                    refresh_token: self.refresh_token,
                    expires_in: self.expires_in,
                    expires_at: self.expires_at,
                    user,
                }
                .into_session(Utc::now());
                Ok(SignUpOutcome {
                    identity: session.identity.clone(),
                    session: Some(session),
                })
            }
            (None, Some(user)) => Ok(SignUpOutcome {
                identity: user.into(),
                session: None,
            }),
            (_, None) => {
                let id = self.id.ok_or_else(|| {
                    AppError::Gateway("Sign-up response did not include a user".to_string())
                })?;
                Ok(SignUpOutcome {
                    identity: Identity {
                        id,
                        email: self.email,
                    },
                    session: None,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_rows_maps_to_not_found() {
        let body = r#"{"code":"PGRST116","message":"JSON object requested, multiple (or no) rows returned","details":"The result contains 0 rows"}"#;
        let err = error_from_response(StatusCode::NOT_ACCEPTABLE, body);
        assert!(err.is_not_found());
    }

    #[test]
    fn test_matched_rows() {
        assert_eq!(matched_rows("The result contains 0 rows"), Some(0));
        assert_eq!(matched_rows("The result contains 2 rows"), Some(2));
        assert_eq!(matched_rows("Results contain 2 rows"), None);
    }

    #[test]
    fn test_auth_error_message_is_kept() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        let err = error_from_response(StatusCode::BAD_REQUEST, body);
        assert!(matches!(err, AppError::Gateway(ref msg) if msg == "Invalid login credentials"));
        assert_eq!(err.user_message(), "Invalid login credentials");
    }

    #[test]
    fn test_unparsable_body_falls_back_to_status() {
        let err = error_from_response(StatusCode::BAD_GATEWAY, "<html>oops</html>");
        assert!(matches!(err, AppError::Gateway(ref msg) if msg.contains("502")));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_unauthorized() {
        let err = error_from_response(StatusCode::UNAUTHORIZED, "");
        assert!(matches!(err, AppError::Unauthorized));
    }

    #[test]
    fn test_sign_up_without_session() {
        let parsed: SignUpResponse =
            serde_json::from_str(r#"{"id":"u-1","email":"a@b.c"}"#).unwrap();
        let outcome = parsed.into_outcome().unwrap();
        assert_eq!(outcome.identity.id, "u-1");
        assert!(outcome.session.is_none());
    }

    #[test]
    fn test_sign_up_with_implicit_session() {
        let parsed: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"t","expires_in":3600,"user":{"id":"u-2","email":"x@y.z"}}"#,
        )
        .unwrap();
        let outcome = parsed.into_outcome().unwrap();
        let session = outcome.session.expect("session");
        assert_eq!(session.identity.id, "u-2");
        assert!(session.expires_at.is_some());
    }

    #[test]
    fn test_public_url_encodes_segments() {
        let gateway = HttpGateway::new(&Config::test_default()).unwrap();
        assert_eq!(
            gateway.public_url("videos", "/drills/first touch.mp4"),
            "http://127.0.0.1:54321/storage/v1/object/public/videos/drills/first%20touch.mp4"
        );
    }
}
