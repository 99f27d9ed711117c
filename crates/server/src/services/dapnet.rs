//! DAPNET paging client.
//!
//! Sends a call through the amateur-radio paging network:
//! `POST {base}/calls` with HTTP basic auth and a JSON body. Pager displays
//! are small, so the text is cut to [`MAX_TEXT_CHARS`] characters.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::instrument;

use brunch_core::PagingCredentials;

use crate::config::DapnetConfig;

/// Longest text a DAPNET call may carry.
pub const MAX_TEXT_CHARS: usize = 80;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from the paging API.
#[derive(Debug, thiserror::Error)]
pub enum DapnetError {
    /// The HTTP request failed (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// DAPNET answered with an error status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
}

/// Body of `POST /calls`.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DapnetCall {
    /// Message text, at most 80 characters.
    pub text: String,
    /// Recipient callsigns.
    pub call_sign_names: Vec<String>,
    /// Transmitter groups to send through, e.g. `all`.
    pub transmitter_group_names: Vec<String>,
    /// Always `false` for brunch notices.
    pub emergency: bool,
}

impl DapnetCall {
    /// Build a non-emergency call, truncating `text`.
    #[must_use]
    pub fn new(text: &str, callsigns: &[String], transmitter_groups: &[String]) -> Self {
        Self {
            text: truncate_chars(text, MAX_TEXT_CHARS),
            call_sign_names: callsigns.to_vec(),
            transmitter_group_names: transmitter_groups.to_vec(),
            emergency: false,
        }
    }
}

/// DAPNET API client.
#[derive(Clone)]
pub struct DapnetClient {
    client: Client,
    calls_url: String,
    user: String,
    password: SecretString,
    callsigns: Vec<String>,
    transmitter_groups: Vec<String>,
}

impl std::fmt::Debug for DapnetClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DapnetClient")
            .field("calls_url", &self.calls_url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("callsigns", &self.callsigns)
            .finish_non_exhaustive()
    }
}

impl DapnetClient {
    /// Create a client for the configured endpoint and account.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &DapnetConfig, credentials: PagingCredentials) -> Result<Self, DapnetError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            client,
            calls_url: format!("{}/calls", config.url.trim_end_matches('/')),
            user: credentials.user,
            password: credentials.password,
            callsigns: config.callsigns.clone(),
            transmitter_groups: config.transmitter_groups.clone(),
        })
    }

    /// Whether any callsign is configured to receive pages.
    #[must_use]
    pub fn has_recipients(&self) -> bool {
        !self.callsigns.is_empty()
    }

    /// Send `text` to the configured callsigns. No retries.
    ///
    /// # Errors
    ///
    /// Returns `DapnetError::Http` if the request fails or times out and
    /// `DapnetError::Api` if DAPNET rejects the call.
    #[instrument(skip(self, text), fields(callsigns = ?self.callsigns))]
    pub async fn send(&self, text: &str) -> Result<(), DapnetError> {
        let call = DapnetCall::new(text, &self.callsigns, &self.transmitter_groups);

        let response = self
            .client
            .post(&self.calls_url)
            .basic_auth(&self.user, Some(self.password.expose_secret()))
            .json(&call)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(chars = call.text.chars().count(), "DAPNET call sent");
            return Ok(());
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        Err(DapnetError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

/// Cut `text` to at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::HeaderMap, http::StatusCode, routing::post};

    use super::*;

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    fn credentials() -> PagingCredentials {
        PagingCredentials {
            user: "do1ffe".to_string(),
            password: SecretString::from("pager"),
        }
    }

    async fn serve(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                "/api/calls",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<serde_json::Value>| async move {
                        let auth = headers
                            .get("authorization")
                            .map(|v| v.to_str().unwrap().to_string());
                        captured.lock().unwrap().push((auth, body));
                        status
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        (format!("http://{addr}/api/"), captured)
    }

    fn config(url: String) -> DapnetConfig {
        DapnetConfig {
            url,
            callsigns: vec!["do1ffe".to_string()],
            transmitter_groups: vec!["all".to_string()],
        }
    }

    #[test]
    fn test_call_is_truncated_and_camel_case() {
        let long = "x".repeat(100);
        let call = DapnetCall::new(&long, &["do1ffe".to_string()], &["all".to_string()]);
        assert_eq!(call.text.chars().count(), MAX_TEXT_CHARS);

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(json["callSignNames"], serde_json::json!(["do1ffe"]));
        assert_eq!(json["transmitterGroupNames"], serde_json::json!(["all"]));
        assert_eq!(json["emergency"], serde_json::json!(false));
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate_chars("Brötchen", 3), "Brö");
        assert_eq!(truncate_chars("Tee", 80), "Tee");
    }

    #[tokio::test]
    async fn test_send_posts_call_with_basic_auth() {
        let (url, captured) = serve(StatusCode::CREATED).await;
        let client = DapnetClient::new(&config(url), credentials()).unwrap();

        client.send("Brunch am 16.06.2024: 3 Personen").await.unwrap();

        let calls = captured.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (auth, body) = &calls[0];
        // base64("do1ffe:pager")
        assert_eq!(auth.as_deref(), Some("Basic ZG8xZmZlOnBhZ2Vy"));
        assert_eq!(body["text"], "Brunch am 16.06.2024: 3 Personen");
        assert_eq!(body["callSignNames"], serde_json::json!(["do1ffe"]));
    }

    #[tokio::test]
    async fn test_send_reports_api_error() {
        let (url, _captured) = serve(StatusCode::UNAUTHORIZED).await;
        let client = DapnetClient::new(&config(url), credentials()).unwrap();

        let err = client.send("Test").await.unwrap_err();
        assert!(matches!(err, DapnetError::Api { status: 401, .. }));
    }
}
