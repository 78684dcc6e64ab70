//! JSON POST client for a single chat endpoint.
//!
//! The bearer token is never logged, only whether one is set. Failed calls
//! are retried only when [`HttpClient::with_retries`] asks for it; 429 and
//! 5xx responses honour `Retry-After`. Set `PARLOR_HTTP_RAW=1` to log request
//! and response bodies at `debug` under the `http.raw` target.
//!
//! ```no_run
//! # async fn demo() -> Result<(), parlor_http::HttpError> {
//! let client = parlor_http::HttpClient::new("http://127.0.0.1:8000/chat")?;
//! let got: serde_json::Value = client
//!     .post_json(&serde_json::json!({ "user_message": "hi" }))
//!     .await?;
//! # Ok(()) }
//! ```

pub mod reply;

use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;

const RAW_ENV: &str = "PARLOR_HTTP_RAW";
const RAW_BODY_LIMIT: usize = 16 * 1024;
const SNIPPET_LIMIT: usize = 300;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid endpoint URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("undecodable response ({0}): {1}")]
    Decode(String, String),
    #[error("endpoint answered {status}: {message}")]
    Status { status: StatusCode, message: String },
}

impl HttpError {
    fn is_retryable(&self) -> bool {
        match self {
            HttpError::Network(_) => true,
            HttpError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }
}

#[derive(Clone)]
pub struct HttpClient {
    endpoint: Url,
    inner: Client,
    timeout: Option<Duration>,
    retries: usize,
    bearer: Option<String>,
}

impl HttpClient {
    /// A client for `endpoint` with no timeout, no retries and no auth.
    ///
    /// ```
    /// use parlor_http::{HttpClient, HttpError};
    ///
    /// let client = HttpClient::new("http://127.0.0.1:8000/chat")?;
    /// assert_eq!(client.endpoint().path(), "/chat");
    /// assert!(HttpClient::new("not a url").is_err());
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(endpoint: &str) -> Result<Self, HttpError> {
        let endpoint = Url::parse(endpoint).map_err(|e| HttpError::Url(e.to_string()))?;
        let inner = Client::builder()
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            endpoint,
            inner,
            timeout: None,
            retries: 0,
            bearer: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// Blank tokens are treated as no token.
    pub fn with_bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token.filter(|t| !t.trim().is_empty());
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// POST `body` as JSON and decode the JSON answer.
    pub async fn post_json<B, T>(&self, body: &B) -> Result<T, HttpError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| HttpError::Build(e.to_string()))?;
        let token = self.bearer.as_deref().map(clean_token).transpose()?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.send_once(&payload, token.as_deref(), attempt).await {
                Ok(bytes) => {
                    return serde_json::from_slice(&bytes).map_err(|e| {
                        let snippet = lossy_prefix(&bytes, SNIPPET_LIMIT);
                        tracing::warn!(error = %e, body_snippet = %snippet, "http.decode_error");
                        HttpError::Decode(e.to_string(), snippet)
                    });
                }
                Err((err, wait)) if err.is_retryable() && attempt <= self.retries => {
                    let wait = wait.unwrap_or_else(|| backoff(attempt));
                    tracing::warn!(attempt, backoff_ms = wait.as_millis() as u64, error = %err, "http.retrying");
                    tokio::time::sleep(wait).await;
                }
                Err((err, _)) => return Err(err),
            }
        }
    }

    /// One round trip. Errors carry the server's `Retry-After`, if any.
    async fn send_once(
        &self,
        payload: &[u8],
        token: Option<&str>,
        attempt: usize,
    ) -> Result<Vec<u8>, (HttpError, Option<Duration>)> {
        let mut req = self
            .inner
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(payload.to_vec());
        if let Some(t) = self.timeout {
            req = req.timeout(t);
        }
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let req_id = uuid::Uuid::new_v4().simple().to_string();
        tracing::debug!(
            %req_id,
            attempt,
            host = self.endpoint.host_str().unwrap_or("-"),
            path = self.endpoint.path(),
            bearer = token.is_some(),
            "http.request"
        );
        if raw_logging() {
            tracing::debug!(target: "http.raw", %req_id, body = %lossy_prefix(payload, RAW_BODY_LIMIT), "request");
        }

        let started = Instant::now();
        let resp = req
            .send()
            .await
            .map_err(|e| (HttpError::Network(e.to_string()), None))?;
        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs);
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| (HttpError::Network(e.to_string()), None))?;

        tracing::debug!(
            %req_id,
            %status,
            elapsed_ms = started.elapsed().as_millis() as u64,
            body_len = bytes.len(),
            "http.response"
        );
        if raw_logging() {
            tracing::debug!(target: "http.raw", %req_id, %status, body = %lossy_prefix(&bytes, RAW_BODY_LIMIT), "response");
        }

        if status.is_success() {
            Ok(bytes.to_vec())
        } else {
            let message = error_message(&bytes);
            Err((HttpError::Status { status, message }, retry_after))
        }
    }
}

fn raw_logging() -> bool {
    matches!(std::env::var(RAW_ENV).as_deref(), Ok("1" | "true" | "yes"))
}

fn backoff(attempt: usize) -> Duration {
    Duration::from_millis(250u64 << attempt.clamp(1, 6).saturating_sub(1))
}

/// `detail`, `message` or `error` from a JSON error body, else the raw prefix.
fn error_message(body: &[u8]) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
        for key in ["detail", "message", "error"] {
            match map.get(key) {
                Some(serde_json::Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(serde_json::Value::Object(inner)) => {
                    if let Some(serde_json::Value::String(s)) = inner.get("message") {
                        return s.clone();
                    }
                }
                _ => {}
            }
        }
    }
    lossy_prefix(body, SNIPPET_LIMIT)
}

fn lossy_prefix(bytes: &[u8], limit: usize) -> String {
    let mut s = String::from_utf8_lossy(&bytes[..bytes.len().min(limit)]).into_owned();
    if bytes.len() > limit {
        s.push_str("...");
    }
    s
}

/// Strip quotes and whitespace pasted along with a token; reject bytes a header can't carry.
fn clean_token(raw: &str) -> Result<String, HttpError> {
    let mut token: String = raw.trim().trim_matches(['"', '\'']).to_string();
    token.retain(|c| !c.is_ascii_whitespace());
    if !token.is_ascii() || token.bytes().any(|b| b.is_ascii_control()) {
        return Err(HttpError::Build("bearer token has non-printable bytes".into()));
    }
    HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| HttpError::Build(format!("bad authorization header: {e}")))?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_common_envelopes() {
        assert_eq!(error_message(br#"{"detail":"Not Found"}"#), "Not Found");
        assert_eq!(error_message(br#"{"error":{"message":"quota"}}"#), "quota");
        assert_eq!(error_message(b"plain failure"), "plain failure");
    }

    #[test]
    fn tokens_lose_pasted_quotes_and_whitespace() {
        assert_eq!(clean_token(" \"ab c\n\" ").unwrap(), "abc");
        assert!(clean_token("é").is_err());
    }

    #[test]
    fn blank_bearer_means_no_auth() {
        let client = HttpClient::new("http://localhost/chat")
            .unwrap()
            .with_bearer(Some("   ".into()));
        assert!(client.bearer.is_none());
    }

    #[test]
    fn only_transient_failures_retry() {
        let status = |code| HttpError::Status {
            status: StatusCode::from_u16(code).unwrap(),
            message: String::new(),
        };
        assert!(status(503).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(HttpError::Network("reset".into()).is_retryable());
        assert!(!HttpError::Decode("eof".into(), String::new()).is_retryable());
    }

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff(1), Duration::from_millis(250));
        assert_eq!(backoff(2), Duration::from_millis(500));
        assert_eq!(backoff(6), backoff(9));
    }

    #[test]
    fn long_bodies_are_cut() {
        let snip = lossy_prefix(&[b'x'; SNIPPET_LIMIT + 5], SNIPPET_LIMIT);
        assert_eq!(snip.len(), SNIPPET_LIMIT + 3);
        assert!(snip.ends_with("..."));
    }
}
