//! Chat reply fetching.
//!
//! [`ReplyFetcher::fetch`] never fails: transport errors, non-2xx statuses
//! and undecodable bodies all collapse into [`FALLBACK_REPLY`].

use crate::{HttpClient, HttpError};
use async_trait::async_trait;
use parlor_common::FALLBACK_REPLY;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub user_message: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[async_trait]
pub trait ReplyFetcher: Send + Sync {
    /// Ask the endpoint for a reply to `user_text`.
    async fn fetch(&self, user_text: &str) -> String;
}

/// Posts `{"user_message": ...}` and reads `{"reply": ...}`.
#[derive(Clone)]
pub struct HttpReplyFetcher {
    client: HttpClient,
}

impl HttpReplyFetcher {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Build a fetcher for `url` with the given auth/timeout/retry settings.
    ///
    /// ```
    /// use parlor_http::reply::HttpReplyFetcher;
    ///
    /// let fetcher = HttpReplyFetcher::for_endpoint("http://127.0.0.1:8000/chat", None, None, 0)
    ///     .expect("valid url");
    /// assert_eq!(fetcher.endpoint(), "http://127.0.0.1:8000/chat");
    /// ```
    pub fn for_endpoint(
        url: &str,
        auth_token: Option<String>,
        timeout: Option<Duration>,
        retries: usize,
    ) -> Result<Self, HttpError> {
        let client = HttpClient::new(url)?
            .with_timeout(timeout)
            .with_retries(retries)
            .with_bearer(auth_token);
        Ok(Self::new(client))
    }

    pub fn endpoint(&self) -> &str {
        self.client.endpoint().as_str()
    }

    /// The fallible request underneath [`ReplyFetcher::fetch`].
    pub async fn try_fetch(&self, user_text: &str) -> Result<String, HttpError> {
        let body = ChatRequest {
            user_message: user_text,
        };
        let reply: ChatReply = self.client.post_json(&body).await?;
        Ok(reply.reply)
    }
}

#[async_trait]
impl ReplyFetcher for HttpReplyFetcher {
    async fn fetch(&self, user_text: &str) -> String {
        match self.try_fetch(user_text).await {
            Ok(reply) => {
                tracing::debug!(reply_len = reply.len(), "reply.fetched");
                reply
            }
            Err(e) => {
                tracing::warn!(error = %e, endpoint = %self.endpoint(), "reply.fetch_failed");
                FALLBACK_REPLY.to_string()
            }
        }
    }
}
