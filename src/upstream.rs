// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Upstream chat-completion client
//
// Responsibilities:
// - Transport abstraction (HttpSender) so sessions never touch reqwest directly
// - Completions URL resolution from a configured base URL
// - Streaming chat request construction (bearer auth, stream: true)

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use futures_util::stream::Stream;
use futures_util::TryStreamExt;
use serde::Serialize;

use crate::credentials::UpstreamCredentials;

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Deadline for the response head only. The body may stream for as
    /// long as the upstream keeps producing it.
    pub timeout_ms: Option<u64>,
}

pub enum HttpBody {
    Full(Bytes),
    Stream(Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>),
}

pub struct HttpResponse {
    pub status: StatusCode,
    pub body: HttpBody,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

/// Sends HTTP requests to the upstream chat-completion service.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

/// Streams the upstream response body as it arrives.
pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let pending = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body)
            .send();

        let resp = match request.timeout_ms {
            Some(timeout_ms) => {
                tokio::time::timeout(Duration::from_millis(timeout_ms), pending)
                    .await
                    .map_err(|_| {
                        HttpError::Timeout(format!("no response within {timeout_ms}ms"))
                    })?
            }
            None => pending.await,
        }
        .map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout(e.to_string())
            } else {
                HttpError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        let stream = resp
            .bytes_stream()
            .map_err(|e| HttpError::Transport(e.to_string()));
        Ok(HttpResponse {
            status,
            body: HttpBody::Stream(Box::pin(stream)),
        })
    }
}

// ---------------------------------------------------------------------------
// Chat request construction
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    stream: bool,
}

/// Resolve the chat completions endpoint for a base URL.
///
/// A base URL whose path already carries a version segment (`/v1`, `/v3`,
/// ...) gets `/chat/completions` appended; anything else gets
/// `/v1/chat/completions`.
pub fn completions_url(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    if has_version_segment(base) {
        format!("{base}/chat/completions")
    } else {
        format!("{base}/v1/chat/completions")
    }
}

fn has_version_segment(url: &str) -> bool {
    let path = match url.find("://") {
        Some(scheme_end) => {
            let after_scheme = &url[scheme_end + 3..];
            after_scheme.find('/').map_or("", |i| &after_scheme[i..])
        }
        None => url,
    };
    path.split('/').any(|segment| {
        let mut chars = segment.chars();
        chars.next() == Some('v')
            && segment.len() > 1
            && chars.all(|c| c.is_ascii_digit())
    })
}

/// Build the streaming chat request for one session.
pub fn build_chat_request(
    credentials: &UpstreamCredentials,
    system_prompt: &str,
    user_text: &str,
    timeout_ms: Option<u64>,
) -> Result<HttpRequest, HttpError> {
    let body = ChatCompletionRequest {
        model: &credentials.model_name,
        messages: [
            ChatMessage {
                role: "system",
                content: system_prompt,
            },
            ChatMessage {
                role: "user",
                content: user_text,
            },
        ],
        stream: true,
    };
    let body = serde_json::to_vec(&body)
        .map_err(|e| HttpError::Transport(format!("failed to encode request: {e}")))?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    let auth = HeaderValue::from_str(&format!("Bearer {}", credentials.api_key))
        .map_err(|_| HttpError::Transport("API key is not a valid header value".to_string()))?;
    headers.insert(header::AUTHORIZATION, auth);

    Ok(HttpRequest {
        method: Method::POST,
        url: completions_url(&credentials.api_url),
        headers,
        body: Bytes::from(body),
        timeout_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> UpstreamCredentials {
        UpstreamCredentials {
            api_url: "https://api.example.com".to_string(),
            api_key: "sk-test".to_string(),
            model_name: "gpt-test".to_string(),
        }
    }

    #[test]
    fn completions_url_appends_version_when_missing() {
        assert_eq!(
            completions_url("https://api.example.com"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn completions_url_keeps_existing_version_segment() {
        assert_eq!(
            completions_url("https://api.example.com/v1"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://ark.example.com/api/v3/"),
            "https://ark.example.com/api/v3/chat/completions"
        );
    }

    #[test]
    fn host_names_are_not_version_segments() {
        assert_eq!(
            completions_url("https://v1.example.com"),
            "https://v1.example.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("https://api.example.com/vendor"),
            "https://api.example.com/vendor/v1/chat/completions"
        );
    }

    #[test]
    fn chat_request_has_bearer_auth_and_streaming_body() {
        let req = build_chat_request(&credentials(), "be terse", "draw it", Some(1000)).unwrap();

        assert_eq!(req.method, Method::POST);
        assert_eq!(req.url, "https://api.example.com/v1/chat/completions");
        assert_eq!(req.headers.get(header::AUTHORIZATION).unwrap(), "Bearer sk-test");
        assert_eq!(req.timeout_ms, Some(1000));

        let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
        assert_eq!(body["model"], "gpt-test");
        assert_eq!(body["stream"], true);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be terse");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "draw it");
    }

    #[test]
    fn api_key_with_newline_is_rejected() {
        let mut creds = credentials();
        creds.api_key = "bad\nkey".to_string();
        assert!(build_chat_request(&creds, "p", "t", None).is_err());
    }

    #[test]
    fn http_error_formats() {
        assert_eq!(
            HttpError::Timeout("after 5000ms".into()).to_string(),
            "upstream request timed out: after 5000ms"
        );
        assert_eq!(
            HttpError::Transport("connection refused".into()).to_string(),
            "upstream request failed: connection refused"
        );
    }
}
