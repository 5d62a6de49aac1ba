//! HTTP transport
//!
//! `HttpTransport` is the seam to the network. `ReqwestTransport` is the
//! real thing; `RetryingTransport` wraps any transport with per-attempt
//! timeouts and exponential backoff.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::classify::is_retryable;
use crate::error::AuthError;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(format!("Unsupported HTTP method: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Set a header, replacing any existing value (names compare case-insensitively).
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `HTTP 401: Unauthorized`
    pub fn status_line(&self) -> String {
        let reason = reqwest::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        format!("HTTP {}: {}", self.status, reason)
    }

    /// The server's `{detail}` message, or the status line when the body has none.
    pub fn error_detail(&self) -> String {
        serde_json::from_str::<ErrorBody>(&self.body)
            .ok()
            .and_then(|b| b.detail)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| self.status_line())
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Issue one request. Any HTTP answer is `Ok`, whatever its status;
    /// `Err` means no response was obtained.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Client whose connect and whole-request time are both bounded by
    /// `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(from_reqwest)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.text().await.map_err(from_reqwest)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn from_reqwest(e: reqwest::Error) -> AuthError {
    if e.is_timeout() {
        AuthError::Timeout
    } else {
        AuthError::Network(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts beyond the first
    pub max_retries: u32,
    pub attempt_timeout: Duration,
    /// Delay before the first retry; doubles for each one after
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            attempt_timeout: Duration::from_secs(10),
            base_delay: Duration::from_secs(1),
        }
    }
}

pub struct RetryingTransport {
    inner: Arc<dyn HttpTransport>,
    policy: RetryPolicy,
    retry_count: Arc<AtomicU32>,
}

impl RetryingTransport {
    pub fn new(inner: Arc<dyn HttpTransport>, policy: RetryPolicy) -> Self {
        Self {
            inner,
            policy,
            retry_count: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retries performed since the last reset.
    pub fn retry_count(&self) -> u32 {
        self.retry_count.load(Ordering::SeqCst)
    }

    pub fn reset_retry_count(&self) {
        self.retry_count.store(0, Ordering::SeqCst);
    }

    /// Send with retries. Only failures to get any response are retried;
    /// an error status from the server is returned on the first attempt.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut attempt = 0;

        loop {
            let error = match tokio::time::timeout(
                self.policy.attempt_timeout,
                self.inner.send(request.clone()),
            )
            .await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) if is_retryable(&e) => e,
                Ok(Err(e)) => return Err(e),
                Err(_) => AuthError::Timeout,
            };

            if attempt >= self.policy.max_retries {
                tracing::warn!(
                    method = request.method.as_str(),
                    url = %request.url,
                    attempts = attempt + 1,
                    error = %error,
                    "Giving up on request"
                );
                return Err(AuthError::Network(format!(
                    "no response after {} attempts: {}",
                    attempt + 1,
                    error
                )));
            }

            let delay = self.policy.backoff(attempt);
            tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Request failed, retrying"
            );

            self.retry_count.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl HttpTransport for RetryingTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.fetch(request).await
    }
}

impl Clone for RetryingTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            policy: self.policy,
            retry_count: Arc::clone(&self.retry_count),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeReply, FakeTransport};
    use tokio::time::Instant;

    const URL: &str = "http://localhost:8000/api/auth/login";

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_error_detail() {
        let response = HttpResponse::new(401, r#"{"detail":"Invalid email or password"}"#);
        assert_eq!(response.error_detail(), "Invalid email or password");

        let response = HttpResponse::new(502, "<html>bad gateway</html>");
        assert_eq!(response.error_detail(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_request_header_replaces() {
        let request = HttpRequest::new(Method::Get, URL)
            .header("content-type", "text/plain")
            .header("Content-Type", "application/json")
            .bearer("abc");

        assert_eq!(request.headers.len(), 2);
        assert_eq!(request.header_value("CONTENT-TYPE"), Some("application/json"));
        assert_eq!(request.header_value("authorization"), Some("Bearer abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_timing_then_success() {
        let fake = FakeTransport::new();
        fake.route("/api/auth/login", |_, n| {
            if n < 3 {
                FakeReply::Fail(AuthError::Network("connection refused".into()))
            } else {
                FakeReply::Respond(HttpResponse::new(200, "{}"))
            }
        });

        let retrying = RetryingTransport::new(fake.clone(), RetryPolicy::default());
        let response = retrying
            .fetch(HttpRequest::new(Method::Post, URL))
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(retrying.retry_count(), 3);

        let times = fake.call_times("/api/auth/login");
        assert_eq!(times.len(), 4);
        let gaps: Vec<Duration> = times.windows(2).map(|w| w[1] - w[0]).collect();
        assert_eq!(
            gaps,
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_are_network_error() {
        let fake = FakeTransport::new();
        fake.route("/api/auth/login", |_, _| {
            FakeReply::Fail(AuthError::Network("connection reset".into()))
        });

        let retrying = RetryingTransport::new(fake.clone(), RetryPolicy::default());
        let start = Instant::now();
        let err = retrying
            .fetch(HttpRequest::new(Method::Post, URL))
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Network(_)));
        assert_eq!(fake.calls_to("/api/auth/login"), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retried() {
        let fake = FakeTransport::new();
        fake.route("/api/auth/login", |_, n| {
            if n == 0 {
                FakeReply::Delayed(
                    Duration::from_secs(30),
                    Box::new(FakeReply::Respond(HttpResponse::new(200, "late"))),
                )
            } else {
                FakeReply::Respond(HttpResponse::new(200, "ok"))
            }
        });

        let retrying = RetryingTransport::new(fake.clone(), RetryPolicy::default());
        let start = Instant::now();
        let response = retrying
            .fetch(HttpRequest::new(Method::Post, URL))
            .await
            .unwrap();

        assert_eq!(response.body, "ok");
        // 10s attempt timeout plus 1s backoff
        assert_eq!(start.elapsed(), Duration::from_secs(11));
    }

    #[tokio::test]
    async fn test_server_errors_are_not_retried() {
        let fake = FakeTransport::new();
        fake.route("/api/auth/login", |_, _| {
            FakeReply::Respond(HttpResponse::new(500, r#"{"detail":"Internal server error"}"#))
        });

        let retrying = RetryingTransport::new(fake.clone(), RetryPolicy::default());
        let response = retrying
            .fetch(HttpRequest::new(Method::Post, URL))
            .await
            .unwrap();

        assert_eq!(response.status, 500);
        assert_eq!(fake.calls_to("/api/auth/login"), 1);
        assert_eq!(retrying.retry_count(), 0);
    }
}
