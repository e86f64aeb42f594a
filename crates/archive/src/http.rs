//! HTTP access to the archive.
//!
//! Everything that talks to the network goes through [`HttpSource`], so the
//! locator and the frame cache can be driven by an in-memory archive.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use suncast_common::error::{SuncastError, SuncastResult};

/// Minimal GET-only view of a remote host.
#[async_trait]
pub trait HttpSource: Send + Sync {
    /// Fetch a document as text, optionally bounded by `timeout`.
    async fn get_text(&self, url: &str, timeout: Option<Duration>) -> SuncastResult<String>;

    /// Fetch a response body verbatim.
    async fn get_bytes(&self, url: &str) -> SuncastResult<Vec<u8>>;
}

/// [`HttpSource`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
}

impl ReqwestSource {
    pub fn new(user_agent: &str) -> SuncastResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| SuncastError::config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn get(&self, url: &str, timeout: Option<Duration>) -> SuncastResult<reqwest::Response> {
        let mut request = self.client.get(url);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }

        let resp = request.send().await.map_err(|e| classify(url, e))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SuncastError::network(url, format!("server returned {status}")));
        }
        Ok(resp)
    }
}

#[async_trait]
impl HttpSource for ReqwestSource {
    async fn get_text(&self, url: &str, timeout: Option<Duration>) -> SuncastResult<String> {
        let resp = self.get(url, timeout).await?;
        tracing::debug!(url, status = %resp.status(), "Fetched document");
        resp.text().await.map_err(|e| classify(url, e))
    }

    async fn get_bytes(&self, url: &str) -> SuncastResult<Vec<u8>> {
        let resp = self.get(url, None).await?;
        let body = resp.bytes().await.map_err(|e| classify(url, e))?;
        Ok(body.to_vec())
    }
}

/// Connection, timeout, and body-read failures are transient; anything
/// else (bad URL, redirect loops, decode errors) is not.
fn classify(url: &str, err: reqwest::Error) -> SuncastError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        SuncastError::transient(url, err.to_string())
    } else {
        SuncastError::network(url, err.to_string())
    }
}

/// In-memory [`HttpSource`] serving canned bodies and recording every
/// request it sees. Unknown URLs fail as non-transient 404s.
#[derive(Debug, Default)]
pub struct MemorySource {
    bodies: HashMap<String, Vec<u8>>,
    failures: Mutex<HashMap<String, u32>>,
    requests: Mutex<Vec<String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub fn with_body(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    /// Fail the first `count` requests for `url` with a transient error.
    pub fn with_transient_failures(self, url: impl Into<String>, count: u32) -> Self {
        if let Ok(mut failures) = self.failures.lock() {
            failures.insert(url.into(), count);
        }
        self
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn serve(&self, url: &str) -> SuncastResult<Vec<u8>> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
        if let Ok(mut failures) = self.failures.lock() {
            if let Some(remaining) = failures.get_mut(url) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(SuncastError::transient(url, "connection reset"));
                }
            }
        }
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| SuncastError::network(url, "server returned 404 Not Found"))
    }
}

#[async_trait]
impl HttpSource for MemorySource {
    async fn get_text(&self, url: &str, _timeout: Option<Duration>) -> SuncastResult<String> {
        let body = self.serve(url)?;
        String::from_utf8(body).map_err(|e| SuncastError::network(url, e.to_string()))
    }

    async fn get_bytes(&self, url: &str) -> SuncastResult<Vec<u8>> {
        self.serve(url)
    }
}
