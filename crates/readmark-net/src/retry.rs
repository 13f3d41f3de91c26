//! Bounded-retry fetch for eventually-ready resources.
//!
//! The backend answers 206 while a resource exists but is still being
//! computed. This primitive retries through a fixed budget with a fixed
//! inter-attempt delay; any other status parses and returns the body,
//! including error statuses, because some endpoints report failure in the
//! body rather than the status line.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// The "resource exists but is not fully computed yet" status.
pub const NOT_READY: StatusCode = StatusCode::PARTIAL_CONTENT;

/// A rebuildable request: retries need a fresh request per attempt.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: Some(body),
        }
    }

    fn build(&self, client: &Client) -> RequestBuilder {
        let mut request = client
            .request(self.method.clone(), &self.url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = &self.body {
            request = request.json(body);
        }
        request
    }
}

/// Issue a request, retrying while the backend answers [`NOT_READY`].
///
/// Makes at most `max_attempts` requests with a fixed `delay` between them
/// (no jitter, so worst-case latency is `max_attempts * delay` and nothing
/// more). Exhausting the budget on 206 fails with
/// [`FetchError::RetryExhausted`]; any other status returns the parsed body.
pub async fn fetch_with_retry(
    client: &Client,
    spec: &RequestSpec,
    max_attempts: u32,
    delay: Duration,
) -> Result<Value, FetchError> {
    debug_assert!(max_attempts >= 1);
    let mut attempts_left = max_attempts.max(1);

    loop {
        let response = spec.build(client).send().await?;
        let status = response.status();

        if status == NOT_READY {
            if attempts_left > 1 {
                attempts_left -= 1;
                debug!(url = %spec.url, attempts_left, "resource not ready, retrying");
                tokio::time::sleep(delay).await;
                continue;
            }
            return Err(FetchError::RetryExhausted {
                url: spec.url.clone(),
                attempts: max_attempts,
            });
        }

        let text = response.text().await?;
        return serde_json::from_str(&text).map_err(FetchError::from);
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
