//! Typed client over the backend's HTTP endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, warn};

use readmark_config::{BackendConfig, RetryConfig};
use readmark_protocols::BookmarkRecord;
use readmark_store::{BookmarkSource, SourceError};

use crate::error::FetchError;
use crate::retry::{fetch_with_retry, RequestSpec};

/// Backend endpoint paths.
mod endpoints {
    pub const PING: &str = "/ping";
    pub const BOOKMARK: &str = "/bookmark";
    pub const REGENERATE: &str = "/document/regenerate";
    pub const USER_BOOKMARK: &str = "/bookmark/user";
    pub const ASK_QUESTION: &str = "/ask_question";

    pub fn bookmark(id: i64) -> String {
        format!("/bookmark/{id}")
    }

    pub fn document_plus(bookmark_id: i64) -> String {
        format!("/document_plus/{bookmark_id}")
    }

    pub fn user_bookmarks(user_id: &str) -> String {
        format!("/bookmarks/user/{user_id}")
    }

    pub fn qanda(document_id: &str) -> String {
        format!("/document/{document_id}/questions_answers")
    }

    pub fn chat(document_id: &str) -> String {
        format!("/document/{document_id}/chat")
    }

    pub fn chat_message(message_id: &str) -> String {
        format!("/chat_message/{message_id}")
    }
}

/// Outcome of a bookmark creation: status plus parsed body, even for error
/// statuses, since the UI inspects the content.
#[derive(Debug, Clone, PartialEq)]
pub struct BookmarkOutcome {
    pub status: u16,
    pub content: Value,
}

/// HTTP client for the backend service.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    /// Build a client against the configured backend.
    pub fn new(backend: &BackendConfig, retry: RetryConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent("readmark/0.1")
            .build()?;
        Ok(Self {
            client,
            base_url: backend.base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_with_retry(&self, path: &str, attempts: u32) -> Result<Value, FetchError> {
        let spec = RequestSpec::get(self.url(path));
        fetch_with_retry(&self.client, &spec, attempts, self.retry.not_ready_delay()).await
    }

    /// Backend health probe, quick budget.
    pub async fn ping(&self) -> Result<Value, FetchError> {
        self.get_with_retry(endpoints::PING, self.retry.quick_attempts)
            .await
    }

    /// Create a bookmark for a page. The page HTML is optional; capture can
    /// fail without blocking the bookmark.
    pub async fn create_bookmark(
        &self,
        url: &str,
        html: Option<String>,
        user_id: &str,
    ) -> Result<BookmarkOutcome, FetchError> {
        let response = self
            .client
            .post(self.url(endpoints::BOOKMARK))
            .json(&json!({
                "url": url,
                "html": html,
                "user_id": user_id,
            }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let content: Value = serde_json::from_str(&response.text().await?)?;
        debug!(status, "create_bookmark response");
        Ok(BookmarkOutcome { status, content })
    }

    /// Delete a bookmark. `true` on 2xx.
    pub async fn delete_bookmark(&self, bookmark_id: i64) -> Result<bool, FetchError> {
        let response = self
            .client
            .delete(self.url(&endpoints::bookmark(bookmark_id)))
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Ask the backend to regenerate a failed document. On 202 the body is
    /// the bookmark whose document fetch should be chained next.
    pub async fn regenerate_document(&self, document: &Value) -> Result<Option<i64>, FetchError> {
        let response = self
            .client
            .post(self.url(endpoints::REGENERATE))
            .json(document)
            .send()
            .await?;

        if response.status().as_u16() != 202 {
            warn!(status = %response.status(), "regenerate_document not accepted");
            return Ok(None);
        }

        let bookmark: Value = serde_json::from_str(&response.text().await?)?;
        Ok(bookmark.get("id").and_then(Value::as_i64))
    }

    /// Fetch the enriched document, polling through the long budget while
    /// generation is still in progress.
    pub async fn fetch_document_plus(&self, bookmark_id: i64) -> Result<Value, FetchError> {
        self.get_with_retry(
            &endpoints::document_plus(bookmark_id),
            self.retry.document_attempts,
        )
        .await
    }

    /// Fetch the user's full bookmark list.
    pub async fn list_user_bookmarks(
        &self,
        user_id: &str,
    ) -> Result<Vec<BookmarkRecord>, FetchError> {
        let body = self
            .get_with_retry(&endpoints::user_bookmarks(user_id), self.retry.quick_attempts)
            .await?;
        Ok(BookmarkRecord::from_payload(&body))
    }

    /// Server-side bookmark lookup by URL. 404 means "not bookmarked".
    pub async fn find_bookmark_by_url(
        &self,
        user_id: &str,
        url: &str,
    ) -> Result<Option<BookmarkRecord>, FetchError> {
        let response = self
            .client
            .post(self.url(endpoints::USER_BOOKMARK))
            .json(&json!({
                "url": url,
                "html": "",
                "user_id": user_id,
            }))
            .send()
            .await?;

        if response.status().as_u16() == 404 {
            return Ok(None);
        }

        let body: Value = serde_json::from_str(&response.text().await?)?;
        Ok(serde_json::from_value(body).ok())
    }

    /// Fetch the Q&A set for a document.
    pub async fn fetch_qanda(&self, document_id: &str) -> Result<Value, FetchError> {
        self.get_with_retry(&endpoints::qanda(document_id), self.retry.quick_attempts)
            .await
    }

    /// Fetch the chat transcript for a document.
    pub async fn fetch_chat(&self, document_id: &str) -> Result<Value, FetchError> {
        self.get_with_retry(&endpoints::chat(document_id), self.retry.quick_attempts)
            .await
    }

    /// Submit a question; the answer may take a few not-ready cycles.
    pub async fn ask_question(&self, payload: &Value) -> Result<Value, FetchError> {
        let spec = RequestSpec::post(self.url(endpoints::ASK_QUESTION), payload.clone());
        fetch_with_retry(
            &self.client,
            &spec,
            self.retry.quick_attempts,
            self.retry.not_ready_delay(),
        )
        .await
    }

    /// Delete a chat message. `true` on 2xx.
    pub async fn delete_chat_message(&self, message_id: &str) -> Result<bool, FetchError> {
        let response = self
            .client
            .delete(self.url(&endpoints::chat_message(message_id)))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

#[async_trait]
impl BookmarkSource for ApiClient {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<BookmarkRecord>, SourceError> {
        self.list_user_bookmarks(user_id)
            .await
            .map_err(|e| SourceError(e.to_string()))
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
