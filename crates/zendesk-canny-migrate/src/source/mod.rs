//! Zendesk Help Center source: REST transport, cursor pagination and user loading.

pub mod pagination;
pub mod users;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::config::SourceConfig;
use crate::error::{Error, Result};
use crate::http::create_http_client;

pub use pagination::{fetch_all, Paginator};
pub use users::{UserBatchLoader, UserCache, USER_BATCH_SIZE};

/// Read access to the Zendesk REST API.
///
/// Implement this trait to feed the collector from something other than a
/// live Help Center (tests use an in-memory implementation).
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Base URL that endpoint paths are appended to.
    fn base_url(&self) -> &str;

    /// Issues an authenticated GET and decodes the body as JSON.
    ///
    /// # Errors
    ///
    /// `Error::Transport` on network failure or non-success status,
    /// `Error::MalformedResponse` if the body is not JSON.
    async fn get_json(&self, url: &str) -> Result<Value>;
}

/// Zendesk client using Basic authentication.
pub struct ZendeskClient {
    config: SourceConfig,
    client: Client,
}

impl ZendeskClient {
    /// Creates a new Zendesk client with configured HTTP client.
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            client: create_http_client(),
        }
    }
}

#[async_trait]
impl SourceApi for ZendeskClient {
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        let response = self
            .client
            .get(url)
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Zendesk request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("cannot read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Transport(format!(
                "error while making request to {}: {} - {}",
                url, status, body
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!(
                "cannot unmarshal response to json: {}, response: {}",
                e, body
            ))
        })
    }
}

/// First page of the posts of a topic, oldest first.
pub fn topic_posts_url(base_url: &str, topic: &str) -> String {
    format!(
        "{}/api/v2/community/topics/{}/posts.json?sort_by=created_at",
        base_url, topic
    )
}

/// First page of the comments of a post, oldest first.
pub fn post_comments_url(base_url: &str, post_id: i64) -> String {
    format!(
        "{}/api/v2/community/posts/{}/comments.json?sort_by=created_at",
        base_url, post_id
    )
}

/// First page of the votes of a post, oldest first.
pub fn post_votes_url(base_url: &str, post_id: i64) -> String {
    format!(
        "{}/api/v2/community/posts/{}/votes.json?sort_by=created_at",
        base_url, post_id
    )
}

/// Batch lookup of users by id.
pub fn show_many_users_url(base_url: &str, ids: &[i64]) -> String {
    let ids: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("{}/api/v2/users/show_many.json?ids={}", base_url, ids.join(","))
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
