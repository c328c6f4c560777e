//! Canny destination: request types and the REST client.
//!
//! Every Canny call is a `POST` of a flat JSON object that carries the API
//! key next to the call parameters. The client is stateless: it has no
//! retries and no batching, failures go straight back to the caller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::config::DestinationConfig;
use crate::error::{Error, Result};
use crate::http::create_http_client;

/// Parameters of `posts/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePost {
    /// Canny user id of the author.
    #[serde(rename = "authorID")]
    pub author_id: String,
    /// Canny board id.
    #[serde(rename = "boardID")]
    pub board_id: String,
    /// Plain-text body.
    pub details: String,
    /// Plain-text title.
    pub title: String,
}

/// Parameters of `comments/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateComment {
    /// Canny user id of the author.
    #[serde(rename = "authorID")]
    pub author_id: String,
    /// Canny post id.
    #[serde(rename = "postID")]
    pub post_id: String,
    /// Plain-text body.
    pub value: String,
}

/// Parameters of `votes/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateVote {
    /// Canny post id.
    #[serde(rename = "postID")]
    pub post_id: String,
    /// Canny user id of the voter.
    #[serde(rename = "voterID")]
    pub voter_id: String,
}

/// Parameters of `users/find_or_create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindOrCreateUser {
    /// Account creation time carried over from Zendesk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    /// Email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Display name.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// External user id.
    #[serde(rename = "userID", skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Write access to the Canny API.
#[async_trait]
pub trait DestinationApi: Send + Sync {
    /// Creates a post and returns its Canny id.
    async fn create_post(&self, post: &CreatePost) -> Result<String>;

    /// Creates a comment and returns its Canny id.
    async fn create_comment(&self, comment: &CreateComment) -> Result<String>;

    /// Creates a vote. Canny acknowledges votes without returning an id.
    async fn create_vote(&self, vote: &CreateVote) -> Result<()>;

    /// Finds a user by email/user id or creates it, and returns its Canny id.
    async fn find_or_create_user(&self, user: &FindOrCreateUser) -> Result<String>;
}

/// Body of every Canny request: the API key plus the call parameters.
#[derive(Serialize)]
struct AuthenticatedRequest<'a, T> {
    #[serde(rename = "apiKey")]
    api_key: &'a str,
    #[serde(flatten)]
    params: &'a T,
}

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

/// Canny REST client.
pub struct CannyClient {
    config: DestinationConfig,
    client: Client,
}

impl CannyClient {
    /// Creates a new Canny client with configured HTTP client.
    pub fn new(config: DestinationConfig) -> Self {
        Self {
            config,
            client: create_http_client(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    /// Posts `params` to `path` and returns the raw response body.
    async fn post<T: Serialize + Sync>(&self, path: &str, params: &T) -> Result<String> {
        let url = self.endpoint(path);
        let request = AuthenticatedRequest {
            api_key: &self.config.api_key,
            params,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("Canny request to {} failed: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("cannot read response body: {}", e)))?;

        if !status.is_success() {
            return Err(Error::Creation(format!(
                "error while making request to {}: {} - {}",
                url, status, body
            )));
        }
        Ok(body)
    }

    async fn post_for_id<T: Serialize + Sync>(&self, path: &str, params: &T) -> Result<String> {
        let body = self.post(path, params).await?;
        let response: IdResponse = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!(
                "cannot unmarshal response to json: {}, response: {}",
                e, body
            ))
        })?;
        Ok(response.id)
    }
}

#[async_trait]
impl DestinationApi for CannyClient {
    async fn create_post(&self, post: &CreatePost) -> Result<String> {
        self.post_for_id("posts/create", post).await
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<String> {
        self.post_for_id("comments/create", comment).await
    }

    async fn create_vote(&self, vote: &CreateVote) -> Result<()> {
        let body = self.post("votes/create", vote).await?;
        if body.trim() != "success" {
            return Err(Error::Creation(format!(
                "unknown error while creating vote for postID={} voterID={}",
                vote.post_id, vote.voter_id
            )));
        }
        Ok(())
    }

    async fn find_or_create_user(&self, user: &FindOrCreateUser) -> Result<String> {
        self.post_for_id("users/find_or_create", user).await
    }
}

/// Destination for dry runs: nothing is sent, every call succeeds with a
/// placeholder id.
#[derive(Debug, Default)]
pub struct DryRunDestination {
    next_id: AtomicU64,
}

impl DryRunDestination {
    /// Creates a dry-run destination.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn placeholder(&self, kind: &str) -> String {
        format!("dry-run-{}-{}", kind, self.next_id.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

#[async_trait]
impl DestinationApi for DryRunDestination {
    async fn create_post(&self, post: &CreatePost) -> Result<String> {
        debug!("[dry run] would create post '{}' on board {}", post.title, post.board_id);
        Ok(self.placeholder("post"))
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<String> {
        debug!("[dry run] would create comment on post {}", comment.post_id);
        Ok(self.placeholder("comment"))
    }

    async fn create_vote(&self, vote: &CreateVote) -> Result<()> {
        debug!("[dry run] would create vote of {} on post {}", vote.voter_id, vote.post_id);
        Ok(())
    }

    async fn find_or_create_user(&self, user: &FindOrCreateUser) -> Result<String> {
        debug!("[dry run] would find or create user '{}'", user.name);
        Ok(self.placeholder("user"))
    }
}

#[cfg(test)]
#[path = "destination_tests.rs"]
mod tests;
