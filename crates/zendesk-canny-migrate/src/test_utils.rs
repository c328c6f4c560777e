//! In-memory Zendesk and Canny doubles for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::destination::{
    CreateComment, CreatePost, CreateVote, DestinationApi, FindOrCreateUser,
};
use crate::error::{Error, Result};
use crate::source::SourceApi;

pub const BASE_URL: &str = "http://zendesk.test";

const SHOW_MANY_PREFIX: &str = "http://zendesk.test/api/v2/users/show_many.json?ids=";

pub fn post_json(id: i64, author_id: i64, comment_count: i64, vote_count: i64) -> Value {
    json!({
        "id": id,
        "title": format!("Post {}", id),
        "details": format!("<p>Details of <b>{}</b></p>", id),
        "author_id": author_id,
        "comment_count": comment_count,
        "vote_count": vote_count,
    })
}

pub fn comment_json(id: i64, author_id: i64) -> Value {
    json!({ "id": id, "body": format!("Comment {}", id), "author_id": author_id })
}

pub fn vote_json(id: i64, user_id: i64) -> Value {
    json!({ "id": id, "user_id": user_id, "value": 1 })
}

pub fn user_json(id: i64) -> Value {
    json!({
        "id": id,
        "created_at": "2019-05-01T12:00:00Z",
        "name": format!("User {}", id),
        "email": format!("user{}@example.com", id),
        "external_id": null,
    })
}

/// A single-page envelope.
pub fn last_page(collection: &str, items: Vec<Value>) -> Value {
    page_with_next(collection, items, Value::Null)
}

/// An envelope pointing at `next_page`.
pub fn page_with_next(collection: &str, items: Vec<Value>, next_page: Value) -> Value {
    let mut envelope = serde_json::Map::new();
    envelope.insert(collection.to_string(), Value::Array(items));
    envelope.insert("next_page".to_string(), next_page);
    envelope.insert("count".to_string(), json!(0));
    Value::Object(envelope)
}

/// Zendesk double serving canned pages and any subset of known users.
#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, Value>,
    failing: HashSet<String>,
    failing_once: Mutex<HashSet<String>>,
    panicking: HashSet<String>,
    users: HashMap<i64, Value>,
    calls: Mutex<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: impl Into<String>, body: Value) -> Self {
        self.pages.insert(url.into(), body);
        self
    }

    pub fn failing(mut self, url: impl Into<String>) -> Self {
        self.failing.insert(url.into());
        self
    }

    /// Fails the first request to `url` only.
    pub fn failing_once(self, url: impl Into<String>) -> Self {
        self.failing_once.lock().unwrap().insert(url.into());
        self
    }

    /// Panics on any request to `url`, killing the calling task.
    pub fn panicking(mut self, url: impl Into<String>) -> Self {
        self.panicking.insert(url.into());
        self
    }

    pub fn user(mut self, id: i64) -> Self {
        self.users.insert(id, user_json(id));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_containing(&self, needle: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|url| url.contains(needle))
            .collect()
    }

    /// Ids requested through `show_many`, one vector per request.
    pub fn user_batches(&self) -> Vec<Vec<i64>> {
        self.calls()
            .iter()
            .filter_map(|url| url.strip_prefix(SHOW_MANY_PREFIX))
            .map(|ids| ids.split(',').filter_map(|id| id.parse().ok()).collect())
            .collect()
    }
}

#[async_trait]
impl SourceApi for FakeSource {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.panicking.contains(url) {
            panic!("unexpected request to {}", url);
        }
        let fail_now = self.failing_once.lock().unwrap().remove(url);
        if fail_now || self.failing.contains(url) {
            return Err(Error::Transport(format!(
                "error while making request to {}: 503 Service Unavailable",
                url
            )));
        }
        if let Some(ids) = url.strip_prefix(SHOW_MANY_PREFIX) {
            let users: Vec<Value> = ids
                .split(',')
                .filter_map(|id| id.parse::<i64>().ok())
                .filter_map(|id| self.users.get(&id).cloned())
                .collect();
            return Ok(last_page("users", users));
        }
        self.pages.get(url).cloned().ok_or_else(|| {
            Error::Transport(format!("error while making request to {}: 404 Not Found", url))
        })
    }
}

/// Canny double recording every call.
#[derive(Default)]
pub struct FakeDestination {
    posts: Mutex<Vec<CreatePost>>,
    comments: Mutex<Vec<CreateComment>>,
    votes: Mutex<Vec<CreateVote>>,
    users: Mutex<Vec<FindOrCreateUser>>,
    next_id: AtomicUsize,
    reject_comment: Option<String>,
}

impl FakeDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects comments whose value equals `value`.
    pub fn rejecting_comment(value: &str) -> Self {
        Self {
            reject_comment: Some(value.to_string()),
            ..Self::default()
        }
    }

    pub fn posts(&self) -> Vec<CreatePost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn comments(&self) -> Vec<CreateComment> {
        self.comments.lock().unwrap().clone()
    }

    pub fn votes(&self) -> Vec<CreateVote> {
        self.votes.lock().unwrap().clone()
    }

    pub fn users(&self) -> Vec<FindOrCreateUser> {
        self.users.lock().unwrap().clone()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("{}-{}", kind, self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl DestinationApi for FakeDestination {
    async fn create_post(&self, post: &CreatePost) -> Result<String> {
        self.posts.lock().unwrap().push(post.clone());
        Ok(self.next_id("cpost"))
    }

    async fn create_comment(&self, comment: &CreateComment) -> Result<String> {
        if self.reject_comment.as_deref() == Some(comment.value.as_str()) {
            return Err(Error::Creation(format!(
                "error while making request to comments/create: 400 - invalid value {}",
                comment.value
            )));
        }
        self.comments.lock().unwrap().push(comment.clone());
        Ok(self.next_id("ccomment"))
    }

    async fn create_vote(&self, vote: &CreateVote) -> Result<()> {
        self.votes.lock().unwrap().push(vote.clone());
        Ok(())
    }

    async fn find_or_create_user(&self, user: &FindOrCreateUser) -> Result<String> {
        self.users.lock().unwrap().push(user.clone());
        Ok(format!("cuser-{}", user.name))
    }
}
