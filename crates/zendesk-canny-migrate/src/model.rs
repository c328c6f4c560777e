//! Zendesk Help Center records carried through the migration.
//!
//! Only the fields the migration uses are decoded. Child collections and
//! resolved users are not part of the source payloads: they are filled in by
//! the enrichment workers and the collector after the users are loaded.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;

/// A Zendesk user referenced as a post author, comment author or voter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct User {
    /// Zendesk user id.
    pub id: i64,
    /// Account creation time.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address, absent for some end users.
    #[serde(default)]
    pub email: Option<String>,
    /// External id set by SSO integrations.
    #[serde(default)]
    pub external_id: Option<String>,
}

/// A community post with its comments and votes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Post {
    /// Zendesk post id.
    pub id: i64,
    /// Post title (may contain HTML).
    #[serde(default)]
    pub title: String,
    /// Post body (HTML).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub details: String,
    /// Author user id.
    pub author_id: i64,
    /// Declared number of votes, used to skip the votes request.
    #[serde(default)]
    pub vote_count: i64,
    /// Declared number of comments, used to skip the comments request.
    #[serde(default)]
    pub comment_count: i64,
    /// Comments in source page order.
    #[serde(skip)]
    pub comments: Vec<Comment>,
    /// Votes in source page order.
    #[serde(skip)]
    pub votes: Vec<Vote>,
    /// Resolved author, `None` until users are loaded or when unresolvable.
    #[serde(skip)]
    pub author: Option<Arc<User>>,
}

impl Post {
    /// Every user id this post references: its author, then comment authors, then voters.
    pub fn referenced_user_ids(&self) -> impl Iterator<Item = i64> + '_ {
        std::iter::once(self.author_id)
            .chain(self.comments.iter().map(|c| c.author_id))
            .chain(self.votes.iter().map(|v| v.user_id))
    }
}

/// A comment on a post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    /// Zendesk comment id.
    pub id: i64,
    /// Comment body (HTML).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub body: String,
    /// Author user id.
    pub author_id: i64,
    /// Resolved author.
    #[serde(skip)]
    pub author: Option<Arc<User>>,
}

/// An up-vote on a post.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vote {
    /// Zendesk vote id.
    pub id: i64,
    /// Voter user id.
    pub user_id: i64,
    /// Resolved voter. Votes without one are not migrated.
    #[serde(skip)]
    pub user: Option<Arc<User>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
