//! Idempotent creation of collected posts, comments and votes in Canny.
//!
//! Every record has its own ledger key, checked before and written right
//! after its creation. A post that is already in the ledger is not created
//! again but its comments and votes are still checked one by one, so a rerun
//! resumes exactly at the first record that was not ledgered.

use indicatif::ProgressBar;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::destination::{CreateComment, CreatePost, CreateVote, DestinationApi, FindOrCreateUser};
use crate::error::{Error, Result};
use crate::ledger::{MigrationLedger, RecordKind, VOTE_MARKER};
use crate::model::{Post, User};
use crate::sanitize::html_to_text;

/// Maps Zendesk users to Canny user ids.
///
/// Lookup order: missing author -> default user, then the fixed agent
/// mapping, then users already found or created in this run, and finally a
/// `find_or_create` call whose result is remembered.
#[derive(Debug, Clone, Default)]
pub struct AuthorResolver {
    default_user: Option<String>,
    agents: HashMap<i64, String>,
    resolved: HashMap<i64, String>,
}

impl AuthorResolver {
    /// Creates a resolver from the configured default user and agent mapping.
    pub fn new(default_user: Option<String>, agents: HashMap<i64, String>) -> Self {
        Self {
            default_user,
            agents,
            resolved: HashMap::new(),
        }
    }

    /// Returns the Canny user id for the author of a `kind` record.
    ///
    /// # Errors
    ///
    /// `Error::MissingAuthor` if there is no author and no default user,
    /// or the failure of the `find_or_create` call.
    pub async fn resolve(
        &mut self,
        destination: &dyn DestinationApi,
        user: Option<&User>,
        kind: RecordKind,
    ) -> Result<String> {
        let Some(user) = user else {
            return self
                .default_user
                .clone()
                .ok_or(Error::MissingAuthor(kind.as_str()));
        };
        if let Some(canny_id) = self.agents.get(&user.id).or_else(|| self.resolved.get(&user.id)) {
            return Ok(canny_id.clone());
        }

        let canny_id = destination
            .find_or_create_user(&FindOrCreateUser {
                created: user.created_at,
                email: user.email.clone(),
                name: user.name.clone(),
                user_id: user.external_id.clone(),
            })
            .await?;
        self.resolved.insert(user.id, canny_id.clone());
        Ok(canny_id)
    }
}

/// Outcome of migrating one topic.
#[derive(Debug, Default)]
pub struct TopicReport {
    /// Posts whose post, comments and votes are all in the ledger now.
    pub posts_migrated: u64,
    /// Posts created in Canny.
    pub posts_created: u64,
    /// Comments created in Canny.
    pub comments_created: u64,
    /// Votes created in Canny.
    pub votes_created: u64,
    /// Records skipped because the ledger already had them.
    pub already_migrated: u64,
    /// Votes skipped because their voter could not be loaded.
    pub votes_without_voter: u64,
    /// Failure that stopped the topic, with the Zendesk id of the post.
    pub failure: Option<(i64, Error)>,
}

impl TopicReport {
    /// Number of records created in Canny.
    pub fn created(&self) -> u64 {
        self.posts_created + self.comments_created + self.votes_created
    }
}

/// Drives record creation against Canny and keeps the ledger.
pub struct Migrator {
    destination: Arc<dyn DestinationApi>,
    authors: AuthorResolver,
    ledger: MigrationLedger,
    checkpoint: Option<PathBuf>,
}

impl Migrator {
    /// Creates a migrator continuing from `ledger`.
    pub fn new(
        destination: Arc<dyn DestinationApi>,
        authors: AuthorResolver,
        ledger: MigrationLedger,
    ) -> Self {
        Self {
            destination,
            authors,
            ledger,
            checkpoint: None,
        }
    }

    /// Rewrites the ledger at `path` after every created record.
    #[must_use]
    pub fn with_checkpoint(mut self, path: PathBuf) -> Self {
        self.checkpoint = Some(path);
        self
    }

    /// Current ledger.
    pub fn ledger(&self) -> &MigrationLedger {
        &self.ledger
    }

    /// Takes the ledger back.
    pub fn into_ledger(self) -> MigrationLedger {
        self.ledger
    }

    /// Migrates `posts` of `topic` onto `board`, in the given order.
    ///
    /// Stops at the first post that fails: the remaining posts of the topic
    /// are left for the next run, everything ledgered so far stays.
    pub async fn migrate_topic(
        &mut self,
        topic: &str,
        board: &str,
        posts: &[Post],
        progress: &ProgressBar,
    ) -> TopicReport {
        let mut report = TopicReport::default();
        for post in posts {
            match self.migrate_post(topic, board, post, &mut report).await {
                Ok(()) => {
                    debug!("Migrated post '{}'", post.title);
                    report.posts_migrated += 1;
                }
                Err(e) => {
                    report.failure = Some((post.id, e));
                    break;
                }
            }
            progress.inc(1);
        }
        report
    }

    /// Migrates one post and its comments and votes.
    ///
    /// # Errors
    ///
    /// The first author resolution or creation failure.
    pub async fn migrate_post(
        &mut self,
        topic: &str,
        board: &str,
        post: &Post,
        report: &mut TopicReport,
    ) -> Result<()> {
        let existing = self
            .ledger
            .get(topic, RecordKind::Post, post.id)
            .map(str::to_owned);
        let post_id = match existing {
            Some(canny_id) => {
                debug!("Post '{}' is found in state - skipping", post.title);
                report.already_migrated += 1;
                canny_id
            }
            None => {
                let author_id = self
                    .authors
                    .resolve(self.destination.as_ref(), post.author.as_deref(), RecordKind::Post)
                    .await?;
                let canny_id = self
                    .destination
                    .create_post(&CreatePost {
                        author_id,
                        board_id: board.to_string(),
                        details: html_to_text(&post.details),
                        title: html_to_text(&post.title),
                    })
                    .await?;
                self.commit(topic, RecordKind::Post, post.id, &canny_id)?;
                report.posts_created += 1;
                canny_id
            }
        };

        for comment in &post.comments {
            if self.ledger.get(topic, RecordKind::Comment, comment.id).is_some() {
                debug!("Comment '{}' is found in state - skipping", comment.id);
                report.already_migrated += 1;
                continue;
            }
            let author_id = self
                .authors
                .resolve(
                    self.destination.as_ref(),
                    comment.author.as_deref(),
                    RecordKind::Comment,
                )
                .await?;
            let canny_id = self
                .destination
                .create_comment(&CreateComment {
                    author_id,
                    post_id: post_id.clone(),
                    value: html_to_text(&comment.body),
                })
                .await?;
            self.commit(topic, RecordKind::Comment, comment.id, &canny_id)?;
            report.comments_created += 1;
        }

        for vote in &post.votes {
            if self.ledger.get(topic, RecordKind::Vote, vote.id).is_some() {
                report.already_migrated += 1;
                continue;
            }
            let Some(voter) = vote.user.as_deref() else {
                debug!("Vote {} has no known voter - skipping", vote.id);
                report.votes_without_voter += 1;
                continue;
            };
            let voter_id = self
                .authors
                .resolve(self.destination.as_ref(), Some(voter), RecordKind::Vote)
                .await?;
            self.destination
                .create_vote(&CreateVote {
                    post_id: post_id.clone(),
                    voter_id,
                })
                .await?;
            self.commit(topic, RecordKind::Vote, vote.id, VOTE_MARKER)?;
            report.votes_created += 1;
        }

        Ok(())
    }

    fn commit(&mut self, topic: &str, kind: RecordKind, id: i64, canny_id: &str) -> Result<()> {
        self.ledger.record(topic, kind, id, canny_id);
        if let Some(path) = &self.checkpoint {
            self.ledger.save(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
