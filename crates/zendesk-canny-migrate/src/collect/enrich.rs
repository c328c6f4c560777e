//! Worker pool loading the comments and votes of each post.
//!
//! Posts go in through a bounded multi-consumer queue. Each worker owns a
//! clone of the three output senders, so the result, error and user-id
//! streams close exactly when the last worker has exited.

use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::Post;
use crate::source::{fetch_all, post_comments_url, post_votes_url, SourceApi};

/// A post tagged with its position in the topic listing.
pub type ListedPost = (usize, Post);

/// Receiving ends of the pool's output streams.
pub struct EnrichmentStreams {
    /// Fully enriched posts, in completion order.
    pub results: mpsc::UnboundedReceiver<ListedPost>,
    /// Failures of posts that were abandoned.
    pub errors: mpsc::UnboundedReceiver<Error>,
    /// Every user id referenced by an enriched post.
    pub user_ids: mpsc::UnboundedReceiver<i64>,
}

#[derive(Clone)]
struct EnrichmentOutputs {
    results: mpsc::UnboundedSender<ListedPost>,
    errors: mpsc::UnboundedSender<Error>,
    user_ids: mpsc::UnboundedSender<i64>,
}

/// Fixed-size pool of enrichment workers.
pub struct EnrichmentPool {
    input: async_channel::Sender<ListedPost>,
    workers: JoinSet<()>,
}

impl EnrichmentPool {
    /// Spawns `parallelism` workers (at least one) reading from `api`.
    pub fn spawn(api: Arc<dyn SourceApi>, parallelism: usize) -> (Self, EnrichmentStreams) {
        let parallelism = parallelism.max(1);
        let (input_tx, input_rx) = async_channel::bounded(parallelism);
        let (results_tx, results_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (user_ids_tx, user_ids_rx) = mpsc::unbounded_channel();
        let outputs = EnrichmentOutputs {
            results: results_tx,
            errors: errors_tx,
            user_ids: user_ids_tx,
        };

        let mut workers = JoinSet::new();
        for worker_id in 0..parallelism {
            workers.spawn(run_worker(
                worker_id,
                Arc::clone(&api),
                input_rx.clone(),
                outputs.clone(),
            ));
        }

        let pool = Self {
            input: input_tx,
            workers,
        };
        let streams = EnrichmentStreams {
            results: results_rx,
            errors: errors_rx,
            user_ids: user_ids_rx,
        };
        (pool, streams)
    }

    /// Queues a post, waiting while all workers are busy and the queue is full.
    ///
    /// # Errors
    ///
    /// `Error::Worker` if every worker has died.
    pub async fn submit(&self, index: usize, post: Post) -> Result<()> {
        self.input
            .send((index, post))
            .await
            .map_err(|_| Error::Worker("enrichment queue closed: no worker left".to_string()))
    }

    /// Closes the queue and waits until every worker has drained it and exited.
    ///
    /// # Errors
    ///
    /// `Error::Worker` if a worker panicked.
    pub async fn finish(mut self) -> Result<()> {
        self.input.close();
        while let Some(joined) = self.workers.join_next().await {
            joined.map_err(|e| Error::Worker(format!("enrichment worker failed: {}", e)))?;
        }
        Ok(())
    }
}

/// Loads the comments and votes a post declares. Requests are skipped for
/// zero counts. On failure the post is left untouched.
///
/// # Errors
///
/// The first failing child collection.
pub async fn enrich_post(api: &dyn SourceApi, post: &mut Post) -> Result<()> {
    let comments = if post.comment_count > 0 {
        fetch_all(api, "comments", post_comments_url(api.base_url(), post.id))
            .await
            .map_err(|e| e.with_context(format!("comments of postID={}", post.id)))?
    } else {
        Vec::new()
    };
    let votes = if post.vote_count > 0 {
        fetch_all(api, "votes", post_votes_url(api.base_url(), post.id))
            .await
            .map_err(|e| e.with_context(format!("votes of postID={}", post.id)))?
    } else {
        Vec::new()
    };
    post.comments = comments;
    post.votes = votes;
    Ok(())
}

async fn run_worker(
    worker_id: usize,
    api: Arc<dyn SourceApi>,
    input: async_channel::Receiver<ListedPost>,
    outputs: EnrichmentOutputs,
) {
    debug!(worker_id = worker_id, "Enrichment worker starting");

    while let Ok((index, mut post)) = input.recv().await {
        match enrich_post(api.as_ref(), &mut post).await {
            Ok(()) => {
                for user_id in post.referenced_user_ids() {
                    // Receivers only go away once the collector has given up.
                    let _ = outputs.user_ids.send(user_id);
                }
                let _ = outputs.results.send((index, post));
            }
            Err(e) => {
                let _ = outputs.errors.send(Error::enrichment(post.id, e));
            }
        }
    }

    debug!(worker_id = worker_id, "Enrichment worker exited");
}

#[cfg(test)]
#[path = "enrich_tests.rs"]
mod tests;
