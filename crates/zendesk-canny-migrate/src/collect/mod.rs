//! Collection of a topic: posts, their comments and votes, and every
//! referenced user.
//!
//! The collector pages the posts of a topic into the [`EnrichmentPool`] and
//! drains the pool's three output streams with three independent tasks. The
//! user-id task is the only writer of the [`UserCache`] while the pool runs:
//! the collector hands the cache over to it and takes it back when the
//! stream closes. Once every worker has exited the pending users are loaded
//! in batches and attached to the posts.

pub mod enrich;

use std::sync::Arc;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::Post;
use crate::source::{topic_posts_url, Paginator, SourceApi, UserBatchLoader, UserCache};

pub use enrich::{enrich_post, EnrichmentPool, EnrichmentStreams};

/// Posts of one topic, ready for migration.
#[derive(Debug, Default)]
pub struct Collection {
    /// Enriched posts in topic listing order, with users attached.
    pub posts: Vec<Post>,
    /// Posts that could not be enriched. They are retried on the next run.
    pub errors: Vec<Error>,
    /// Number of posts listed for the topic.
    pub listed: usize,
    /// Users resolved by this collection's batch requests.
    pub users_loaded: usize,
}

/// Collects topics, keeping the user cache across topics for the whole run.
pub struct Collector {
    api: Arc<dyn SourceApi>,
    parallelism: usize,
    cache: UserCache,
}

impl Collector {
    /// Creates a collector running `parallelism` enrichment workers.
    pub fn new(api: Arc<dyn SourceApi>, parallelism: usize) -> Self {
        Self {
            api,
            parallelism: parallelism.max(1),
            cache: UserCache::new(),
        }
    }

    /// Users known so far in this run.
    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    /// Collects every post of `topic` with its comments, votes and users.
    ///
    /// Posts whose comments or votes fail to load are left out and reported
    /// in [`Collection::errors`].
    ///
    /// # Errors
    ///
    /// Fails if the post listing or a user batch fails. The pool is drained
    /// and joined before returning in every case.
    pub async fn collect_topic(&mut self, topic: &str) -> Result<Collection> {
        let (pool, streams) = EnrichmentPool::spawn(Arc::clone(&self.api), self.parallelism);
        let EnrichmentStreams {
            mut results,
            mut errors,
            mut user_ids,
        } = streams;

        let results_task = tokio::spawn(async move {
            let mut posts = Vec::new();
            while let Some((index, post)) = results.recv().await {
                debug!(
                    "Loaded post {}: '{}' with {} comments and {} votes",
                    post.id,
                    post.title,
                    post.comments.len(),
                    post.votes.len()
                );
                posts.push((index, post));
            }
            posts
        });

        let errors_task = tokio::spawn(async move {
            let mut failures = Vec::new();
            while let Some(err) = errors.recv().await {
                warn!("Error: {}", err);
                failures.push(err);
            }
            failures
        });

        let mut cache = std::mem::take(&mut self.cache);
        let users_task = tokio::spawn(async move {
            let mut pending = Vec::new();
            while let Some(user_id) = user_ids.recv().await {
                if cache.claim(user_id) {
                    pending.push(user_id);
                }
            }
            (cache, pending)
        });

        let listing = self.list_posts(topic, &pool).await;
        let workers = pool.finish().await;

        let (cache, pending) = users_task.await.map_err(join_error)?;
        self.cache = cache;

        // From here on a failed topic must give back the ids it claimed.
        let joined = async {
            let posts = results_task.await.map_err(join_error)?;
            let failures = errors_task.await.map_err(join_error)?;
            workers?;
            Ok::<_, Error>((posts, failures, listing?))
        }
        .await;
        let (mut posts, failures, listed) = match joined {
            Ok(joined) => joined,
            Err(e) => {
                self.cache.release(&pending);
                return Err(e);
            }
        };

        let loaded = UserBatchLoader::new(self.api.as_ref())
            .load(&pending, &mut self.cache)
            .await;
        let users_loaded = match loaded {
            Ok(count) => count,
            Err(e) => {
                self.cache.release(&pending);
                return Err(e);
            }
        };
        if users_loaded < pending.len() {
            debug!(
                "{} of {} users of topic '{}' were not returned by Zendesk",
                pending.len() - users_loaded,
                pending.len(),
                topic
            );
        }

        posts.sort_by_key(|(index, _)| *index);
        let mut posts: Vec<Post> = posts.into_iter().map(|(_, post)| post).collect();
        attach_users(&mut posts, &self.cache);

        info!(
            "Loaded {} posts with {} errors",
            posts.len(),
            failures.len()
        );

        Ok(Collection {
            posts,
            errors: failures,
            listed,
            users_loaded,
        })
    }

    /// Pages the posts of `topic` into the pool. Returns how many were listed.
    async fn list_posts(&self, topic: &str, pool: &EnrichmentPool) -> Result<usize> {
        let url = topic_posts_url(self.api.base_url(), topic);
        let mut paginator: Paginator<'_, Post> = Paginator::new(self.api.as_ref(), "posts", url);
        let mut listed = 0;
        while let Some(page) = paginator.next_page().await? {
            for post in page {
                pool.submit(listed, post).await?;
                listed += 1;
            }
        }
        debug!(
            "Listed {} posts of topic '{}' in {} pages",
            listed,
            topic,
            paginator.pages_fetched()
        );
        Ok(listed)
    }
}

/// Fills in every author and voter from the cache. Users that were not
/// resolved stay `None`.
pub fn attach_users(posts: &mut [Post], cache: &UserCache) {
    for post in posts {
        post.author = cache.get(post.author_id);
        for comment in &mut post.comments {
            comment.author = cache.get(comment.author_id);
        }
        for vote in &mut post.votes {
            vote.user = cache.get(vote.user_id);
        }
    }
}

fn join_error(err: JoinError) -> Error {
    Error::Worker(format!("collector task failed: {}", err))
}

#[cfg(test)]
#[path = "collect_tests.rs"]
mod tests;
