//! Migration pipeline orchestration.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{error, info};

use crate::collect::Collector;
use crate::config::MigrationConfig;
use crate::destination::{CannyClient, DestinationApi, DryRunDestination};
use crate::error::{Error, Result};
use crate::ledger::MigrationLedger;
use crate::migrate::{AuthorResolver, Migrator, TopicReport};
use crate::source::{SourceApi, ZendeskClient};

/// Migration statistics over all topics of a run.
#[derive(Debug, Default, Clone)]
pub struct MigrationStats {
    /// Topics processed.
    pub topics: u64,
    /// Topics that could not be loaded or stopped on a failing post.
    pub topics_failed: u64,
    /// Posts listed in Zendesk.
    pub posts_listed: u64,
    /// Posts whose comments or votes could not be loaded.
    pub enrichment_errors: u64,
    /// Posts fully migrated (created now or earlier).
    pub posts_migrated: u64,
    /// Posts that failed to migrate.
    pub posts_failed: u64,
    /// Loaded posts left untouched after a failure in their topic.
    pub posts_skipped: u64,
    /// Posts created in Canny.
    pub posts_created: u64,
    /// Comments created in Canny.
    pub comments_created: u64,
    /// Votes created in Canny.
    pub votes_created: u64,
    /// Records already present in the state file.
    pub already_migrated: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
}

impl MigrationStats {
    /// Records created in Canny during this run.
    #[must_use]
    pub fn created(&self) -> u64 {
        self.posts_created + self.comments_created + self.votes_created
    }

    /// Created records per second.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.created() as f64 / self.duration_secs
        } else {
            0.0
        }
    }

    fn absorb(&mut self, report: &TopicReport, failed: u64, skipped: u64) {
        self.posts_migrated += report.posts_migrated;
        self.posts_failed += failed;
        self.posts_skipped += skipped;
        self.posts_created += report.posts_created;
        self.comments_created += report.comments_created;
        self.votes_created += report.votes_created;
        self.already_migrated += report.already_migrated;
    }
}

/// Migration pipeline.
pub struct Pipeline {
    config: MigrationConfig,
    source: Arc<dyn SourceApi>,
    destination: Arc<dyn DestinationApi>,
}

impl Pipeline {
    /// Create a pipeline talking to the configured Zendesk and Canny.
    ///
    /// In dry run mode nothing is sent to Canny.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        config.validate()?;
        let source: Arc<dyn SourceApi> = Arc::new(ZendeskClient::new(config.source.clone()));
        let destination: Arc<dyn DestinationApi> = if config.options.dry_run {
            Arc::new(DryRunDestination::new())
        } else {
            Arc::new(CannyClient::new(config.destination.clone()))
        };
        Ok(Self::with_clients(config, source, destination))
    }

    /// Create a pipeline over the given clients.
    pub fn with_clients(
        config: MigrationConfig,
        source: Arc<dyn SourceApi>,
        destination: Arc<dyn DestinationApi>,
    ) -> Self {
        Self {
            config,
            source,
            destination,
        }
    }

    /// Run the migration pipeline.
    ///
    /// A topic whose posts cannot be loaded, or that stops on a failing
    /// post, is logged and counted; the run goes on with the next topic.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be loaded or, after all
    /// topics, saved. In the latter case the state is printed to the log.
    pub async fn run(&self) -> Result<MigrationStats> {
        let start = std::time::Instant::now();
        let mut stats = MigrationStats::default();
        let options = &self.config.options;

        info!("Starting migration pipeline");
        let ledger = MigrationLedger::load(&options.state_file)?;
        info!(
            "Loaded {} migrated records from {}",
            ledger.len(),
            options.state_file.display()
        );
        if options.dry_run {
            info!("Dry run mode - not writing to Canny");
        }

        let authors = AuthorResolver::new(options.default_user.clone(), options.agents.clone());
        let mut migrator = Migrator::new(Arc::clone(&self.destination), authors, ledger);
        if options.checkpoint_each_record && !options.dry_run {
            migrator = migrator.with_checkpoint(options.state_file.clone());
        }
        let mut collector = Collector::new(Arc::clone(&self.source), options.parallelism);

        for (topic, board) in &self.config.topics {
            stats.topics += 1;
            info!("Loading posts for topic {}", topic);
            let collection = match collector.collect_topic(topic).await {
                Ok(collection) => collection,
                Err(e) => {
                    error!("FATAL ERROR while loading posts for {}, skipping: {}", topic, e);
                    stats.topics_failed += 1;
                    continue;
                }
            };
            stats.posts_listed += collection.listed as u64;
            stats.enrichment_errors += collection.errors.len() as u64;

            let total = collection.posts.len() as u64;
            let progress = create_progress_bar(total);
            progress.set_message(topic.clone());
            let report = migrator
                .migrate_topic(topic, board, &collection.posts, &progress)
                .await;
            progress.finish_and_clear();

            let failed = u64::from(report.failure.is_some());
            let skipped = total - report.posts_migrated - failed;
            if let Some((post_id, e)) = &report.failure {
                error!(
                    "Error while migrating post {} of topic {}, skipping the rest of the topic: {}",
                    post_id, topic, e
                );
                stats.topics_failed += 1;
            }
            info!(
                "Topic {} -> board {}: migrated {}, failed {}, skipped {}, enrichment errors {}; \
                 created {} posts, {} comments, {} votes ({} already migrated, {} votes without voter)",
                topic,
                board,
                report.posts_migrated,
                failed,
                skipped,
                collection.errors.len(),
                report.posts_created,
                report.comments_created,
                report.votes_created,
                report.already_migrated,
                report.votes_without_voter
            );
            stats.absorb(&report, failed, skipped);
        }

        stats.duration_secs = start.elapsed().as_secs_f64();

        if options.dry_run {
            info!("Dry run mode - state file is left untouched");
        } else if let Err(e) = migrator.ledger().save(&options.state_file) {
            match migrator.ledger().to_pretty_json() {
                Ok(state) => error!("Unsaved state:\n{}", state),
                Err(render) => error!("Unsaved state cannot be rendered: {}", render),
            }
            return Err(Error::LedgerSave(e.to_string()));
        }

        info!(
            "Migration complete: {} posts migrated, {} failed, {} records created in {:.2}s ({:.1} records/sec)",
            stats.posts_migrated,
            stats.posts_failed,
            stats.created(),
            stats.duration_secs,
            stats.throughput()
        );

        Ok(stats)
    }
}

fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] {msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    pb
}
