//! Error types for zendesk-canny-migrate.

use thiserror::Error;

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while collecting from Zendesk or writing to Canny.
#[derive(Error, Debug)]
pub enum Error {
    /// Network failure or non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded, or the pagination envelope is inconsistent.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Record has no author and no default user is configured.
    #[error("{0} doesn't have a user and default user is not specified")]
    MissingAuthor(&'static str),

    /// Destination rejected a record.
    #[error("Creation failed: {0}")]
    Creation(String),

    /// Fetching the comments or votes of a single post failed.
    #[error("Failed to load details of post {post_id}: {source}")]
    Enrichment {
        /// Source id of the abandoned post.
        post_id: i64,
        /// Underlying fetch failure.
        #[source]
        source: Box<Error>,
    },

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The ledger could not be written after destination records were created.
    #[error("Cannot save state file: {0}. State is printed above, add it to the state file manually before repeating the operation")]
    LedgerSave(String),

    /// A spawned task panicked or was cancelled.
    #[error("Worker task failed: {0}")]
    Worker(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Wraps a child-collection fetch failure with the post it belongs to.
    #[must_use]
    pub fn enrichment(post_id: i64, source: Error) -> Self {
        Self::Enrichment {
            post_id,
            source: Box::new(source),
        }
    }

    /// Prefixes transport and decoding messages with where the failure happened.
    #[must_use]
    pub fn with_context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Transport(msg) => Self::Transport(format!("{}: {}", context, msg)),
            Self::MalformedResponse(msg) => {
                Self::MalformedResponse(format!("{}: {}", context, msg))
            }
            other => other,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}
