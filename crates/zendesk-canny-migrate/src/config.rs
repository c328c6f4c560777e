//! Configuration types for zendesk-canny-migrate.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Main migration configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Zendesk Help Center to read from.
    #[serde(default)]
    pub source: SourceConfig,
    /// Canny account to write to.
    #[serde(default)]
    pub destination: DestinationConfig,
    /// Zendesk topic id -> Canny board id. Several topics may share a board.
    #[serde(default)]
    pub topics: BTreeMap<String, String>,
    /// Migration options.
    #[serde(default)]
    pub options: MigrationOptions,
}

/// Zendesk connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Zendesk URL (e.g. https://your_company.zendesk.com).
    #[serde(default)]
    pub url: String,
    /// User name for Basic auth.
    #[serde(default)]
    pub username: String,
    /// Password for Basic auth, may be left to the command line.
    #[serde(default)]
    pub password: String,
}

/// Canny connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DestinationConfig {
    /// Canny API URL.
    #[serde(default = "default_canny_url")]
    pub url: String,
    /// Canny API key, sent with every request. May be left to the command line.
    #[serde(default)]
    pub api_key: String,
}

/// Migration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Number of posts whose comments and votes are loaded concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Canny user id used for posts and comments without a Zendesk author.
    /// When unset such records fail.
    #[serde(default)]
    pub default_user: Option<String>,
    /// Zendesk agent id -> Canny admin id, checked before find-or-create.
    #[serde(default)]
    pub agents: HashMap<i64, String>,
    /// Ledger of already migrated records.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
    /// Rewrite the state file after every created record instead of once per run.
    #[serde(default)]
    pub checkpoint_each_record: bool,
    /// Dry run mode (load from Zendesk, don't write to Canny).
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            url: default_canny_url(),
            api_key: String::new(),
        }
    }
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            parallelism: default_parallelism(),
            default_user: None,
            agents: HashMap::new(),
            state_file: default_state_file(),
            checkpoint_each_record: false,
            dry_run: false,
        }
    }
}

fn default_canny_url() -> String {
    "https://canny.io".to_string()
}

fn default_parallelism() -> usize {
    10
}

fn default_state_file() -> PathBuf {
    PathBuf::from("./state.json")
}

impl MigrationConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        validate_url(&self.source.url)?;
        validate_url(&self.destination.url)?;
        if self.source.username.is_empty() || self.source.password.is_empty() {
            return Err(Error::Config(
                "Zendesk username and password are required".to_string(),
            ));
        }
        if self.destination.api_key.is_empty() {
            return Err(Error::Config("Canny API key is required".to_string()));
        }
        if self.topics.is_empty() {
            return Err(Error::Config(
                "at least one pair of zendesk_topic_id:canny_board_id must be provided"
                    .to_string(),
            ));
        }
        if let Some((topic, _)) = self.topics.iter().find(|(_, board)| board.is_empty()) {
            return Err(Error::Config(format!("topic '{}' has no board", topic)));
        }
        if self.options.parallelism == 0 {
            return Err(Error::Config(
                "parallelism must be greater than 0".to_string(),
            ));
        }
        if self.options.default_user.as_deref() == Some("") {
            return Err(Error::Config("default user cannot be empty".to_string()));
        }
        Ok(())
    }
}

/// Validates that a base URL uses http or https.
pub fn validate_url(url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{}'. Allowed: http, https",
            url
        )));
    }
    if url.len() < 10 {
        return Err(Error::Config(format!("Invalid URL format: {}", url)));
    }
    Ok(())
}

/// Parses a `zendesk_topic_id:canny_board_id` argument.
pub fn parse_topic_pair(arg: &str) -> Result<(String, String)> {
    match arg.split(':').collect::<Vec<_>>().as_slice() {
        [topic, board] if !topic.is_empty() && !board.is_empty() => {
            Ok(((*topic).to_string(), (*board).to_string()))
        }
        _ => Err(Error::Config(format!("invalid arguments format {}", arg))),
    }
}

/// Parses a `zendeskID:cannyID` agent mapping argument.
pub fn parse_agent_pair(arg: &str) -> Result<(i64, String)> {
    let invalid = || Error::Config(format!("invalid agent format {}", arg));
    match arg.split(':').collect::<Vec<_>>().as_slice() {
        [zendesk_id, canny_id] if !canny_id.is_empty() => {
            let zendesk_id = zendesk_id.parse::<i64>().map_err(|_| invalid())?;
            Ok((zendesk_id, (*canny_id).to_string()))
        }
        _ => Err(invalid()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
