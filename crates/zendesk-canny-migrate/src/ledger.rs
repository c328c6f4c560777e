//! Persistent ledger of migrated records.
//!
//! The ledger maps `topic -> { "<kind>_<zendesk id>": "<canny id>" }` and is
//! the only thing that makes reruns idempotent: a key that is present means
//! the Canny record exists and is never created again. It is not rebuilt
//! from Canny.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::error::Result;

/// Stored for votes, which Canny acknowledges without an id.
pub const VOTE_MARKER: &str = "s";

/// Kind of a migrated record, the prefix of its ledger key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// Community post.
    Post,
    /// Post comment.
    Comment,
    /// Post vote.
    Vote,
}

impl RecordKind {
    /// Key prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "post",
            Self::Comment => "comment",
            Self::Vote => "vote",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic-scoped map of Zendesk records to Canny ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationLedger {
    topics: BTreeMap<String, BTreeMap<String, String>>,
}

impl MigrationLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the ledger from `path`. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Rewrites the whole ledger at `path`.
    ///
    /// The content goes to a sibling temporary file first and is renamed
    /// over `path`, so an interrupted save leaves the previous ledger intact.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = self.to_pretty_json()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, data)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Pretty JSON rendering, also used to print the ledger when it cannot be saved.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Ledger key of a record.
    #[must_use]
    pub fn key(kind: RecordKind, id: i64) -> String {
        format!("{}_{}", kind, id)
    }

    /// Canny id of an already migrated record.
    #[must_use]
    pub fn get(&self, topic: &str, kind: RecordKind, id: i64) -> Option<&str> {
        self.topics
            .get(topic)?
            .get(&Self::key(kind, id))
            .map(String::as_str)
    }

    /// Records a migrated record.
    pub fn record(&mut self, topic: &str, kind: RecordKind, id: i64, canny_id: impl Into<String>) {
        self.topics
            .entry(topic.to_string())
            .or_default()
            .insert(Self::key(kind, id), canny_id.into());
    }

    /// Entries of one topic.
    #[must_use]
    pub fn topic(&self, topic: &str) -> Option<&BTreeMap<String, String>> {
        self.topics.get(topic)
    }

    /// Total number of entries over all topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.values().map(BTreeMap::len).sum()
    }

    /// Returns `true` if nothing has been migrated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
