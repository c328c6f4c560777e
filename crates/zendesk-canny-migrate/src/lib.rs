// Migration tool - pedantic lints relaxed for CLI ergonomics
#![allow(clippy::pedantic)]

//! # Zendesk to Canny Migration Tool
//!
//! `zendesk-canny-migrate` is a CLI tool and library for moving Zendesk Help
//! Center community posts, with their comments and votes, to Canny boards.
//!
//! ## How it works
//!
//! | Stage | Module | Notes |
//! |-------|--------|-------|
//! | Collect | [`collect`] | Pages posts of a topic, enriches them with a worker pool |
//! | Users | [`source::users`] | Deduplicated, batched `show_many` lookups |
//! | Migrate | [`migrate`] | Creates posts, comments and votes at most once |
//! | State | [`ledger`] | JSON state file that makes reruns resume |
//!
//! ## Quick Start
//!
//! ```bash
//! # Topic 115-faq to Canny board 5c8e...
//! zendesk-to-canny run --z-url https://acme.zendesk.com --z-username admin@acme.com \
//!     --z-password secret --c-key canny-key 115-faq:5c8e
//!
//! # Dry run (load from Zendesk only)
//! zendesk-to-canny run --config migration.yaml --dry-run
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! source:
//!   url: https://acme.zendesk.com
//!   username: admin@acme.com
//!   password: secret
//!
//! destination:
//!   api_key: canny-key
//!
//! topics:
//!   115-faq: 5c8e0b2a1f
//!
//! options:
//!   parallelism: 10
//!   default_user: 5c8e0b2a20
//!   state_file: ./state.json
//! ```

#![warn(missing_docs)]

pub mod collect;
pub mod config;
pub mod destination;
pub mod error;
pub mod http;
pub mod ledger;
pub mod migrate;
pub mod model;
pub mod pipeline;
pub mod sanitize;
pub mod source;

#[cfg(test)]
mod test_utils;

pub use collect::{Collection, Collector};
pub use config::{DestinationConfig, MigrationConfig, MigrationOptions, SourceConfig};
pub use destination::{CannyClient, DestinationApi, DryRunDestination};
pub use error::{Error, Result};
pub use ledger::{MigrationLedger, RecordKind};
pub use migrate::{AuthorResolver, Migrator, TopicReport};
pub use pipeline::{MigrationStats, Pipeline};
pub use source::{SourceApi, ZendeskClient};
