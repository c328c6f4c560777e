//! Zendesk to Canny migration CLI
//!
//! CLI tool for moving Zendesk Help Center community posts to Canny.
//! Pedantic lints relaxed for CLI ergonomics.

// CLI tool - relax pedantic lints for ergonomics
#![allow(clippy::pedantic)]

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use zendesk_canny_migrate::config::{parse_agent_pair, parse_topic_pair};
use zendesk_canny_migrate::{MigrationConfig, Pipeline};

#[derive(Parser)]
#[command(name = "zendesk-to-canny")]
#[command(version)]
#[command(about = "Migrate Zendesk community posts, comments and votes to Canny", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run migration
    Run(RunArgs),

    /// Validate configuration
    Validate(RunArgs),

    /// Generate example configuration
    Init {
        /// Output file path
        #[arg(short, long, default_value = "migration.yaml")]
        output: PathBuf,
    },
}

/// Configuration file and the flags that override it.
#[derive(Args, Debug)]
struct RunArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Zendesk URL (e.g. https://your_company.zendesk.com)
    #[arg(long = "z-url", value_name = "URL")]
    z_url: Option<String>,

    /// Zendesk user name
    #[arg(long = "z-username", value_name = "USER")]
    z_username: Option<String>,

    /// Zendesk password
    #[arg(long = "z-password", env = "ZENDESK_PASSWORD", hide_env_values = true)]
    z_password: Option<String>,

    /// Canny API key
    #[arg(long = "c-key", env = "CANNY_API_KEY", hide_env_values = true)]
    c_key: Option<String>,

    /// Canny API URL
    #[arg(long = "c-url", value_name = "URL")]
    c_url: Option<String>,

    /// Canny user id for posts and comments without an author
    #[arg(long = "default-user", value_name = "CANNY_ID")]
    default_user: Option<String>,

    /// Number of posts loaded concurrently
    #[arg(long = "parallel", value_name = "N")]
    parallel: Option<usize>,

    /// State file path
    #[arg(long = "state", value_name = "FILE")]
    state: Option<PathBuf>,

    /// Agent mapping, can be repeated
    #[arg(long = "agent", value_name = "ZENDESK_ID:CANNY_ID", value_parser = agent_arg)]
    agents: Vec<(i64, String)>,

    /// Dry run mode (load from Zendesk, don't write to Canny)
    #[arg(long)]
    dry_run: bool,

    /// Save the state file after every created record
    #[arg(long)]
    checkpoint: bool,

    /// Topics to migrate
    #[arg(value_name = "ZENDESK_TOPIC_ID:CANNY_BOARD_ID", value_parser = topic_arg)]
    topics: Vec<(String, String)>,
}

fn topic_arg(arg: &str) -> Result<(String, String), String> {
    parse_topic_pair(arg).map_err(|e| e.to_string())
}

fn agent_arg(arg: &str) -> Result<(i64, String), String> {
    parse_agent_pair(arg).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Some(Commands::Run(args)) => run_migration(&args).await?,
        Some(Commands::Validate(args)) => validate_config(&args)?,
        Some(Commands::Init { output }) => generate_config(&output)?,
        None => run_migration(&cli.run).await?,
    }

    Ok(())
}

/// Loads the configuration file, if any, and applies the flags on top.
fn load_config(args: &RunArgs) -> anyhow::Result<MigrationConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            MigrationConfig::from_file(path)?
        }
        None => MigrationConfig::default(),
    };

    if let Some(url) = &args.z_url {
        config.source.url = url.trim_end_matches('/').to_string();
    }
    if let Some(username) = &args.z_username {
        config.source.username = username.clone();
    }
    if let Some(password) = &args.z_password {
        config.source.password = password.clone();
    }
    if let Some(key) = &args.c_key {
        config.destination.api_key = key.clone();
    }
    if let Some(url) = &args.c_url {
        config.destination.url = url.trim_end_matches('/').to_string();
    }
    if let Some(user) = &args.default_user {
        config.options.default_user = Some(user.clone());
    }
    if let Some(parallel) = args.parallel {
        config.options.parallelism = parallel;
    }
    if let Some(state) = &args.state {
        config.options.state_file = state.clone();
    }
    config.options.agents.extend(args.agents.iter().cloned());
    config.topics.extend(args.topics.iter().cloned());
    if args.dry_run {
        config.options.dry_run = true;
    }
    if args.checkpoint {
        config.options.checkpoint_each_record = true;
    }

    config.validate()?;
    Ok(config)
}

async fn run_migration(args: &RunArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;

    info!(
        "Starting migration of {} topics from {}...",
        config.topics.len(),
        config.source.url
    );

    let pipeline = Pipeline::new(config)?;
    let stats = pipeline.run().await?;

    println!("\n✅ Migration Complete!");
    println!("   Topics:      {} ({} with errors)", stats.topics, stats.topics_failed);
    println!(
        "   Posts:       {} migrated, {} failed, {} skipped",
        stats.posts_migrated, stats.posts_failed, stats.posts_skipped
    );
    println!("   Load errors: {}", stats.enrichment_errors);
    println!(
        "   Created:     {} posts, {} comments, {} votes",
        stats.posts_created, stats.comments_created, stats.votes_created
    );
    println!("   Already migrated: {}", stats.already_migrated);
    println!("   Duration:    {:.2}s", stats.duration_secs);

    Ok(())
}

fn validate_config(args: &RunArgs) -> anyhow::Result<()> {
    let config = load_config(args)?;

    println!("✅ Configuration is valid!");
    println!("   Zendesk: {}", config.source.url);
    println!("   Canny:   {}", config.destination.url);
    for (topic, board) in &config.topics {
        println!("   Topic {} -> board {}", topic, board);
    }
    println!("   State:   {}", config.options.state_file.display());

    Ok(())
}

fn generate_config(output: &Path) -> anyhow::Result<()> {
    std::fs::write(output, CONFIG_TEMPLATE)?;
    println!("✅ Generated configuration: {:?}", output);
    println!(
        "   Edit the file and run: zendesk-to-canny run --config {:?}",
        output
    );

    Ok(())
}

const CONFIG_TEMPLATE: &str = r#"# Zendesk to Canny migration configuration

source:
  url: https://your_company.zendesk.com
  username: admin@your_company.com
  password: change-me # or --z-password / ZENDESK_PASSWORD

destination:
  url: https://canny.io
  api_key: change-me # or --c-key / CANNY_API_KEY

# zendesk_topic_id: canny_board_id
topics:
  "115000000001": "5c8e0b2a1f0c4a3b2d1e0f00"

options:
  parallelism: 10
  # Canny user for posts and comments whose Zendesk author is unknown
  # default_user: 5c8e0b2a1f0c4a3b2d1e0f01
  # Zendesk agent id -> Canny admin id
  # agents:
  #   360000000001: 5c8e0b2a1f0c4a3b2d1e0f02
  state_file: ./state.json
  checkpoint_each_record: false
  dry_run: false
"#;
