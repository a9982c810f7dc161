//! feedcache - local feed cache
//!
//! Main entry point for the feedcache CLI.

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use feed::FeedItem;
use feedcache::cache::{DeletionReason, FeedCachePolicy, ValidationOutcome};
use feedcache::config::FeedCacheConfig;
use std::path::{Path, PathBuf};
use std::process;

/// feedcache - Serve a feed from a local cache with a maximum age
#[derive(Parser, Debug)]
#[command(name = "feedcache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/feedcache/config.yaml)
    #[arg(short, long, env = "FEEDCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default configuration file
    Init,

    /// Print the cached feed as JSON if it is still fresh
    Load,

    /// Cache the feed read from a JSON file
    Save {
        /// JSON array of feed items
        file: PathBuf,
    },

    /// Delete the cached feed if it expired or cannot be read
    Validate,

    /// Delete the cached feed
    Clear,

    /// Show what is cached and how old it is
    Status,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = feedcache::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_file = cli.config.unwrap_or_else(FeedCacheConfig::default_path);

    if let Commands::Init = cli.command {
        return handle_init_command(&config_file);
    }

    let config = FeedCacheConfig::load_or_default(&config_file)?;
    tracing::info!(
        backend = %config.store.backend,
        store = %config.store.path.display(),
        "Configuration loaded"
    );

    match cli.command {
        Commands::Load => {
            let loader = config.loader()?;
            let feed = loader.load().await?;
            println!("{}", serde_json::to_string_pretty(&feed)?);
        }

        Commands::Save { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let feed: Vec<FeedItem> = serde_json::from_str(&content)
                .with_context(|| format!("{} is not a JSON array of feed items", file.display()))?;

            let loader = config.loader()?;
            loader.save(&feed).await?;
            println!("Cached {} items", feed.len());
        }

        Commands::Validate => {
            let loader = config.loader()?;
            match loader.validate_cache().await? {
                ValidationOutcome::Validated => println!("Cache is valid"),
                ValidationOutcome::Deleted(DeletionReason::Expired { timestamp }) => {
                    println!("Deleted cache from {} (expired)", timestamp.to_rfc3339())
                }
                ValidationOutcome::Deleted(DeletionReason::Unreadable(e)) => {
                    println!("Deleted unreadable cache: {}", e)
                }
            }
        }

        Commands::Clear => {
            let store = config.open_store()?;
            store.delete_cached_feed().await?;
            println!("Cache cleared successfully");
        }

        Commands::Status => {
            let policy = config.policy()?;
            let store = config.open_store()?;
            println!("Backend:  {}", config.store.backend);
            println!("Location: {}", config.store.path.display());
            println!("Max age:  {} days", config.cache.max_age_days);

            match store.retrieve().await? {
                None => println!("Cached:   nothing"),
                Some(cached) => {
                    let now = Utc::now();
                    let age = FeedCachePolicy::age(cached.timestamp, now);
                    println!("Cached:   {} items", cached.len());
                    println!("Saved at: {}", cached.timestamp.to_rfc3339());
                    println!("Age:      {}", format_age(age));
                    println!(
                        "Expired:  {}",
                        if policy.validate(cached.timestamp, now).is_expired() {
                            "yes"
                        } else {
                            "no"
                        }
                    );
                }
            }
        }

        Commands::Init => {
            // Handled before the configuration is loaded
            unreachable!("Init is handled before loading configuration")
        }
    }

    Ok(())
}

/// Hours and minutes, marking timestamps ahead of the clock
fn format_age(age: Duration) -> String {
    let minutes = age.num_minutes().unsigned_abs();
    let formatted = format!("{}h {}m", minutes / 60, minutes % 60);
    if age < Duration::zero() {
        format!("{} (in the future)", formatted)
    } else {
        formatted
    }
}

fn handle_init_command(config_file: &Path) -> anyhow::Result<()> {
    if config_file.exists() {
        println!("Configuration already exists at {}", config_file.display());
        return Ok(());
    }

    let config = FeedCacheConfig::new();
    config.save(config_file)?;

    println!("✓ Created configuration at {}", config_file.display());
    println!();
    println!("Cache location: {}", config.store.path.display());
    println!("Next steps:");
    println!("  feedcache save feed.json");
    println!("  feedcache load");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(Duration::minutes(125)), "2h 5m");
        assert_eq!(format_age(Duration::zero()), "0h 0m");
    }

    #[test]
    fn test_format_age_in_the_future() {
        assert_eq!(format_age(Duration::minutes(-5)), "0h 5m (in the future)");
        assert_eq!(format_age(Duration::minutes(-65)), "1h 5m (in the future)");
    }
}
