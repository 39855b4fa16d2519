use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tvdb_indexer::config::{self, Config};
use tvdb_indexer::error::Result;
use tvdb_indexer::notify::{NotificationSink, Notifier};
use tvdb_indexer::Indexer;

#[derive(Parser)]
#[command(name = "tvdb-indexer")]
#[command(author, version, about = "Fetch show metadata from TheTVDB")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search shows by name
    Search {
        name: String,

        /// Search language (defaults to the configured one)
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Index a complete show
    Show {
        id: u64,

        /// Show language, used when no language is configured
        #[arg(short, long)]
        language: Option<String>,
    },

    /// List shows updated since an epoch timestamp
    Updates {
        #[arg(long)]
        since: i64,

        #[arg(long, default_value = "1")]
        weeks: u32,
    },

    /// List updated seasons of the given shows
    Seasons {
        #[arg(long)]
        since: i64,

        #[arg(required = true)]
        ids: Vec<u64>,
    },
}

fn setup_logging() -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "tvdb-indexer.log");

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tvdb_indexer=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = setup_logging() {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    info!("Loaded config");

    let notifier: Arc<dyn NotificationSink> =
        Arc::new(Notifier::from_config(&config.notifications));
    let indexer = Indexer::from_config(&config, notifier)?;

    match cli.command {
        Commands::Search { name, language } => {
            let language = language.unwrap_or_else(|| indexer.language().to_string());
            print_json(&indexer.search(&name, &language).await?)
        }
        Commands::Show { id, language } => {
            print_json(&indexer.get_show(id, language.as_deref()).await?)
        }
        Commands::Updates { since, weeks } => {
            print_json(&indexer.get_last_updated_series(since, weeks, None).await?)
        }
        Commands::Seasons { since, ids } => {
            print_json(&indexer.get_last_updated_seasons(&ids, since).await?)
        }
    }
}
