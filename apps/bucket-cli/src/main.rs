//! Bucket CLI
//!
//! Command-line front end for a persistent bucket list.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bucket_core::{BucketConfig, BucketStore};

use commands::CliError;

#[derive(Debug, Parser)]
#[command(name = "bucket", version, about = "Keep track of the things you want to do")]
struct Cli {
    /// Config file (defaults to <config dir>/bucket-list/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a new item to the end of the list
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Show items (all by default)
    List {
        /// Only items still to do
        #[arg(long, conflicts_with = "completed")]
        active: bool,
        /// Only completed items
        #[arg(long)]
        completed: bool,
    },
    /// Mark an item done, or not done again
    Toggle {
        /// Item id or a unique prefix of it
        id: String,
    },
    /// Remove an item
    Delete {
        /// Item id or a unique prefix of it
        id: String,
    },
    /// Change an item's title or description
    Edit {
        /// Item id or a unique prefix of it
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = match cli.config.or_else(BucketConfig::default_path) {
        Some(path) => {
            tracing::debug!("Loading config from {}", path.display());
            BucketConfig::load(&path)?
        }
        None => BucketConfig::default(),
    };

    let (store, hydration) = BucketStore::initialize(config.adapter()?, config.seed()).await;
    if let Some(warning) = &hydration.warning {
        eprintln!("warning: {}", warning);
    }

    let result = commands::execute(&store, cli.command, &mut std::io::stdout()).await;
    let closed = store.close().await;
    result?;
    closed?;
    Ok(())
}
