//! discogs-mirror CLI
//!
//! One worker process serves one shard: it consumes that shard's queue and
//! commits changed releases into the shard's storage partition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use discogs_mirror::{error::Result, models::Config, pipeline};

/// discogs-mirror - incremental Discogs-to-Git mirror
#[derive(Parser, Debug)]
#[command(
    name = "discogs-mirror",
    version,
    about = "Mirrors Discogs release data into per-shard Git repositories"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one shard queue and commit changed releases
    Crawl {
        /// Shard number (selects the queue and the storage partition)
        #[arg(short, long)]
        shard: u32,

        /// Discogs username (overrides the config file)
        #[arg(long)]
        user: Option<String>,

        /// Discogs API token (overrides the config file)
        #[arg(long)]
        token: Option<String>,

        /// Storage root holding the per-shard partitions (overrides the config file)
        #[arg(long)]
        store_root: Option<PathBuf>,
    },

    /// Hash releases out of a gzipped XML data dump
    Split {
        /// Discogs data dump file
        #[arg(short, long)]
        datadump: PathBuf,

        /// Result file to write (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Queue new/changed releases from split results onto their shard queues
    Seed {
        /// New results file
        #[arg(short, long)]
        new_result_file: PathBuf,

        /// Old results file from the previous run
        #[arg(short, long)]
        old_result_file: Option<PathBuf>,
    },

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);

    match cli.command {
        Command::Crawl {
            shard,
            user,
            token,
            store_root,
        } => {
            // CLI flags take precedence over file-supplied values.
            if let Some(user) = user {
                config.api.user = user;
            }
            if let Some(token) = token {
                config.api.token = token;
            }
            if let Some(root) = store_root {
                config.store.root = root.display().to_string();
            }

            config.validate()?;
            config.validate_for_crawl()?;

            let stats = pipeline::run_crawl(&config, shard)?;
            stats.log_summary();
        }

        Command::Split { datadump, output } => {
            let count = pipeline::run_split(&datadump, output.as_deref())?;
            log::info!("hashed {count} releases from {}", datadump.display());
        }

        Command::Seed {
            new_result_file,
            old_result_file,
        } => {
            config.validate()?;
            let queued =
                pipeline::run_seeder(&config, &new_result_file, old_result_file.as_deref())?;
            log::info!("queued {queued} new/changed releases");
        }

        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate()?;
            log::info!("Config OK");
        }
    }

    Ok(())
}
