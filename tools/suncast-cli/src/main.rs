//! Suncast CLI: turn the last hour of SDO 193 Å frames into an animated GIF.
//!
//! Usage:
//!   suncast run <WORK_DIR> [OPTIONS]   Build the hourly animation and post it
//!   suncast authorize --keyfile FILE   Obtain access keys for posting
//!   suncast check                      Check that the external tools are installed

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(
    name = "suncast",
    about = "Hourly animations of the Sun from the SDO archive",
    version,
    author
)]
struct Cli {
    /// Read settings from this JSON file instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Build the animation for the current hour and publish it
    Run {
        /// Working directory containing `originals/` and `gifs/`
        work_dir: PathBuf,

        /// JSON keyfile with the account's keys
        #[arg(long)]
        keyfile: Option<PathBuf>,

        /// Publish the animation (default)
        #[arg(long, overrides_with = "no_tweet")]
        tweet: bool,

        /// Build the animation without publishing it
        #[arg(long, overrides_with = "tweet")]
        no_tweet: bool,

        /// Status text posted with the animation
        #[arg(long, default_value = "")]
        status: String,

        /// Append logs to this file; the console then only shows warnings
        #[arg(long)]
        logfile: Option<PathBuf>,

        /// Log level
        #[arg(long, value_enum)]
        loglevel: Option<LogLevel>,
    },

    /// Run the one-time PIN flow and print the access keys
    Authorize {
        /// JSON keyfile with the consumer keys
        #[arg(long)]
        keyfile: PathBuf,
    },

    /// Check that the encoder and optimizer are installed
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => suncast_common::config::AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => suncast_common::config::AppConfig::load(),
    };

    match cli.command {
        Commands::Run {
            work_dir,
            keyfile,
            tweet: _,
            no_tweet,
            status,
            logfile,
            loglevel,
        } => {
            if let Some(level) = loglevel {
                config.logging.level = level.as_str().to_string();
            }
            if logfile.is_some() {
                config.logging.file = logfile;
            }
            suncast_common::logging::init_logging(&config.logging)?;
            commands::run::run(config, work_dir, keyfile, !no_tweet, status).await
        }
        Commands::Authorize { keyfile } => {
            suncast_common::logging::init_logging(&config.logging)?;
            commands::authorize::run(&config, keyfile).await
        }
        Commands::Check => commands::check::run(&config),
    }
}
