use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, Targets};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

mod commands;

use commands::ScrapeArgs;
use tubethread::error::{self, Error};

#[derive(Parser)]
#[command(
    name = "tubethread",
    version,
    about = "Scrape comment threads and replies from a video watch page",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read every comment thread of a watch page and write JSON Lines
    Scrape(ScrapeArgs),

    /// Load and validate a config file, then print the resolved settings
    CheckConfig {
        /// Path to a TOML config file
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::from(error::exit_code(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Scrape(args) => {
            let mut config = args
                .resolve_config()
                .map_err(|e| Error::config(format!("{e:#}")))?;
            if let Some(format) = cli.log_format {
                config.logging.format = format;
            }
            config
                .validate()
                .map_err(|e| Error::config(format!("{e:#}")))?;

            let diagnostics = config
                .logging
                .diagnostics_enabled
                .then_some(config.logging.diagnostics_destination.as_path());
            setup_tracing(&config.logging.format, &config.logging.level, cli.verbose, diagnostics)?;

            tracing::info!(
                url = %config.scrape.target_url,
                thread_limit = ?config.scrape.thread_limit,
                filter = ?config.scrape.filter_pattern,
                output = ?args.output,
                "Starting scrape command"
            );
            commands::scrape(config, args.output, args.include_skips).await?;
        }

        Commands::CheckConfig { file } => {
            setup_tracing(
                cli.log_format.as_deref().unwrap_or("text"),
                "info",
                cli.verbose,
                None,
            )?;
            commands::check_config(&file)?;
        }
    }

    Ok(())
}

/// Install the global subscriber
///
/// Console output goes to stderr so stdout stays free for records. When a
/// diagnostics file is given, traversal steps are also written there at
/// `debug` regardless of the console level.
fn setup_tracing(format: &str, level: &str, verbose: bool, diagnostics: Option<&Path>) -> Result<()> {
    let env_filter = if verbose {
        EnvFilter::new("tubethread=debug,info")
    } else {
        EnvFilter::try_new(format!("tubethread={level},warn"))
            .with_context(|| format!("Invalid log level: {level}"))?
    };

    let diagnostics_layer = match diagnostics {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
            let file = File::create(path)
                .with_context(|| format!("Failed to create diagnostics file: {}", path.display()))?;

            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(Targets::new().with_target("tubethread::traversal", Level::DEBUG)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry().with(diagnostics_layer);

    match format {
        "json" => {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(io::stderr)
                        .with_filter(env_filter),
                )
                .init();
        }
        _ => {
            registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_writer(io::stderr)
                        .with_filter(env_filter),
                )
                .init();
        }
    }

    Ok(())
}
