use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use tubethread::config::Config;
use tubethread::driver::{ChromeDriver, PageDriver};
use tubethread::error::Error;
use tubethread::storage::JsonLinesWriter;
use tubethread::traversal::{CommentIterator, Termination, TimeLimit, TraversalSettings};

#[derive(Args, Debug)]
pub struct ScrapeArgs {
    /// Watch page URL
    pub url: String,

    /// Maximum number of comment threads (defaults to the advertised count)
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Case-insensitive regex; threads with no matching comment are skipped
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Time limit hours
    #[arg(long)]
    pub hours: Option<u64>,

    /// Time limit minutes
    #[arg(long)]
    pub minutes: Option<u64>,

    /// Time limit seconds
    #[arg(long)]
    pub seconds: Option<u64>,

    /// Output file (JSON Lines); stdout when absent
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write `null` lines for threads the filter skipped
    #[arg(long, default_value = "false")]
    pub include_skips: bool,

    /// TOML config file; environment variables are used when absent
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, default_value = "false")]
    pub headed: bool,

    /// Chrome/Chromium executable
    #[arg(long)]
    pub chrome_path: Option<PathBuf>,

    /// Write step-by-step traversal diagnostics
    #[arg(long, default_value = "false")]
    pub diagnostics: bool,

    /// Diagnostics file (implies --diagnostics)
    #[arg(long)]
    pub diagnostics_file: Option<PathBuf>,
}

impl ScrapeArgs {
    /// Base config from file or environment, overlaid with the flags given
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env()?,
        };

        config.scrape.target_url = self.url.clone();

        if let Some(limit) = self.limit {
            config.scrape.thread_limit = Some(limit);
        }
        if let Some(filter) = &self.filter {
            config.scrape.filter_pattern = Some(filter.clone());
        }
        if self.hours.is_some() || self.minutes.is_some() || self.seconds.is_some() {
            config.scrape.time_limit = TimeLimit::new(
                self.hours.unwrap_or(0),
                self.minutes.unwrap_or(0),
                self.seconds.unwrap_or(0),
            );
        }

        if self.headed {
            config.browser.headless = false;
        }
        if let Some(path) = &self.chrome_path {
            config.browser.chrome_path = Some(path.clone());
        }

        if self.diagnostics {
            config.logging.diagnostics_enabled = true;
        }
        if let Some(path) = &self.diagnostics_file {
            config.logging.diagnostics_enabled = true;
            config.logging.diagnostics_destination = path.clone();
        }

        Ok(config)
    }
}

pub async fn scrape(config: Config, output: Option<PathBuf>, include_skips: bool) -> Result<()> {
    let settings = TraversalSettings::from_config(&config.scrape, &config.waits)?;

    let driver = ChromeDriver::launch(&config.browser, &config.waits)
        .await
        .map_err(Error::from)
        .context("Failed to launch browser")?;

    let mut comments = CommentIterator::new(driver, settings);

    match &output {
        Some(path) => {
            let mut writer = JsonLinesWriter::create(path, include_skips)?;
            drain(&mut comments, &mut writer).await?;
        }
        None => {
            let mut writer = JsonLinesWriter::stdout(include_skips);
            drain(&mut comments, &mut writer).await?;
        }
    }

    let stats = comments.stats();
    eprintln!();
    eprintln!("Scrape Summary");
    eprintln!("==============");
    if let Some(total) = stats.advertised_total {
        eprintln!("  Advertised comments: {total}");
    }
    eprintln!("  Threads read:        {}", stats.threads_completed);
    eprintln!("  Replies read:        {}", stats.replies_read());
    eprintln!("  Threads emitted:     {}", stats.emitted);
    eprintln!("  Threads skipped:     {}", stats.skipped);
    if let Some(termination) = comments.termination() {
        eprintln!("  Ended:               {termination}");
    }
    if let Some(path) = &output {
        eprintln!("  Output:              {}", path.display());
    }

    if comments.termination() == Some(Termination::Failed) {
        if let Some(failure) = comments.diagnostic() {
            anyhow::bail!("traversal ended early: {failure}");
        }
    }

    Ok(())
}

/// Write outcomes until the sequence ends or the user interrupts
async fn drain<D: PageDriver, W: Write>(
    comments: &mut CommentIterator<D>,
    writer: &mut JsonLinesWriter<W>,
) -> Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            outcome = comments.next() => {
                let Some(outcome) = outcome else {
                    break;
                };
                if let Err(e) = writer.write_outcome(&outcome) {
                    comments.close().await;
                    return Err(e);
                }
            }
            _ = &mut ctrl_c => {
                tracing::warn!("interrupted, closing browser");
                comments.close().await;
                break;
            }
        }
    }

    Ok(())
}
