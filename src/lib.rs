//! tubethread - comment thread scraper for video watch pages
//!
//! Drives a real browser through a watch page's comment section and turns it
//! into structured records: one per top-level thread, with every reply
//! attached, optionally filtered by a regular expression.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`driver`] - Page driver abstraction and the Chrome implementation
//! - [`traversal`] - Thread/reply state machine, limits and filtering
//! - [`models`] - Comment records and run statistics
//! - [`storage`] - JSON Lines output
//! - [`utils`] - URL validation, count parsing and retry helpers
//!
//! # Example
//!
//! ```no_run
//! use tubethread::config::Config;
//! use tubethread::driver::ChromeDriver;
//! use tubethread::traversal::{CommentIterator, TraversalSettings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let driver = ChromeDriver::launch(&config.browser, &config.waits).await?;
//!     let settings = TraversalSettings::from_config(&config.scrape, &config.waits)?;
//!
//!     let mut comments = CommentIterator::new(driver, settings);
//!     while let Some(outcome) = comments.next().await {
//!         if let Some(record) = outcome.record() {
//!             println!("{}: {}", record.commenter, record.content);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod models;
pub mod storage;
pub mod traversal;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::driver::{ChromeDriver, PageDriver};
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{CommentRecord, ReplyRecord, ScrapeStats, ThreadOutcome};
    pub use crate::storage::JsonLinesWriter;
    pub use crate::traversal::{CommentIterator, Termination, TraversalSettings};
}

// Direct re-exports for convenience
pub use models::{CommentRecord, ReplyRecord, ScrapeStats, ThreadOutcome};
