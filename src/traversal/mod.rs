//! Comment section traversal
//!
//! Walks the comment threads of one watch page in document order, expanding
//! each thread's replies (including "load more" batches) before moving on,
//! and yields one [`ThreadOutcome`] per thread.
//!
//! - [`cursor`] tracks the `(thread, reply)` position
//! - [`limit`] decides when to stop early
//! - [`aggregator`] assembles records and applies the content filter
//! - [`machine`] is the state machine behind [`CommentIterator`]
//!
//! # Example
//!
//! ```rust,ignore
//! use tubethread::config::Config;
//! use tubethread::driver::ChromeDriver;
//! use tubethread::traversal::{CommentIterator, TraversalSettings};
//!
//! let config = Config::from_env()?;
//! let driver = ChromeDriver::launch(&config.browser, &config.waits).await?;
//! let settings = TraversalSettings::from_config(&config.scrape, &config.waits)?;
//!
//! let mut comments = CommentIterator::new(driver, settings);
//! while let Some(outcome) = comments.next().await {
//!     println!("{outcome:?}");
//! }
//! ```

pub mod aggregator;
pub mod cursor;
pub mod limit;
pub mod machine;

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::{ScrapeConfig, WaitConfig};
use crate::error::Result;
use crate::utils::retry::RetryConfig;

pub use aggregator::{ContentFilter, ThreadAggregator};
pub use cursor::TraversalCursor;
pub use limit::{LimitState, StopReason, TimeLimit};
pub use machine::CommentIterator;

pub use crate::models::ThreadOutcome;

// ============================================================================
// Phases
// ============================================================================

/// How a traversal ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// No further thread appeared within the thread timeout
    Exhausted,
    /// A limit was reached
    Stopped(StopReason),
    /// An unexpected failure; see [`CommentIterator::diagnostic`]
    Failed,
    /// The caller closed the sequence before it finished
    Closed,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::Stopped(reason) => reason.as_str(),
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the state machine currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalPhase {
    /// Page not loaded yet
    NotStarted,
    /// Reading the top-level comment of the current thread
    ReadingThread,
    /// Opening the reply panel
    ExpandingReplies,
    /// Reading replies of the open thread
    ReadingReply,
    /// Thread read, panel collapsed, outcome about to be emitted
    ThreadDone,
    /// Terminal; the driver has been shut down
    Finished(Termination),
}

impl TraversalPhase {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

// ============================================================================
// Failures
// ============================================================================

/// Step at which a traversal failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Navigation or the page title landmark
    Startup,
    /// Reading a top-level comment
    ThreadRead,
    /// Reading a reply
    ReplyRead,
    /// The advertised comment count was missing or unreadable
    CountParse,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::ThreadRead => "thread_read",
            Self::ReplyRead => "reply_read",
            Self::CountParse => "count_parse",
        }
    }
}

/// Diagnostic left behind when a traversal ends with [`Termination::Failed`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    /// 0-based thread index at the time of failure
    pub thread: usize,

    /// 0-based reply index, when the failure happened inside a reply panel
    pub reply: Option<usize>,

    pub kind: FailureKind,

    pub message: String,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reply {
            Some(reply) => write!(
                f,
                "{} failure at thread {} reply {}: {}",
                self.kind.as_str(),
                self.thread + 1,
                reply + 1,
                self.message
            ),
            None => write!(
                f,
                "{} failure at thread {}: {}",
                self.kind.as_str(),
                self.thread + 1,
                self.message
            ),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Everything the state machine needs besides the driver
#[derive(Debug, Clone)]
pub struct TraversalSettings {
    pub target_url: String,

    /// Explicit thread ceiling; the advertised count is used when absent
    pub thread_limit: Option<usize>,

    pub filter: Option<ContentFilter>,

    pub time_limit: TimeLimit,

    /// Wait for the title and count landmarks
    pub page_load_timeout: Duration,

    /// Wait for the next thread; expiry means the section is exhausted
    pub thread_timeout: Duration,

    /// Wait for a reply after expanding or loading more
    pub reply_timeout: Duration,

    /// Retries for the initial navigation
    pub navigation_retry: RetryConfig,
}

impl TraversalSettings {
    /// Settings with default waits and no limits or filter
    pub fn new(target_url: impl Into<String>) -> Self {
        let waits = WaitConfig::default();
        Self {
            target_url: target_url.into(),
            thread_limit: None,
            filter: None,
            time_limit: TimeLimit::default(),
            page_load_timeout: waits.page_load_timeout(),
            thread_timeout: waits.thread_timeout(),
            reply_timeout: waits.reply_timeout(),
            navigation_retry: waits.retry_config(),
        }
    }

    /// Build settings from loaded configuration, compiling the filter
    pub fn from_config(scrape: &ScrapeConfig, waits: &WaitConfig) -> Result<Self> {
        let filter = scrape
            .filter_pattern
            .as_deref()
            .map(ContentFilter::new)
            .transpose()?;

        Ok(Self {
            target_url: scrape.target_url.clone(),
            thread_limit: scrape.thread_limit,
            filter,
            time_limit: scrape.time_limit,
            page_load_timeout: waits.page_load_timeout(),
            thread_timeout: waits.thread_timeout(),
            reply_timeout: waits.reply_timeout(),
            navigation_retry: waits.retry_config(),
        })
    }

    pub fn with_thread_limit(mut self, limit: usize) -> Self {
        self.thread_limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: ContentFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_time_limit(mut self, time_limit: TimeLimit) -> Self {
        self.time_limit = time_limit;
        self
    }

    /// Override the three landmark waits at once
    pub fn with_waits(mut self, page_load: Duration, thread: Duration, reply: Duration) -> Self {
        self.page_load_timeout = page_load;
        self.thread_timeout = thread;
        self.reply_timeout = reply;
        self
    }

    pub fn with_navigation_retry(mut self, retry: RetryConfig) -> Self {
        self.navigation_retry = retry;
        self
    }
}
