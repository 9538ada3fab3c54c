// Core data structures for tubethread

use serde::{Deserialize, Serialize};

/// Disambiguation prefix the site puts in front of channel handles
pub const HANDLE_PREFIX: char = '@';

/// One top-level comment thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Channel name of the commenter, handle prefix stripped
    pub commenter: String,

    /// Comment text, surrounding whitespace trimmed
    pub content: String,

    /// Permalink to the comment (empty if it could not be read)
    pub link: String,

    /// Replies in render order
    #[serde(default)]
    pub children: Vec<ReplyRecord>,
}

impl CommentRecord {
    /// Build a record from raw page text, normalizing every field
    pub fn new(commenter: &str, content: &str, link: impl Into<String>) -> Self {
        Self {
            commenter: normalize_commenter(commenter),
            content: normalize_content(content),
            link: link.into(),
            children: Vec::new(),
        }
    }
}

/// One reply inside a thread. Replies do not nest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub commenter: String,
    pub content: String,
    pub link: String,
}

impl ReplyRecord {
    /// Build a reply from raw page text, normalizing every field
    pub fn new(commenter: &str, content: &str, link: impl Into<String>) -> Self {
        Self {
            commenter: normalize_commenter(commenter),
            content: normalize_content(content),
            link: link.into(),
        }
    }
}

/// What a fully processed thread produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    /// The thread passed the filter (or no filter is set)
    Record(CommentRecord),

    /// The thread was read but failed the filter
    Skip,
}

impl ThreadOutcome {
    /// Get the record, if any
    pub fn record(&self) -> Option<&CommentRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Skip => None,
        }
    }

    /// Consume and return the record, if any
    pub fn into_record(self) -> Option<CommentRecord> {
        match self {
            Self::Record(record) => Some(record),
            Self::Skip => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

/// Counters for one traversal run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScrapeStats {
    /// Comment count advertised by the page at startup
    pub advertised_total: Option<usize>,

    /// Threads fully processed (emitted or skipped)
    pub threads_completed: usize,

    /// Every comment read, threads and replies together
    pub parsed_count: usize,

    /// Threads that produced a record
    pub emitted: usize,

    /// Threads dropped by the filter
    pub skipped: usize,
}

impl ScrapeStats {
    /// Replies read across all threads
    pub fn replies_read(&self) -> usize {
        self.parsed_count.saturating_sub(self.threads_completed)
    }
}

/// Trim a channel name and strip the handle prefix
///
/// Applying this to an already normalized name leaves it unchanged.
pub fn normalize_commenter(raw: &str) -> String {
    let mut name = raw.trim();
    while let Some(rest) = name.strip_prefix(HANDLE_PREFIX) {
        name = rest.trim_start();
    }
    name.to_string()
}

/// Trim leading and trailing whitespace from comment text
pub fn normalize_content(raw: &str) -> String {
    raw.trim().to_string()
}
