//! Per-thread record assembly and content filtering

use regex::{Regex, RegexBuilder};

use crate::models::{CommentRecord, ReplyRecord, ThreadOutcome};

// ============================================================================
// Content Filter
// ============================================================================

/// Case-insensitive pattern tested against comment text
///
/// Clones share the compiled regex.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    regex: Regex,
}

impl ContentFilter {
    /// Compile a pattern. Matching ignores case.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// Check if the text contains a match anywhere
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

// ============================================================================
// Thread Aggregator
// ============================================================================

/// Builds the record for one thread and makes the emit decision
#[derive(Debug)]
pub struct ThreadAggregator {
    record: CommentRecord,
    filter: Option<ContentFilter>,
    matched: bool,
}

impl ThreadAggregator {
    /// Start a thread from its top-level comment
    ///
    /// The top-level text is tested first; once a thread matches, replies are
    /// no longer tested.
    pub fn new(record: CommentRecord, filter: Option<ContentFilter>) -> Self {
        let matched = filter
            .as_ref()
            .is_some_and(|f| f.matches(&record.content));
        Self {
            record,
            filter,
            matched,
        }
    }

    /// Append a reply, testing it against the filter if the thread has not matched yet
    pub fn push_reply(&mut self, reply: ReplyRecord) {
        if !self.matched {
            if let Some(filter) = &self.filter {
                self.matched = filter.matches(&reply.content);
            }
        }
        self.record.children.push(reply);
    }

    /// Whether the thread has matched the filter so far
    pub fn is_matched(&self) -> bool {
        self.matched
    }

    pub fn reply_count(&self) -> usize {
        self.record.children.len()
    }

    /// Emit decision for the fully read thread
    ///
    /// Without a filter every thread is emitted. With one, a matched thread is
    /// emitted with all of its replies and an unmatched thread is skipped.
    pub fn finish(self) -> ThreadOutcome {
        match self.filter {
            Some(_) if !self.matched => ThreadOutcome::Skip,
            _ => ThreadOutcome::Record(self.record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thread(content: &str) -> CommentRecord {
        CommentRecord::new("@op", content, "https://example.com/c/1")
    }

    fn reply(content: &str) -> ReplyRecord {
        ReplyRecord::new("@someone", content, "")
    }

    #[test]
    fn test_filter_is_case_insensitive() {
        let filter = ContentFilter::new("rust").unwrap();
        assert!(filter.matches("I love RUST"));
        assert!(filter.matches("rusty"));
        assert!(!filter.matches("go"));
        assert!(filter.matches("Rust, Rust, RUST"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(ContentFilter::new("(unclosed").is_err());
    }

    #[test]
    fn test_no_filter_always_emits() {
        let mut agg = ThreadAggregator::new(thread("anything"), None);
        agg.push_reply(reply("more"));

        let outcome = agg.finish();
        let record = outcome.into_record().unwrap();
        assert_eq!(record.children.len(), 1);
    }

    #[test]
    fn test_top_level_match() {
        let filter = ContentFilter::new("timestamp").unwrap();
        let agg = ThreadAggregator::new(thread("Timestamp 1:23"), Some(filter.clone()));
        assert!(agg.is_matched());
        assert!(!agg.finish().is_skip());
    }

    #[test]
    fn test_reply_match_keeps_all_replies() {
        let filter = ContentFilter::new("needle").unwrap();
        let mut agg = ThreadAggregator::new(thread("haystack"), Some(filter.clone()));
        assert!(!agg.is_matched());

        agg.push_reply(reply("first"));
        agg.push_reply(reply("a NEEDLE here"));
        agg.push_reply(reply("third"));
        assert!(agg.is_matched());
        assert_eq!(agg.reply_count(), 3);

        let record = agg.finish().into_record().unwrap();
        let contents: Vec<_> = record.children.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "a NEEDLE here", "third"]);
    }

    #[test]
    fn test_unmatched_thread_is_skipped() {
        let filter = ContentFilter::new("needle").unwrap();
        let mut agg = ThreadAggregator::new(thread("haystack"), Some(filter.clone()));
        agg.push_reply(reply("still nothing"));
        assert_eq!(agg.finish(), ThreadOutcome::Skip);
    }

    #[test]
    fn test_unmatched_childless_thread_is_skipped() {
        let filter = ContentFilter::new("needle").unwrap();
        let agg = ThreadAggregator::new(thread("haystack"), Some(filter.clone()));
        assert!(agg.finish().is_skip());
    }
}
