//! Thread-by-thread traversal state machine
//!
//! Each call to [`CommentIterator::next`] reads exactly one thread: the
//! top-level comment, then every reply (clicking "load more" while more
//! batches exist), then collapses the panel and yields the outcome.
//! Unexpected failures end the sequence; they are never returned to the caller.

use futures::stream::{self, Stream, StreamExt};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::aggregator::ThreadAggregator;
use super::cursor::TraversalCursor;
use super::limit::LimitState;
use super::{FailureKind, FailureRecord, Termination, TraversalPhase, TraversalSettings};
use crate::driver::{Control, DriverError, Field, Locator, PageDriver};
use crate::models::{CommentRecord, ReplyRecord, ScrapeStats, ThreadOutcome};
use crate::utils::retry::retry_with_context;
use crate::utils::{parse_comment_count, truncate_text};

/// Internal failure, converted to a [`FailureRecord`] when the sequence ends
#[derive(Debug, Error)]
enum TraversalError {
    #[error("{landmark} did not appear within {timeout:?}")]
    LandmarkTimeout {
        kind: FailureKind,
        landmark: Locator,
        timeout: Duration,
    },

    #[error("unreadable comment count {0:?}")]
    InvalidCommentCount(String),

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: DriverError,
    },

    #[error("{locator}: {source}")]
    Driver {
        kind: FailureKind,
        locator: Locator,
        #[source]
        source: DriverError,
    },
}

impl TraversalError {
    fn driver(kind: FailureKind, locator: Locator) -> impl FnOnce(DriverError) -> Self {
        move |source| Self::Driver {
            kind,
            locator,
            source,
        }
    }

    fn kind(&self) -> FailureKind {
        match self {
            Self::LandmarkTimeout { kind, .. } | Self::Driver { kind, .. } => *kind,
            Self::InvalidCommentCount(_) => FailureKind::CountParse,
            Self::Navigation { .. } => FailureKind::Startup,
        }
    }

    fn locator(&self) -> Option<Locator> {
        match self {
            Self::LandmarkTimeout { landmark, .. } => Some(*landmark),
            Self::Driver { locator, .. } => Some(*locator),
            Self::InvalidCommentCount(_) => Some(Locator::CommentCount),
            Self::Navigation { .. } => None,
        }
    }
}

/// Lazy sequence of thread outcomes read from one watch page
///
/// The driver is owned by the iterator and shut down exactly once, when the
/// sequence reaches [`TraversalPhase::Finished`]. Call [`close`](Self::close)
/// to release it early.
pub struct CommentIterator<D: PageDriver> {
    driver: D,
    settings: TraversalSettings,
    cursor: TraversalCursor,
    limits: LimitState,
    phase: TraversalPhase,
    stats: ScrapeStats,
    failure: Option<FailureRecord>,
}

impl<D: PageDriver> CommentIterator<D> {
    /// Wrap a driver. Nothing touches the page until the first `next()`.
    pub fn new(driver: D, settings: TraversalSettings) -> Self {
        Self {
            driver,
            settings,
            cursor: TraversalCursor::new(),
            limits: LimitState::unlimited(),
            phase: TraversalPhase::NotStarted,
            stats: ScrapeStats::default(),
            failure: None,
        }
    }

    /// Read the next thread
    ///
    /// Returns `None` once the section is exhausted, a limit is reached, or a
    /// failure occurred. Every later call also returns `None`.
    ///
    /// Limits are checked once per thread, before it starts. A thread already
    /// being read always finishes, so a run can overshoot the deadline by up
    /// to one thread.
    pub async fn next(&mut self) -> Option<ThreadOutcome> {
        if self.phase == TraversalPhase::NotStarted {
            if let Err(e) = self.startup().await {
                self.fail(e).await;
                return None;
            }
        }

        if self.phase.is_finished() {
            return None;
        }

        let now = Instant::now();
        if let Some(reason) = self.limits.should_stop(self.stats.threads_completed, now) {
            info!(
                reason = reason.as_str(),
                threads = self.stats.threads_completed,
                "limit reached"
            );
            self.finish(Termination::Stopped(reason)).await;
            return None;
        }
        if let Some(remaining) = self.limits.remaining(now) {
            debug!(remaining_secs = remaining.as_secs(), "time left");
        }

        match self.read_thread().await {
            Ok(Some(outcome)) => {
                self.stats.threads_completed += 1;
                if outcome.is_skip() {
                    self.stats.skipped += 1;
                } else {
                    self.stats.emitted += 1;
                }
                Some(outcome)
            }
            Ok(None) => {
                self.finish(Termination::Exhausted).await;
                None
            }
            Err(e) => {
                self.fail(e).await;
                None
            }
        }
    }

    /// Release the browser without reading further
    pub async fn close(&mut self) {
        self.finish(Termination::Closed).await;
    }

    /// All outcomes as a stream, skips included
    pub fn into_stream(self) -> impl Stream<Item = ThreadOutcome> {
        stream::unfold(self, |mut comments| async move {
            let outcome = comments.next().await?;
            Some((outcome, comments))
        })
    }

    /// Only the emitted records as a stream
    pub fn into_records(self) -> impl Stream<Item = CommentRecord> {
        self.into_stream()
            .filter_map(|outcome| futures::future::ready(outcome.into_record()))
    }

    pub fn stats(&self) -> &ScrapeStats {
        &self.stats
    }

    pub fn cursor(&self) -> TraversalCursor {
        self.cursor
    }

    pub fn phase(&self) -> TraversalPhase {
        self.phase
    }

    /// How the sequence ended, once it has
    pub fn termination(&self) -> Option<Termination> {
        match self.phase {
            TraversalPhase::Finished(termination) => Some(termination),
            _ => None,
        }
    }

    /// The failure that ended the sequence, if any
    pub fn diagnostic(&self) -> Option<&FailureRecord> {
        self.failure.as_ref()
    }

    // ========================================================================
    // Startup
    // ========================================================================

    async fn startup(&mut self) -> Result<(), TraversalError> {
        info!(url = %self.settings.target_url, "loading watch page");
        self.navigate().await?;

        let timeout = self.settings.page_load_timeout;
        let title = self
            .driver
            .wait_for(&Locator::Title, timeout)
            .await
            .map_err(TraversalError::driver(FailureKind::Startup, Locator::Title))?
            .ok_or(TraversalError::LandmarkTimeout {
                kind: FailureKind::Startup,
                landmark: Locator::Title,
                timeout,
            })?;

        // the comment section only renders once the page has been scrolled
        self.scroll_best_effort(&title, Locator::Title).await;

        match self.read_advertised_count().await {
            Ok(count) => {
                info!(advertised = count, "comment count found");
                self.stats.advertised_total = Some(count);
            }
            Err(e) if self.settings.thread_limit.is_some() => {
                warn!(error = %e, "comment count unavailable, using explicit thread limit");
            }
            Err(e) => return Err(e),
        }

        let max_threads = self.settings.thread_limit.or(self.stats.advertised_total);
        self.limits = LimitState::start(max_threads, self.settings.time_limit, Instant::now());
        debug!(
            max_threads = ?self.limits.max_threads,
            deadline_secs = ?self.settings.time_limit.as_duration().map(|d| d.as_secs()),
            "limits established"
        );

        self.enter(TraversalPhase::ReadingThread);
        Ok(())
    }

    /// Navigate with backoff, retrying only recoverable driver errors
    async fn navigate(&mut self) -> Result<(), TraversalError> {
        let retry = self.settings.navigation_retry.clone();

        retry_with_context(
            &retry,
            "navigate",
            &mut *self,
            |this| this.driver.navigate(&this.settings.target_url),
            DriverError::is_recoverable,
        )
        .await
        .map_err(|source| TraversalError::Navigation {
            url: self.settings.target_url.clone(),
            source,
        })
    }

    async fn read_advertised_count(&mut self) -> Result<usize, TraversalError> {
        let timeout = self.settings.page_load_timeout;
        let locator = Locator::CommentCount;

        let element = self
            .driver
            .wait_for(&locator, timeout)
            .await
            .map_err(TraversalError::driver(FailureKind::CountParse, locator))?
            .ok_or(TraversalError::LandmarkTimeout {
                kind: FailureKind::CountParse,
                landmark: locator,
                timeout,
            })?;

        let text = self
            .driver
            .read_text(&element)
            .await
            .map_err(TraversalError::driver(FailureKind::CountParse, locator))?;

        parse_comment_count(&text).ok_or(TraversalError::InvalidCommentCount(text))
    }

    // ========================================================================
    // Threads
    // ========================================================================

    /// Read the thread under the cursor. `Ok(None)` means no thread appeared.
    async fn read_thread(&mut self) -> Result<Option<ThreadOutcome>, TraversalError> {
        self.enter(TraversalPhase::ReadingThread);

        let content_locator = self.cursor.thread_locator(Field::Content);
        let Some(content) = self
            .driver
            .wait_for(&content_locator, self.settings.thread_timeout)
            .await
            .map_err(TraversalError::driver(FailureKind::ThreadRead, content_locator))?
        else {
            info!(
                thread = self.cursor.thread_number(),
                "no further thread rendered"
            );
            return Ok(None);
        };

        let text = self
            .driver
            .read_text(&content)
            .await
            .map_err(TraversalError::driver(FailureKind::ThreadRead, content_locator))?;
        let commenter = self
            .read_located_text(self.cursor.thread_locator(Field::Author), FailureKind::ThreadRead)
            .await?;
        self.scroll_best_effort(&content, content_locator).await;
        let link = self.read_link(self.cursor.thread_locator(Field::Link)).await;

        self.stats.parsed_count += 1;
        debug!(
            thread = self.cursor.thread_number(),
            commenter = %commenter,
            preview = %truncate_text(&text, 60),
            "thread read"
        );

        let record = CommentRecord::new(&commenter, &text, link);
        let mut aggregator = ThreadAggregator::new(record, self.settings.filter.clone());

        let show_replies = self.cursor.control(Control::ShowReplies);
        let expanded = if self.driver.exists(&show_replies).await {
            self.read_replies(&mut aggregator).await?
        } else {
            false
        };

        let anchor = self.cursor.thread_locator(Field::Content);
        let hide_replies = self.cursor.control(Control::HideReplies);
        self.cursor.finish_thread();
        self.enter(TraversalPhase::ThreadDone);

        if expanded {
            self.collapse_replies(anchor, hide_replies).await;
        }

        debug!(
            replies = aggregator.reply_count(),
            matched = aggregator.is_matched(),
            "thread finished"
        );
        Ok(Some(aggregator.finish()))
    }

    /// Expand the panel and read every reply into the aggregator
    ///
    /// Returns whether the panel was opened and needs collapsing.
    async fn read_replies(
        &mut self,
        aggregator: &mut ThreadAggregator,
    ) -> Result<bool, TraversalError> {
        self.enter(TraversalPhase::ExpandingReplies);

        let show_replies = self.cursor.control(Control::ShowReplies);
        if !self.click_control(show_replies).await {
            warn!(
                thread = self.cursor.thread_number(),
                "could not expand replies, treating thread as childless"
            );
            return Ok(false);
        }

        let first = self.cursor.reply_locator(Field::Content);
        let rendered = self
            .driver
            .wait_for(&first, self.settings.reply_timeout)
            .await
            .map_err(TraversalError::driver(FailureKind::ReplyRead, first))?;
        if rendered.is_none() {
            debug!(
                thread = self.cursor.thread_number(),
                "no reply rendered after expanding"
            );
            return Ok(true);
        }

        loop {
            let next_reply = self.cursor.reply_locator(Field::Content);
            if !self.driver.exists(&next_reply).await && !self.load_more_replies(next_reply).await?
            {
                break;
            }

            let reply = self.read_reply().await?;
            aggregator.push_reply(reply);
            self.cursor.advance_reply();
            self.stats.parsed_count += 1;
        }

        Ok(true)
    }

    /// Click "load more" if present and wait for `target` to render
    ///
    /// Returns false when there is nothing more to load.
    async fn load_more_replies(&mut self, target: Locator) -> Result<bool, TraversalError> {
        let load_more = self.cursor.control(Control::LoadMoreReplies);
        if !self.driver.exists(&load_more).await {
            return Ok(false);
        }

        if !self.click_control(load_more).await {
            warn!(
                thread = self.cursor.thread_number(),
                reply = self.cursor.reply_number(),
                "load more click failed, ending reply panel"
            );
            return Ok(false);
        }

        let rendered = self
            .driver
            .wait_for(&target, self.settings.reply_timeout)
            .await
            .map_err(TraversalError::driver(FailureKind::ReplyRead, target))?;

        if rendered.is_none() {
            debug!(%target, "no reply rendered after loading more");
        }
        Ok(rendered.is_some())
    }

    async fn read_reply(&mut self) -> Result<ReplyRecord, TraversalError> {
        self.enter(TraversalPhase::ReadingReply);

        let content_locator = self.cursor.reply_locator(Field::Content);
        let content = self
            .driver
            .find(&content_locator)
            .await
            .map_err(TraversalError::driver(FailureKind::ReplyRead, content_locator))?;
        let text = self
            .driver
            .read_text(&content)
            .await
            .map_err(TraversalError::driver(FailureKind::ReplyRead, content_locator))?;
        let commenter = self
            .read_located_text(self.cursor.reply_locator(Field::Author), FailureKind::ReplyRead)
            .await?;
        self.scroll_best_effort(&content, content_locator).await;
        let link = self.read_link(self.cursor.reply_locator(Field::Link)).await;

        debug!(
            thread = self.cursor.thread_number(),
            reply = self.cursor.reply_number(),
            "reply read"
        );
        Ok(ReplyRecord::new(&commenter, &text, link))
    }

    /// Scroll back to the thread and hide its replies. Failures are ignored.
    async fn collapse_replies(&mut self, anchor: Locator, hide_replies: Locator) {
        if let Ok(element) = self.driver.find(&anchor).await {
            self.scroll_best_effort(&element, anchor).await;
        }
        if !self.click_control(hide_replies).await {
            debug!(%hide_replies, "could not collapse replies");
        }
    }

    // ========================================================================
    // Element helpers
    // ========================================================================

    async fn read_located_text(
        &mut self,
        locator: Locator,
        kind: FailureKind,
    ) -> Result<String, TraversalError> {
        let element = self
            .driver
            .find(&locator)
            .await
            .map_err(TraversalError::driver(kind, locator))?;
        self.driver
            .read_text(&element)
            .await
            .map_err(TraversalError::driver(kind, locator))
    }

    /// Read an `href`, or an empty string when the link is missing
    async fn read_link(&mut self, locator: Locator) -> String {
        match self.driver.find(&locator).await {
            Ok(element) => self.driver.read_attribute(&element, "href").await,
            Err(e) => {
                debug!(%locator, error = %e, "link unavailable");
                String::new()
            }
        }
    }

    async fn scroll_best_effort(&mut self, element: &D::Element, locator: Locator) {
        if let Err(e) = self.driver.scroll_into_view(element).await {
            debug!(%locator, error = %e, "scroll failed");
        }
    }

    /// Resolve and click a control, reporting success
    async fn click_control(&mut self, locator: Locator) -> bool {
        let button = match self.driver.find(&locator).await {
            Ok(button) => button,
            Err(e) => {
                debug!(%locator, error = %e, "control not found");
                return false;
            }
        };

        match self.driver.click(&button).await {
            Ok(()) => true,
            Err(e) => {
                debug!(%locator, error = %e, "click failed");
                false
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn enter(&mut self, phase: TraversalPhase) {
        if self.phase != phase {
            debug!(
                from = ?self.phase,
                to = ?phase,
                thread = self.cursor.thread_number(),
                reply = self.cursor.reply_number(),
                "transition"
            );
        }
        self.phase = phase;
    }

    async fn fail(&mut self, e: TraversalError) {
        let kind = e.kind();
        let thread = e
            .locator()
            .and_then(|l| l.thread())
            .unwrap_or(self.cursor.thread_index);
        let reply = match (e.locator(), self.phase) {
            (Some(Locator::Reply { reply, .. }), _) => Some(reply),
            (_, TraversalPhase::ExpandingReplies | TraversalPhase::ReadingReply) => {
                Some(self.cursor.reply_index)
            }
            _ => None,
        };

        error!(
            kind = kind.as_str(),
            thread = thread + 1,
            reply = ?reply.map(|r| r + 1),
            error = %e,
            "traversal failed"
        );

        self.failure = Some(FailureRecord {
            thread,
            reply,
            kind,
            message: e.to_string(),
        });
        self.finish(Termination::Failed).await;
    }

    /// Enter the terminal phase and release the driver, once
    async fn finish(&mut self, termination: Termination) {
        if self.phase.is_finished() {
            return;
        }

        self.enter(TraversalPhase::Finished(termination));
        self.driver.shutdown().await;

        info!(
            termination = termination.as_str(),
            threads = self.stats.threads_completed,
            parsed = self.stats.parsed_count,
            emitted = self.stats.emitted,
            skipped = self.stats.skipped,
            "traversal finished"
        );
    }
}

impl<D: PageDriver> Drop for CommentIterator<D> {
    fn drop(&mut self) {
        if !self.phase.is_finished() && self.phase != TraversalPhase::NotStarted {
            warn!(
                thread = self.cursor.thread_number(),
                "comment iterator dropped before finishing; call close() to release the browser"
            );
        }
    }
}
