//! Common test utilities
//!
//! [`FakePage`] is an in-memory model of a watch page's comment section that
//! implements [`PageDriver`]. Elements are the locators themselves; whether a
//! locator resolves depends on which threads exist and which reply panels are
//! open, so the traversal sees the same appear/disappear behavior as on the
//! live page.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tubethread::driver::{Control, DriverError, Field, Locator, PageDriver};
use tubethread::traversal::TraversalSettings;
use tubethread::utils::retry::RetryConfig;

pub const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// One rendered comment
#[derive(Debug, Clone)]
pub struct FakeComment {
    pub author: String,
    pub content: String,
    /// `None` means the link element is not rendered
    pub link: Option<String>,
}

impl FakeComment {
    pub fn new(author: &str, content: &str) -> Self {
        Self {
            author: author.to_string(),
            content: content.to_string(),
            link: Some(format!("https://www.youtube.com/watch?v=x&lc={author}")),
        }
    }

    pub fn without_link(mut self) -> Self {
        self.link = None;
        self
    }
}

/// A top-level comment and its replies
#[derive(Debug, Clone)]
pub struct FakeThread {
    pub comment: FakeComment,
    pub replies: Vec<FakeComment>,

    /// Replies revealed by the expand click and by each "load more" click
    pub batch_size: usize,

    /// The expand click itself fails
    pub expand_fails: bool,

    /// The expand click succeeds but no reply ever renders
    pub expand_renders_nothing: bool,

    /// The "load more" click fails
    pub load_more_fails: bool,
}

impl FakeThread {
    pub fn new(author: &str, content: &str) -> Self {
        Self {
            comment: FakeComment::new(author, content),
            replies: Vec::new(),
            batch_size: 10,
            expand_fails: false,
            expand_renders_nothing: false,
            load_more_fails: false,
        }
    }

    pub fn reply(mut self, author: &str, content: &str) -> Self {
        self.replies.push(FakeComment::new(author, content));
        self
    }

    pub fn with_reply(mut self, reply: FakeComment) -> Self {
        self.replies.push(reply);
        self
    }

    pub fn without_link(mut self) -> Self {
        self.comment.link = None;
        self
    }

    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    pub fn expand_fails(mut self) -> Self {
        self.expand_fails = true;
        self
    }

    pub fn expand_renders_nothing(mut self) -> Self {
        self.expand_renders_nothing = true;
        self
    }

    pub fn load_more_fails(mut self) -> Self {
        self.load_more_fails = true;
        self
    }
}

/// Shared view of what the traversal did to the page
#[derive(Debug, Clone, Default)]
pub struct FakeHandle {
    shutdowns: Arc<AtomicUsize>,
    clicks: Arc<Mutex<Vec<Locator>>>,
}

impl FakeHandle {
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> Vec<Locator> {
        self.clicks.lock().unwrap().clone()
    }

    pub fn clicks_of(&self, control: Control) -> usize {
        self.clicks()
            .iter()
            .filter(|l| matches!(l, Locator::Control { control: c, .. } if *c == control))
            .count()
    }
}

/// In-memory watch page
pub struct FakePage {
    threads: Vec<FakeThread>,
    title_present: bool,
    count_text: Option<String>,

    /// Navigations that fail before one succeeds
    navigation_failures: usize,
    navigated: bool,

    /// Locators whose text read fails
    failing_reads: HashSet<Locator>,

    /// Virtual time spent on every text read
    read_delay: Duration,

    /// Open reply panels and how many replies each has revealed
    revealed: HashMap<usize, usize>,

    closed: bool,
    handle: FakeHandle,
}

impl FakePage {
    pub fn new(threads: Vec<FakeThread>) -> Self {
        let count = threads.len() + threads.iter().map(|t| t.replies.len()).sum::<usize>();
        Self {
            threads,
            title_present: true,
            count_text: Some(format!("{count} Comments")),
            navigation_failures: 0,
            navigated: false,
            failing_reads: HashSet::new(),
            read_delay: Duration::ZERO,
            revealed: HashMap::new(),
            closed: false,
            handle: FakeHandle::default(),
        }
    }

    pub fn handle(&self) -> FakeHandle {
        self.handle.clone()
    }

    pub fn count_text(mut self, text: Option<&str>) -> Self {
        self.count_text = text.map(str::to_string);
        self
    }

    pub fn without_title(mut self) -> Self {
        self.title_present = false;
        self
    }

    pub fn navigation_failures(mut self, failures: usize) -> Self {
        self.navigation_failures = failures;
        self
    }

    pub fn fail_read(mut self, locator: Locator) -> Self {
        self.failing_reads.insert(locator);
        self
    }

    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    fn comment(&self, locator: &Locator) -> Option<&FakeComment> {
        match *locator {
            Locator::Thread { thread, .. } => self.threads.get(thread).map(|t| &t.comment),
            Locator::Reply { thread, reply, .. } => {
                let visible = self.revealed.get(&thread).copied().unwrap_or(0);
                if reply >= visible {
                    return None;
                }
                self.threads.get(thread)?.replies.get(reply)
            }
            _ => None,
        }
    }

    fn is_present(&self, locator: &Locator) -> bool {
        if !self.navigated || self.closed {
            return false;
        }

        match *locator {
            Locator::Title => self.title_present,
            Locator::CommentCount => self.count_text.is_some(),
            Locator::Thread { field, .. } | Locator::Reply { field, .. } => {
                match self.comment(locator) {
                    Some(comment) => field != Field::Link || comment.link.is_some(),
                    None => false,
                }
            }
            Locator::Control { thread, control } => {
                let Some(t) = self.threads.get(thread) else {
                    return false;
                };
                let open = self.revealed.get(&thread);
                match control {
                    Control::ShowReplies => !t.replies.is_empty() && open.is_none(),
                    Control::HideReplies => open.is_some(),
                    Control::LoadMoreReplies => open.is_some_and(|n| *n < t.replies.len()),
                }
            }
        }
    }

    fn text_of(&self, locator: &Locator) -> String {
        match *locator {
            Locator::Title => "A video".to_string(),
            Locator::CommentCount => self.count_text.clone().unwrap_or_default(),
            Locator::Thread { field, .. } | Locator::Reply { field, .. } => {
                let Some(comment) = self.comment(locator) else {
                    return String::new();
                };
                match field {
                    Field::Content => comment.content.clone(),
                    Field::Author => comment.author.clone(),
                    Field::Link => comment.link.clone().unwrap_or_default(),
                }
            }
            Locator::Control { control, .. } => control.as_str().to_string(),
        }
    }
}

#[async_trait]
impl PageDriver for FakePage {
    type Element = Locator;

    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        if self.navigation_failures > 0 {
            self.navigation_failures -= 1;
            return Err(DriverError::NavigationFailed(format!("{url}: net::ERR_TIMED_OUT")));
        }
        self.navigated = true;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Locator>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        if self.is_present(locator) {
            return Ok(Some(*locator));
        }
        tokio::time::sleep(timeout).await;
        Ok(None)
    }

    async fn exists(&mut self, locator: &Locator) -> bool {
        self.is_present(locator)
    }

    async fn find(&mut self, locator: &Locator) -> Result<Locator, DriverError> {
        if self.is_present(locator) {
            Ok(*locator)
        } else {
            Err(DriverError::ElementNotFound(locator.to_string()))
        }
    }

    async fn read_text(&mut self, element: &Locator) -> Result<String, DriverError> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.failing_reads.contains(element) {
            return Err(DriverError::Cdp(format!("node for {element} was detached")));
        }
        Ok(self.text_of(element))
    }

    async fn read_attribute(&mut self, element: &Locator, name: &str) -> String {
        if name != "href" {
            return String::new();
        }
        self.comment(element)
            .and_then(|c| c.link.clone())
            .unwrap_or_default()
    }

    async fn scroll_into_view(&mut self, element: &Locator) -> Result<(), DriverError> {
        if self.is_present(element) {
            Ok(())
        } else {
            Err(DriverError::ElementNotFound(element.to_string()))
        }
    }

    async fn click(&mut self, element: &Locator) -> Result<(), DriverError> {
        self.handle.clicks.lock().unwrap().push(*element);

        let Locator::Control { thread, control } = *element else {
            return Ok(());
        };
        let Some(t) = self.threads.get(thread) else {
            return Err(DriverError::ElementNotFound(element.to_string()));
        };

        match control {
            Control::ShowReplies => {
                if t.expand_fails {
                    return Err(DriverError::Cdp("element is not clickable".into()));
                }
                let shown = if t.expand_renders_nothing {
                    0
                } else {
                    t.batch_size.min(t.replies.len())
                };
                self.revealed.insert(thread, shown);
            }
            Control::LoadMoreReplies => {
                if t.load_more_fails {
                    return Err(DriverError::Cdp("element is not clickable".into()));
                }
                let total = t.replies.len();
                let batch = t.batch_size;
                if let Some(shown) = self.revealed.get_mut(&thread) {
                    *shown = (*shown + batch).min(total);
                }
            }
            Control::HideReplies => {
                self.revealed.remove(&thread);
            }
        }
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.closed = true;
        self.handle.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Settings with short waits and no navigation backoff
pub fn settings() -> TraversalSettings {
    TraversalSettings::new(WATCH_URL)
        .with_waits(
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .with_navigation_retry(RetryConfig::none())
}

/// `count` childless threads authored `@user0`, `@user1`, ...
pub fn plain_threads(count: usize) -> Vec<FakeThread> {
    (0..count)
        .map(|i| FakeThread::new(&format!("@user{i}"), &format!("comment {i}")))
        .collect()
}
