//! Declarative locators for the comment section
//!
//! The traversal never holds element handles across a click. It asks for
//! "thread i, reply j, field f" and the driver resolves that address against
//! the live page every time. [`Locator::css`] renders the fixed CSS selector
//! for the watch page layout.

use std::fmt;

// Base paths shared by the per-thread selectors
const THREAD_BASE: &str = "#contents > ytd-comment-thread-renderer";
const REPLY_BASE: &str = "#replies > ytd-comment-replies-renderer #contents > ytd-comment-renderer";
const BUTTON_FILL: &str =
    "yt-button-shape > button > yt-touch-feedback-shape > div > div.yt-spec-touch-feedback-shape__fill";

/// Page title marker, present once the watch page has loaded
pub const TITLE_SELECTOR: &str = "#title > h1 > yt-formatted-string";

/// Advertised total comment count
pub const COMMENT_COUNT_SELECTOR: &str = "#sections #count > yt-formatted-string > span:nth-child(1)";

/// Sub-element of a single comment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    /// Comment text
    Content,
    /// Channel name of the commenter
    Author,
    /// Anchor carrying the comment permalink
    Link,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Author => "author",
            Self::Link => "link",
        }
    }
}

/// Per-thread panel control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    /// Expands the replies panel
    ShowReplies,
    /// Collapses the replies panel
    HideReplies,
    /// Loads the next batch of replies inside an open panel
    LoadMoreReplies,
}

impl Control {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ShowReplies => "show_replies",
            Self::HideReplies => "hide_replies",
            Self::LoadMoreReplies => "load_more_replies",
        }
    }
}

/// Address of an element on the page
///
/// Thread and reply indices are 0-based; the rendered selectors use the
/// 1-based `nth-child` positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Locator {
    Title,
    CommentCount,
    Thread { thread: usize, field: Field },
    Reply { thread: usize, reply: usize, field: Field },
    Control { thread: usize, control: Control },
}

impl Locator {
    /// Render the CSS selector for this locator
    pub fn css(&self) -> String {
        match *self {
            Self::Title => TITLE_SELECTOR.to_string(),
            Self::CommentCount => COMMENT_COUNT_SELECTOR.to_string(),
            Self::Thread { thread, field } => {
                let base = thread_base(thread);
                match field {
                    Field::Content => format!("{base} #content-text"),
                    Field::Author => format!("{base} #author-text"),
                    Field::Link => format!("{base} #header-author > yt-formatted-string > a"),
                }
            }
            Self::Reply {
                thread,
                reply,
                field,
            } => {
                let base = format!(
                    "{} {REPLY_BASE}:nth-child({})",
                    thread_base(thread),
                    reply + 1
                );
                match field {
                    Field::Content => format!("{base} #content-text"),
                    Field::Author => format!("{base} #author-text > yt-formatted-string"),
                    Field::Link => format!("{base} #header-author > yt-formatted-string > a"),
                }
            }
            Self::Control { thread, control } => {
                let base = thread_base(thread);
                match control {
                    Control::ShowReplies => format!("{base} #more-replies > {BUTTON_FILL}"),
                    Control::HideReplies => format!("{base} #less-replies > {BUTTON_FILL}"),
                    Control::LoadMoreReplies => {
                        format!("{base} #replies #button > ytd-button-renderer > {BUTTON_FILL}")
                    }
                }
            }
        }
    }

    /// Thread index this locator belongs to, if any
    pub fn thread(&self) -> Option<usize> {
        match *self {
            Self::Title | Self::CommentCount => None,
            Self::Thread { thread, .. }
            | Self::Reply { thread, .. }
            | Self::Control { thread, .. } => Some(thread),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Title => write!(f, "title"),
            Self::CommentCount => write!(f, "comment_count"),
            Self::Thread { thread, field } => write!(f, "thread[{thread}].{}", field.as_str()),
            Self::Reply {
                thread,
                reply,
                field,
            } => write!(f, "thread[{thread}].reply[{reply}].{}", field.as_str()),
            Self::Control { thread, control } => {
                write!(f, "thread[{thread}].{}", control.as_str())
            }
        }
    }
}

fn thread_base(thread: usize) -> String {
    format!("{THREAD_BASE}:nth-child({})", thread + 1)
}
