//! Position of the next element to read

use crate::driver::{Control, Field, Locator};

/// `(thread_index, reply_index)` coordinate into the comment section
///
/// Every locator the traversal uses is derived from the cursor at the moment
/// of use, so no element handle outlives a page mutation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TraversalCursor {
    /// 0-based index of the thread being read
    pub thread_index: usize,

    /// 0-based index of the next reply within the open thread
    pub reply_index: usize,
}

impl TraversalCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator for a field of the current thread's top-level comment
    pub fn thread_locator(&self, field: Field) -> Locator {
        Locator::Thread {
            thread: self.thread_index,
            field,
        }
    }

    /// Locator for a field of the current reply
    pub fn reply_locator(&self, field: Field) -> Locator {
        Locator::Reply {
            thread: self.thread_index,
            reply: self.reply_index,
            field,
        }
    }

    /// Locator for a panel control of the current thread
    pub fn control(&self, control: Control) -> Locator {
        Locator::Control {
            thread: self.thread_index,
            control,
        }
    }

    /// Move to the next reply in the open thread
    pub fn advance_reply(&mut self) {
        self.reply_index += 1;
    }

    /// Close the current thread: reset the reply index and move to the next thread
    pub fn finish_thread(&mut self) {
        self.reply_index = 0;
        self.thread_index += 1;
    }

    /// 1-based thread number, as shown in logs
    pub fn thread_number(&self) -> usize {
        self.thread_index + 1
    }

    /// 1-based reply number, as shown in logs
    pub fn reply_number(&self) -> usize {
        self.reply_index + 1
    }
}
