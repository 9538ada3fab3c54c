//! Stop policy for a traversal run
//!
//! Two independent ceilings: the number of completed threads and an optional
//! wall-clock deadline. Replies never count against the thread limit.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Configured run duration. All zero means no deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimit {
    #[serde(default)]
    pub hours: u64,
    #[serde(default)]
    pub minutes: u64,
    #[serde(default)]
    pub seconds: u64,
}

impl TimeLimit {
    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Sum of all components in seconds, or `None` if it does not fit in a `u64`
    pub fn total_seconds(&self) -> Option<u64> {
        self.hours
            .checked_mul(SECONDS_PER_HOUR)?
            .checked_add(self.minutes.checked_mul(SECONDS_PER_MINUTE)?)?
            .checked_add(self.seconds)
    }

    /// Total duration, or `None` when every component is zero
    ///
    /// A sum too large for `u64` seconds saturates to [`Duration::MAX`].
    pub fn as_duration(&self) -> Option<Duration> {
        match self.total_seconds() {
            Some(0) => None,
            Some(total) => Some(Duration::from_secs(total)),
            None => Some(Duration::MAX),
        }
    }
}

/// Why a traversal stopped before the page ran out of threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The thread limit was reached
    ThreadLimit,
    /// The deadline passed
    Deadline,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThreadLimit => "thread_limit",
            Self::Deadline => "deadline",
        }
    }
}

/// Limits established once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitState {
    /// Ceiling on completed threads
    pub max_threads: Option<usize>,

    /// Absolute deadline, if a time limit was configured
    pub deadline: Option<Instant>,
}

impl LimitState {
    /// Capture the deadline relative to `started_at`
    ///
    /// A deadline beyond what the clock can represent is never reached, so it
    /// is dropped.
    pub fn start(max_threads: Option<usize>, time_limit: TimeLimit, started_at: Instant) -> Self {
        Self {
            max_threads,
            deadline: time_limit
                .as_duration()
                .and_then(|d| started_at.checked_add(d)),
        }
    }

    /// No limits at all
    pub fn unlimited() -> Self {
        Self {
            max_threads: None,
            deadline: None,
        }
    }

    /// Decide whether the next unit of work may begin
    ///
    /// Pure in `(completed_threads, now)` and the captured limits.
    pub fn should_stop(&self, completed_threads: usize, now: Instant) -> Option<StopReason> {
        if let Some(max) = self.max_threads {
            if completed_threads >= max {
                return Some(StopReason::ThreadLimit);
            }
        }

        match self.deadline {
            Some(deadline) if now > deadline => Some(StopReason::Deadline),
            _ => None,
        }
    }

    /// Time left before the deadline
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|d| d.saturating_duration_since(now))
    }
}
