//! Unified error handling for the tubethread crate
//!
//! The traversal itself never returns errors to its caller (failures end the
//! sequence and leave a [`FailureRecord`](crate::traversal::FailureRecord)).
//! This type covers what happens before it starts: loading configuration,
//! compiling the filter and launching the browser. Its category picks the
//! process exit status.

use thiserror::Error;

pub use crate::driver::DriverError;

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Browser launch and page driving
    Browser,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Process exit status for a command that failed with this category
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Config => 2,
            Self::Browser => 3,
        }
    }
}

/// Unified error type for the tubethread crate
#[derive(Error, Debug)]
pub enum Error {
    /// Browser and page driver errors
    #[error("Browser error: {0}")]
    Driver(#[from] DriverError),

    /// Invalid filter pattern
    #[error("Invalid filter pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Get the error category for handling strategies
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Driver(_) => ErrorCategory::Browser,
            Self::Pattern(_) | Self::Config(_) => ErrorCategory::Config,
        }
    }
}

/// Exit status for an application error
///
/// Looks through any `.context(...)` layers for an [`Error`]. Anything else,
/// including a traversal that ended with a failure, exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<Error>()
        .map_or(1, |e| e.category().exit_code())
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
