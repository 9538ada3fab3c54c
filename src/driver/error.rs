//! Page driver error types.

use thiserror::Error;

/// Errors that can occur while driving the browser.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("browser session already closed")]
    Closed,
}

impl DriverError {
    /// Whether the same call could succeed if tried again
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NavigationFailed(_) | Self::Cdp(_))
    }
}

impl From<chromiumoxide::error::CdpError> for DriverError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        DriverError::Cdp(err.to_string())
    }
}
