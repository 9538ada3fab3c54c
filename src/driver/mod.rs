//! Page driver abstraction
//!
//! The traversal talks to the browser only through [`PageDriver`]. Element
//! handles returned by a driver are valid until the next click or scroll;
//! callers re-resolve through a [`Locator`] instead of keeping them.
//!
//! - [`ChromeDriver`] drives Chrome/Chromium over the DevTools protocol
//! - [`selectors`] maps locators onto the watch page markup

pub mod chrome;
pub mod error;
pub mod selectors;

use async_trait::async_trait;
use std::time::Duration;

pub use chrome::ChromeDriver;
pub use error::DriverError;
pub use selectors::{Control, Field, Locator};

/// Capabilities the traversal needs from a live page
#[async_trait]
pub trait PageDriver: Send {
    /// Ephemeral handle to a rendered element
    type Element: Send + Sync;

    /// Load a URL in the driven page
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError>;

    /// Wait up to `timeout` for an element to appear
    ///
    /// Returns `Ok(None)` when the wait expires. Expiry is an expected outcome,
    /// not an error.
    async fn wait_for(
        &mut self,
        locator: &Locator,
        timeout: Duration,
    ) -> Result<Option<Self::Element>, DriverError>;

    /// Check whether an element is currently present. Never fails.
    async fn exists(&mut self, locator: &Locator) -> bool;

    /// Resolve an element that is expected to be present right now
    async fn find(&mut self, locator: &Locator) -> Result<Self::Element, DriverError>;

    /// Read the rendered text of an element
    async fn read_text(&mut self, element: &Self::Element) -> Result<String, DriverError>;

    /// Read an attribute, returning an empty string if it is absent or unreadable
    async fn read_attribute(&mut self, element: &Self::Element, name: &str) -> String;

    /// Scroll the element into the viewport
    async fn scroll_into_view(&mut self, element: &Self::Element) -> Result<(), DriverError>;

    /// Click the element
    async fn click(&mut self, element: &Self::Element) -> Result<(), DriverError>;

    /// Release the browser session. Safe to call more than once.
    async fn shutdown(&mut self);
}
