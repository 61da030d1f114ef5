//! Browser capabilities the lookup pipeline depends on.
//!
//! `PageDriver` is implemented by [`crate::bookoff::browser::ChromeSession`]
//! for real lookups and by scripted fakes in tests.

use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the browser engine.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("JavaScript evaluation failed: {0}")]
    JsEvalFailed(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("browser session already closed")]
    Closed,
}

impl DriverError {
    /// Errors a page raises while it is between documents, e.g. a script
    /// evaluated against an execution context that navigation just destroyed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DriverError::JsEvalFailed(_) | DriverError::Cdp(_))
    }
}

/// Addresses one element: the `nth` match of `selector`, optionally narrowed
/// to the first descendant matching `inner`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub nth: usize,
    pub inner: Option<String>,
}

impl Locator {
    /// First element matching `selector`.
    pub fn first(selector: impl Into<String>) -> Self {
        Self::nth(selector, 0)
    }

    pub fn nth(selector: impl Into<String>, nth: usize) -> Self {
        Self { selector: selector.into(), nth, inner: None }
    }

    /// Narrows the locator to its first descendant matching `inner`.
    pub fn descendant(mut self, inner: impl Into<String>) -> Self {
        self.inner = Some(inner.into());
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.selector, self.nth)?;
        if let Some(inner) = &self.inner {
            write!(f, " >> {}", inner)?;
        }
        Ok(())
    }
}

/// How a click is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    /// Real mouse events at the element's center, after scrolling it into view.
    Normal,
    /// `element.click()` in page script; ignores overlays covering the element.
    Forced,
}

/// A single live page owned by one lookup.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates and waits for the load to finish.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Scrolls the window to the bottom of the document.
    async fn scroll_to_bottom(&self) -> Result<(), DriverError>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, DriverError>;

    /// True if the element exists, is displayed and has a non-empty box.
    async fn is_visible(&self, locator: &Locator) -> Result<bool, DriverError>;

    async fn click(&self, locator: &Locator, mode: ClickMode) -> Result<(), DriverError>;

    /// Waits for a navigation started by the previous action to finish.
    /// Returns at once when none is pending.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<(), DriverError>;

    /// Serialized HTML of the whole document.
    async fn content(&self) -> Result<String, DriverError>;

    /// Outer HTML of the element, `None` if it does not exist.
    async fn outer_html(&self, locator: &Locator) -> Result<Option<String>, DriverError>;

    /// `scrollHeight` of the element, 0 if it does not exist.
    async fn scroll_height(&self, locator: &Locator) -> Result<u64, DriverError>;

    /// Scrolls the element's content down by its own client height.
    async fn scroll_by_page(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Settle delay between a mutation and the next measurement.
    async fn pause(&self, duration: Duration);

    /// Tears the session down. Later calls on the driver fail with `Closed`.
    async fn close(&mut self) -> Result<(), DriverError>;
}
