//! Types for page automation drivers.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while driving a page.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Timed out waiting for: {0}")]
    WaitTimeout(String),

    #[error("Timed out waiting for a matching response")]
    ResponseTimeout,

    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// How to locate an element on the page.
///
/// Locators are injected configuration; core workflow code only passes
/// them through to the driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locator {
    /// CSS selector.
    Css(String),
    /// XPath expression.
    XPath(String),
}

impl Locator {
    /// Create a CSS locator.
    pub fn css(selector: impl Into<String>) -> Self {
        Locator::Css(selector.into())
    }

    /// Create an XPath locator.
    pub fn xpath(expression: impl Into<String>) -> Self {
        Locator::XPath(expression.into())
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Options for waiting on an element.
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    /// Require the element to be visible (non-zero layout box).
    pub visible: bool,
    /// Wait for the element to disappear instead of appear.
    pub hidden: bool,
    /// Give up after this long.
    pub timeout: Duration,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            visible: false,
            hidden: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl WaitOptions {
    /// Wait until the element is present, with the given timeout.
    pub fn present(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Wait until the element is visible, with the given timeout.
    pub fn visible(timeout: Duration) -> Self {
        Self {
            visible: true,
            hidden: false,
            timeout,
        }
    }

    /// Wait until the element is gone (or hidden), with the given timeout.
    pub fn hidden(timeout: Duration) -> Self {
        Self {
            visible: false,
            hidden: true,
            timeout,
        }
    }
}

/// An option entry of a `<select>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Visible label text.
    pub label: String,
    /// Form value.
    pub value: String,
}

/// A network response observed by the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseInfo {
    /// Full response URL.
    pub url: String,
    /// HTTP status code.
    pub status: u16,
    /// `Content-Type` header, if present.
    pub content_type: Option<String>,
    /// `Content-Disposition` header, if present.
    pub content_disposition: Option<String>,
}

impl ResponseInfo {
    /// Extract the attachment filename from the `Content-Disposition`
    /// header, if the response carries one.
    pub fn attachment_filename(&self) -> Option<String> {
        let disposition = self.content_disposition.as_deref()?;
        let re = Regex::new(r#"filename="([^"]+)""#).ok()?;
        re.captures(disposition)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}

/// Declarative predicate for awaiting a network response.
///
/// Kept as data rather than a closure so it can cross the driver trait
/// object boundary and be asserted on in tests.
#[derive(Debug, Clone, Default)]
pub struct ResponseMatcher {
    /// Match responses whose URL ends with this suffix.
    pub url_suffix: Option<String>,
    /// Match responses whose `Content-Type` contains any of these.
    pub content_types: Vec<String>,
}

impl ResponseMatcher {
    /// Match responses from a given page (URL suffix).
    pub fn from_page(suffix: impl Into<String>) -> Self {
        Self {
            url_suffix: Some(suffix.into()),
            content_types: Vec::new(),
        }
    }

    /// Also match responses with any of the given content types.
    pub fn or_content_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.content_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Whether a successful response satisfies this matcher.
    pub fn matches(&self, response: &ResponseInfo) -> bool {
        if response.status != 200 {
            return false;
        }
        if let Some(suffix) = &self.url_suffix {
            if response.url.ends_with(suffix.as_str()) {
                return true;
            }
        }
        if let Some(content_type) = &response.content_type {
            return self
                .content_types
                .iter()
                .any(|t| content_type.contains(t.as_str()));
        }
        false
    }
}

/// Page automation capability consumed by the navigator and orchestrator.
///
/// Implementations own the underlying browser session; core workflow code
/// depends only on this interface and never on a concrete automation
/// library's surface.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Current page URL, including the location fragment.
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Navigate to a URL (or rewrite the location fragment).
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Wait for an element to appear, become visible or disappear.
    async fn wait_for(&self, locator: &Locator, opts: WaitOptions) -> Result<(), DriverError>;

    /// Click the first element matching the locator.
    async fn click(&self, locator: &Locator) -> Result<(), DriverError>;

    /// Set the value of a `<select>` element and fire its change event.
    async fn select_value(&self, locator: &Locator, value: &str) -> Result<(), DriverError>;

    /// Inner text of the first matching element.
    async fn read_text(&self, locator: &Locator) -> Result<String, DriverError>;

    /// Form value of the first matching element.
    async fn read_value(&self, locator: &Locator) -> Result<String, DriverError>;

    /// Checked state of the first matching checkbox/radio.
    async fn is_checked(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Whether at least one element matches the locator right now.
    async fn exists(&self, locator: &Locator) -> Result<bool, DriverError>;

    /// Label/value pairs of a `<select>` element's options.
    async fn select_options(&self, locator: &Locator) -> Result<Vec<SelectOption>, DriverError>;

    /// Wait for a network response satisfying the matcher.
    ///
    /// Resolves with the first matching response, or
    /// [`DriverError::ResponseTimeout`] when the timeout elapses first.
    async fn await_response(
        &self,
        matcher: &ResponseMatcher,
        timeout: Duration,
    ) -> Result<ResponseInfo, DriverError>;

    /// Route browser-initiated downloads into the given directory.
    async fn set_download_dir(&self, dir: &Path) -> Result<(), DriverError>;

    /// Filenames of downloads the driver observed since the last drain.
    ///
    /// Downloads materialize out-of-band; the driver records them as they
    /// are announced and callers hand them to the completion tracker.
    fn drain_downloads(&self) -> Vec<String>;

    /// Consume the site-redirect signal, if one was observed.
    ///
    /// The flag is raised from a response-header heuristic and cleared by
    /// this call. A raised flag means the site bounced the session back and
    /// the current stage must be re-entered.
    fn take_redirect_flag(&self) -> bool;
}
