// Core types for the browser driver abstraction

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Browser viewport dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

/// Page readiness condition a navigation waits for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    /// DOM content loaded; scripts and subresources may still be in flight
    ContentLoaded,
    /// Load event fired and the page has been quiet for a short window
    NetworkIdle,
}

impl Readiness {
    /// Parse a readiness mode name. Accepts the puppeteer-style spellings.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "domcontentloaded" | "load" | "content-loaded" => Some(Self::ContentLoaded),
            "networkidle" | "networkidle2" | "network-idle" => Some(Self::NetworkIdle),
            _ => None,
        }
    }
}

/// Rendering cost metrics reported by the page
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    /// Total time spent in layout (milliseconds)
    pub layout_duration_ms: f64,
    /// Total time spent executing script (milliseconds)
    pub script_duration_ms: f64,
}

/// One `link[rel=stylesheet]` entry observed on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylesheetInfo {
    /// Resolved href of the stylesheet
    pub href: String,
    /// Whether the sheet object is attached (the CSS actually parsed)
    pub loaded: bool,
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// Error types for driver operations
#[derive(Debug)]
pub enum DriverError {
    /// Browser process could not be acquired
    Launch(String),

    /// Navigation failed outright (DNS, refused connection, protocol error)
    Navigation(String),

    /// An operation exceeded its time bound
    Timeout(String),

    /// DOM query failed or matched nothing
    Query(String),

    /// Keyboard/mouse interaction failed
    Input(String),

    /// Screenshot capture or encoding failed
    Screenshot(String),

    /// In-page script evaluation failed
    Eval(String),

    /// I/O error
    Io(std::io::Error),
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverError::Launch(msg) => write!(f, "Launch error: {}", msg),
            DriverError::Navigation(msg) => write!(f, "Navigation error: {}", msg),
            DriverError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            DriverError::Query(msg) => write!(f, "Query error: {}", msg),
            DriverError::Input(msg) => write!(f, "Input error: {}", msg),
            DriverError::Screenshot(msg) => write!(f, "Screenshot error: {}", msg),
            DriverError::Eval(msg) => write!(f, "Evaluation error: {}", msg),
            DriverError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        DriverError::Io(err)
    }
}

/// Trait for browser drivers
///
/// Implementations provide the page-level capabilities the smoke runner
/// orchestrates:
/// - `CdpDriver` for a real Chromium via the DevTools Protocol
/// - `MockDriver` for scripted pages in tests
#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate to `url` and wait for the readiness condition.
    ///
    /// Returns `DriverError::Timeout` when the readiness condition was not
    /// reached in time; the page may still be partially usable afterwards.
    async fn navigate(&mut self, url: &str, readiness: Readiness, timeout: Duration)
    -> DriverResult<()>;

    /// Try each selector candidate in order; return the first that matches
    /// an element on the current page, or `None` when none do.
    async fn find_first(&mut self, candidates: &[String]) -> DriverResult<Option<String>>;

    /// Count elements matching a selector (0 when none match).
    async fn count(&mut self, selector: &str) -> DriverResult<usize>;

    /// Clear the value of an input element and type `text` into it.
    async fn clear_and_type(&mut self, selector: &str, text: &str) -> DriverResult<()>;

    /// Click the submit control and wait for the resulting navigation.
    ///
    /// The navigation wait must be armed together with the click, so a
    /// redirect that starts or finishes quickly cannot slip past it.
    /// Returns `Ok(true)` when the navigation signal arrived, `Ok(false)`
    /// when the timeout elapsed first. The timeout is not an error: the
    /// caller falls back to inspecting the current URL.
    async fn submit_and_wait(&mut self, selector: &str, timeout: Duration) -> DriverResult<bool>;

    /// Capture a screenshot of the current page to `path` (PNG).
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> DriverResult<()>;

    /// The URL the page currently shows.
    async fn current_url(&mut self) -> DriverResult<String>;

    /// The current document title.
    async fn page_title(&mut self) -> DriverResult<String>;

    /// Whether the visible page text contains `text`.
    async fn text_present(&mut self, text: &str) -> DriverResult<bool>;

    /// Fetch `url` from within the page context and return the HTTP status.
    async fn fetch_status(&mut self, url: &str) -> DriverResult<u16>;

    /// List the stylesheets referenced by the current document.
    async fn stylesheets(&mut self) -> DriverResult<Vec<StylesheetInfo>>;

    /// Read rendering cost metrics for the current page.
    async fn metrics(&mut self) -> DriverResult<PageMetrics>;

    /// Release the browser. Must be safe to call more than once.
    async fn close(&mut self) -> DriverResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readiness_from_str() {
        assert_eq!(Readiness::from_str("domcontentloaded"), Some(Readiness::ContentLoaded));
        assert_eq!(Readiness::from_str("load"), Some(Readiness::ContentLoaded));
        assert_eq!(Readiness::from_str("networkidle2"), Some(Readiness::NetworkIdle));
        assert_eq!(Readiness::from_str("NetworkIdle"), Some(Readiness::NetworkIdle));
        assert_eq!(Readiness::from_str("whenever"), None);
    }

    #[test]
    fn test_viewport_default() {
        let vp = Viewport::default();
        assert_eq!(vp.width, 1280);
        assert_eq!(vp.height, 720);
    }

    #[test]
    fn test_driver_error_display() {
        let err = DriverError::Launch("no chrome".to_string());
        assert_eq!(err.to_string(), "Launch error: no chrome");

        let err = DriverError::Timeout("navigation".to_string());
        assert!(err.to_string().starts_with("Timeout"));
    }
}
