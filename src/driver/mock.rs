//! Scripted in-memory driver for tests.
//!
//! `MockDriver` plays back a configured page: which selectors exist, how
//! navigation behaves, where authentication lands. Screenshots are rendered
//! as labeled placeholder PNGs so evidence paths are exercised for real.

use async_trait::async_trait;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{ImageBuffer, RgbImage};
use std::collections::HashMap;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::types::{
    BrowserDriver, DriverError, DriverResult, PageMetrics, Readiness, StylesheetInfo,
};

/// How a scripted navigation resolves
#[derive(Debug, Clone)]
pub enum NavBehavior {
    /// Navigation completes and lands on the requested URL
    Succeed,
    /// Readiness is never reached in time
    Timeout,
    /// Navigation fails outright with the given message
    Fail(String),
    /// Navigation never returns; only an outer budget can end the run
    Hang,
}

/// Where a scripted authentication attempt lands
#[derive(Debug, Clone)]
pub enum AuthBehavior {
    /// Navigation signal fires and the page lands on `to`
    Redirect { to: String },
    /// Navigation signal fires but the page lands back on `login_url`
    BackToLogin { login_url: String },
    /// No navigation signal; the page quietly ends up at `final_url`
    SignalTimeout { final_url: String },
}

/// A scripted page driver for tests
///
/// Built with chained setters, then handed to the runner:
///
/// ```ignore
/// let mut driver = MockDriver::new("http://site/login")
///     .with_selectors(["input[name=usr]", "input[type=password]", "button"])
///     .with_auth(AuthBehavior::Redirect { to: "http://site/app".into() });
/// ```
pub struct MockDriver {
    current_url: String,
    title: String,
    nav_behavior: NavBehavior,
    auth_behavior: AuthBehavior,
    /// Selectors that match an element on the scripted page
    selectors: Vec<String>,
    /// Element counts per selector, for region checks
    region_counts: HashMap<String, usize>,
    /// Text fragments present in the page body
    page_text: Vec<String>,
    /// HTTP statuses returned for in-page fetches, keyed by URL suffix
    asset_statuses: HashMap<String, u16>,
    stylesheet_entries: Vec<StylesheetInfo>,
    page_metrics: PageMetrics,
    fail_screenshot: bool,
    close_count: Arc<AtomicUsize>,
    actions: Vec<String>,
}

impl MockDriver {
    pub fn new(initial_url: impl Into<String>) -> Self {
        Self {
            current_url: initial_url.into(),
            title: "Mock Page".to_string(),
            nav_behavior: NavBehavior::Succeed,
            auth_behavior: AuthBehavior::Redirect {
                to: "http://localhost/app".to_string(),
            },
            selectors: Vec::new(),
            region_counts: HashMap::new(),
            page_text: Vec::new(),
            asset_statuses: HashMap::new(),
            stylesheet_entries: Vec::new(),
            page_metrics: PageMetrics::default(),
            fail_screenshot: false,
            close_count: Arc::new(AtomicUsize::new(0)),
            actions: Vec::new(),
        }
    }

    /// Set how navigations resolve
    pub fn with_nav(mut self, behavior: NavBehavior) -> Self {
        self.nav_behavior = behavior;
        self
    }

    /// Set where authentication lands
    pub fn with_auth(mut self, behavior: AuthBehavior) -> Self {
        self.auth_behavior = behavior;
        self
    }

    /// Declare which selectors match elements on the page
    pub fn with_selectors(mut self, selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.selectors.extend(selectors.into_iter().map(Into::into));
        self
    }

    /// Set the element count a selector reports
    pub fn with_region_count(mut self, selector: impl Into<String>, count: usize) -> Self {
        self.region_counts.insert(selector.into(), count);
        self
    }

    /// Add text visible in the page body
    pub fn with_text(mut self, text: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.page_text.extend(text.into_iter().map(Into::into));
        self
    }

    /// Set the status an in-page fetch returns for URLs ending in `suffix`
    pub fn with_asset_status(mut self, suffix: impl Into<String>, status: u16) -> Self {
        self.asset_statuses.insert(suffix.into(), status);
        self
    }

    /// Add a stylesheet entry the page reports
    pub fn with_stylesheet(mut self, href: impl Into<String>, loaded: bool) -> Self {
        self.stylesheet_entries.push(StylesheetInfo {
            href: href.into(),
            loaded,
        });
        self
    }

    /// Set the rendering metrics the page reports
    pub fn with_metrics(mut self, metrics: PageMetrics) -> Self {
        self.page_metrics = metrics;
        self
    }

    /// Set the document title
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Make every screenshot attempt fail
    pub fn with_failing_screenshots(mut self) -> Self {
        self.fail_screenshot = true;
        self
    }

    /// Handle to the close-call counter, for asserting teardown happens
    /// exactly once even after the driver is consumed by a run.
    pub fn close_count(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_count)
    }

    /// Ordered log of driver operations performed so far
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    fn has_selector(&self, selector: &str) -> bool {
        self.selectors.iter().any(|s| s == selector)
    }

    /// Render a labeled placeholder page: header bar with the title, body
    /// with the current URL.
    fn render_placeholder(&self) -> RgbImage {
        let (width, height) = (320u32, 200u32);
        let mut buffer = vec![0u8; (width * height * 3) as usize];

        fill(&mut buffer, width, 0, width, height, [240, 240, 240]);
        fill(&mut buffer, width, 0, width, 24, [40, 60, 120]);
        draw_text(&mut buffer, width, height, 8, 8, &self.title, [255, 255, 255]);
        draw_text(&mut buffer, width, height, 8, 40, &self.current_url, [30, 30, 30]);

        ImageBuffer::from_raw(width, height, buffer)
            .unwrap_or_else(|| ImageBuffer::new(width, height))
    }
}

fn fill(buffer: &mut [u8], stride: u32, x: u32, w: u32, h: u32, color: [u8; 3]) {
    for py in 0..h {
        for px in x..(x + w).min(stride) {
            let idx = ((py * stride + px) * 3) as usize;
            if idx + 2 < buffer.len() {
                buffer[idx] = color[0];
                buffer[idx + 1] = color[1];
                buffer[idx + 2] = color[2];
            }
        }
    }
}

fn draw_text(buffer: &mut [u8], width: u32, height: u32, x: u32, y: u32, text: &str, fg: [u8; 3]) {
    let mut cursor_x = x;
    for ch in text.chars() {
        let glyph = BASIC_FONTS.get(ch).unwrap_or([0u8; 8]);
        for (row_idx, row) in glyph.iter().enumerate() {
            let py = y + row_idx as u32;
            if py >= height {
                break;
            }
            for bit in 0..8 {
                let px = cursor_x + bit;
                if px >= width {
                    break;
                }
                // font8x8 stores LSB as leftmost pixel
                if (row >> bit) & 1 == 1 {
                    let idx = ((py * width + px) * 3) as usize;
                    buffer[idx] = fg[0];
                    buffer[idx + 1] = fg[1];
                    buffer[idx + 2] = fg[2];
                }
            }
        }
        cursor_x += 8;
        if cursor_x >= width {
            break;
        }
    }
}

#[async_trait]
impl BrowserDriver for MockDriver {
    async fn navigate(
        &mut self,
        url: &str,
        _readiness: Readiness,
        timeout: Duration,
    ) -> DriverResult<()> {
        self.actions.push(format!("navigate {}", url));
        match &self.nav_behavior {
            NavBehavior::Succeed => {
                self.current_url = url.to_string();
                Ok(())
            }
            NavBehavior::Timeout => Err(DriverError::Timeout(format!(
                "navigation to {} did not complete within {:?}",
                url, timeout
            ))),
            NavBehavior::Fail(msg) => Err(DriverError::Navigation(msg.clone())),
            NavBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn find_first(&mut self, candidates: &[String]) -> DriverResult<Option<String>> {
        Ok(candidates
            .iter()
            .find(|c| self.has_selector(c))
            .cloned())
    }

    async fn count(&mut self, selector: &str) -> DriverResult<usize> {
        if let Some(count) = self.region_counts.get(selector) {
            return Ok(*count);
        }
        Ok(if self.has_selector(selector) { 1 } else { 0 })
    }

    async fn clear_and_type(&mut self, selector: &str, text: &str) -> DriverResult<()> {
        if !self.has_selector(selector) {
            return Err(DriverError::Query(format!(
                "element '{}' not found",
                selector
            )));
        }
        self.actions
            .push(format!("type {} chars into {}", text.len(), selector));
        Ok(())
    }

    async fn submit_and_wait(&mut self, selector: &str, _timeout: Duration) -> DriverResult<bool> {
        if !self.has_selector(selector) {
            return Err(DriverError::Query(format!(
                "element '{}' not found",
                selector
            )));
        }
        self.actions.push(format!("submit {}", selector));
        match self.auth_behavior.clone() {
            AuthBehavior::Redirect { to } => {
                self.current_url = to;
                Ok(true)
            }
            AuthBehavior::BackToLogin { login_url } => {
                self.current_url = login_url;
                Ok(true)
            }
            AuthBehavior::SignalTimeout { final_url } => {
                self.current_url = final_url;
                Ok(false)
            }
        }
    }

    async fn screenshot(&mut self, path: &Path, _full_page: bool) -> DriverResult<()> {
        self.actions.push(format!("screenshot {}", path.display()));
        if self.fail_screenshot {
            return Err(DriverError::Screenshot(
                "capture rejected by mock".to_string(),
            ));
        }
        let img = self.render_placeholder();
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .map_err(|e| DriverError::Screenshot(format!("failed to encode PNG: {}", e)))?;
        fs::write(path, &bytes)?;
        Ok(())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        Ok(self.current_url.clone())
    }

    async fn page_title(&mut self) -> DriverResult<String> {
        Ok(self.title.clone())
    }

    async fn text_present(&mut self, text: &str) -> DriverResult<bool> {
        Ok(self.page_text.iter().any(|t| t.contains(text)))
    }

    async fn fetch_status(&mut self, url: &str) -> DriverResult<u16> {
        for (suffix, status) in &self.asset_statuses {
            if url.ends_with(suffix.as_str()) {
                return Ok(*status);
            }
        }
        Ok(404)
    }

    async fn stylesheets(&mut self) -> DriverResult<Vec<StylesheetInfo>> {
        Ok(self.stylesheet_entries.clone())
    }

    async fn metrics(&mut self) -> DriverResult<PageMetrics> {
        Ok(self.page_metrics)
    }

    async fn close(&mut self) -> DriverResult<()> {
        self.actions.push("close".to_string());
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
