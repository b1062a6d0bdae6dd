//! Chromium-backed driver using the DevTools Protocol.
//!
//! Owns the browser process, a single page, and the CDP event handler task
//! for the lifetime of one run. All waits are bounded by the caller.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::cdp::browser_protocol::performance;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::types::{
    BrowserDriver, DriverError, DriverResult, PageMetrics, Readiness, StylesheetInfo, Viewport,
};

/// Configuration for launching a Chromium instance
#[derive(Debug, Clone)]
pub struct CdpDriverConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Window/viewport dimensions
    pub viewport: Viewport,
    /// Extra arguments passed to the browser process
    pub chrome_args: Vec<String>,
}

impl Default for CdpDriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            chrome_args: vec![
                "--disable-gpu".to_string(),
                "--disable-dev-shm-usage".to_string(),
                "--disable-extensions".to_string(),
            ],
        }
    }
}

impl CdpDriverConfig {
    pub fn new(viewport: Viewport, headless: bool) -> Self {
        Self {
            headless,
            viewport,
            ..Default::default()
        }
    }

    /// Add an extra browser argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.chrome_args.push(arg.into());
        self
    }
}

/// Driver for a real Chromium process
pub struct CdpDriver {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    closed: bool,
}

impl CdpDriver {
    /// Launch Chromium and open a blank page.
    pub async fn launch(config: &CdpDriverConfig) -> DriverResult<Self> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(config.viewport.width, config.viewport.height);
        for arg in &config.chrome_args {
            builder = builder.arg(arg);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(DriverError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| DriverError::Launch(format!("failed to launch browser: {}", e)))?;

        // The handler task pumps CDP websocket messages until the browser
        // connection drops.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| DriverError::Launch(format!("failed to open page: {}", e)))?;

        Ok(Self {
            browser,
            page,
            handler_task: Some(handler_task),
            closed: false,
        })
    }

    /// Poll the document until it reports `readyState == "complete"` and has
    /// been quiet for a short window. Approximates network-idle over CDP.
    async fn settle(&self, deadline: Instant) -> DriverResult<()> {
        let quiet = Duration::from_millis(500);
        loop {
            let complete: bool = self
                .page
                .evaluate("document.readyState === 'complete'")
                .await
                .map_err(|e| DriverError::Eval(e.to_string()))?
                .into_value()
                .unwrap_or(false);
            if complete {
                tokio::time::sleep(quiet).await;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout(
                    "page did not reach network idle".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    async fn eval_value<T: serde::de::DeserializeOwned>(&self, expr: String) -> DriverResult<T> {
        self.page
            .evaluate(expr)
            .await
            .map_err(|e| DriverError::Eval(e.to_string()))?
            .into_value()
            .map_err(|e| DriverError::Eval(e.to_string()))
    }
}

/// Quote a string as a JavaScript string literal
fn js_literal(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[async_trait]
impl BrowserDriver for CdpDriver {
    async fn navigate(
        &mut self,
        url: &str,
        readiness: Readiness,
        timeout: Duration,
    ) -> DriverResult<()> {
        let deadline = Instant::now() + timeout;
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Err(_) => Err(DriverError::Timeout(format!(
                "navigation to {} did not complete within {:?}",
                url, timeout
            ))),
            Ok(Err(e)) => Err(DriverError::Navigation(format!(
                "navigation to {} failed: {}",
                url, e
            ))),
            Ok(Ok(_)) => match readiness {
                Readiness::ContentLoaded => Ok(()),
                Readiness::NetworkIdle => self.settle(deadline).await,
            },
        }
    }

    async fn find_first(&mut self, candidates: &[String]) -> DriverResult<Option<String>> {
        for candidate in candidates {
            if self.page.find_element(candidate.as_str()).await.is_ok() {
                return Ok(Some(candidate.clone()));
            }
        }
        Ok(None)
    }

    async fn count(&mut self, selector: &str) -> DriverResult<usize> {
        self.page
            .find_elements(selector)
            .await
            .map(|elements| elements.len())
            .map_err(|e| DriverError::Query(format!("query '{}' failed: {}", selector, e)))
    }

    async fn clear_and_type(&mut self, selector: &str, text: &str) -> DriverResult<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Query(format!("element '{}' not found: {}", selector, e)))?;

        element
            .click()
            .await
            .map_err(|e| DriverError::Input(format!("failed to focus '{}': {}", selector, e)))?;

        // Clear any prefilled value before typing
        self.page
            .evaluate(format!(
                "const el = document.querySelector({}); if (el) el.value = '';",
                js_literal(selector)
            ))
            .await
            .map_err(|e| DriverError::Eval(e.to_string()))?;

        element
            .type_str(text)
            .await
            .map_err(|e| DriverError::Input(format!("failed to type into '{}': {}", selector, e)))?;
        Ok(())
    }

    async fn submit_and_wait(&mut self, selector: &str, timeout: Duration) -> DriverResult<bool> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|e| DriverError::Query(format!("element '{}' not found: {}", selector, e)))?;

        // The wait is armed before the click resolves; arming it afterwards
        // loses navigations that start or finish while the click command is
        // still in flight.
        let (nav, clicked) = futures::join!(
            tokio::time::timeout(timeout, self.page.wait_for_navigation()),
            element.click(),
        );
        clicked
            .map_err(|e| DriverError::Input(format!("click on '{}' failed: {}", selector, e)))?;
        match nav {
            Err(_) => Ok(false),
            Ok(Err(e)) => Err(DriverError::Navigation(format!(
                "waiting for navigation failed: {}",
                e
            ))),
            Ok(Ok(_)) => Ok(true),
        }
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> DriverResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();
        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| DriverError::Screenshot(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }

    async fn current_url(&mut self) -> DriverResult<String> {
        self.page
            .url()
            .await
            .map(|url| url.unwrap_or_default())
            .map_err(|e| DriverError::Eval(e.to_string()))
    }

    async fn page_title(&mut self) -> DriverResult<String> {
        self.page
            .get_title()
            .await
            .map(|title| title.unwrap_or_default())
            .map_err(|e| DriverError::Eval(e.to_string()))
    }

    async fn text_present(&mut self, text: &str) -> DriverResult<bool> {
        self.eval_value(format!(
            "document.body ? document.body.innerText.includes({}) : false",
            js_literal(text)
        ))
        .await
    }

    async fn fetch_status(&mut self, url: &str) -> DriverResult<u16> {
        // In-page fetch so cookies and same-origin policy match what the app sees
        self.eval_value(format!(
            "fetch({}).then(r => r.status).catch(() => 0)",
            js_literal(url)
        ))
        .await
    }

    async fn stylesheets(&mut self) -> DriverResult<Vec<StylesheetInfo>> {
        self.eval_value(
            "Array.from(document.querySelectorAll('link[rel=\"stylesheet\"]'))\
             .map(l => ({href: l.href, loaded: l.sheet !== null}))"
                .to_string(),
        )
        .await
    }

    async fn metrics(&mut self) -> DriverResult<PageMetrics> {
        self.page
            .execute(performance::EnableParams::default())
            .await
            .map_err(|e| DriverError::Eval(format!("performance enable failed: {}", e)))?;
        let response = self
            .page
            .execute(performance::GetMetricsParams::default())
            .await
            .map_err(|e| DriverError::Eval(format!("metrics read failed: {}", e)))?;

        let mut metrics = PageMetrics::default();
        for metric in &response.metrics {
            // CDP reports durations in seconds
            match metric.name.as_str() {
                "LayoutDuration" => metrics.layout_duration_ms = metric.value * 1000.0,
                "ScriptDuration" => metrics.script_duration_ms = metric.value * 1000.0,
                _ => {}
            }
        }
        Ok(metrics)
    }

    async fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self
            .browser
            .close()
            .await
            .map_err(|e| DriverError::Launch(format!("browser close failed: {}", e)));
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_js_literal_escapes_quotes() {
        assert_eq!(js_literal("plain"), "\"plain\"");
        assert_eq!(js_literal("a\"b"), "\"a\\\"b\"");
    }

    #[test]
    fn test_config_defaults() {
        let config = CdpDriverConfig::default();
        assert!(config.headless);
        assert_eq!(config.viewport, Viewport::default());
        assert!(config.chrome_args.iter().any(|a| a == "--disable-gpu"));
    }

    #[test]
    fn test_config_extra_arg() {
        let config = CdpDriverConfig::new(Viewport::new(800, 600), false).arg("--lang=en-US");
        assert!(!config.headless);
        assert_eq!(config.chrome_args.last().map(String::as_str), Some("--lang=en-US"));
    }
}
