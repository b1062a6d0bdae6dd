//! Read-only observation checks.
//!
//! Checks run after authentication, against whatever page the session landed
//! on. Each check is independent: it inspects the page, records a pass/fail
//! step, and never mutates page state or affects the session verdict.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::driver::{BrowserDriver, DriverResult};
use crate::report::{StepKind, StepResult};

/// A configurable post-login observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "check", rename_all = "snake_case")]
pub enum ObservationCheck {
    /// At least `min` elements match `selector`
    RegionCount { selector: String, min: usize },
    /// The visible page text contains `text`
    Label { text: String },
    /// Fetching `path` (resolved against the base URL) returns a 2xx status
    AssetFetch { path: String },
    /// Every `link[rel=stylesheet]` on the page actually loaded
    Stylesheets,
    /// Report layout and script durations (diagnostic, always passes)
    Metrics,
}

impl ObservationCheck {
    /// Short name used in step records
    pub fn name(&self) -> String {
        match self {
            ObservationCheck::RegionCount { selector, .. } => format!("regions {}", selector),
            ObservationCheck::Label { text } => format!("label '{}'", text),
            ObservationCheck::AssetFetch { path } => format!("asset {}", path),
            ObservationCheck::Stylesheets => "stylesheets".to_string(),
            ObservationCheck::Metrics => "metrics".to_string(),
        }
    }

    /// Parse a region spec of the form `MIN=SELECTOR`, or a bare selector
    /// (minimum of one).
    pub fn parse_region(spec: &str) -> Self {
        if let Some((head, tail)) = spec.split_once('=') {
            if let Ok(min) = head.trim().parse::<usize>() {
                return ObservationCheck::RegionCount {
                    selector: tail.trim().to_string(),
                    min,
                };
            }
        }
        ObservationCheck::RegionCount {
            selector: spec.trim().to_string(),
            min: 1,
        }
    }

    /// Run the check against the current page.
    ///
    /// Driver failures become Failure steps; this never propagates an error
    /// so one broken check cannot take down the rest of the run.
    pub async fn run(&self, driver: &mut dyn BrowserDriver, base_url: &str) -> StepResult {
        match self.evaluate(driver, base_url).await {
            Ok(step) => step,
            Err(err) => {
                StepResult::failure(StepKind::Observe, self.name(), err.to_string())
            }
        }
    }

    async fn evaluate(
        &self,
        driver: &mut dyn BrowserDriver,
        base_url: &str,
    ) -> DriverResult<StepResult> {
        let name = self.name();
        let step = match self {
            ObservationCheck::RegionCount { selector, min } => {
                let count = driver.count(selector).await?;
                if count >= *min {
                    StepResult::success(StepKind::Observe, name)
                        .with_detail(format!("{} elements", count))
                } else {
                    StepResult::failure(
                        StepKind::Observe,
                        name,
                        format!("{} elements, expected at least {}", count, min),
                    )
                }
            }
            ObservationCheck::Label { text } => {
                if driver.text_present(text).await? {
                    StepResult::success(StepKind::Observe, name)
                } else {
                    StepResult::failure(StepKind::Observe, name, "text not found on page")
                }
            }
            ObservationCheck::AssetFetch { path } => {
                let target = resolve_asset_url(base_url, path);
                let status = driver.fetch_status(&target).await?;
                if (200..300).contains(&status) {
                    StepResult::success(StepKind::Observe, name)
                        .with_detail(format!("HTTP {}", status))
                } else {
                    StepResult::failure(StepKind::Observe, name, format!("HTTP {}", status))
                }
            }
            ObservationCheck::Stylesheets => {
                let sheets = driver.stylesheets().await?;
                let unloaded: Vec<&str> = sheets
                    .iter()
                    .filter(|s| !s.loaded)
                    .map(|s| s.href.as_str())
                    .collect();
                if unloaded.is_empty() {
                    StepResult::success(StepKind::Observe, name)
                        .with_detail(format!("{} stylesheets loaded", sheets.len()))
                } else {
                    StepResult::failure(
                        StepKind::Observe,
                        name,
                        format!("not loaded: {}", unloaded.join(", ")),
                    )
                }
            }
            ObservationCheck::Metrics => {
                let metrics = driver.metrics().await?;
                StepResult::success(StepKind::Observe, name).with_detail(format!(
                    "layout {:.1}ms, script {:.1}ms",
                    metrics.layout_duration_ms, metrics.script_duration_ms
                ))
            }
        };
        Ok(step)
    }
}

/// Resolve an asset path against the base URL. Falls back to plain
/// concatenation when the base does not parse.
fn resolve_asset_url(base_url: &str, path: &str) -> String {
    match Url::parse(base_url).and_then(|base| base.join(path)) {
        Ok(joined) => joined.to_string(),
        Err(_) => format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/')),
    }
}
