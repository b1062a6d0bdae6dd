//! web-smoke - Browser-driven smoke testing for authenticated web apps.
//!
//! This crate provides:
//! - A single-command session pipeline: navigate, log in, capture, observe
//! - Chromium automation via the DevTools Protocol (chromiumoxide)
//! - A scripted mock driver for tests
//! - Screenshot evidence with organized per-run directories
//! - Configurable read-only post-login checks
//!
//! # Example
//!
//! ```rust,no_run
//! use web_smoke::evidence::EvidenceDir;
//! use web_smoke::runner::{SessionConfig, SmokeRunner};
//!
//! # async fn demo() {
//! let config = SessionConfig::new("http://localhost:8080")
//!     .credentials("Administrator", "admin");
//! let evidence = EvidenceDir::with_name("erp");
//! evidence.init(&config.base_url).unwrap();
//!
//! let report = SmokeRunner::new(config).run(&evidence).await;
//! println!("{}", report.render_console());
//! # }
//! ```

pub mod checks;
pub mod config;
pub mod driver;
pub mod evidence;
pub mod report;
pub mod runner;
pub mod selectors;

// Re-export driver types and implementations
pub use driver::{
    AuthBehavior, BrowserDriver, CdpDriver, CdpDriverConfig, DriverError, DriverResult,
    MockDriver, NavBehavior, PageMetrics, Readiness, StylesheetInfo, Viewport,
};

// Re-export report types
pub use report::{Outcome, SessionReport, StepKind, StepResult, Verdict};

// Re-export the runner
pub use runner::{SessionConfig, SmokeRunner};

// Re-export selector and check types
pub use checks::ObservationCheck;
pub use selectors::{FormLookup, LoginSelectors, ResolvedLoginForm};

// Re-export evidence management
pub use evidence::{EvidenceDir, cleanup_old_runs, list_runs};
