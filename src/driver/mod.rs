//! Browser driver abstraction.
//!
//! The runner talks to pages through the `BrowserDriver` trait; the two
//! implementations are `CdpDriver` (real Chromium over the DevTools
//! Protocol) and `MockDriver` (scripted pages for tests).

pub mod cdp;
pub mod mock;
pub mod types;

pub use cdp::{CdpDriver, CdpDriverConfig};
pub use mock::{AuthBehavior, MockDriver, NavBehavior};
pub use types::{
    BrowserDriver, DriverError, DriverResult, PageMetrics, Readiness, StylesheetInfo, Viewport,
};
