//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for web-smoke, supporting:
//! - Environment variables for all configurable values
//! - Sensible defaults for a local development target
//! - Plain settings structs for programmatic configuration
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `WEB_SMOKE_BASE_URL` | Base URL of the target application | `http://localhost` |
//! | `WEB_SMOKE_USERNAME` | Login username | `Administrator` |
//! | `WEB_SMOKE_PASSWORD` | Login password | (empty) |
//! | `WEB_SMOKE_EVIDENCE_DIR` | Base directory for evidence runs | `/tmp/web-smoke` |
//! | `WEB_SMOKE_NAV_TIMEOUT` | Navigation timeout in seconds | `30` |
//! | `WEB_SMOKE_AUTH_TIMEOUT` | Authentication timeout in seconds | `30` |
//! | `WEB_SMOKE_BUDGET` | Overall run budget in seconds | `120` |
//! | `WEB_SMOKE_GRACE` | Pre-teardown grace delay in seconds | `0` |
//! | `WEB_SMOKE_VIEWPORT` | Viewport preset or WxH | `hd` |
//! | `WEB_SMOKE_LOGIN_TOKEN` | URL substring marking the login page | `login` |
//!
//! # Example
//!
//! ```bash
//! export WEB_SMOKE_BASE_URL="http://erp.localhost:8080"
//! export WEB_SMOKE_PASSWORD="admin"
//! export WEB_SMOKE_VIEWPORT="fhd"
//! ```

use std::env;
use std::sync::OnceLock;

use crate::driver::Viewport;

// ============================================================================
// Default Values
// ============================================================================

/// Default base URL of the target application
pub const DEFAULT_BASE_URL: &str = "http://localhost";

/// Default login username
pub const DEFAULT_USERNAME: &str = "Administrator";

/// Default navigation timeout (seconds)
pub const DEFAULT_NAV_TIMEOUT: u64 = 30;

/// Default authentication timeout (seconds)
pub const DEFAULT_AUTH_TIMEOUT: u64 = 30;

/// Default overall run budget (seconds)
pub const DEFAULT_BUDGET: u64 = 120;

/// Default pre-teardown grace delay (seconds)
pub const DEFAULT_GRACE: u64 = 0;

/// Default evidence base directory
pub const DEFAULT_EVIDENCE_DIR: &str = "/tmp/web-smoke";

/// Default viewport preset
pub const DEFAULT_VIEWPORT: &str = "hd";

/// Default URL substring identifying the login page
pub const DEFAULT_LOGIN_TOKEN: &str = "login";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the base URL
pub const ENV_BASE_URL: &str = "WEB_SMOKE_BASE_URL";

/// Environment variable for the username
pub const ENV_USERNAME: &str = "WEB_SMOKE_USERNAME";

/// Environment variable for the password
pub const ENV_PASSWORD: &str = "WEB_SMOKE_PASSWORD";

/// Environment variable for the evidence directory
pub const ENV_EVIDENCE_DIR: &str = "WEB_SMOKE_EVIDENCE_DIR";

/// Environment variable for the navigation timeout
pub const ENV_NAV_TIMEOUT: &str = "WEB_SMOKE_NAV_TIMEOUT";

/// Environment variable for the authentication timeout
pub const ENV_AUTH_TIMEOUT: &str = "WEB_SMOKE_AUTH_TIMEOUT";

/// Environment variable for the overall budget
pub const ENV_BUDGET: &str = "WEB_SMOKE_BUDGET";

/// Environment variable for the grace delay
pub const ENV_GRACE: &str = "WEB_SMOKE_GRACE";

/// Environment variable for the viewport
pub const ENV_VIEWPORT: &str = "WEB_SMOKE_VIEWPORT";

/// Environment variable for the login token
pub const ENV_LOGIN_TOKEN: &str = "WEB_SMOKE_LOGIN_TOKEN";

// ============================================================================
// Configuration Getters (with caching)
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Centralized configuration for web-smoke
#[derive(Debug, Clone)]
pub struct Config {
    /// Target application settings
    pub target: TargetSettings,
    /// Timing settings
    pub timing: TimingSettings,
    /// Evidence settings
    pub evidence: EvidenceSettings,
}

/// Target application settings
#[derive(Debug, Clone)]
pub struct TargetSettings {
    /// Base URL of the application under test
    pub base_url: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Viewport preset or WxH string
    pub viewport: String,
    /// URL substring marking the login page
    pub login_token: String,
}

/// Timing settings, all in seconds
#[derive(Debug, Clone)]
pub struct TimingSettings {
    /// Navigation timeout
    pub nav_timeout: u64,
    /// Authentication timeout
    pub auth_timeout: u64,
    /// Overall run budget
    pub budget: u64,
    /// Pre-teardown grace delay
    pub grace: u64,
}

/// Evidence settings
#[derive(Debug, Clone)]
pub struct EvidenceSettings {
    /// Base directory for evidence runs
    pub base_dir: String,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            target: TargetSettings::from_env(),
            timing: TimingSettings::from_env(),
            evidence: EvidenceSettings::from_env(),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            target: TargetSettings::defaults(),
            timing: TimingSettings::defaults(),
            evidence: EvidenceSettings::defaults(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

impl TargetSettings {
    /// Create target settings from environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            username: env::var(ENV_USERNAME).unwrap_or_else(|_| DEFAULT_USERNAME.to_string()),
            password: env::var(ENV_PASSWORD).unwrap_or_default(),
            viewport: env::var(ENV_VIEWPORT).unwrap_or_else(|_| DEFAULT_VIEWPORT.to_string()),
            login_token: env::var(ENV_LOGIN_TOKEN)
                .unwrap_or_else(|_| DEFAULT_LOGIN_TOKEN.to_string()),
        }
    }

    /// Create target settings with defaults
    pub fn defaults() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: String::new(),
            viewport: DEFAULT_VIEWPORT.to_string(),
            login_token: DEFAULT_LOGIN_TOKEN.to_string(),
        }
    }
}

impl TimingSettings {
    /// Create timing settings from environment variables
    pub fn from_env() -> Self {
        Self {
            nav_timeout: env::var(ENV_NAV_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_NAV_TIMEOUT),
            auth_timeout: env::var(ENV_AUTH_TIMEOUT)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_AUTH_TIMEOUT),
            budget: env::var(ENV_BUDGET)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BUDGET),
            grace: env::var(ENV_GRACE)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_GRACE),
        }
    }

    /// Create timing settings with defaults
    pub fn defaults() -> Self {
        Self {
            nav_timeout: DEFAULT_NAV_TIMEOUT,
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            budget: DEFAULT_BUDGET,
            grace: DEFAULT_GRACE,
        }
    }
}

impl EvidenceSettings {
    /// Create evidence settings from environment variables
    pub fn from_env() -> Self {
        Self {
            base_dir: env::var(ENV_EVIDENCE_DIR)
                .unwrap_or_else(|_| DEFAULT_EVIDENCE_DIR.to_string()),
        }
    }

    /// Create evidence settings with defaults
    pub fn defaults() -> Self {
        Self {
            base_dir: DEFAULT_EVIDENCE_DIR.to_string(),
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Parse a viewport string into dimensions
/// Supports: "hd" (1280x720), "fhd" (1920x1080), "tablet" (1024x768), or "WxH"
pub fn parse_viewport(size: &str) -> Option<Viewport> {
    match size.to_lowercase().as_str() {
        "hd" => Some(Viewport::new(1280, 720)),
        "fhd" => Some(Viewport::new(1920, 1080)),
        "tablet" => Some(Viewport::new(1024, 768)),
        custom => {
            let parts: Vec<&str> = custom.split('x').collect();
            if parts.len() == 2 {
                let w = parts[0].parse().ok()?;
                let h = parts[1].parse().ok()?;
                Some(Viewport::new(w, h))
            } else {
                None
            }
        }
    }
}

/// Get the evidence base directory (convenience function)
pub fn evidence_base_dir() -> String {
    get().evidence.base_dir.clone()
}
