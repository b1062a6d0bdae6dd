//! The smoke-test session pipeline.
//!
//! `SmokeRunner` drives one session end to end: navigate to the target,
//! locate the login form, authenticate, capture screenshot evidence, run
//! observation checks, and tear the browser down. The runner is total: it
//! never returns an error, fatal step failures become report entries and a
//! Failed verdict.

use chrono::Utc;
use std::time::Duration;

use crate::checks::ObservationCheck;
use crate::config;
use crate::driver::{
    BrowserDriver, CdpDriver, CdpDriverConfig, DriverError, Readiness, Viewport,
};
use crate::evidence::EvidenceDir;
use crate::report::{SessionReport, StepKind, StepResult, Verdict};
use crate::selectors::{FormLookup, LoginSelectors, ResolvedLoginForm};

/// Configuration for one smoke-test session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL the session navigates to first
    pub base_url: String,
    /// Login username
    pub username: String,
    /// Login password
    pub password: String,
    /// Navigation timeout
    pub nav_timeout: Duration,
    /// Authentication timeout (waiting for the post-submit navigation)
    pub auth_timeout: Duration,
    /// Wall-clock budget for the whole pipeline before teardown
    pub budget: Duration,
    /// Delay before teardown, for watching a headed browser
    pub teardown_grace: Duration,
    /// Browser viewport
    pub viewport: Viewport,
    /// Run without a visible window
    pub headless: bool,
    /// Readiness condition navigations wait for
    pub readiness: Readiness,
    /// URL substring that marks the login page
    pub login_token: String,
    /// Selector candidates for the login form controls
    pub selectors: LoginSelectors,
    /// Post-login observation checks
    pub checks: Vec<ObservationCheck>,
    /// Capture full-page screenshots instead of the viewport
    pub full_page: bool,
}

impl SessionConfig {
    /// Create a config for the given target with default timing and selectors
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            username: config::DEFAULT_USERNAME.to_string(),
            password: String::new(),
            nav_timeout: Duration::from_secs(config::DEFAULT_NAV_TIMEOUT),
            auth_timeout: Duration::from_secs(config::DEFAULT_AUTH_TIMEOUT),
            budget: Duration::from_secs(config::DEFAULT_BUDGET),
            teardown_grace: Duration::from_secs(config::DEFAULT_GRACE),
            viewport: Viewport::default(),
            headless: true,
            readiness: Readiness::NetworkIdle,
            login_token: config::DEFAULT_LOGIN_TOKEN.to_string(),
            selectors: LoginSelectors::default(),
            checks: Vec::new(),
            full_page: false,
        }
    }

    /// Set the login credentials
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Set the viewport
    pub fn viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    /// Run with a visible browser window
    pub fn headed(mut self) -> Self {
        self.headless = false;
        self
    }

    /// Set the navigation timeout
    pub fn nav_timeout(mut self, timeout: Duration) -> Self {
        self.nav_timeout = timeout;
        self
    }

    /// Set the authentication timeout
    pub fn auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Set the overall run budget
    pub fn budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Set the pre-teardown grace delay
    pub fn teardown_grace(mut self, grace: Duration) -> Self {
        self.teardown_grace = grace;
        self
    }

    /// Set the readiness condition for navigations
    pub fn readiness(mut self, readiness: Readiness) -> Self {
        self.readiness = readiness;
        self
    }

    /// Set the login-page URL token
    pub fn login_token(mut self, token: impl Into<String>) -> Self {
        self.login_token = token.into();
        self
    }

    /// Set the login form selector candidates
    pub fn selectors(mut self, selectors: LoginSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    /// Set the post-login observation checks
    pub fn checks(mut self, checks: Vec<ObservationCheck>) -> Self {
        self.checks = checks;
        self
    }

    /// Capture full-page screenshots
    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }
}

/// Mutable state accumulated while the pipeline executes.
///
/// Lives outside the budget timeout so steps recorded before budget
/// exhaustion survive into the final report.
struct RunState {
    steps: Vec<StepResult>,
    final_url: Option<String>,
    form_found: bool,
    auth_ok: bool,
}

/// Runs smoke-test sessions
pub struct SmokeRunner {
    config: SessionConfig,
}

impl SmokeRunner {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run a full session against a real Chromium instance.
    pub async fn run(&self, evidence: &EvidenceDir) -> SessionReport {
        let started = Utc::now();
        let driver_config = CdpDriverConfig::new(self.config.viewport, self.config.headless);
        match CdpDriver::launch(&driver_config).await {
            Ok(mut driver) => self.run_with_driver(&mut driver, evidence).await,
            Err(err) => SessionReport {
                started_at: started,
                finished_at: Utc::now(),
                steps: vec![StepResult::failure(
                    StepKind::Launch,
                    "launch browser",
                    err.to_string(),
                )],
                verdict: Verdict::Failed,
                final_url: None,
            },
        }
    }

    /// Run a full session against an already-launched driver.
    ///
    /// The pipeline body runs under the configured budget; teardown runs
    /// unconditionally afterwards, exactly once, budget or not.
    pub async fn run_with_driver(
        &self,
        driver: &mut dyn BrowserDriver,
        evidence: &EvidenceDir,
    ) -> SessionReport {
        let started = Utc::now();
        let mut state = RunState {
            steps: Vec::new(),
            final_url: None,
            form_found: false,
            auth_ok: false,
        };

        state.steps.push(
            StepResult::success(StepKind::Launch, "browser ready").with_detail(format!(
                "{}x{}",
                self.config.viewport.width, self.config.viewport.height
            )),
        );

        let budget = self.config.budget;
        if tokio::time::timeout(budget, self.execute(driver, evidence, &mut state))
            .await
            .is_err()
        {
            state.steps.push(StepResult::failure(
                StepKind::Budget,
                "session budget",
                format!("run exceeded {}s budget, aborting", budget.as_secs()),
            ));
            state.auth_ok = false;
        }

        if !self.config.teardown_grace.is_zero() {
            tokio::time::sleep(self.config.teardown_grace).await;
        }

        match driver.close().await {
            Ok(()) => state
                .steps
                .push(StepResult::success(StepKind::Teardown, "browser closed")),
            Err(err) => state.steps.push(StepResult::failure(
                StepKind::Teardown,
                "browser close",
                err.to_string(),
            )),
        }

        let verdict = if state.form_found && state.auth_ok {
            Verdict::Passed
        } else {
            Verdict::Failed
        };

        SessionReport {
            started_at: started,
            finished_at: Utc::now(),
            steps: state.steps,
            verdict,
            final_url: state.final_url,
        }
    }

    /// The pipeline body: everything between launch and teardown.
    async fn execute(
        &self,
        driver: &mut dyn BrowserDriver,
        evidence: &EvidenceDir,
        state: &mut RunState,
    ) {
        // Navigate. A timeout is non-fatal: the page may be partially
        // rendered and the login form reachable anyway.
        match driver
            .navigate(&self.config.base_url, self.config.readiness, self.config.nav_timeout)
            .await
        {
            Ok(()) => {
                let mut step = StepResult::success(StepKind::Navigate, "open target");
                if let Ok(title) = driver.page_title().await {
                    if !title.is_empty() {
                        step = step.with_detail(format!("title: {}", title));
                    }
                }
                state.steps.push(step);
            }
            Err(DriverError::Timeout(msg)) => {
                state.steps.push(StepResult::failure(
                    StepKind::Navigate,
                    "open target",
                    format!("{}; continuing with partial page", msg),
                ));
            }
            Err(err) => {
                state.steps.push(StepResult::failure(
                    StepKind::Navigate,
                    "open target",
                    err.to_string(),
                ));
                self.capture(driver, evidence, "error-screenshot", state).await;
                self.record_final_url(driver, state).await;
                return;
            }
        }

        self.capture(driver, evidence, "login-page", state).await;

        // Locate the login form. Without it there is nothing to test.
        let form = match self.config.selectors.resolve(driver).await {
            Ok(FormLookup::Found(form)) => {
                state.form_found = true;
                state.steps.push(
                    StepResult::success(StepKind::LocateForm, "login form").with_detail(format!(
                        "username={} password={} submit={}",
                        form.username, form.password, form.submit
                    )),
                );
                form
            }
            Ok(FormLookup::Missing(missing)) => {
                state.steps.push(StepResult::failure(
                    StepKind::LocateForm,
                    "login form",
                    format!("controls not found: {}", missing.join(", ")),
                ));
                self.capture(driver, evidence, "error-screenshot", state).await;
                self.record_final_url(driver, state).await;
                return;
            }
            Err(err) => {
                state.steps.push(StepResult::failure(
                    StepKind::LocateForm,
                    "login form",
                    err.to_string(),
                ));
                self.capture(driver, evidence, "error-screenshot", state).await;
                self.record_final_url(driver, state).await;
                return;
            }
        };

        self.authenticate(driver, evidence, &form, state).await;

        self.capture(driver, evidence, "post-login-state", state).await;

        for check in &self.config.checks {
            let step = check.run(driver, &self.config.base_url).await;
            state.steps.push(step);
        }

        self.record_final_url(driver, state).await;
    }

    /// Fill the form, submit, and decide whether authentication succeeded.
    ///
    /// The post-submit navigation signal races the auth timeout. Either way
    /// the decision comes from the URL: still on the login page means the
    /// credentials were rejected.
    async fn authenticate(
        &self,
        driver: &mut dyn BrowserDriver,
        evidence: &EvidenceDir,
        form: &ResolvedLoginForm,
        state: &mut RunState,
    ) {
        if let Err(err) = driver.clear_and_type(&form.username, &self.config.username).await {
            state.steps.push(StepResult::failure(
                StepKind::Authenticate,
                "fill username",
                err.to_string(),
            ));
            return;
        }
        if let Err(err) = driver.clear_and_type(&form.password, &self.config.password).await {
            state.steps.push(StepResult::failure(
                StepKind::Authenticate,
                "fill password",
                err.to_string(),
            ));
            return;
        }

        self.capture(driver, evidence, "before-login", state).await;

        // Submit with the navigation wait armed alongside the click; a
        // redirect that completes before a separately-issued wait would
        // otherwise be missed and the stale login URL misread as rejection.
        let signaled = match driver
            .submit_and_wait(&form.submit, self.config.auth_timeout)
            .await
        {
            Ok(signaled) => signaled,
            Err(err) => {
                state.steps.push(StepResult::failure(
                    StepKind::Authenticate,
                    "submit credentials",
                    err.to_string(),
                ));
                return;
            }
        };

        let url = match driver.current_url().await {
            Ok(url) => url,
            Err(err) => {
                state.steps.push(StepResult::failure(
                    StepKind::Authenticate,
                    "submit credentials",
                    format!("could not read page URL: {}", err),
                ));
                return;
            }
        };

        let on_login_page = url.contains(&self.config.login_token);
        let step = match (signaled, on_login_page) {
            (_, false) => {
                state.auth_ok = true;
                let detail = if signaled {
                    format!("landed on {}", url)
                } else {
                    format!("no navigation signal, but page moved to {}", url)
                };
                StepResult::success(StepKind::Authenticate, "submit credentials")
                    .with_detail(detail)
            }
            (true, true) => StepResult::failure(
                StepKind::Authenticate,
                "submit credentials",
                "redirected back to login, credentials rejected",
            ),
            (false, true) => StepResult::failure(
                StepKind::Authenticate,
                "submit credentials",
                format!("still on login page after {}s", self.config.auth_timeout.as_secs()),
            ),
        };
        state.steps.push(step);
    }

    /// Capture one evidence screenshot. Failures are recorded and ignored.
    async fn capture(
        &self,
        driver: &mut dyn BrowserDriver,
        evidence: &EvidenceDir,
        checkpoint: &str,
        state: &mut RunState,
    ) {
        let path = evidence.artifact_path(checkpoint);
        let name = format!("capture {}", checkpoint);
        match driver.screenshot(&path, self.config.full_page).await {
            Ok(()) => state
                .steps
                .push(StepResult::success(StepKind::Capture, name).with_artifact(path)),
            Err(err) => state.steps.push(StepResult::failure(
                StepKind::Capture,
                name,
                err.to_string(),
            )),
        }
    }

    async fn record_final_url(&self, driver: &mut dyn BrowserDriver, state: &mut RunState) {
        if let Ok(url) = driver.current_url().await {
            if !url.is_empty() {
                state.final_url = Some(url);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_builders() {
        let config = SessionConfig::new("http://site")
            .credentials("admin", "secret")
            .viewport(Viewport::new(1920, 1080))
            .headed()
            .budget(Duration::from_secs(60))
            .teardown_grace(Duration::from_secs(3))
            .login_token("signin")
            .full_page(true);

        assert_eq!(config.base_url, "http://site");
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "secret");
        assert!(!config.headless);
        assert_eq!(config.viewport, Viewport::new(1920, 1080));
        assert_eq!(config.budget, Duration::from_secs(60));
        assert_eq!(config.teardown_grace, Duration::from_secs(3));
        assert_eq!(config.login_token, "signin");
        assert!(config.full_page);
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new("http://site");
        assert_eq!(config.username, config::DEFAULT_USERNAME);
        assert!(config.headless);
        assert_eq!(config.nav_timeout, Duration::from_secs(config::DEFAULT_NAV_TIMEOUT));
        assert_eq!(config.readiness, Readiness::NetworkIdle);
        assert!(config.checks.is_empty());
    }
}
