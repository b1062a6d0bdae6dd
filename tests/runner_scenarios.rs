//! End-to-end pipeline scenarios against the scripted mock driver.

use pretty_assertions::assert_eq;
use std::sync::atomic::Ordering;
use std::time::Duration;

use web_smoke::checks::ObservationCheck;
use web_smoke::driver::{AuthBehavior, MockDriver, NavBehavior, PageMetrics};
use web_smoke::evidence::EvidenceDir;
use web_smoke::report::{Outcome, SessionReport, StepKind, Verdict};
use web_smoke::runner::{SessionConfig, SmokeRunner};

const LOGIN_URL: &str = "http://erp.local/login";
const APP_URL: &str = "http://erp.local/app";

/// The default selector set resolves against these
const FORM_SELECTORS: [&str; 3] = [
    "input[data-fieldname=\"usr\"]",
    "input[type=\"password\"]",
    "button[type=\"submit\"]",
];

fn base_config() -> SessionConfig {
    SessionConfig::new(LOGIN_URL)
        .credentials("Administrator", "admin")
        .nav_timeout(Duration::from_secs(5))
        .auth_timeout(Duration::from_secs(5))
        .budget(Duration::from_secs(30))
}

fn evidence_in(dir: &tempfile::TempDir) -> EvidenceDir {
    let evidence = EvidenceDir::in_dir(dir.path().join("run"));
    evidence.init(LOGIN_URL).unwrap();
    evidence
}

async fn run(config: SessionConfig, driver: &mut MockDriver, evidence: &EvidenceDir) -> SessionReport {
    SmokeRunner::new(config).run_with_driver(driver, evidence).await
}

#[tokio::test]
async fn healthy_site_with_valid_credentials_passes() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() });
    let closes = driver.close_count();

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Passed);
    assert_eq!(report.final_url.as_deref(), Some(APP_URL));
    assert!(!report.final_url.unwrap().contains("login"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // login-page, before-login, post-login-state
    let artifacts = evidence.list_artifacts().unwrap();
    assert!(artifacts.len() >= 2, "expected screenshots on disk, got {:?}", artifacts);
    for artifact in &artifacts {
        let bytes = std::fs::read(artifact).unwrap();
        assert_eq!(&bytes[0..4], &[0x89, 0x50, 0x4E, 0x47], "not a PNG: {:?}", artifact);
    }
}

#[tokio::test]
async fn rejected_credentials_fail_with_diagnostic() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::BackToLogin { login_url: LOGIN_URL.to_string() });
    let closes = driver.close_count();

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Failed);
    let auth = report.step(StepKind::Authenticate).expect("authenticate step present");
    assert_eq!(auth.outcome, Outcome::Failure);
    assert!(auth.detail.as_ref().unwrap().contains("redirected back to login"));
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn navigation_failure_is_fatal_but_torn_down() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_nav(NavBehavior::Fail("connection refused".to_string()));
    let closes = driver.close_count();

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Failed);
    let nav = report.step(StepKind::Navigate).unwrap();
    assert_eq!(nav.outcome, Outcome::Failure);
    assert!(nav.detail.as_ref().unwrap().contains("connection refused"));
    // No authenticate attempt after a dead navigation
    assert!(report.step(StepKind::Authenticate).is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 1);

    // At most the error screenshot
    assert!(evidence.list_artifacts().unwrap().len() <= 1);
}

#[tokio::test]
async fn navigation_timeout_is_not_fatal() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    // Page times out but the form is present on the partial render
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_nav(NavBehavior::Timeout)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    let nav = report.step(StepKind::Navigate).unwrap();
    assert_eq!(nav.outcome, Outcome::Failure);
    // The pipeline kept going and still authenticated
    assert_eq!(report.verdict, Verdict::Passed);
}

#[tokio::test]
async fn missing_form_names_every_absent_control() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL).with_selectors(["input[type=\"password\"]"]);
    let closes = driver.close_count();

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Failed);
    let locate = report.step(StepKind::LocateForm).unwrap();
    assert_eq!(locate.outcome, Outcome::Failure);
    let detail = locate.detail.as_ref().unwrap();
    assert!(detail.contains("username"));
    assert!(detail.contains("submit"));
    assert!(!detail.contains("password"));
    assert!(report.step(StepKind::Authenticate).is_none());
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn screenshot_failures_do_not_change_the_verdict() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() })
        .with_failing_screenshots();

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Passed);
    let captures = report.steps_of(StepKind::Capture);
    assert!(!captures.is_empty());
    for capture in captures {
        assert_eq!(capture.outcome, Outcome::Failure);
        assert!(capture.artifact.is_none());
    }
    assert!(evidence.list_artifacts().unwrap().is_empty());
}

#[tokio::test]
async fn auth_timeout_falls_back_to_url_inspection() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    // No navigation signal, but the page quietly moved off the login URL
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::SignalTimeout { final_url: APP_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Passed);
    let auth = report.step(StepKind::Authenticate).unwrap();
    assert_eq!(auth.outcome, Outcome::Success);
    assert!(auth.detail.as_ref().unwrap().contains("no navigation signal"));
}

#[tokio::test]
async fn auth_timeout_still_on_login_page_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::SignalTimeout { final_url: LOGIN_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Failed);
    let auth = report.step(StepKind::Authenticate).unwrap();
    assert!(auth.detail.as_ref().unwrap().contains("still on login page"));
}

#[tokio::test]
async fn budget_exhaustion_aborts_and_tears_down() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_nav(NavBehavior::Hang);
    let closes = driver.close_count();

    let config = base_config().budget(Duration::from_millis(200));
    let started = std::time::Instant::now();
    let report = run(config, &mut driver, &evidence).await;

    assert!(started.elapsed() < Duration::from_secs(5), "run did not respect its budget");
    assert_eq!(report.verdict, Verdict::Failed);
    let budget_steps = report.steps_of(StepKind::Budget);
    assert_eq!(budget_steps.len(), 1);
    assert_eq!(budget_steps[0].outcome, Outcome::Failure);
    // Budget exhaustion is its own record; exactly one teardown entry remains
    assert_eq!(report.steps_of(StepKind::Teardown).len(), 1);
    assert_eq!(closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn submit_arms_navigation_wait_with_the_click() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    // A redirect that completes immediately on submit; a wait issued only
    // after the click would read the pre-navigation URL and misreport the
    // login as rejected
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    assert_eq!(report.verdict, Verdict::Passed);
    let auth = report.step(StepKind::Authenticate).unwrap();
    assert_eq!(auth.outcome, Outcome::Success);
    assert_eq!(report.final_url.as_deref(), Some(APP_URL));

    // The submit is one combined operation, never a click followed by a
    // separately armed wait
    let actions = driver.actions();
    assert!(actions.iter().any(|a| a == "submit button[type=\"submit\"]"), "{:?}", actions);
    assert!(!actions.iter().any(|a| a.starts_with("click ")), "{:?}", actions);
}

#[tokio::test]
async fn observation_checks_report_without_affecting_verdict() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() })
        .with_region_count(".module-card, .widget", 4)
        .with_text(["Stock", "Manufacturing"])
        .with_asset_status("/assets/site.css", 200)
        .with_stylesheet("http://erp.local/broken.css", false)
        .with_metrics(PageMetrics { layout_duration_ms: 8.0, script_duration_ms: 22.0 });

    let config = base_config().checks(vec![
        ObservationCheck::RegionCount { selector: ".module-card, .widget".to_string(), min: 3 },
        ObservationCheck::Label { text: "Stock".to_string() },
        ObservationCheck::Label { text: "Payroll".to_string() },
        ObservationCheck::AssetFetch { path: "/assets/site.css".to_string() },
        ObservationCheck::Stylesheets,
        ObservationCheck::Metrics,
    ]);

    let report = run(config, &mut driver, &evidence).await;

    let observations = report.steps_of(StepKind::Observe);
    assert_eq!(observations.len(), 6);
    let failures: Vec<&str> = observations
        .iter()
        .filter(|s| s.outcome == Outcome::Failure)
        .map(|s| s.name.as_str())
        .collect();
    // The missing label and the broken stylesheet fail; nothing else does
    assert_eq!(failures, vec!["label 'Payroll'", "stylesheets"]);

    // Observation failures never flip a successful login
    assert_eq!(report.verdict, Verdict::Passed);
}

#[tokio::test]
async fn report_steps_follow_execution_order() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    let kinds: Vec<StepKind> = report.steps.iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            StepKind::Launch,
            StepKind::Navigate,
            StepKind::Capture,      // login-page
            StepKind::LocateForm,
            StepKind::Capture,      // before-login
            StepKind::Authenticate,
            StepKind::Capture,      // post-login-state
            StepKind::Teardown,
        ]
    );
}

#[tokio::test]
async fn report_written_as_json_round_trips() {
    let tmp = tempfile::tempdir().unwrap();
    let evidence = evidence_in(&tmp);
    let mut driver = MockDriver::new(LOGIN_URL)
        .with_selectors(FORM_SELECTORS)
        .with_auth(AuthBehavior::Redirect { to: APP_URL.to_string() });

    let report = run(base_config(), &mut driver, &evidence).await;

    std::fs::write(evidence.report_path(), report.to_json().unwrap()).unwrap();
    let loaded: SessionReport =
        serde_json::from_str(&std::fs::read_to_string(evidence.report_path()).unwrap()).unwrap();
    assert_eq!(loaded.verdict, report.verdict);
    assert_eq!(loaded.steps.len(), report.steps.len());
}
