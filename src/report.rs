//! Session report types.
//!
//! Every run produces exactly one `SessionReport`: an ordered list of step
//! records (order matches execution order) plus an overall verdict. Reports
//! serialize to JSON for machine consumption and render to a short console
//! summary for humans.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The kind of pipeline step a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Launch,
    Navigate,
    LocateForm,
    Authenticate,
    Capture,
    Observe,
    /// The wall-clock budget ran out before the pipeline finished
    Budget,
    Teardown,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StepKind::Launch => "launch",
            StepKind::Navigate => "navigate",
            StepKind::LocateForm => "locate-form",
            StepKind::Authenticate => "authenticate",
            StepKind::Capture => "capture",
            StepKind::Observe => "observe",
            StepKind::Budget => "budget",
            StepKind::Teardown => "teardown",
        };
        write!(f, "{}", name)
    }
}

/// Whether a step succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

/// One step record in a session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub kind: StepKind,
    /// Human-readable step name, e.g. "capture before-login"
    pub name: String,
    pub outcome: Outcome,
    /// Artifact produced by this step, if any (screenshot path)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Diagnostic or informational detail
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepResult {
    pub fn success(kind: StepKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome: Outcome::Success,
            artifact: None,
            detail: None,
        }
    }

    pub fn failure(kind: StepKind, name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            outcome: Outcome::Failure,
            artifact: None,
            detail: Some(detail.into()),
        }
    }

    pub fn with_artifact(mut self, path: impl Into<PathBuf>) -> Self {
        self.artifact = Some(path.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}

/// Overall session verdict
///
/// `Passed` requires the browser to have launched, the login form to have
/// been located, and authentication to have succeeded. Evidence and
/// observation failures are reported but never flip the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
}

/// The complete record of one smoke-test session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Steps in execution order
    pub steps: Vec<StepResult>,
    pub verdict: Verdict,
    /// URL the page showed when the session ended, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
}

impl SessionReport {
    /// First step of the given kind, if the pipeline reached it
    pub fn step(&self, kind: StepKind) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.kind == kind)
    }

    /// All steps of the given kind
    pub fn steps_of(&self, kind: StepKind) -> Vec<&StepResult> {
        self.steps.iter().filter(|s| s.kind == kind).collect()
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Passed
    }

    /// Serialize the report as pretty-printed JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render a console summary: one line per step, then the verdict.
    pub fn render_console(&self) -> String {
        let mut out = String::new();
        for step in &self.steps {
            let mark = match step.outcome {
                Outcome::Success => "ok  ",
                Outcome::Failure => "FAIL",
            };
            out.push_str(&format!("[{}] {:<13} {}", mark, step.kind.to_string(), step.name));
            if let Some(detail) = &step.detail {
                out.push_str(&format!(" ({})", detail));
            }
            if let Some(artifact) = &step.artifact {
                out.push_str(&format!(" -> {}", artifact.display()));
            }
            out.push('\n');
        }
        if let Some(url) = &self.final_url {
            out.push_str(&format!("final url: {}\n", url));
        }
        let duration = self.finished_at - self.started_at;
        out.push_str(&format!(
            "verdict: {} ({}.{:03}s)\n",
            match self.verdict {
                Verdict::Passed => "PASSED",
                Verdict::Failed => "FAILED",
            },
            duration.num_seconds(),
            duration.num_milliseconds().rem_euclid(1000),
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> SessionReport {
        let now = Utc::now();
        SessionReport {
            started_at: now,
            finished_at: now,
            steps: vec![
                StepResult::success(StepKind::Launch, "browser started"),
                StepResult::success(StepKind::Capture, "capture login-page")
                    .with_artifact("/tmp/run/login-page.png"),
                StepResult::failure(StepKind::Authenticate, "submit credentials", "redirected back to login"),
            ],
            verdict: Verdict::Failed,
            final_url: Some("http://site/login".to_string()),
        }
    }

    #[test]
    fn test_step_lookup_by_kind() {
        let report = sample_report();
        assert!(report.step(StepKind::Launch).is_some());
        assert!(report.step(StepKind::Teardown).is_none());
        assert_eq!(report.steps_of(StepKind::Capture).len(), 1);
    }

    #[test]
    fn test_json_round_trip() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        let back: SessionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.steps, report.steps);
        assert_eq!(back.verdict, report.verdict);
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let report = sample_report();
        let json = report.to_json().unwrap();
        // The launch step has no artifact or detail; keys should be absent
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        let launch = &value["steps"][0];
        assert!(launch.get("artifact").is_none());
        assert!(launch.get("detail").is_none());
    }

    #[test]
    fn test_console_render_marks_failures() {
        let report = sample_report();
        let text = report.render_console();
        assert!(text.contains("[ok  ] launch"));
        assert!(text.contains("[FAIL] authenticate"));
        assert!(text.contains("redirected back to login"));
        assert!(text.contains("verdict: FAILED"));
    }
}
