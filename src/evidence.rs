//! Evidence directory management for organized screenshot handling.
//!
//! Provides centralized management of per-run evidence with:
//! - Unique run directories under a global base location
//! - Automatic cleanup unless explicitly preserved
//! - Run metadata tracking

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config;

/// An evidence directory holding the artifacts of one smoke run
#[derive(Debug, Clone)]
pub struct EvidenceDir {
    /// Unique run ID
    pub id: String,
    /// Root directory for this run
    pub dir: PathBuf,
    /// Whether to keep files after the run ends
    pub keep: bool,
}

impl EvidenceDir {
    /// Create a new evidence directory with a unique ID
    pub fn new() -> Self {
        let id = generate_run_id();
        let dir = PathBuf::from(config::evidence_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Create an evidence directory with a specific name/prefix
    pub fn with_name(name: &str) -> Self {
        let timestamp = generate_timestamp_suffix();
        let id = format!("{}_{}", sanitize_name(name), timestamp);
        let dir = PathBuf::from(config::evidence_base_dir()).join(&id);

        Self {
            id,
            dir,
            keep: false,
        }
    }

    /// Use a caller-supplied directory directly
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let id = dir
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(generate_run_id);

        Self {
            id,
            dir,
            keep: true, // User-specified directories are kept by default
        }
    }

    /// Set whether to keep files after the run ends
    pub fn keep(mut self, keep: bool) -> Self {
        self.keep = keep;
        self
    }

    /// Initialize the directory and write run metadata
    pub fn init(&self, base_url: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let metadata = serde_json::json!({
            "id": self.id,
            "created": chrono::Utc::now().to_rfc3339(),
            "base_url": base_url,
        });

        let metadata_path = self.dir.join(".session.json");
        fs::write(metadata_path, serde_json::to_string_pretty(&metadata)?)?;

        Ok(())
    }

    /// Path for a named screenshot artifact (e.g. "before-login")
    pub fn artifact_path(&self, checkpoint: &str) -> PathBuf {
        let filename = format!("{}.png", sanitize_name(checkpoint));
        self.dir.join(filename)
    }

    /// Path for the JSON session report
    pub fn report_path(&self) -> PathBuf {
        self.dir.join("report.json")
    }

    /// List all PNG artifacts in the run directory
    pub fn list_artifacts(&self) -> std::io::Result<Vec<PathBuf>> {
        let mut artifacts = Vec::new();
        if self.dir.exists() {
            for entry in fs::read_dir(&self.dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().map(|e| e == "png").unwrap_or(false) {
                    artifacts.push(path);
                }
            }
        }
        artifacts.sort();
        Ok(artifacts)
    }

    /// Clean up the run directory
    pub fn cleanup(&self) -> std::io::Result<()> {
        if self.dir.exists() && !self.keep {
            fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl Default for EvidenceDir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EvidenceDir {
    fn drop(&mut self) {
        if !self.keep {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }
}

/// Generate a unique run ID
fn generate_run_id() -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let pid = std::process::id();
    format!("run_{}_{}", timestamp, pid)
}

/// Generate a timestamp suffix
fn generate_timestamp_suffix() -> String {
    chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Sanitize a name for use in filenames
fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// Clean up runs older than the specified duration
pub fn cleanup_old_runs(max_age: std::time::Duration) -> std::io::Result<usize> {
    let base = PathBuf::from(config::evidence_base_dir());
    if !base.exists() {
        return Ok(0);
    }

    let now = SystemTime::now();
    let mut cleaned = 0;

    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            if let Ok(metadata) = entry.metadata() {
                if let Ok(modified) = metadata.modified() {
                    if let Ok(age) = now.duration_since(modified) {
                        if age > max_age && fs::remove_dir_all(&path).is_ok() {
                            cleaned += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(cleaned)
}

/// List all existing run directories
pub fn list_runs() -> std::io::Result<Vec<PathBuf>> {
    let base = PathBuf::from(config::evidence_base_dir());
    if !base.exists() {
        return Ok(Vec::new());
    }

    let mut runs = Vec::new();
    for entry in fs::read_dir(&base)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            runs.push(path);
        }
    }
    runs.sort();
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_dir_new() {
        let evidence = EvidenceDir::new();
        assert!(evidence.id.starts_with("run_"));
        assert!(!evidence.keep);
    }

    #[test]
    fn test_evidence_dir_with_name() {
        let evidence = EvidenceDir::with_name("erp smoke");
        assert!(evidence.id.starts_with("erp_smoke_"));
    }

    #[test]
    fn test_user_dir_is_kept() {
        let evidence = EvidenceDir::in_dir("/tmp/my-evidence");
        assert!(evidence.keep);
        assert_eq!(evidence.id, "my-evidence");
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("before login"), "before_login");
        assert_eq!(sanitize_name("post-login-state"), "post-login-state");
        assert_eq!(sanitize_name("a/b\\c"), "a_b_c");
    }

    #[test]
    fn test_artifact_path() {
        let evidence = EvidenceDir::in_dir("/tmp/run");
        assert!(evidence.artifact_path("login-page").ends_with("login-page.png"));
        assert!(evidence.artifact_path("error screenshot").ends_with("error_screenshot.png"));
    }

    #[test]
    fn test_init_and_list() {
        let tmp = tempfile::tempdir().unwrap();
        let evidence = EvidenceDir::in_dir(tmp.path().join("run-1"));
        evidence.init("http://localhost").unwrap();

        assert!(evidence.dir.join(".session.json").exists());
        assert!(evidence.list_artifacts().unwrap().is_empty());

        fs::write(evidence.artifact_path("login-page"), b"png").unwrap();
        let artifacts = evidence.list_artifacts().unwrap();
        assert_eq!(artifacts.len(), 1);
    }

    #[test]
    fn test_cleanup_respects_keep() {
        let tmp = tempfile::tempdir().unwrap();
        let kept = tmp.path().join("kept");
        let evidence = EvidenceDir::in_dir(&kept);
        evidence.init("http://localhost").unwrap();
        evidence.cleanup().unwrap();
        assert!(kept.exists());

        let removed = tmp.path().join("removed");
        let evidence = EvidenceDir::in_dir(&removed).keep(false);
        evidence.init("http://localhost").unwrap();
        evidence.cleanup().unwrap();
        assert!(!removed.exists());
        // Avoid a second removal attempt on drop
        std::mem::forget(evidence);
    }
}
