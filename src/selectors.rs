//! Login form discovery.
//!
//! Maps the three logical login controls (username, password, submit) to
//! ordered lists of selector candidates, and resolves them against a live
//! page. Defaults cover the common framework variants; callers can override
//! any list for a nonstandard form.

use serde::{Deserialize, Serialize};

use crate::driver::{BrowserDriver, DriverResult};

/// Ordered selector candidates for each login control
///
/// Candidates are tried first to last; the first match wins. An empty list
/// makes that control unresolvable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginSelectors {
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
}

impl Default for LoginSelectors {
    fn default() -> Self {
        Self {
            username: vec![
                "input[data-fieldname=\"usr\"]".to_string(),
                "#login_email".to_string(),
                "input[placeholder*=\"Email\"]".to_string(),
                "input[name=\"usr\"]".to_string(),
                "input[type=\"email\"]".to_string(),
                "input[name=\"username\"]".to_string(),
            ],
            password: vec![
                "input[data-fieldname=\"pwd\"]".to_string(),
                "#login_password".to_string(),
                "input[type=\"password\"]".to_string(),
            ],
            submit: vec![
                "button[type=\"submit\"]".to_string(),
                ".btn-login".to_string(),
                "input[type=\"submit\"]".to_string(),
            ],
        }
    }
}

impl LoginSelectors {
    /// Replace the username candidates with a single selector
    pub fn username_only(mut self, selector: impl Into<String>) -> Self {
        self.username = vec![selector.into()];
        self
    }

    /// Replace the password candidates with a single selector
    pub fn password_only(mut self, selector: impl Into<String>) -> Self {
        self.password = vec![selector.into()];
        self
    }

    /// Replace the submit candidates with a single selector
    pub fn submit_only(mut self, selector: impl Into<String>) -> Self {
        self.submit = vec![selector.into()];
        self
    }

    /// Resolve all three controls against the current page.
    ///
    /// Succeeds only when every control resolved; otherwise reports which
    /// controls had no matching candidate.
    pub async fn resolve(&self, driver: &mut dyn BrowserDriver) -> DriverResult<FormLookup> {
        let username = driver.find_first(&self.username).await?;
        let password = driver.find_first(&self.password).await?;
        let submit = driver.find_first(&self.submit).await?;

        match (username, password, submit) {
            (Some(username), Some(password), Some(submit)) => {
                Ok(FormLookup::Found(ResolvedLoginForm {
                    username,
                    password,
                    submit,
                }))
            }
            (username, password, submit) => {
                let mut missing = Vec::new();
                if username.is_none() {
                    missing.push("username".to_string());
                }
                if password.is_none() {
                    missing.push("password".to_string());
                }
                if submit.is_none() {
                    missing.push("submit".to_string());
                }
                Ok(FormLookup::Missing(missing))
            }
        }
    }
}

/// The concrete selectors that matched, one per control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLoginForm {
    pub username: String,
    pub password: String,
    pub submit: String,
}

/// Outcome of a login form lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormLookup {
    /// All three controls resolved
    Found(ResolvedLoginForm),
    /// Names of the controls with no matching candidate
    Missing(Vec<String>),
}
