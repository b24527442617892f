use crate::error::{Error, Result};
use crate::selector::Selector;
use crate::step::{Step, DEFAULT_WAIT_TIMEOUT_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Browser viewport for a scenario. Desktop-sized unless overridden;
/// `mobile` turns on touch/mobile emulation for the small-screen checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub mobile: bool,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            mobile: false,
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

/// The signal that authentication succeeded: an element becoming visible,
/// or gaining a CSS class (e.g. `#main-page` gaining `visible`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessWait {
    pub selector: Selector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// The shared login sequence scenarios declare once instead of spelling out
/// step by step: open the login form, fill company/email/password, submit,
/// wait for the application shell to appear.
///
/// When `already_logged_in` is set and that element is already visible, the
/// whole fixture is skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginFixture {
    /// Element that opens the login form (e.g. an "Acesso do Administrador"
    /// link revealing a modal). Optional when the form is shown by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<Selector>,

    /// Element that appears once the login form is ready to be filled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<Selector>,

    /// Company selector dropdown, for multi-tenant logins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_field: Option<Selector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,

    pub email_field: Selector,
    pub email: String,
    pub password_field: Selector,
    pub password: String,
    pub submit: Selector,

    pub success: SuccessWait,

    /// Probe for the "already logged in" fast path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_logged_in: Option<Selector>,
}

/// A self-contained verification flow: optional login fixture followed by a
/// linear sequence of steps, producing screenshot artifacts as evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Base for relative `goto` URLs. Deliberately has no default: target
    /// ports differ between deployments, so every scenario states its own
    /// (or the CLI overrides it).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Page loaded before the login fixture runs. Defaults to `base_url`,
    /// so it only needs setting when the login form lives elsewhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub viewport: Option<Viewport>,

    /// Headless by default; scenarios may insist on a headed browser.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headless: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<LoginFixture>,

    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn from_json(json: &str) -> Result<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject scenarios that could never run meaningfully.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidScenario("name must not be empty".into()));
        }
        if self.steps.is_empty() {
            return Err(Error::InvalidScenario(format!(
                "scenario '{}' has no steps",
                self.name
            )));
        }

        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| {
                Error::InvalidScenario(format!(
                    "scenario '{}' has invalid base_url '{}': {}",
                    self.name, base, e
                ))
            })?;
        }

        for (idx, step) in self.steps.iter().enumerate() {
            self.validate_step(idx, step)?;
        }

        if let Some(entry) = &self.entry {
            let is_absolute = url::Url::parse(entry).is_ok();
            if !is_absolute && self.base_url.is_none() {
                return Err(Error::InvalidScenario(format!(
                    "scenario '{}': relative entry '{}' requires base_url",
                    self.name, entry
                )));
            }
        }

        if let Some(login) = &self.login {
            if self.entry.is_none() && self.base_url.is_none() {
                return Err(Error::InvalidScenario(format!(
                    "scenario '{}' has a login fixture but neither entry nor base_url",
                    self.name
                )));
            }
            for sel in [&login.email_field, &login.password_field, &login.submit] {
                if sel.is_empty() {
                    return Err(Error::InvalidScenario(format!(
                        "scenario '{}' login fixture has an empty selector",
                        self.name
                    )));
                }
            }
            if login.company_field.is_some() != login.company.is_some() {
                return Err(Error::InvalidScenario(format!(
                    "scenario '{}' login fixture must set company_field and company together",
                    self.name
                )));
            }
        }

        Ok(())
    }

    fn validate_step(&self, idx: usize, step: &Step) -> Result<()> {
        for sel in step.selectors() {
            if sel.is_empty() {
                return Err(Error::InvalidScenario(format!(
                    "scenario '{}' step {} has an empty selector",
                    self.name,
                    idx + 1
                )));
            }
        }

        match step {
            Step::Goto { url } => {
                let is_absolute = url::Url::parse(url).is_ok();
                if !is_absolute && self.base_url.is_none() {
                    return Err(Error::InvalidScenario(format!(
                        "scenario '{}' step {}: relative url '{}' requires base_url",
                        self.name,
                        idx + 1,
                        url
                    )));
                }
            }
            Step::AssertText {
                contains, matches, ..
            } => {
                match (contains, matches) {
                    (None, None) | (Some(_), Some(_)) => {
                        return Err(Error::InvalidScenario(format!(
                            "scenario '{}' step {}: assert_text needs exactly one of contains/matches",
                            self.name,
                            idx + 1
                        )));
                    }
                    (None, Some(pattern)) => {
                        regex::Regex::new(pattern).map_err(|e| {
                            Error::InvalidScenario(format!(
                                "scenario '{}' step {}: bad regex: {}",
                                self.name,
                                idx + 1,
                                e
                            ))
                        })?;
                    }
                    (Some(_), None) => {}
                }
            }
            Step::Screenshot { name, .. } => {
                if name.trim().is_empty() || name.contains(['/', '\\']) {
                    return Err(Error::InvalidScenario(format!(
                        "scenario '{}' step {}: screenshot name must be a bare file stem",
                        self.name,
                        idx + 1
                    )));
                }
            }
            _ => {}
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_json() -> &'static str {
        r##"{
            "name": "reports-page",
            "base_url": "http://localhost:8080",
            "steps": [
                {"step": "goto", "url": "index.html"},
                {"step": "wait_visible", "selector": {"css": "#login-page"}},
                {"step": "screenshot", "name": "reports"}
            ]
        }"##
    }

    #[test]
    fn test_scenario_parses_and_validates() {
        let scenario = Scenario::from_json(minimal_json()).unwrap();
        assert_eq!(scenario.name, "reports-page");
        assert_eq!(scenario.steps.len(), 3);
        assert!(scenario.login.is_none());
    }

    #[test]
    fn test_relative_goto_without_base_url_is_rejected() {
        let json = r#"{"name": "x", "steps": [{"step": "goto", "url": "index.html"}]}"#;
        let err = Scenario::from_json(json).unwrap_err();
        assert!(err.to_string().contains("requires base_url"));
    }

    #[test]
    fn test_empty_steps_rejected() {
        let json = r#"{"name": "x", "steps": []}"#;
        assert!(Scenario::from_json(json).is_err());
    }

    #[test]
    fn test_assert_text_needs_one_matcher() {
        let json = r##"{
            "name": "x",
            "steps": [{"step": "assert_text", "selector": {"css": "#t"}}]
        }"##;
        let err = Scenario::from_json(json).unwrap_err();
        assert!(err.to_string().contains("contains/matches"));
    }

    #[test]
    fn test_bad_regex_rejected() {
        let json = r##"{
            "name": "x",
            "steps": [{"step": "assert_text", "selector": {"css": "#t"}, "matches": "("}]
        }"##;
        assert!(Scenario::from_json(json).is_err());
    }

    #[test]
    fn test_login_fixture_parses() {
        let json = r##"{
            "name": "login",
            "base_url": "http://localhost:8080",
            "login": {
                "trigger": {"css": "#admin-login-link"},
                "form": {"css": "#admin-login-modal"},
                "email_field": {"css": "#admin-login-email"},
                "email": "test.user@email.com",
                "password_field": {"css": "#admin-login-password"},
                "password": "password",
                "submit": {"css": "#admin-login-form button[type='submit']"},
                "success": {"selector": {"css": "#main-page"}, "class": "visible"},
                "already_logged_in": {"css": "#main-page.visible"}
            },
            "steps": [{"step": "screenshot", "name": "after_login"}]
        }"##;
        let scenario = Scenario::from_json(json).unwrap();
        let login = scenario.login.unwrap();
        assert_eq!(login.email, "test.user@email.com");
        assert_eq!(login.success.class.as_deref(), Some("visible"));
        assert_eq!(login.success.timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
    }

    #[test]
    fn test_login_needs_somewhere_to_navigate() {
        let json = r##"{
            "name": "login",
            "login": {
                "email_field": {"css": "#email"},
                "email": "a@b.c",
                "password_field": {"css": "#password"},
                "password": "pw",
                "submit": {"css": "button"},
                "success": {"selector": {"css": "#main"}}
            },
            "steps": [{"step": "screenshot", "name": "s"}]
        }"##;
        let err = Scenario::from_json(json).unwrap_err();
        assert!(err.to_string().contains("neither entry nor base_url"));
    }

    #[test]
    fn test_absolute_entry_without_base_url_is_fine() {
        let json = r##"{
            "name": "direct",
            "entry": "file:///app/crm.html",
            "steps": [{"step": "wait_visible", "selector": {"css": "#login-page"}}]
        }"##;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.entry.as_deref(), Some("file:///app/crm.html"));
    }

    #[test]
    fn test_company_field_requires_value() {
        let json = r##"{
            "name": "login",
            "base_url": "http://localhost:8080",
            "login": {
                "email_field": {"css": "#email"},
                "email": "a@b.c",
                "password_field": {"css": "#password"},
                "password": "pw",
                "submit": {"css": "button"},
                "company_field": {"css": "#company"},
                "success": {"selector": {"css": "#main"}}
            },
            "steps": [{"step": "screenshot", "name": "s"}]
        }"##;
        let err = Scenario::from_json(json).unwrap_err();
        assert!(err.to_string().contains("company_field and company"));
    }

    #[test]
    fn test_screenshot_name_must_be_bare() {
        let json = r#"{
            "name": "x",
            "steps": [{"step": "screenshot", "name": "../escape"}]
        }"#;
        assert!(Scenario::from_json(json).is_err());
    }

    #[test]
    fn test_scenario_roundtrips_through_json() {
        let scenario = Scenario::from_json(minimal_json()).unwrap();
        let json = serde_json::to_string(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(scenario, back);
    }

    #[test]
    fn test_from_file_reads_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");
        std::fs::write(&path, minimal_json()).unwrap();
        let scenario = Scenario::from_file(&path).unwrap();
        assert_eq!(scenario.name, "reports-page");
    }
}
