use crate::chrome_finder::ChromeFinder;
use crate::driver::{Driver, WaitCondition};
use crate::launcher::{ChromeLauncher, DEFAULT_DEBUGGING_PORT};
use crate::profile::ProfileManager;
use crate::{Error, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use vistoria_core::{
    Diagnostics, LoginFixture, Scenario, ScenarioReport, Step, StepOutcome, StepStatus,
    DEFAULT_WAIT_TIMEOUT_MS,
};

/// Run-wide settings; per-scenario fields in the file win where both exist.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Root directory for screenshots and failure diagnostics; each scenario
    /// gets a subdirectory named after it.
    pub artifacts_dir: PathBuf,
    pub chrome_path: Option<PathBuf>,
    /// Persistent profile directory; `None` means a throwaway profile.
    pub profile_dir: Option<PathBuf>,
    pub headless: bool,
    /// Overrides every scenario's `base_url` when set.
    pub base_url: Option<String>,
    pub debugging_port: u16,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            artifacts_dir: PathBuf::from("artifacts"),
            chrome_path: None,
            profile_dir: None,
            headless: true,
            base_url: None,
            debugging_port: DEFAULT_DEBUGGING_PORT,
        }
    }
}

/// Executes scenarios: launch, connect, optional login fixture, steps in
/// order, teardown. Always returns a report; the browser is released on
/// every exit path.
pub struct ScenarioRunner {
    config: RunnerConfig,
}

impl ScenarioRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, scenario: &Scenario) -> ScenarioReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let scenario_dir = self.config.artifacts_dir.join(artifact_stem(&scenario.name));

        tracing::info!("Running scenario '{}'", scenario.name);

        let mut steps: Vec<StepOutcome> = Vec::new();
        let mut artifacts: Vec<PathBuf> = Vec::new();
        let mut diagnostics = None;

        match self.launch(scenario).await {
            Ok(driver) => {
                let failed = self
                    .drive(scenario, &driver, &scenario_dir, &mut steps, &mut artifacts)
                    .await;

                if failed {
                    diagnostics = Some(self.collect_diagnostics(&driver, &scenario_dir).await);
                }

                if let Err(e) = driver.close().await {
                    tracing::warn!("Browser teardown reported: {}", e);
                }
            }
            Err(e) => {
                tracing::error!("Scenario '{}' could not start: {}", scenario.name, e);
                steps.push(StepOutcome {
                    index: 0,
                    label: "launch browser".to_string(),
                    status: StepStatus::Failed {
                        error: e.to_string(),
                    },
                    duration: start.elapsed(),
                });
            }
        }

        let report = ScenarioReport {
            scenario: scenario.name.clone(),
            started_at,
            duration: start.elapsed(),
            steps,
            artifacts,
            diagnostics,
        };

        if report.passed() {
            tracing::info!("Scenario '{}' passed", scenario.name);
        } else if let Some(failure) = report.failure() {
            tracing::error!("Scenario '{}' failed at: {}", scenario.name, failure.label);
        }

        report
    }

    async fn launch(&self, scenario: &Scenario) -> Result<Driver> {
        let chrome = ChromeFinder::new(self.config.chrome_path.clone()).find()?;

        let profile = match &self.config.profile_dir {
            Some(dir) => ProfileManager::persistent(dir.clone())?,
            None => ProfileManager::temporary()?,
        };

        let viewport = scenario.viewport.unwrap_or_default();
        let headless = scenario.headless.unwrap_or(self.config.headless);

        let launcher = ChromeLauncher::new(chrome, profile.path().to_path_buf())
            .headless(headless)
            .viewport(viewport)
            .debugging_port(self.config.debugging_port);

        let child = launcher.launch()?;
        let mut driver = Driver::attach(child, launcher.port()).await?;
        driver.set_viewport(viewport).await?;

        // Keep the profile alive for the whole scenario; its directory is
        // removed when this guard drops after teardown.
        driver.hold_profile(profile);

        Ok(driver)
    }

    /// Login fixture plus steps. Returns true when anything failed.
    async fn drive(
        &self,
        scenario: &Scenario,
        driver: &Driver,
        scenario_dir: &Path,
        steps: &mut Vec<StepOutcome>,
        artifacts: &mut Vec<PathBuf>,
    ) -> bool {
        let mut failed = false;

        // Entry navigation: before the login fixture (or first step) the
        // page must actually be loaded.
        let base = self
            .config
            .base_url
            .as_deref()
            .or(scenario.base_url.as_deref());
        let entry_url = match (&scenario.entry, base) {
            (Some(entry), base) => resolve_url(entry, base).map(Some),
            (None, Some(base)) if scenario.login.is_some() => Ok(Some(base.to_string())),
            (None, _) => Ok(None),
        };

        match entry_url {
            Ok(Some(url)) => {
                let start = Instant::now();
                let status = match driver.goto(&url).await {
                    Ok(()) => StepStatus::Passed,
                    Err(e) => {
                        failed = true;
                        StepStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                steps.push(StepOutcome {
                    index: 0,
                    label: format!("open {}", url),
                    status,
                    duration: start.elapsed(),
                });
            }
            Ok(None) => {}
            Err(e) => {
                failed = true;
                steps.push(StepOutcome {
                    index: 0,
                    label: "open entry page".to_string(),
                    status: StepStatus::Failed {
                        error: e.to_string(),
                    },
                    duration: std::time::Duration::ZERO,
                });
            }
        }

        if let Some(login) = &scenario.login {
            if failed {
                steps.push(StepOutcome {
                    index: 0,
                    label: "login fixture".to_string(),
                    status: StepStatus::Skipped,
                    duration: std::time::Duration::ZERO,
                });
            } else {
                let start = Instant::now();
                let status = match self.run_login(driver, login).await {
                    Ok(()) => StepStatus::Passed,
                    Err(e) => {
                        failed = true;
                        StepStatus::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                steps.push(StepOutcome {
                    index: 0,
                    label: "login fixture".to_string(),
                    status,
                    duration: start.elapsed(),
                });
            }
        }

        for (i, step) in scenario.steps.iter().enumerate() {
            if failed {
                steps.push(StepOutcome {
                    index: i + 1,
                    label: step.label(),
                    status: StepStatus::Skipped,
                    duration: std::time::Duration::ZERO,
                });
                continue;
            }

            let start = Instant::now();
            let status = match self
                .execute_step(scenario, driver, step, scenario_dir, artifacts)
                .await
            {
                Ok(()) => StepStatus::Passed,
                Err(e) => {
                    failed = true;
                    StepStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            steps.push(StepOutcome {
                index: i + 1,
                label: step.label(),
                status,
                duration: start.elapsed(),
            });
        }

        failed
    }

    async fn run_login(&self, driver: &Driver, login: &LoginFixture) -> Result<()> {
        if let Some(probe) = &login.already_logged_in {
            if driver.is_visible(probe).await.unwrap_or(false) {
                tracing::info!("Already logged in, skipping login fixture");
                return Ok(());
            }
        }

        if let Some(trigger) = &login.trigger {
            driver.click(trigger).await?;
        }
        if let Some(form) = &login.form {
            driver
                .wait_for(form, &WaitCondition::Visible, DEFAULT_WAIT_TIMEOUT_MS)
                .await?;
        }
        if let (Some(field), Some(company)) = (&login.company_field, &login.company) {
            driver.select_option(field, company).await?;
        }

        driver.fill(&login.email_field, &login.email).await?;
        driver.fill(&login.password_field, &login.password).await?;
        driver.click(&login.submit).await?;

        let condition = match &login.success.class {
            Some(class) => WaitCondition::HasClass(class.clone()),
            None => WaitCondition::Visible,
        };
        driver
            .wait_for(&login.success.selector, &condition, login.success.timeout_ms)
            .await
    }

    async fn execute_step(
        &self,
        scenario: &Scenario,
        driver: &Driver,
        step: &Step,
        scenario_dir: &Path,
        artifacts: &mut Vec<PathBuf>,
    ) -> Result<()> {
        match step {
            Step::Goto { url } => {
                let url = resolve_url(
                    url,
                    self.config.base_url.as_deref().or(scenario.base_url.as_deref()),
                )?;
                driver.goto(&url).await
            }
            Step::Click { selector } => driver.click(selector).await,
            Step::Fill { selector, value } => driver.fill(selector, value).await,
            Step::SelectOption { selector, value } => driver.select_option(selector, value).await,
            Step::SetChecked { selector, checked } => driver.set_checked(selector, *checked).await,
            Step::WaitVisible {
                selector,
                timeout_ms,
            } => {
                driver
                    .wait_for(selector, &WaitCondition::Visible, *timeout_ms)
                    .await
            }
            Step::WaitHidden {
                selector,
                timeout_ms,
            } => {
                driver
                    .wait_for(selector, &WaitCondition::Hidden, *timeout_ms)
                    .await
            }
            Step::WaitClass {
                selector,
                class,
                present,
                timeout_ms,
            } => {
                let condition = if *present {
                    WaitCondition::HasClass(class.clone())
                } else {
                    WaitCondition::NotClass(class.clone())
                };
                driver.wait_for(selector, &condition, *timeout_ms).await
            }
            Step::AssertText {
                selector,
                contains,
                matches,
                timeout_ms,
            } => match (contains, matches) {
                (Some(needle), _) => {
                    let expectation = format!("to contain {:?}", needle);
                    driver
                        .assert_text(selector, |t| t.contains(needle.as_str()), &expectation, *timeout_ms)
                        .await
                }
                (None, Some(pattern)) => {
                    let re = regex::Regex::new(pattern)
                        .map_err(|e| Error::Assertion(format!("bad regex /{}/: {}", pattern, e)))?;
                    let expectation = format!("to match /{}/", pattern);
                    driver
                        .assert_text(selector, |t| re.is_match(t), &expectation, *timeout_ms)
                        .await
                }
                (None, None) => Err(Error::Assertion(
                    "assert_text without contains/matches".to_string(),
                )),
            },
            Step::AssertCount {
                selector,
                count,
                timeout_ms,
            } => driver.assert_count(selector, *count, *timeout_ms).await,
            Step::Evaluate { expression } => driver.evaluate(expression).await,
            Step::AcceptDialog { prompt_text } => {
                driver.arm_dialog(prompt_text.clone());
                Ok(())
            }
            Step::Screenshot {
                name,
                full_page,
                selector,
            } => {
                let path = scenario_dir.join(format!("{}.png", name));
                match selector {
                    Some(selector) => driver.element_screenshot(selector, &path).await?,
                    None => driver.screenshot(&path, *full_page).await?,
                }
                artifacts.push(path);
                Ok(())
            }
            Step::Sleep { ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(*ms)).await;
                Ok(())
            }
        }
    }

    /// Best-effort failure evidence: error screenshot, rendered HTML, and
    /// whatever the page logged to its console.
    async fn collect_diagnostics(&self, driver: &Driver, scenario_dir: &Path) -> Diagnostics {
        let mut diagnostics = Diagnostics {
            console: driver.console_messages(),
            ..Default::default()
        };

        let screenshot = scenario_dir.join("error.png");
        match driver.screenshot(&screenshot, true).await {
            Ok(()) => diagnostics.error_screenshot = Some(screenshot),
            Err(e) => tracing::warn!("Could not capture error screenshot: {}", e),
        }

        match driver.page_html().await {
            Ok(html) => {
                let path = scenario_dir.join("page.html");
                match std::fs::write(&path, html) {
                    Ok(()) => diagnostics.page_html = Some(path),
                    Err(e) => tracing::warn!("Could not write page dump: {}", e),
                }
            }
            Err(e) => tracing::warn!("Could not read page content: {}", e),
        }

        diagnostics
    }
}

/// Resolve a step URL against the effective base. Absolute URLs pass through.
fn resolve_url(url: &str, base: Option<&str>) -> Result<String> {
    if let Ok(parsed) = url::Url::parse(url) {
        return Ok(parsed.into());
    }
    let base = base.ok_or_else(|| {
        Error::Browser(format!("relative url '{}' with no base_url", url))
    })?;
    let base = url::Url::parse(base)
        .map_err(|e| Error::Browser(format!("invalid base_url '{}': {}", base, e)))?;
    let joined = base
        .join(url)
        .map_err(|e| Error::Browser(format!("cannot join '{}' to '{}': {}", url, base, e)))?;
    Ok(joined.into())
}

/// Scenario names become artifact directory names; anything unsafe for a
/// path component is mapped to '-'.
fn artifact_stem(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '-'
            }
        })
        .collect()
}
