use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Outcome of a single step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed { error: String },
    /// Steps after the first failure are not attempted.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 1-based position in the scenario (0 marks fixture work: the entry
    /// navigation and the login sequence).
    pub index: usize,
    pub label: String,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
}

impl StepOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.status, StepStatus::Passed)
    }
}

/// Artifacts captured when a scenario fails, so a failed run is debuggable
/// from the report alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_screenshot: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_html: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub console: Vec<ConsoleMessage>,
}

/// A console message captured from the page during the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsoleMessage {
    pub level: String,
    pub text: String,
}

/// The uniform per-scenario result: every run produces one of these,
/// pass or fail. Errors never escape a run as exceptions to a caller;
/// they land here as a failed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub started_at: DateTime<Utc>,
    #[serde(with = "duration_millis")]
    pub duration: Duration,
    pub steps: Vec<StepOutcome>,
    /// Screenshot files written during the run, in capture order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|s| !matches!(s.status, StepStatus::Failed { .. }))
    }

    /// The failing step, if any.
    pub fn failure(&self) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|s| matches!(s.status, StepStatus::Failed { .. }))
    }
}

/// Aggregate over a multi-scenario run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub reports: Vec<ScenarioReport>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: ScenarioReport) {
        self.reports.push(report);
    }

    pub fn total(&self) -> usize {
        self.reports.len()
    }

    pub fn passed(&self) -> usize {
        self.reports.iter().filter(|r| r.passed()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }
}

/// Serialize `Duration` as integer milliseconds for report readability.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(index: usize, status: StepStatus) -> StepOutcome {
        StepOutcome {
            index,
            label: format!("step {}", index),
            status,
            duration: Duration::from_millis(12),
        }
    }

    fn report(name: &str, steps: Vec<StepOutcome>) -> ScenarioReport {
        ScenarioReport {
            scenario: name.to_string(),
            started_at: Utc::now(),
            duration: Duration::from_millis(340),
            steps,
            artifacts: vec![],
            diagnostics: None,
        }
    }

    #[test]
    fn test_report_passes_when_all_steps_pass() {
        let r = report(
            "ok",
            vec![outcome(1, StepStatus::Passed), outcome(2, StepStatus::Passed)],
        );
        assert!(r.passed());
        assert!(r.failure().is_none());
    }

    #[test]
    fn test_report_fails_on_any_failed_step() {
        let r = report(
            "bad",
            vec![
                outcome(1, StepStatus::Passed),
                outcome(
                    2,
                    StepStatus::Failed {
                        error: "timed out".to_string(),
                    },
                ),
                outcome(3, StepStatus::Skipped),
            ],
        );
        assert!(!r.passed());
        assert_eq!(r.failure().unwrap().index, 2);
    }

    #[test]
    fn test_skipped_steps_do_not_fail_a_report() {
        // Skipped alone never happens in practice, but the predicate should
        // only key off Failed.
        let r = report("odd", vec![outcome(1, StepStatus::Skipped)]);
        assert!(r.passed());
    }

    #[test]
    fn test_summary_counts() {
        let mut summary = RunSummary::new();
        summary.push(report("a", vec![outcome(1, StepStatus::Passed)]));
        summary.push(report(
            "b",
            vec![outcome(
                1,
                StepStatus::Failed {
                    error: "boom".to_string(),
                },
            )],
        ));
        assert_eq!(summary.total(), 2);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.failed(), 1);
        assert!(!summary.all_passed());
    }

    #[test]
    fn test_report_serializes_duration_as_millis() {
        let r = report("ser", vec![outcome(1, StepStatus::Passed)]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["duration"], 340);
        assert_eq!(json["steps"][0]["status"], "passed");
    }

    #[test]
    fn test_report_roundtrips() {
        let r = report(
            "rt",
            vec![outcome(
                1,
                StepStatus::Failed {
                    error: "no such element".to_string(),
                },
            )],
        );
        let json = serde_json::to_string(&r).unwrap();
        let back: ScenarioReport = serde_json::from_str(&json).unwrap();
        assert_eq!(r, back);
    }
}
