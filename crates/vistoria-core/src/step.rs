use crate::selector::Selector;
use serde::{Deserialize, Serialize};

/// Default bounded wait for wait/assert steps.
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 10_000;

fn default_timeout() -> u64 {
    DEFAULT_WAIT_TIMEOUT_MS
}

fn is_default_timeout(v: &u64) -> bool {
    *v == DEFAULT_WAIT_TIMEOUT_MS
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// One interaction in a scenario.
///
/// Steps are written in scenario JSON files as tagged objects, e.g.
/// `{"step": "click", "selector": {"css": "#admin-login-link"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Load a URL. Relative URLs resolve against the scenario `base_url`.
    Goto { url: String },

    Click {
        selector: Selector,
    },

    /// Set an input's value, dispatching `input` and `change` events so the
    /// application's listeners fire as they would for real typing.
    Fill {
        selector: Selector,
        value: String,
    },

    SelectOption {
        selector: Selector,
        value: String,
    },

    SetChecked {
        selector: Selector,
        checked: bool,
    },

    WaitVisible {
        selector: Selector,
        #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
        timeout_ms: u64,
    },

    WaitHidden {
        selector: Selector,
        #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a class to appear on (or disappear from) an element, e.g.
    /// `#main-page` gaining `visible` after login.
    WaitClass {
        selector: Selector,
        class: String,
        #[serde(default = "default_present")]
        present: bool,
        #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
        timeout_ms: u64,
    },

    /// Assert on an element's text content, by substring or regex.
    /// Exactly one of `contains` / `matches` must be given.
    AssertText {
        selector: Selector,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        contains: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matches: Option<String>,
        #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
        timeout_ms: u64,
    },

    AssertCount {
        selector: Selector,
        count: usize,
        #[serde(default = "default_timeout", skip_serializing_if = "is_default_timeout")]
        timeout_ms: u64,
    },

    /// Run a JavaScript expression in the page, ignoring its result.
    Evaluate { expression: String },

    /// Arm auto-accept for the next native dialog (alert/confirm/prompt),
    /// optionally answering a prompt with the given text.
    AcceptDialog {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prompt_text: Option<String>,
    },

    /// Capture a PNG artifact named `<name>.png` in the artifact directory.
    /// With a selector the capture is scoped to that element.
    Screenshot {
        name: String,
        #[serde(default, skip_serializing_if = "is_false")]
        full_page: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        selector: Option<Selector>,
    },

    /// Fixed settle delay. Prefer an explicit wait where one exists.
    Sleep { ms: u64 },
}

pub(crate) fn default_present() -> bool {
    true
}

impl Step {
    /// A stable one-line rendering, used as the step label in reports.
    pub fn label(&self) -> String {
        match self {
            Step::Goto { url } => format!("goto {}", url),
            Step::Click { selector } => format!("click {}", selector),
            Step::Fill { selector, value } => format!("fill {} = {:?}", selector, value),
            Step::SelectOption { selector, value } => {
                format!("select {} = {:?}", selector, value)
            }
            Step::SetChecked { selector, checked } => {
                let verb = if *checked { "check" } else { "uncheck" };
                format!("{} {}", verb, selector)
            }
            Step::WaitVisible { selector, .. } => format!("wait visible {}", selector),
            Step::WaitHidden { selector, .. } => format!("wait hidden {}", selector),
            Step::WaitClass {
                selector,
                class,
                present,
                ..
            } => {
                if *present {
                    format!("wait class {} on {}", class, selector)
                } else {
                    format!("wait class {} off {}", class, selector)
                }
            }
            Step::AssertText {
                selector,
                contains,
                matches,
                ..
            } => match (contains, matches) {
                (Some(s), _) => format!("assert {} contains {:?}", selector, s),
                (None, Some(re)) => format!("assert {} matches /{}/", selector, re),
                (None, None) => format!("assert text {}", selector),
            },
            Step::AssertCount {
                selector, count, ..
            } => format!("assert count {} == {}", selector, count),
            Step::Evaluate { .. } => "evaluate".to_string(),
            Step::AcceptDialog { prompt_text } => match prompt_text {
                Some(t) => format!("accept dialog (prompt {:?})", t),
                None => "accept dialog".to_string(),
            },
            Step::Screenshot { name, .. } => format!("screenshot {}", name),
            Step::Sleep { ms } => format!("sleep {}ms", ms),
        }
    }

    /// Selectors this step references, for validation.
    pub fn selectors(&self) -> Vec<&Selector> {
        match self {
            Step::Click { selector }
            | Step::Fill { selector, .. }
            | Step::SelectOption { selector, .. }
            | Step::SetChecked { selector, .. }
            | Step::WaitVisible { selector, .. }
            | Step::WaitHidden { selector, .. }
            | Step::WaitClass { selector, .. }
            | Step::AssertText { selector, .. }
            | Step::AssertCount { selector, .. } => vec![selector],
            Step::Screenshot {
                selector: Some(selector),
                ..
            } => vec![selector],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_step_parses() {
        let step: Step = serde_json::from_str(
            r##"{"step": "click", "selector": {"css": "#admin-login-link"}}"##,
        )
        .unwrap();
        assert_eq!(
            step,
            Step::Click {
                selector: Selector::css("#admin-login-link")
            }
        );
    }

    #[test]
    fn test_wait_class_defaults() {
        let step: Step = serde_json::from_str(
            r##"{"step": "wait_class", "selector": {"css": "#main-page"}, "class": "visible"}"##,
        )
        .unwrap();
        match step {
            Step::WaitClass {
                present,
                timeout_ms,
                ..
            } => {
                assert!(present);
                assert_eq!(timeout_ms, DEFAULT_WAIT_TIMEOUT_MS);
            }
            other => panic!("unexpected step: {:?}", other),
        }
    }

    #[test]
    fn test_fill_label_includes_value() {
        let step = Step::Fill {
            selector: Selector::css("#what-if-receita-descricao"),
            value: "Novo Projeto Y".to_string(),
        };
        assert_eq!(
            step.label(),
            "fill #what-if-receita-descricao = \"Novo Projeto Y\""
        );
    }

    #[test]
    fn test_screenshot_step_roundtrips() {
        let step = Step::Screenshot {
            name: "what_if_feature".to_string(),
            full_page: true,
            selector: None,
        };
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(step, back);
    }

    #[test]
    fn test_role_selector_in_step() {
        let step: Step = serde_json::from_str(
            r#"{"step": "click", "selector": {"role": "link", "name": "Contas a Pagar"}}"#,
        )
        .unwrap();
        assert_eq!(
            step.selectors(),
            vec![&Selector::role("link", "Contas a Pagar")]
        );
    }
}
