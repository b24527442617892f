use serde::{Deserialize, Serialize};

/// Identifies one or more elements on the page under test.
///
/// Most scenarios use plain CSS selectors. `Role` addresses an element by
/// its accessible role and name (e.g. the button labelled "Entrar"), which
/// survives markup churn better than deep CSS paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Css { css: String },
    Role { role: String, name: String },
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Selector::Css { css: css.into() }
    }

    pub fn role(role: impl Into<String>, name: impl Into<String>) -> Self {
        Selector::Role {
            role: role.into(),
            name: name.into(),
        }
    }

    /// True when the selector query is empty and can never match.
    pub fn is_empty(&self) -> bool {
        match self {
            Selector::Css { css } => css.trim().is_empty(),
            Selector::Role { role, name } => {
                role.trim().is_empty() || name.trim().is_empty()
            }
        }
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Css { css } => write!(f, "{}", css),
            Selector::Role { role, name } => write!(f, "role={}[name={:?}]", role, name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_selector_parses_from_json() {
        let sel: Selector = serde_json::from_str(r##"{"css": "#main-page"}"##).unwrap();
        assert_eq!(sel, Selector::css("#main-page"));
    }

    #[test]
    fn test_role_selector_parses_from_json() {
        let sel: Selector =
            serde_json::from_str(r#"{"role": "button", "name": "Financeiro"}"#).unwrap();
        assert_eq!(sel, Selector::role("button", "Financeiro"));
    }

    #[test]
    fn test_empty_selector_is_detected() {
        assert!(Selector::css("  ").is_empty());
        assert!(Selector::role("button", "").is_empty());
        assert!(!Selector::css("#login-page").is_empty());
    }

    #[test]
    fn test_display_formats_both_variants() {
        assert_eq!(Selector::css("#x").to_string(), "#x");
        assert_eq!(
            Selector::role("link", "Contas a Pagar").to_string(),
            "role=link[name=\"Contas a Pagar\"]"
        );
    }
}
