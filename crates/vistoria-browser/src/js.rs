//! Builders for the JavaScript expressions the driver evaluates in the page.
//!
//! Everything here is a pure string builder so the escaping and predicate
//! logic can be unit tested without a browser. String arguments are embedded
//! as JSON literals, which is also valid JavaScript string syntax.

use vistoria_core::Selector;

/// Attribute used to hand a role-resolved element back to CSS-based CDP calls.
pub const HIT_ATTR: &str = "data-vistoria-hit";

fn js_str(s: &str) -> String {
    // serde_json escaping covers quotes, backslashes and control characters.
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Expression evaluating to an array of elements matching the selector.
pub fn query(selector: &Selector) -> String {
    match selector {
        Selector::Css { css } => {
            format!("Array.from(document.querySelectorAll({}))", js_str(css))
        }
        Selector::Role { role, name } => format!(
            "(function(role, name) {{ \
               const norm = (s) => (s || '').replace(/\\s+/g, ' ').trim(); \
               const accName = (el) => norm(el.getAttribute('aria-label') || el.textContent || el.value || ''); \
               const map = {{ \
                 link: 'a[href], [role=link]', \
                 button: 'button, input[type=button], input[type=submit], [role=button]', \
                 heading: 'h1,h2,h3,h4,h5,h6,[role=heading]', \
                 textbox: 'input, textarea, [role=textbox]', \
                 checkbox: 'input[type=checkbox], [role=checkbox]' \
               }}; \
               const sel = map[role] || '[role=\"' + role + '\"]'; \
               return Array.from(document.querySelectorAll(sel)).filter((el) => accName(el) === norm(name)); \
             }})({}, {})",
            js_str(role),
            js_str(name)
        ),
    }
}

fn first(selector: &Selector) -> String {
    format!("({})[0]", query(selector))
}

/// Predicate: the first matching element is rendered and visible.
/// A missing element is not visible.
pub fn is_visible(selector: &Selector) -> String {
    format!(
        "(function() {{ \
           const el = {}; \
           if (!el) return false; \
           const st = window.getComputedStyle(el); \
           return st.display !== 'none' && st.visibility !== 'hidden' && el.getClientRects().length > 0; \
         }})()",
        first(selector)
    )
}

/// Predicate: no matching element is visible.
pub fn is_hidden(selector: &Selector) -> String {
    format!("!({})", is_visible(selector))
}

/// Predicate: the first matching element carries (or lacks) the class.
pub fn has_class(selector: &Selector, class: &str, present: bool) -> String {
    let check = format!(
        "(function() {{ const el = {}; return !!el && el.classList.contains({}); }})()",
        first(selector),
        js_str(class)
    );
    if present { check } else { format!("!({})", check) }
}

/// Expression evaluating to the number of matching elements.
pub fn count(selector: &Selector) -> String {
    format!("({}).length", query(selector))
}

/// Expression evaluating to the first match's text content, or null.
pub fn text_content(selector: &Selector) -> String {
    format!(
        "(function() {{ const el = {}; return el ? el.textContent : null; }})()",
        first(selector)
    )
}

/// Set an input's value the way the application expects user typing to:
/// focus, assign, then dispatch `input` and `change`. Evaluates to false
/// when no element matches.
pub fn fill(selector: &Selector, value: &str) -> String {
    format!(
        "(function() {{ \
           const el = {}; \
           if (!el) return false; \
           el.focus(); \
           el.value = {}; \
           el.dispatchEvent(new Event('input', {{bubbles: true}})); \
           el.dispatchEvent(new Event('change', {{bubbles: true}})); \
           return true; \
         }})()",
        first(selector),
        js_str(value)
    )
}

/// Select a `<select>` option by value and fire `change`.
pub fn select_option(selector: &Selector, value: &str) -> String {
    format!(
        "(function() {{ \
           const el = {}; \
           if (!el) return false; \
           el.value = {}; \
           el.dispatchEvent(new Event('change', {{bubbles: true}})); \
           return true; \
         }})()",
        first(selector),
        js_str(value)
    )
}

/// Check or uncheck a checkbox via a real click so listeners fire.
pub fn set_checked(selector: &Selector, checked: bool) -> String {
    format!(
        "(function() {{ \
           const el = {}; \
           if (!el) return false; \
           if (el.checked !== {}) el.click(); \
           return true; \
         }})()",
        first(selector),
        checked
    )
}

/// Tag the first match with [`HIT_ATTR`] so CDP element commands can reach
/// role-resolved elements through a CSS query. Evaluates to false when
/// nothing matches.
pub fn tag_first(selector: &Selector) -> String {
    format!(
        "(function() {{ \
           document.querySelectorAll('[{attr}]').forEach((e) => e.removeAttribute('{attr}')); \
           const el = {}; \
           if (!el) return false; \
           el.setAttribute('{attr}', ''); \
           return true; \
         }})()",
        first(selector),
        attr = HIT_ATTR
    )
}

/// Remove any leftover hit tags.
pub fn clear_tags() -> String {
    format!(
        "document.querySelectorAll('[{attr}]').forEach((e) => e.removeAttribute('{attr}'))",
        attr = HIT_ATTR
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_css_query_is_escaped() {
        let q = query(&Selector::css("#admin-login-form button[type='submit']"));
        assert_eq!(
            q,
            "Array.from(document.querySelectorAll(\"#admin-login-form button[type='submit']\"))"
        );
    }

    #[test]
    fn test_quotes_in_selectors_do_not_break_out() {
        let q = query(&Selector::css("a[data-target=\"relatorios-page\"]"));
        assert!(q.contains("a[data-target=\\\"relatorios-page\\\"]"));
    }

    #[test]
    fn test_role_query_embeds_role_and_name() {
        let q = query(&Selector::role("button", "Financeiro"));
        assert!(q.contains("})(\"button\", \"Financeiro\")"));
        assert!(q.contains("aria-label"));
    }

    #[test]
    fn test_visibility_predicate_handles_missing_element() {
        let expr = is_visible(&Selector::css("#main-page"));
        assert!(expr.contains("if (!el) return false"));
        assert!(expr.contains("getClientRects"));
    }

    #[test]
    fn test_hidden_is_negated_visible() {
        let expr = is_hidden(&Selector::css("#x"));
        assert!(expr.starts_with("!("));
    }

    #[test]
    fn test_class_predicate_negation() {
        let on = has_class(&Selector::css("#main-page"), "visible", true);
        let off = has_class(&Selector::css("#main-page"), "visible", false);
        assert!(on.contains("classList.contains(\"visible\")"));
        assert_eq!(off, format!("!({})", on));
    }

    #[test]
    fn test_fill_dispatches_input_and_change() {
        let expr = fill(
            &Selector::css("#what-if-receita-valor"),
            "5000",
        );
        assert!(expr.contains("el.value = \"5000\""));
        assert!(expr.contains("new Event('input'"));
        assert!(expr.contains("new Event('change'"));
    }

    #[test]
    fn test_fill_escapes_value() {
        let expr = fill(&Selector::css("#d"), "Salário \"Dev\" Jr.");
        assert!(expr.contains("\"Salário \\\"Dev\\\" Jr.\""));
    }

    #[test]
    fn test_set_checked_uses_click_toggle() {
        let expr = set_checked(&Selector::css("#what-if-include-projections"), false);
        assert!(expr.contains("el.checked !== false"));
        assert!(expr.contains("el.click()"));
    }

    #[test]
    fn test_tag_first_clears_previous_tags() {
        let expr = tag_first(&Selector::role("link", "Contas a Pagar"));
        let clears = expr.matches("removeAttribute").count();
        assert!(clears >= 1);
        assert!(expr.contains(HIT_ATTR));
    }

    #[test]
    fn test_count_expression() {
        let expr = count(&Selector::css(".notification-item"));
        assert!(expr.ends_with(".length"));
    }
}
