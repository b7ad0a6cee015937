//! Page scripts for the scripted click/focus fallbacks.
//!
//! ## Security: JS encoding
//!
//! Locator values come from a settings file. They are escaped for a JS
//! string context and only ever injected into string literals, never
//! into code positions.

use foldbatch::Locator;

/// What the fallback script does with the element it finds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptAction {
    Click,
    Focus,
}

/// Build an expression that finds the element described by `locator`
/// (CSS match narrowed by trimmed text) and performs `action` on it.
/// Evaluates to `true` when an element was found.
pub fn lookup_script(locator: &Locator, action: ScriptAction) -> String {
    let text = match &locator.text {
        Some(t) => format!("'{}'", sanitize_js_string(t.trim())),
        None => "null".to_string(),
    };
    let act = match action {
        ScriptAction::Click => "el.click();",
        ScriptAction::Focus => "el.scrollIntoView({ block: 'center' }); el.focus();",
    };
    format!(
        r#"(() => {{
            const wanted = {text};
            const hits = Array.from(document.querySelectorAll('{css}'))
                .filter(e => wanted === null || (e.textContent || '').trim().includes(wanted));
            const el = {pick};
            if (!el) return false;
            {act}
            return true;
        }})()"#,
        css = sanitize_js_string(&locator.css),
        pick = if locator.last {
            "hits[hits.length - 1]"
        } else {
            "hits[0]"
        },
    )
}

/// Called on an element: true when it occupies layout space and is not
/// hidden by style.
pub const IS_VISIBLE_FN: &str = r#"function() {
    const r = this.getBoundingClientRect();
    const s = window.getComputedStyle(this);
    return r.width > 0 && r.height > 0 && s.visibility !== 'hidden' && s.display !== 'none';
}"#;

/// Called on an input: empty it and notify the page's listeners.
pub const CLEAR_VALUE_FN: &str = r#"function() {
    this.focus();
    this.value = '';
    this.dispatchEvent(new Event('input', { bubbles: true }));
}"#;

/// Hides the automation flag from page scripts.
pub const HIDE_WEBDRIVER: &str =
    "Object.defineProperty(navigator, 'webdriver', { get: () => undefined });";

/// Sanitize a string for safe injection into a JavaScript string literal.
///
/// Escapes all characters that could break out of a JS string context:
/// - Backslashes, single/double quotes, backticks
/// - Newlines, carriage returns, tabs
/// - HTML script tags (to prevent XSS if value is reflected in HTML)
/// - Null bytes
pub fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
