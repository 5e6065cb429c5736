//! Page-side JavaScript used by the headless backend.
//!
//! Selectors and text are embedded as JSON string literals, so any quoting
//! in them is safe.

/// Check if an error indicates the page context is unavailable (e.g., during navigation).
pub fn is_context_error(err: &str) -> bool {
    err.contains("Cannot find context")
        || err.contains("Execution context was destroyed")
        || err.contains("-32000")
}

fn literal(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Evaluates to `true` when any element matches.
pub fn presence(selector: &str) -> String {
    format!("document.querySelector({}) !== null", literal(selector))
}

/// Evaluates to the rendered text of every match, in document order.
pub fn texts(selector: &str) -> String {
    format!(
        "Array.from(document.querySelectorAll({}), (el) => el.innerText ?? el.textContent ?? '')",
        literal(selector)
    )
}

/// Puts `text` into the first match and fires `input`. Evaluates to `false`
/// when nothing matches.
///
/// Plain inputs go through the native value setter so framework-controlled
/// components see the change; contenteditable editors get `insertText`.
pub fn fill(selector: &str, text: &str) -> String {
    format!(
        r#"(() => {{
    const el = document.querySelector({selector});
    if (!el) return false;
    el.focus();
    const proto = el instanceof HTMLTextAreaElement
        ? HTMLTextAreaElement.prototype
        : el instanceof HTMLInputElement ? HTMLInputElement.prototype : null;
    if (proto) {{
        Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {text});
        el.dispatchEvent(new Event('input', {{ bubbles: true }}));
    }} else {{
        document.execCommand('selectAll', false);
        document.execCommand('insertText', false, {text});
    }}
    return true;
}})()"#,
        selector = literal(selector),
        text = literal(text)
    )
}
