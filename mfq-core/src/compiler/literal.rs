//! Deterministic rendering of literals in compiled query text

/// Render a number so it always carries a decimal point (`4.0`, `-0.5`)
pub fn number(value: f64) -> String {
    // normalize -0.0
    let value = if value == 0.0 { 0.0 } else { value };
    let text = value.to_string();
    if text.contains('.') || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Single-quoted string literal with `\` and `'` escaped
pub fn string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('\'');
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}
