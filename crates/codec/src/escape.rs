//! String escaping for generated JSON
//!
//! Only backslash and double quote are escaped. Every other character,
//! including non-ASCII text, is written unchanged.

/// Escape `\` and `"` in a string value
pub fn escape_json_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            _ => out.push(c),
        }
    }
    out
}

/// Escape and wrap in double quotes
pub fn quote(s: &str) -> String {
    format!("\"{}\"", escape_json_string(s))
}
