//! DOT format helpers for rendering control flow graphs with Graphviz.

/// Escapes a string for use inside a quoted DOT label.
///
/// Quotes, backslashes and angle brackets are escaped, newlines become `\n` and carriage
/// returns are dropped. IL operands such as `"hello"` string constants or `<tmp>` names
/// render without breaking the record syntax.
///
/// # Examples
///
/// ```rust
/// use ilscope::utils::escape_dot;
///
/// assert_eq!(escape_dot("t<1> = \"a\""), "t\\<1\\> = \\\"a\\\"");
/// ```
#[must_use]
pub fn escape_dot(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => {}
            '<' => escaped.push_str("\\<"),
            '>' => escaped.push_str("\\>"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(escape_dot("LOAD_IMMEDIATE t0, 42"), "LOAD_IMMEDIATE t0, 42");
    }

    #[test]
    fn test_special_characters() {
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
        assert_eq!(escape_dot("line1\r\nline2"), "line1\\nline2");
        assert_eq!(escape_dot("Array<u8>"), "Array\\<u8\\>");
    }
}
