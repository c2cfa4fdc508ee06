//! DOT format utilities for graph visualization.
//!
//! Helpers for generating DOT output that can be rendered with Graphviz
//! tooling. Only text generation lives here; rendering is out of scope.

/// Escapes a string for safe use in DOT format labels and identifiers.
///
/// Handles the characters that carry special meaning in DOT labels:
/// quotes, backslashes, newlines and angle brackets.
///
/// # Arguments
///
/// * `s` - The string to escape
///
/// # Returns
///
/// A new string with all special characters properly escaped.
#[must_use]
pub fn escape_dot(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\r', "")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_dot_plain() {
        assert_eq!(escape_dot("loop.head"), "loop.head");
    }

    #[test]
    fn test_escape_dot_quotes_and_backslash() {
        assert_eq!(escape_dot("a \"b\""), "a \\\"b\\\"");
        assert_eq!(escape_dot("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_escape_dot_newlines() {
        assert_eq!(escape_dot("a\nb"), "a\\nb");
        assert_eq!(escape_dot("a\r\nb"), "a\\nb");
    }

    #[test]
    fn test_escape_dot_angle_brackets() {
        assert_eq!(escape_dot("v<0>"), "v\\<0\\>");
    }
}
