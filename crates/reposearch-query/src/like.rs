//! Translation of SQL `LIKE` patterns into anchored regular expressions.

/// The pattern that matches every value, compiled without a regex.
pub const MATCH_ALL_PATTERN: &str = "%";

/// Converts a `LIKE` pattern into a regular expression matching the same
/// strings.
///
/// Alphanumeric characters are copied, `_` becomes `.`, `%` becomes `.*`, and
/// every other character is matched literally. A backslash makes the next
/// character literal (so `\%` matches a percent sign); a trailing backslash
/// matches itself. The result is anchored with `^` and `$`.
#[must_use]
pub fn like_pattern_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 8);
    regex.push('^');

    let mut escaped = false;
    for ch in pattern.chars() {
        if escaped {
            push_literal(&mut regex, ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            other => push_literal(&mut regex, other),
        }
    }
    if escaped {
        push_literal(&mut regex, '\\');
    }

    regex.push('$');
    regex
}

/// `true` for the pattern that matches any value.
#[must_use]
pub fn is_match_all(pattern: &str) -> bool {
    pattern == MATCH_ALL_PATTERN
}

fn push_literal(regex: &mut String, ch: char) {
    if !ch.is_alphanumeric() && regex_syntax::is_escapeable_character(ch) {
        regex.push('\\');
    }
    regex.push(ch);
}
