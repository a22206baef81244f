//! String-literal escaping for macro expansion echo.
//!
//! [`substitute_escape_codes`] renders a parameter string as the inside of a
//! quoted script literal, so that `:greet a"b` echoes as `greet("a\"b")`.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;

/// Characters that get a two-character escape, paired with that escape.
///
/// Backslash is listed first; the matcher replaces all of them in a single
/// left-to-right pass, so a backslash introduced by one replacement is never
/// seen again by another.
const ESCAPES: &[(&str, &str)] = &[
    ("\\", "\\\\"),
    ("\x08", "\\b"),
    ("\x0c", "\\f"),
    ("\n", "\\n"),
    ("\r", "\\r"),
    ("\t", "\\t"),
    ("\x0b", "\\v"),
    ("'", "\\'"),
    ("\"", "\\\""),
];

static ESCAPE_MATCHER: LazyLock<AhoCorasick> =
    LazyLock::new(|| AhoCorasick::new(ESCAPES.iter().map(|&(from, _)| from)));

/// Replace special characters in `s` with their escape codes.
pub fn substitute_escape_codes(s: &str) -> String {
    let replacements: Vec<&str> = ESCAPES.iter().map(|&(_, to)| to).collect();
    ESCAPE_MATCHER.replace_all(s, &replacements)
}

/// Inverse of [`substitute_escape_codes`].
///
/// Unknown escapes yield the escaped character itself (`\q` → `q`), and a
/// lone trailing backslash is kept.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\x08'),
            Some('f') => out.push('\x0c'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\x0b'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
