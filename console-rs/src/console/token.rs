//! First-token splitting for console arguments.

use std::sync::LazyLock;

use regex::Regex;

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s+").expect("static whitespace pattern")
});

/// Split `s` at its first run of whitespace.
///
/// Returns the text before the run and the text after it.  When `s` contains
/// no whitespace the remainder is `None`.  Leading whitespace is skipped by
/// recursing once on the remainder; the recursion cannot go deeper because the
/// regex consumes the whole leading run.
///
/// ```
/// use ooconsole::console::get_one_token;
///
/// assert_eq!(get_one_token("x   y"), ("x", Some("y")));
/// assert_eq!(get_one_token(" xy"), ("xy", None));
/// assert_eq!(get_one_token(" "), ("", None));
/// ```
pub fn get_one_token(s: &str) -> (&str, Option<&str>) {
    match WHITESPACE_RUN.find(s) {
        Some(m) => {
            let token = &s[..m.start()];
            let tail = &s[m.end()..];
            if token.is_empty() {
                get_one_token(tail)
            } else {
                (token, Some(tail))
            }
        }
        None => (s, None),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
