//! Pattern-based rewriting of CSS `url()` references.
//!
//! There is no CSS parser here. Only `url(...)` constructs preceded by
//! whitespace, `:` or `,` (or at the very start) are recognized, in unquoted,
//! single-quoted and double-quoted forms. `@import "x.css"` without `url()`
//! is not covered.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static CSS_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)((?:^|[\s:,])url\()(\s*)([^ "')]+|"[^"]+"|'[^']+')(\s*\))"#)
        .expect("CSS_URL_RE: hardcoded regex is valid")
});

/// Rewrite every recognized `url()` whose target `map` resolves.
///
/// Quotes around the original value are dropped; `"`, `'` and `)` in the
/// replacement are backslash-escaped so the construct stays valid unquoted.
/// Returns the new text and the number of references changed.
pub fn rewrite_css(css: &str, map: &dyn Fn(&str) -> Option<String>) -> (String, usize) {
    let mut count = 0;
    let rewritten = CSS_URL_RE.replace_all(css, |caps: &Captures<'_>| {
        let raw = &caps[3];
        let url = strip_quotes(raw);

        match map(url) {
            Some(replacement) if replacement != url => {
                count += 1;
                format!("{}{}{}{}", &caps[1], &caps[2], escape(&replacement), &caps[4])
            }
            _ => caps[0].to_string(),
        }
    });
    (rewritten.into_owned(), count)
}

fn strip_quotes(value: &str) -> &str {
    let quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if quoted { &value[1..value.len() - 1] } else { value }
}

fn escape(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    for c in replacement.chars() {
        if matches!(c, '"' | '\'' | ')') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
