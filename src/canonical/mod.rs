//! URL canonicalization for index keys.
//!
//! Equivalent URLs (case variants, default ports, `https` vs `http`, `www.`
//! prefixes, reordered query strings, session ids, trailing slashes) must
//! collapse to the same key so the resource index can select one snapshot per
//! logical resource.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

/// Maps a URL string to a canonical key.
///
/// Returns `None` when the input cannot be parsed as an absolute URL.
pub trait Canonicalizer: Send + Sync {
    fn canonicalize(&self, url: &str) -> Option<String>;
}

static WWW_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^www\d*\.").expect("WWW_PREFIX_RE: hardcoded regex is valid"));

static PATH_SESSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i);(?:jsessionid|phpsessid|sid)=[^/;?]*")
        .expect("PATH_SESSION_RE: hardcoded regex is valid")
});

/// Characters browsers accept literally but that are always escaped in keys
const ALWAYS_ESCAPED: &[char] = &[' ', '"', '<', '>', '[', ']', '\\', '^', '`', '{', '|', '}'];

/// Query parameter names treated as session identifiers
const SESSION_PARAMS: &[&str] = &["jsessionid", "phpsessid", "sid", "sessionid", "cfid", "cftoken"];

/// Aggressive canonicalizer suited to deduplicating archived captures.
///
/// Steps, after WHATWG parsing (lowercase scheme and host, default port
/// removal, dot-segment removal):
/// - `https` becomes `http`
/// - userinfo and fragment are dropped
/// - a leading `www.`/`wwwN.` host label is stripped
/// - escapes of unreserved characters (`%7E`, `%41`) are decoded and
///   loosely accepted characters (`[`, `]`, space) are escaped, so both
///   spellings of a URL share a key
/// - session ids are removed from path parameters and the query
/// - path and query are lowercased, query parameters sorted, empty pairs dropped
/// - a trailing `/` is removed unless the path is `/`
#[derive(Debug, Clone, Copy, Default)]
pub struct AggressiveCanonicalizer;

impl Canonicalizer for AggressiveCanonicalizer {
    fn canonicalize(&self, url: &str) -> Option<String> {
        let parsed = Url::parse(url.trim()).ok()?;

        let scheme = match parsed.scheme() {
            "https" => "http",
            other => other,
        };

        let mut canonical = String::with_capacity(url.len());
        canonical.push_str(scheme);

        if parsed.cannot_be_a_base() {
            canonical.push(':');
            canonical.push_str(&parsed.path().to_lowercase());
            return Some(canonical);
        }

        canonical.push_str("://");
        if let Some(host) = parsed.host_str() {
            canonical.push_str(&WWW_PREFIX_RE.replace(host, ""));
        }

        // Default ports were already dropped by the parser
        if let Some(port) = parsed.port() {
            canonical.push(':');
            canonical.push_str(&port.to_string());
        }

        let path = normalize_escapes(parsed.path()).to_lowercase();
        let path = PATH_SESSION_RE.replace_all(&path, "");
        let trimmed = path.trim_end_matches('/');
        if trimmed.is_empty() {
            canonical.push('/');
        } else {
            canonical.push_str(trimmed);
        }

        if let Some(query) = parsed.query().map(normalize_escapes) {
            let mut pairs: Vec<&str> = query
                .split('&')
                .filter(|pair| !pair.is_empty())
                .filter(|pair| {
                    let name = pair.split('=').next().unwrap_or_default().to_lowercase();
                    !SESSION_PARAMS.contains(&name.as_str()) && !name.starts_with("aspsessionid")
                })
                .collect();
            if !pairs.is_empty() {
                pairs.sort_unstable_by_key(|pair| pair.to_lowercase());
                canonical.push('?');
                canonical.push_str(&pairs.join("&").to_lowercase());
            }
        }

        Some(canonical)
    }
}

/// Rewrite percent-escapes into one form: unreserved characters decoded,
/// everything else escaped with uppercase hex.
fn normalize_escapes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if c == '%' {
            let escaped = rest
                .get(1..3)
                .filter(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit()))
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = escaped {
                if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
                    out.push(char::from(byte));
                } else {
                    out.push_str(&format!("%{byte:02X}"));
                }
                rest = &rest[3..];
                continue;
            }
        }

        if ALWAYS_ESCAPED.contains(&c) {
            out.push_str(&format!("%{:02X}", u32::from(c)));
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    out
}
