//! Deferred rewriting of site-root links in script text.
//!
//! Script bodies are not parsed. The only recognized form is a literal
//! `href="/..."` (as produced by client-side templates that build anchors
//! from strings). The literal is turned into a string concatenation with a
//! prefix that an injected prelude computes in the browser: the number of
//! directories between the current page and its host directory in the
//! output tree, as `../` segments.

use std::sync::LazyLock;

use rand::Rng;
use regex::{Captures, Regex};

use crate::utils::SCRIPT_NAMESPACE_LEN;

static SCRIPT_HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"href="(.*?)""#).expect("SCRIPT_HREF_RE: hardcoded regex is valid")
});

const NAMESPACE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Random identifier prefix for the injected variables
#[must_use]
pub fn random_namespace() -> String {
    let mut rng = rand::rng();
    (0..SCRIPT_NAMESPACE_LEN)
        .map(|_| NAMESPACE_ALPHABET[rng.random_range(0..NAMESPACE_ALPHABET.len())] as char)
        .collect()
}

/// Rewrite `href="/..."` literals in `script`.
///
/// `host_dir` is the first segment of the script's output path; the prelude
/// uses it to find where the output tree's host directory starts in
/// `window.location.pathname`. The prelude is only added when at least one
/// literal was rewritten. Returns the new text and the number of literals
/// changed.
#[must_use]
pub fn rewrite_script(script: &str, namespace: &str, host_dir: &str) -> (String, usize) {
    let mut count = 0;
    let body = SCRIPT_HREF_RE.replace_all(script, |caps: &Captures<'_>| {
        let value = &caps[1];
        // Protocol-relative URLs are absolute
        if !value.starts_with('/') || value.starts_with("//") {
            return caps[0].to_string();
        }
        count += 1;
        format!(
            "href=\"' + {namespace}_relativePath + '{}\"",
            value.trim_start_matches('/')
        )
    });

    if count == 0 {
        return (script.to_string(), 0);
    }
    (format!("{}{body}", prelude(namespace, host_dir)), count)
}

fn prelude(ns: &str, host_dir: &str) -> String {
    let marker = format!("/{host_dir}/").replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        "// --------------------------------------------------------\n\
         // {ns}\n\
         var {ns}_pathname = window.location.pathname.replace(/\\/+/g, \"/\");\n\
         var {ns}_basePath = \"{marker}\";\n\
         var {ns}_inSite = {ns}_pathname;\n\
         if ({ns}_pathname.indexOf({ns}_basePath) !== -1) {{ {ns}_inSite = {ns}_pathname.split({ns}_basePath)[1]; }}\n\
         var {ns}_folders = {ns}_inSite.split(\"/\").filter(function (item) {{ return item !== \"\"; }});\n\
         if ({ns}_inSite.length > 0 && {ns}_inSite.charAt({ns}_inSite.length - 1) !== \"/\") {{ {ns}_folders.pop(); }}\n\
         var {ns}_relativePath = '';\n\
         {ns}_folders.forEach(function () {{ {ns}_relativePath += '../'; }});\n\
         // --------------------------------------------------------\n\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_relative_href_deferred() {
        let js = r#"el.innerHTML = '<a href="/about">About</a>';"#;
        let (out, n) = rewrite_script(js, "NS", "ex.org");

        assert_eq!(n, 1);
        assert!(out.starts_with("// ----"));
        assert!(out.contains(r#"var NS_basePath = "/ex.org/";"#));
        assert!(out.ends_with(r#"el.innerHTML = '<a href="' + NS_relativePath + 'about">About</a>';"#));
    }

    #[test]
    fn test_other_hrefs_untouched() {
        let js = r#"a = '<a href="http://x.org/">'; b = '<a href="rel.html">'; c = '<a href="//cdn.org/x">';"#;
        let (out, n) = rewrite_script(js, "NS", "ex.org");
        assert_eq!(n, 0);
        assert_eq!(out, js);
    }

    #[test]
    fn test_random_namespace() {
        let ns = random_namespace();
        assert_eq!(ns.len(), SCRIPT_NAMESPACE_LEN);
        assert!(ns.chars().all(|c| c.is_ascii_alphabetic()));
    }
}
