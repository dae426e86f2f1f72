//! Link rewriting against the resource index.
//!
//! [`LinkResolver::rewrite_link`] is the single primitive: resolve an embedded
//! reference against the page it appears on, look the result up in the index,
//! and express the target's output path relative to the page's own output
//! path. The surface rewriters apply it to HTML attributes and `<style>`
//! blocks, CSS `url()` constructs, and redirect placeholders. Script text is
//! handled without the index (see [`script`]).
//!
//! Every rewriter is best-effort: anything that cannot be parsed or resolved
//! is left exactly as it was.

pub mod css;
pub mod html;
pub mod redirect_page;
pub mod script;

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use url::Url;

use crate::resource_index::{ResourceIndex, Snapshot, SnapshotId};
use crate::utils::relativize;

/// Resolves embedded references to relative output paths
#[derive(Debug, Clone, Copy)]
pub struct LinkResolver<'a> {
    index: &'a ResourceIndex,
}

impl<'a> LinkResolver<'a> {
    #[must_use]
    pub fn new(index: &'a ResourceIndex) -> Self {
        Self { index }
    }

    #[must_use]
    pub fn index(&self) -> &'a ResourceIndex {
        self.index
    }

    /// The selected snapshot an embedded reference points at
    #[must_use]
    pub fn resolve(&self, embedded: &str, base: &Url) -> Option<(SnapshotId, &'a Snapshot)> {
        let absolute = base.join(embedded.trim()).ok()?;
        self.index.lookup(absolute.as_str())
    }

    /// Relative path from `from_path`'s directory to the snapshot `embedded`
    /// resolves to. `None` if the reference is malformed or not archived.
    #[must_use]
    pub fn rewrite_link(&self, embedded: &str, base: &Url, from_path: &str) -> Option<String> {
        let (_, target) = self.resolve(embedded, base)?;
        relativize(target.output_path()?, from_path)
    }
}

/// How a snapshot's body is transformed on output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    RedirectPage,
    Html,
    Css,
    Script,
    Verbatim,
}

impl BodyKind {
    #[must_use]
    pub fn of(snapshot: &Snapshot) -> Self {
        if snapshot.is_redirect() {
            return Self::RedirectPage;
        }
        match snapshot.content_type() {
            "text/html" | "application/xhtml+xml" => Self::Html,
            "text/css" => Self::Css,
            ct if ct.contains("javascript") || ct.contains("ecmascript") => Self::Script,
            _ => Self::Verbatim,
        }
    }

    /// Whether the archived body is needed to produce the output
    #[must_use]
    pub fn needs_body(self) -> bool {
        self != Self::RedirectPage
    }
}

/// Output bytes for one snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub body: Vec<u8>,
    pub links_rewritten: usize,
}

impl Rewritten {
    fn unchanged(body: Vec<u8>) -> Self {
        Self {
            body,
            links_rewritten: 0,
        }
    }
}

/// Produce the output for an emitted snapshot.
///
/// `body` is the decoded archived payload; it is ignored for redirects.
/// Rewriting failures fall back to the original bytes.
#[must_use]
pub fn rewrite_snapshot(
    resolver: &LinkResolver<'_>,
    id: SnapshotId,
    snapshot: &Snapshot,
    body: Vec<u8>,
) -> Rewritten {
    let kind = BodyKind::of(snapshot);
    let (Ok(base), Some(from_path)) = (Url::parse(snapshot.url()), snapshot.output_path()) else {
        return Rewritten::unchanged(body);
    };
    let map = |link: &str| resolver.rewrite_link(link, &base, from_path);

    match kind {
        BodyKind::RedirectPage => redirect_page::render(resolver, id, snapshot),
        BodyKind::Html => match html::rewrite_html(&body, &map) {
            Ok((_, 0)) => Rewritten::unchanged(body),
            Ok((rewritten, links_rewritten)) => Rewritten {
                body: rewritten,
                links_rewritten,
            },
            Err(e) => {
                log::warn!("Leaving {} unrewritten: {e}", snapshot.url());
                Rewritten::unchanged(body)
            }
        },
        BodyKind::Css => {
            let (text, encoding) = decode_text(&body);
            match css::rewrite_css(&text, &map) {
                (_, 0) => Rewritten::unchanged(body),
                (rewritten, links_rewritten) => Rewritten {
                    body: encode_text(&rewritten, encoding),
                    links_rewritten,
                },
            }
        }
        BodyKind::Script => {
            let (text, encoding) = decode_text(&body);
            let marker = from_path.split('/').next().unwrap_or_default();
            let namespace = script::random_namespace();
            match script::rewrite_script(&text, &namespace, marker) {
                (_, 0) => Rewritten::unchanged(body),
                (rewritten, links_rewritten) => Rewritten {
                    body: encode_text(&rewritten, encoding),
                    links_rewritten,
                },
            }
        }
        BodyKind::Verbatim => Rewritten::unchanged(body),
    }
}

/// Decode stylesheet or script bytes: UTF-8 when valid, otherwise the
/// single-byte fallback.
pub(crate) fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, &'static Encoding) {
    match std::str::from_utf8(bytes) {
        Ok(text) => (Cow::Borrowed(text), UTF_8),
        Err(_) => {
            let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            (text, WINDOWS_1252)
        }
    }
}

pub(crate) fn encode_text(text: &str, encoding: &'static Encoding) -> Vec<u8> {
    let (bytes, _, _) = encoding.encode(text);
    bytes.into_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ForcedExtensions;
    use crate::resource_index::test_support::{record, redirect};

    fn index() -> ResourceIndex {
        let mut index = ResourceIndex::new(Arc::new(ForcedExtensions::builtin().unwrap()));
        index.add(record("http://ex.org/", "text/html", 200, 1)).unwrap();
        index.add(record("http://ex.org/about", "text/plain", 200, 1)).unwrap();
        index.add(record("http://ex.org/img/a.png", "image/png", 200, 1)).unwrap();
        index.add(record("http://ex.org/styles/main.css", "text/css", 200, 1)).unwrap();
        index
    }

    #[test]
    fn test_rewrite_link() {
        let index = index();
        let resolver = LinkResolver::new(&index);
        let base = Url::parse("http://ex.org/").unwrap();

        assert_eq!(
            resolver.rewrite_link("/about", &base, "ex.org/index.html").as_deref(),
            Some("about.txt")
        );
        assert_eq!(
            resolver.rewrite_link("HTTPS://WWW.EX.ORG/img/a.png", &base, "ex.org/index.html").as_deref(),
            Some("img/a.png")
        );
        assert_eq!(resolver.rewrite_link("/missing", &base, "ex.org/index.html"), None);
        assert_eq!(resolver.rewrite_link("http://[::1", &base, "ex.org/index.html"), None);
    }

    #[test]
    fn test_rewrite_link_from_subdirectory() {
        let index = index();
        let resolver = LinkResolver::new(&index);
        let base = Url::parse("http://ex.org/styles/main.css").unwrap();

        assert_eq!(
            resolver.rewrite_link("../img/a.png", &base, "ex.org/styles/main.css").as_deref(),
            Some("../img/a.png")
        );
        assert_eq!(
            resolver.rewrite_link("/", &base, "ex.org/styles/main.css").as_deref(),
            Some("../index.html")
        );
    }

    #[test]
    fn test_body_kind() {
        let mut index = index();
        index.add(redirect("http://ex.org/old", "/about", 1)).unwrap();
        let kind = |url: &str| BodyKind::of(index.lookup(url).unwrap().1);

        assert_eq!(kind("http://ex.org/"), BodyKind::Html);
        assert_eq!(kind("http://ex.org/styles/main.css"), BodyKind::Css);
        assert_eq!(kind("http://ex.org/img/a.png"), BodyKind::Verbatim);
        assert_eq!(kind("http://ex.org/old"), BodyKind::RedirectPage);
        assert!(!BodyKind::RedirectPage.needs_body());
    }

    #[test]
    fn test_rewrite_css_snapshot() {
        let index = index();
        let resolver = LinkResolver::new(&index);
        let (id, snapshot) = index.lookup("http://ex.org/styles/main.css").unwrap();

        let out = rewrite_snapshot(&resolver, id, snapshot, b"body { background: url(/img/a.png) }".to_vec());
        assert_eq!(out.links_rewritten, 1);
        assert_eq!(out.body, b"body { background: url(../img/a.png) }");
    }

    #[test]
    fn test_verbatim_untouched() {
        let index = index();
        let resolver = LinkResolver::new(&index);
        let (id, snapshot) = index.lookup("http://ex.org/img/a.png").unwrap();

        let png = vec![0x89, b'P', b'N', b'G', 0xff, 0x00];
        assert_eq!(rewrite_snapshot(&resolver, id, snapshot, png.clone()).body, png);
    }

    #[test]
    fn test_escaped_and_literal_references_match() {
        let mut index = index();
        index.add(record("http://ex.org/img/a[1].png", "image/png", 200, 1)).unwrap();
        index.add(record("http://ex.org/%7Euser/p.png", "image/png", 200, 1)).unwrap();
        let resolver = LinkResolver::new(&index);
        let base = Url::parse("http://ex.org/").unwrap();

        assert_eq!(
            resolver.rewrite_link("/~user/p.png", &base, "ex.org/index.html").as_deref(),
            Some("~user/p.png")
        );

        let (id, home) = index.lookup("http://ex.org/").unwrap();
        let out = rewrite_snapshot(&resolver, id, home, br#"<img src="/img/a[1].png">"#.to_vec());
        assert_eq!(out.links_rewritten, 1);
        assert_eq!(out.body, br#"<img src="img/a%5B1%5D.png">"#);
    }

    #[test]
    fn test_decode_text_fallback() {
        let (text, encoding) = decode_text(b"caf\xe9");
        assert_eq!(text, "caf\u{e9}");
        assert_eq!(encoding, WINDOWS_1252);
        assert_eq!(encode_text(&text, encoding), b"caf\xe9");
    }
}
