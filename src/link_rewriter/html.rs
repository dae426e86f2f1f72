//! Streaming HTML link rewriting using lol_html.
//!
//! Handles URI-bearing attributes on every start tag, `style` attributes,
//! and the text of `<style>` elements. The document is processed in its own
//! encoding (BOM or `<meta charset>`). A document that is undeclared, or
//! declared UTF-8 but not valid UTF-8, is processed as windows-1252, which
//! maps every byte, so bytes that are not rewritten pass through unchanged.

use std::cell::RefCell;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use html_escape::{decode_html_entities, encode_double_quoted_attribute};
use lol_html::html_content::ContentType;
use lol_html::{AsciiCompatibleEncoding, HtmlRewriter, Settings, element, text};
use regex::bytes::Regex;

use super::css::rewrite_css;
use crate::error::{ConvertError, ConvertResult};
use crate::utils::CHARSET_PRESCAN_BYTES;

/// Attributes whose values are URIs in HTML 4/5. `usemap` names an in-page
/// map and is not listed.
const URI_ATTRIBUTES: &[&str] = &[
    "action",
    "archive",
    "background",
    "cite",
    "classid",
    "codebase",
    "data",
    "dynsrc",
    "formaction",
    "href",
    "icon",
    "longdesc",
    "lowsrc",
    "manifest",
    "poster",
    "profile",
    "src",
];

/// Lazy-load attribute prefix honored on `<a>` and `<area>`
const LAZY_SRC_PREFIX: &str = "data-src";

static META_CHARSET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_.:\-]+)"#)
        .expect("META_CHARSET_RE: hardcoded regex is valid")
});

/// Detect a document's encoding from its BOM or a `<meta>` declaration in
/// the first bytes.
#[must_use]
pub fn detect_encoding(body: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(body) {
        return Some(encoding);
    }
    let prefix = &body[..body.len().min(CHARSET_PRESCAN_BYTES)];
    let label = META_CHARSET_RE.captures(prefix)?.get(1)?;
    Encoding::for_label(label.as_bytes())
}

/// Rewrite every resolvable link in an HTML document.
///
/// `map` turns a (normalized) attribute value into its replacement, or
/// `None` to leave it. Returns the rewritten bytes and the number of
/// references changed.
///
/// # Errors
///
/// Fails only if the rewriter itself rejects the input; callers fall back to
/// the original bytes.
pub fn rewrite_html(
    body: &[u8],
    map: &dyn Fn(&str) -> Option<String>,
) -> ConvertResult<(Vec<u8>, usize)> {
    let encoding = AsciiCompatibleEncoding::new(document_encoding(body))
        .or_else(|| AsciiCompatibleEncoding::new(WINDOWS_1252))
        .ok_or_else(|| ConvertError::Rewrite("no usable document encoding".to_string()))?;

    let mut output = Vec::with_capacity(body.len());
    let rewrite_count = AtomicUsize::new(0);
    let style_text = RefCell::new(String::new());

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("*", |el| {
                    let tag = el.tag_name();
                    let honors_lazy_src = tag == "a" || tag == "area";

                    let candidates: Vec<(String, String)> = el
                        .attributes()
                        .iter()
                        .filter(|attr| {
                            let name = attr.name();
                            URI_ATTRIBUTES.contains(&name.as_str())
                                || (honors_lazy_src && name.starts_with(LAZY_SRC_PREFIX))
                        })
                        .map(|attr| (attr.name(), attr.value()))
                        .collect();

                    for (name, raw) in candidates {
                        let value = normalize_reference(&decode_html_entities(&raw));
                        if value.is_empty() || value.starts_with('#') {
                            continue;
                        }
                        if let Some(rewritten) = map(&value).filter(|r| *r != value) {
                            el.set_attribute(&name, &encode_double_quoted_attribute(&rewritten))?;
                            rewrite_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }

                    if let Some(style) = el.get_attribute("style") {
                        let decoded = decode_html_entities(&style);
                        let (rewritten, n) = rewrite_css(&decoded, map);
                        if n > 0 {
                            el.set_attribute("style", &encode_double_quoted_attribute(&rewritten))?;
                            rewrite_count.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(())
                }),
                text!("style", |chunk| {
                    style_text.borrow_mut().push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        let css = std::mem::take(&mut *style_text.borrow_mut());
                        let (rewritten, n) = rewrite_css(&css, map);
                        rewrite_count.fetch_add(n, Ordering::Relaxed);
                        chunk.replace(&rewritten, ContentType::Html);
                    } else {
                        chunk.remove();
                    }
                    Ok(())
                }),
            ],
            encoding,
            ..Settings::new()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(body)
        .map_err(|e| ConvertError::Rewrite(e.to_string()))?;
    rewriter
        .end()
        .map_err(|e| ConvertError::Rewrite(e.to_string()))?;

    let count = rewrite_count.load(Ordering::Relaxed);
    log::trace!("Rewrote {count} links in HTML document");
    Ok((output, count))
}

/// The encoding to process `body` in.
///
/// UTF-8 (and UTF-16, which is served as UTF-8 once decoded) is only trusted
/// when the bytes validate; otherwise windows-1252 keeps them intact.
fn document_encoding(body: &[u8]) -> &'static Encoding {
    match detect_encoding(body) {
        Some(e) if e != UTF_8 && e != encoding_rs::UTF_16LE && e != encoding_rs::UTF_16BE => e,
        Some(_) if std::str::from_utf8(body).is_ok() => UTF_8,
        _ => WINDOWS_1252,
    }
}

/// Percent-encode characters browsers tolerate but URL parsing rejects.
fn normalize_reference(value: &str) -> String {
    value
        .trim()
        .replace(' ', "%20")
        .replace('[', "%5B")
        .replace(']', "%5D")
}
