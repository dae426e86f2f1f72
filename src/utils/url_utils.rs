//! URL to output-path derivation.
//!
//! Output paths are relative, `/`-separated and kept percent-encoded so the
//! same string can be dropped into an `href` verbatim. Percent-decoding the
//! path yields the on-disk location (see [`super::path_utils::decode_output_path`]).

use url::Url;

use super::constants::{INDEX_FILE_STEM, MAX_QUERY_IN_FILENAME};
use super::path_utils::split_extension;
use crate::error::{ConvertError, ConvertResult};

/// Derive the relative output path for a URL.
///
/// `forced_extension` (with leading dot) is appended to the file name unless
/// the file name already ends with it.
///
/// # Examples
/// ```
/// # use warcmirror::utils::path_from_url;
/// assert_eq!(path_from_url("http://Example.org/", Some(".html")).unwrap(), "example.org/index.html");
/// assert_eq!(path_from_url("http://example.org/about", Some(".html")).unwrap(), "example.org/about.html");
/// assert_eq!(path_from_url("http://example.org:8080/a/b.css", None).unwrap(), "example.org_8080/a/b.css");
/// ```
pub fn path_from_url(url: &str, forced_extension: Option<&str>) -> ConvertResult<String> {
    let parsed = Url::parse(url).map_err(|_| ConvertError::InvalidUrl(url.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| ConvertError::InvalidUrl(url.to_string()))?
        .to_lowercase();

    let mut root = safe_component(host.trim_matches(|c| c == '[' || c == ']'));
    if let Some(port) = parsed.port() {
        root.push('_');
        root.push_str(&port.to_string());
    }

    let mut segments: Vec<String> = vec![root];
    let raw_path = parsed.path();
    let mut raw_segments: Vec<&str> = raw_path.split('/').skip(1).collect();

    // Directory-style URLs map to an index file inside that directory
    let file_segment = match raw_segments.pop() {
        Some(last) if !last.is_empty() => last.to_string(),
        _ => INDEX_FILE_STEM.to_string(),
    };

    for segment in raw_segments.into_iter().filter(|s| !s.is_empty()) {
        segments.push(encode_segment(segment));
    }

    let mut file_name = encode_segment(&file_segment);
    if let Some(query) = parsed.query().filter(|q| !q.is_empty()) {
        file_name = fold_query(&file_name, query);
    }

    if let Some(ext) = forced_extension {
        let (_, current) = split_extension(&file_name);
        if !current.eq_ignore_ascii_case(ext) {
            file_name.push_str(ext);
        }
    }

    segments.push(file_name);
    Ok(segments.join("/"))
}

/// Check if a URL is an archivable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// Percent-decode a raw URL segment, make it filesystem-safe, re-encode it.
fn encode_segment(raw: &str) -> String {
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    urlencoding::encode(&safe_component(&decoded)).into_owned()
}

fn safe_component(name: &str) -> String {
    let options = sanitize_filename::Options {
        truncate: true,
        windows: true,
        replacement: "_",
    };
    let cleaned = sanitize_filename::sanitize_with_options(name, options);
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

/// Insert a sanitized query string before the file extension:
/// `page.php` + `id=3` becomes `page_id=3.php`.
fn fold_query(file_name: &str, query: &str) -> String {
    let decoded = urlencoding::decode(query)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| query.to_string());
    let truncated: String = decoded.chars().take(MAX_QUERY_IN_FILENAME).collect();
    let encoded = urlencoding::encode(&safe_component(&truncated)).into_owned();

    let (base, ext) = split_extension(file_name);
    format!("{base}_{encoded}{ext}")
}
