//! Helpers over relative, `/`-separated output paths.

use std::path::{Component, Path, PathBuf};

/// Split a path into base name and extension.
///
/// The extension is only looked for in the last segment and includes the
/// leading dot. Dotfiles (`.htaccess`) have no extension.
#[must_use]
pub fn split_extension(path: &str) -> (&str, &str) {
    let segment_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[segment_start..].rfind('.') {
        Some(0) | None => (path, ""),
        Some(dot) => path.split_at(segment_start + dot),
    }
}

/// Append a `~n` disambiguation suffix before the extension
#[must_use]
pub fn with_suffix(path: &str, n: u64) -> String {
    let (base, ext) = split_extension(path);
    format!("{base}~{n}{ext}")
}

/// Compute the path of `target` relative to the directory containing `from`.
///
/// Both arguments are output paths relative to the same root. Returns `None`
/// if no relative form exists.
#[must_use]
pub fn relativize(target: &str, from: &str) -> Option<String> {
    let from_dir = Path::new(from).parent().unwrap_or_else(|| Path::new(""));
    let relative = pathdiff::diff_paths(Path::new(target), from_dir)?;
    Some(to_slash_path(&relative))
}

/// Percent-decode an output path into the relative on-disk path.
#[must_use]
pub fn decode_output_path(path: &str) -> PathBuf {
    path.split('/')
        .map(|segment| {
            urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string())
        })
        .collect()
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_extension() {
        assert_eq!(split_extension("ex.org/index.html"), ("ex.org/index", ".html"));
        assert_eq!(split_extension("ex.org/dir.v2/file"), ("ex.org/dir.v2/file", ""));
        assert_eq!(split_extension("ex.org/.htaccess"), ("ex.org/.htaccess", ""));
        assert_eq!(split_extension("a.tar.gz"), ("a.tar", ".gz"));
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("ex.org/index.html", 1), "ex.org/index~1.html");
        assert_eq!(with_suffix("ex.org/data", 12), "ex.org/data~12");
    }

    #[test]
    fn test_relativize() {
        // Same directory
        assert_eq!(
            relativize("ex.org/page2.html", "ex.org/page1.html").as_deref(),
            Some("page2.html")
        );
        // Subdirectory
        assert_eq!(
            relativize("ex.org/docs/guide.html", "ex.org/index.html").as_deref(),
            Some("docs/guide.html")
        );
        // Parent directory
        assert_eq!(
            relativize("ex.org/img/a.png", "ex.org/styles/main.css").as_deref(),
            Some("../img/a.png")
        );
        // Across hosts
        assert_eq!(
            relativize("cdn.org/x.js", "ex.org/a/b.html").as_deref(),
            Some("../../cdn.org/x.js")
        );
    }

    #[test]
    fn test_decode_output_path() {
        assert_eq!(
            decode_output_path("ex.org/c%20d.txt"),
            PathBuf::from("ex.org").join("c d.txt")
        );
        assert_eq!(
            decode_output_path("ex.org/page_id%3D3.php"),
            PathBuf::from("ex.org").join("page_id=3.php")
        );
    }
}
