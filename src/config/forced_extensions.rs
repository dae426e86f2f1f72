//! Content-type to forced file extension table.
//!
//! The table is a line-oriented resource of whitespace-separated
//! `mime/type extension` pairs. A built-in default set ships with the crate;
//! users can extend or override it with a file in the same format.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ConvertError, ConvertResult};

const BUILTIN_TABLE: &str = include_str!("forced.extensions");

/// Read-only mapping from base MIME type to a forced extension (with dot)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForcedExtensions {
    by_type: HashMap<String, String>,
}

impl ForcedExtensions {
    /// The table shipped with the crate
    pub fn builtin() -> ConvertResult<Self> {
        Self::parse(BUILTIN_TABLE)
    }

    /// Parse a table from text.
    ///
    /// Blank lines and lines starting with `#` are ignored. Every other line
    /// must hold exactly a MIME type and an extension.
    pub fn parse(text: &str) -> ConvertResult<Self> {
        let mut by_type = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            let [mime, ext] = fields.as_slice() else {
                return Err(ConvertError::ForcedExtensions {
                    line: idx + 1,
                    reason: format!("expected 'type extension', got '{line}'"),
                });
            };

            if !mime.contains('/') {
                return Err(ConvertError::ForcedExtensions {
                    line: idx + 1,
                    reason: format!("'{mime}' is not a MIME type"),
                });
            }

            let ext = ext.trim_start_matches('.');
            if ext.is_empty() || ext.contains('/') {
                return Err(ConvertError::ForcedExtensions {
                    line: idx + 1,
                    reason: format!("invalid extension for '{mime}'"),
                });
            }

            by_type.insert(mime.to_ascii_lowercase(), format!(".{ext}"));
        }

        Ok(Self { by_type })
    }

    /// Load a user table from disk.
    ///
    /// An unreadable file is a configuration error.
    pub fn load(path: &Path) -> ConvertResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::Config(format!(
                "cannot read forced-extension table {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&text)
    }

    /// Overlay `other` on top of this table; entries in `other` win.
    #[must_use]
    pub fn extended_with(mut self, other: ForcedExtensions) -> Self {
        self.by_type.extend(other.by_type);
        self
    }

    /// Forced extension for a base MIME type, including the leading dot
    #[must_use]
    pub fn get(&self, content_type: &str) -> Option<&str> {
        self.by_type.get(content_type).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_loads() {
        let table = ForcedExtensions::builtin().unwrap();
        assert_eq!(table.get("text/html"), Some(".html"));
        assert_eq!(table.get("text/css"), Some(".css"));
        assert_eq!(table.get("application/octet-stream"), None);
    }

    #[test]
    fn test_override_and_extend() {
        let user = ForcedExtensions::parse("text/html htm\n\n# comment\napplication/wasm .wasm\n").unwrap();
        let table = ForcedExtensions::builtin().unwrap().extended_with(user);
        assert_eq!(table.get("text/html"), Some(".htm"));
        assert_eq!(table.get("application/wasm"), Some(".wasm"));
        assert_eq!(table.get("text/css"), Some(".css"));
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let err = ForcedExtensions::parse("text/html html\ntext/css\n").unwrap_err();
        match err {
            ConvertError::ForcedExtensions { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = ForcedExtensions::load(Path::new("/nonexistent/forced.extensions")).unwrap_err();
        assert!(matches!(err, ConvertError::Config(_)));
        assert!(!err.is_recoverable());
    }
}
