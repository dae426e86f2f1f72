//! URL exclusion rules loaded from JSON.
//!
//! ```json
//! { "startswith": ["http://ads.example.com/"], "contains": ["/tracking/"] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

/// Prefix and substring rules for excluding URLs from conversion
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFilter {
    #[serde(default, rename = "startswith")]
    pub starts_with: Vec<String>,
    #[serde(default)]
    pub contains: Vec<String>,
}

impl UrlFilter {
    pub fn load(path: &Path) -> ConvertResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ConvertError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| ConvertError::Filter {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Whether `url` matches any exclusion rule
    #[must_use]
    pub fn excludes(&self, url: &str) -> bool {
        self.starts_with.iter().any(|prefix| url.starts_with(prefix.as_str()))
            || self.contains.iter().any(|needle| url.contains(needle.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.starts_with.is_empty() && self.contains.is_empty()
    }
}
