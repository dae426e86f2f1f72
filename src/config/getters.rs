//! Getter methods for `ConvertConfig`

use std::path::Path;

use super::forced_extensions::ForcedExtensions;
use super::types::ConvertConfig;
use super::url_filter::UrlFilter;
use crate::resource_index::RedirectResolution;

impl ConvertConfig {
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn archive_base(&self) -> Option<&str> {
        self.archive_base.as_deref()
    }

    /// Whether container names resolve against a remote `http(s)://` prefix
    #[must_use]
    pub fn is_remote_archive(&self) -> bool {
        self.archive_base
            .as_deref()
            .is_some_and(|base| base.starts_with("http://") || base.starts_with("https://"))
    }

    #[must_use]
    pub fn forced_extensions(&self) -> &ForcedExtensions {
        &self.forced_extensions
    }

    #[must_use]
    pub fn url_filter(&self) -> Option<&UrlFilter> {
        self.url_filter.as_ref()
    }

    #[must_use]
    pub fn resolve_redirects(&self) -> bool {
        self.resolve_redirects
    }

    #[must_use]
    pub fn redirect_resolution(&self) -> RedirectResolution {
        self.redirect_resolution
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.fetch_timeout_secs)
    }

    #[must_use]
    pub fn manifest_name(&self) -> &str {
        &self.manifest_name
    }

    #[must_use]
    pub fn progress_interval(&self) -> usize {
        self.progress_interval
    }
}
