//! Type-safe builder for `ConvertConfig` using the typestate pattern
//!
//! The output directory is the only required setting; `build()` is only
//! available once it has been provided.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::forced_extensions::ForcedExtensions;
use super::types::ConvertConfig;
use super::url_filter::UrlFilter;
use crate::error::{ConvertError, ConvertResult};
use crate::resource_index::RedirectResolution;
use crate::utils::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MANIFEST_NAME, DEFAULT_PROGRESS_INTERVAL};

// Type states for the builder
pub struct WithOutputDir;

pub struct ConvertConfigBuilder<State = ()> {
    pub(crate) output_dir: Option<PathBuf>,
    pub(crate) archive_base: Option<String>,
    pub(crate) forced_extensions_file: Option<PathBuf>,
    pub(crate) forced_extensions: Option<ForcedExtensions>,
    pub(crate) url_filter: Option<UrlFilter>,
    pub(crate) resolve_redirects: bool,
    pub(crate) redirect_resolution: RedirectResolution,
    pub(crate) fetch_timeout_secs: u64,
    pub(crate) manifest_name: String,
    pub(crate) progress_interval: usize,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for ConvertConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_dir: None,
            archive_base: None,
            forced_extensions_file: None,
            forced_extensions: None,
            url_filter: None,
            resolve_redirects: true,
            redirect_resolution: RedirectResolution::SingleHop,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            _phantom: PhantomData,
        }
    }
}

impl ConvertConfig {
    /// Create a builder for configuring a `ConvertConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> ConvertConfigBuilder<()> {
        ConvertConfigBuilder::default()
    }
}

impl ConvertConfigBuilder<()> {
    pub fn output_dir(self, dir: impl Into<PathBuf>) -> ConvertConfigBuilder<WithOutputDir> {
        ConvertConfigBuilder {
            output_dir: Some(dir.into()),
            archive_base: self.archive_base,
            forced_extensions_file: self.forced_extensions_file,
            forced_extensions: self.forced_extensions,
            url_filter: self.url_filter,
            resolve_redirects: self.resolve_redirects,
            redirect_resolution: self.redirect_resolution,
            fetch_timeout_secs: self.fetch_timeout_secs,
            manifest_name: self.manifest_name,
            progress_interval: self.progress_interval,
            _phantom: PhantomData,
        }
    }
}

impl ConvertConfigBuilder<WithOutputDir> {
    /// Validate settings and load the forced-extension table.
    ///
    /// # Errors
    ///
    /// Fails if the extension table cannot be loaded or a numeric setting
    /// is zero. Table failures are fatal for the run: paths cannot be
    /// allocated correctly without it.
    pub fn build(self) -> ConvertResult<ConvertConfig> {
        let output_dir = self
            .output_dir
            .ok_or_else(|| ConvertError::Config("output_dir is required".to_string()))?;

        let output_dir = if output_dir.is_absolute() {
            output_dir
        } else {
            std::env::current_dir()
                .map_err(|e| ConvertError::io(&output_dir, e))?
                .join(&output_dir)
        };

        if self.fetch_timeout_secs == 0 {
            return Err(ConvertError::Config("fetch timeout must be at least 1 second".to_string()));
        }
        if self.progress_interval == 0 {
            return Err(ConvertError::Config("progress interval must be positive".to_string()));
        }
        if let RedirectResolution::FixedPoint { max_hops: 0 } = self.redirect_resolution {
            return Err(ConvertError::Config("max redirect hops must be positive".to_string()));
        }
        if self.manifest_name.is_empty() || self.manifest_name.contains(['/', '\\']) {
            return Err(ConvertError::Config(format!(
                "invalid manifest file name '{}'",
                self.manifest_name
            )));
        }

        let mut table = match self.forced_extensions {
            Some(table) => table,
            None => ForcedExtensions::builtin()?,
        };
        if let Some(path) = &self.forced_extensions_file {
            table = table.extended_with(ForcedExtensions::load(path)?);
        }

        let archive_base = self.archive_base.map(normalize_archive_base);

        Ok(ConvertConfig {
            output_dir,
            archive_base,
            forced_extensions: Arc::new(table),
            url_filter: self.url_filter.filter(|f| !f.is_empty()),
            resolve_redirects: self.resolve_redirects,
            redirect_resolution: self.redirect_resolution,
            fetch_timeout_secs: self.fetch_timeout_secs,
            manifest_name: self.manifest_name,
            progress_interval: self.progress_interval,
        })
    }
}

// Builder methods available at any state
impl<State> ConvertConfigBuilder<State> {
    /// Directory or `http(s)://` prefix that container names are resolved against
    #[must_use]
    pub fn archive_base(mut self, base: impl Into<String>) -> Self {
        self.archive_base = Some(base.into());
        self
    }

    /// Replace the built-in forced-extension table entirely
    #[must_use]
    pub fn forced_extensions(mut self, table: ForcedExtensions) -> Self {
        self.forced_extensions = Some(table);
        self
    }

    /// Extend/override the forced-extension table with a file loaded at `build()`
    #[must_use]
    pub fn forced_extensions_file(mut self, path: impl AsRef<Path>) -> Self {
        self.forced_extensions_file = Some(path.as_ref().to_path_buf());
        self
    }

    #[must_use]
    pub fn url_filter(mut self, filter: UrlFilter) -> Self {
        self.url_filter = Some(filter);
        self
    }

    /// Skip the redirect resolver; redirect entries then resolve to their
    /// placeholder pages.
    #[must_use]
    pub fn resolve_redirects(mut self, enabled: bool) -> Self {
        self.resolve_redirects = enabled;
        self
    }

    /// Choose between one-hop and fixed-point redirect resolution
    ///
    /// # Example
    /// ```rust
    /// # use warcmirror::config::ConvertConfig;
    /// # use warcmirror::resource_index::RedirectResolution;
    /// # fn main() -> warcmirror::ConvertResult<()> {
    /// let config = ConvertConfig::builder()
    ///     .output_dir("./site")
    ///     .redirect_resolution(RedirectResolution::FixedPoint { max_hops: 8 })
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[must_use]
    pub fn redirect_resolution(mut self, mode: RedirectResolution) -> Self {
        self.redirect_resolution = mode;
        self
    }

    #[must_use]
    pub fn fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn manifest_name(mut self, name: impl Into<String>) -> Self {
        self.manifest_name = name.into();
        self
    }

    #[must_use]
    pub fn progress_interval(mut self, every: usize) -> Self {
        self.progress_interval = every;
        self
    }
}

/// URL bases get a trailing slash so container names can be appended.
fn normalize_archive_base(base: String) -> String {
    let is_remote = base.starts_with("http://") || base.starts_with("https://");
    if is_remote && !base.ends_with('/') {
        format!("{base}/")
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConvertConfig::builder().output_dir("/tmp/site").build().unwrap();
        assert_eq!(config.output_dir(), Path::new("/tmp/site"));
        assert!(config.resolve_redirects());
        assert_eq!(config.redirect_resolution(), RedirectResolution::SingleHop);
        assert_eq!(config.manifest_name(), DEFAULT_MANIFEST_NAME);
        assert_eq!(config.forced_extensions().get("text/html"), Some(".html"));
    }

    #[test]
    fn test_relative_output_dir_is_absolutized() {
        let config = ConvertConfig::builder().output_dir("site").build().unwrap();
        assert!(config.output_dir().is_absolute());
    }

    #[test]
    fn test_remote_base_gets_trailing_slash() {
        let config = ConvertConfig::builder()
            .output_dir("/tmp/site")
            .archive_base("https://archive.example.org/warcs")
            .build()
            .unwrap();
        assert_eq!(config.archive_base(), Some("https://archive.example.org/warcs/"));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        assert!(ConvertConfig::builder().output_dir("/tmp/site").fetch_timeout_secs(0).build().is_err());
        assert!(ConvertConfig::builder().output_dir("/tmp/site").manifest_name("a/b.json").build().is_err());
        assert!(
            ConvertConfig::builder()
                .output_dir("/tmp/site")
                .redirect_resolution(RedirectResolution::FixedPoint { max_hops: 0 })
                .build()
                .is_err()
        );
    }

    #[test]
    fn test_missing_extension_file_is_fatal() {
        let err = ConvertConfig::builder()
            .output_dir("/tmp/site")
            .forced_extensions_file("/nonexistent/forced.extensions")
            .build()
            .unwrap_err();
        assert!(!err.is_recoverable());
    }
}
