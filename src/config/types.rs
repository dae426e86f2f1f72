//! Core configuration types for archive conversion
//!
//! `ConvertConfig` is built once at startup and passed by reference into the
//! pipeline. Nothing in it is mutated after `build()`.

use std::path::PathBuf;
use std::sync::Arc;

use super::forced_extensions::ForcedExtensions;
use super::url_filter::UrlFilter;
use crate::resource_index::RedirectResolution;

/// Main configuration struct for a conversion run
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Root of the generated static tree.
    ///
    /// **INVARIANT:** Always an absolute path (normalized in builder).
    pub(crate) output_dir: PathBuf,

    /// Directory or `http(s)://` prefix that relative container names
    /// (as found in CDX files) are resolved against when fetching bodies.
    pub(crate) archive_base: Option<String>,

    /// Content-type to extension table used by the path allocator
    pub(crate) forced_extensions: Arc<ForcedExtensions>,

    /// URLs matching this filter are never indexed
    pub(crate) url_filter: Option<UrlFilter>,

    /// Run the redirect resolver after ingestion
    pub(crate) resolve_redirects: bool,

    /// One hop (default) or full chain collapsing
    pub(crate) redirect_resolution: RedirectResolution,

    /// Timeout for remote range requests
    ///
    /// Default: 30 seconds
    pub(crate) fetch_timeout_secs: u64,

    /// File name of the manifest written at the output root
    pub(crate) manifest_name: String,

    /// Log progress every N written resources
    pub(crate) progress_interval: usize,
}
