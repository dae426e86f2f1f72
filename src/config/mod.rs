//! Configuration module for archive conversion
//!
//! This module provides the `ConvertConfig` struct and its type-safe builder,
//! plus the two user-supplied tables the pipeline reads: the forced-extension
//! table and the URL exclusion filter.

// Sub-modules
pub mod builder;
pub mod forced_extensions;
pub mod getters;
pub mod types;
pub mod url_filter;

// Re-exports for public API
pub use builder::{ConvertConfigBuilder, WithOutputDir};
pub use forced_extensions::ForcedExtensions;
pub use types::ConvertConfig;
pub use url_filter::UrlFilter;
