//! Unique output path allocation.

use std::sync::Arc;

use super::snapshot::OutputPath;
use crate::config::ForcedExtensions;
use crate::error::ConvertResult;
use crate::utils::{path_from_url, with_suffix};

/// Derives output paths and guarantees they are unique against a caller
/// supplied occupancy check.
#[derive(Debug, Clone)]
pub struct PathAllocator {
    forced_extensions: Arc<ForcedExtensions>,
}

impl PathAllocator {
    #[must_use]
    pub fn new(forced_extensions: Arc<ForcedExtensions>) -> Self {
        Self { forced_extensions }
    }

    /// Candidate path for a URL before uniqueness is applied
    pub fn candidate(&self, url: &str, content_type: &str) -> ConvertResult<String> {
        path_from_url(url, self.forced_extensions.get(content_type))
    }

    /// Allocate a path not rejected by `is_taken`.
    ///
    /// Tries the candidate first, then `base~1.ext`, `base~2.ext`, ...
    /// `is_taken` must compare case-insensitively. Pure over the caller's
    /// state: calling twice without recording the result yields the same path.
    pub fn allocate(
        &self,
        url: &str,
        content_type: &str,
        is_taken: impl Fn(&str) -> bool,
    ) -> ConvertResult<OutputPath> {
        let base_path = self.candidate(url, content_type)?;
        if !is_taken(&base_path) {
            return Ok(OutputPath {
                path: base_path.clone(),
                base_path,
            });
        }

        let mut n: u64 = 1;
        loop {
            let path = with_suffix(&base_path, n);
            if !is_taken(&path) {
                log::trace!("Disambiguated {base_path} as {path}");
                return Ok(OutputPath { path, base_path });
            }
            n += 1;
        }
    }
}
