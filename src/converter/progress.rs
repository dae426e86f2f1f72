//! Progress reporting for conversion runs
//!
//! Defines the `ProgressReporter` trait for pipeline lifecycle events, a
//! log-based reporter used by the CLI and a no-op reporter for embedding.

use std::path::Path;

use super::ConversionSummary;

/// Trait for reporting conversion progress at key lifecycle events
pub trait ProgressReporter: Send + Sync {
    /// An input file is about to be read
    fn report_loading(&self, path: &Path);

    /// An input file was read and its records offered to the index
    fn report_loaded(&self, path: &Path, records: usize);

    /// An input file could not be read
    fn report_load_failed(&self, path: &Path, error: &str);

    /// `done` of `total` emittable snapshots have been processed
    fn report_written(&self, done: usize, total: usize);

    /// A snapshot could not be written
    fn report_failed(&self, url: &str, error: &str);

    /// The run finished
    fn report_completed(&self, summary: &ConversionSummary);
}

/// Reports through the `log` facade, one progress line every `interval`
/// written snapshots
#[derive(Debug, Clone, Copy)]
pub struct LogProgress {
    interval: usize,
}

impl LogProgress {
    #[must_use]
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
        }
    }
}

impl ProgressReporter for LogProgress {
    fn report_loading(&self, path: &Path) {
        log::debug!("Reading {}", path.display());
    }

    fn report_loaded(&self, path: &Path, records: usize) {
        log::info!("Loaded {records} records from {}", path.display());
    }

    fn report_load_failed(&self, path: &Path, error: &str) {
        log::error!("Skipping {}: {error}", path.display());
    }

    fn report_written(&self, done: usize, total: usize) {
        if done % self.interval == 0 || done == total {
            let percent = if total == 0 { 100 } else { done * 100 / total };
            log::info!("Written {done}/{total} resources ({percent}%)");
        }
    }

    fn report_failed(&self, url: &str, error: &str) {
        log::debug!("Failed {url}: {error}");
    }

    fn report_completed(&self, summary: &ConversionSummary) {
        log::info!(
            "Conversion complete: {} written, {} failed, {} rejected, {} excluded, {} links rewritten",
            summary.emitted,
            summary.failed,
            summary.rejected,
            summary.excluded,
            summary.links_rewritten
        );
    }
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_loading(&self, _path: &Path) {}

    #[inline(always)]
    fn report_loaded(&self, _path: &Path, _records: usize) {}

    #[inline(always)]
    fn report_load_failed(&self, _path: &Path, _error: &str) {}

    #[inline(always)]
    fn report_written(&self, _done: usize, _total: usize) {}

    #[inline(always)]
    fn report_failed(&self, _url: &str, _error: &str) {}

    #[inline(always)]
    fn report_completed(&self, _summary: &ConversionSummary) {}
}
