//! Batch conversion pipeline.
//!
//! Ingest every input into one [`ResourceIndex`], resolve redirects, then
//! write each emittable snapshot to the output tree with its links
//! rewritten, followed by the manifest. Only configuration problems stop a
//! run; unreadable inputs and snapshots that fail to fetch or write are
//! logged, counted and skipped.

pub mod manifest;
pub mod progress;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::archive::{self, ArchiveRecord, RecordSource};
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};
use crate::link_rewriter::{BodyKind, LinkResolver, rewrite_snapshot};
use crate::resource_index::{AddOutcome, ResolutionStats, ResourceIndex, Snapshot, SnapshotId};
use crate::utils::decode_output_path;

pub use manifest::ManifestEntry;
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};

/// Counters for a finished run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConversionSummary {
    /// Records read from inputs
    pub records: usize,
    /// Records dropped by the URL exclusion filter
    pub excluded: usize,
    /// Records dropped by status policy
    pub rejected: usize,
    /// Records whose URL could not be indexed
    pub invalid: usize,
    /// Input files that could not be read
    pub failed_inputs: usize,
    /// Redirect entries re-pointed at an archived target
    pub redirects_resolved: usize,
    /// Files written
    pub emitted: usize,
    /// Snapshots that could not be fetched or written
    pub failed: usize,
    pub links_rewritten: usize,
}

/// Drives one conversion run
pub struct Converter<P: ProgressReporter = LogProgress> {
    config: ConvertConfig,
    index: ResourceIndex,
    source: RecordSource,
    progress: P,
    summary: ConversionSummary,
}

impl Converter<LogProgress> {
    /// Converter reporting progress through the log
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client for remote archives cannot be built.
    pub fn new(config: ConvertConfig) -> ConvertResult<Self> {
        let progress = LogProgress::new(config.progress_interval());
        Self::with_progress(config, progress)
    }
}

impl<P: ProgressReporter> Converter<P> {
    /// # Errors
    ///
    /// Fails if the HTTP client for remote archives cannot be built.
    pub fn with_progress(config: ConvertConfig, progress: P) -> ConvertResult<Self> {
        let source = RecordSource::from_config(&config)?;
        let index = ResourceIndex::new(Arc::clone(&config.forced_extensions));
        Ok(Self {
            config,
            index,
            source,
            progress,
            summary: ConversionSummary::default(),
        })
    }

    #[must_use]
    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    #[must_use]
    pub fn index(&self) -> &ResourceIndex {
        &self.index
    }

    /// Counters accumulated so far
    #[must_use]
    pub fn summary(&self) -> ConversionSummary {
        self.summary
    }

    /// Load, resolve and write everything.
    ///
    /// Unreadable inputs are reported and skipped.
    ///
    /// # Errors
    ///
    /// Fails on configuration errors, or if the output root or the
    /// manifest cannot be written.
    pub async fn run(mut self, inputs: &[PathBuf]) -> ConvertResult<ConversionSummary> {
        for input in inputs {
            if let Err(e) = self.load_path(input).await {
                if !e.is_recoverable() {
                    return Err(e);
                }
                self.summary.failed_inputs += 1;
                self.progress.report_load_failed(input, &e.to_string());
            }
        }

        self.resolve_redirects();
        let output_dir = self.config.output_dir().to_path_buf();
        let summary = self.write_to(&output_dir).await?;
        self.progress.report_completed(&summary);
        Ok(summary)
    }

    /// Load one archive file, or every regular file in a directory in
    /// sorted order. Returns the number of records accepted into the index.
    ///
    /// Within a directory, a file that cannot be read is reported and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails if `path` itself cannot be read, or on a non-recoverable error.
    pub async fn load_path(&mut self, path: &Path) -> ConvertResult<usize> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ConvertError::io(path, e))?;
        if !metadata.is_dir() {
            return self.load_file(path).await;
        }

        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(path)
            .await
            .map_err(|e| ConvertError::io(path, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ConvertError::io(path, e))?
        {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                files.push(entry.path());
            }
        }
        files.sort();
        log::info!("Loading {} files from {}", files.len(), path.display());

        let mut accepted = 0;
        for file in files {
            match self.load_file(&file).await {
                Ok(n) => accepted += n,
                Err(e) if e.is_recoverable() => {
                    self.summary.failed_inputs += 1;
                    self.progress.report_load_failed(&file, &e.to_string());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(accepted)
    }

    async fn load_file(&mut self, path: &Path) -> ConvertResult<usize> {
        self.progress.report_loading(path);
        let owned = path.to_path_buf();
        let records = tokio::task::spawn_blocking(move || archive::load_file(&owned)).await??;
        let read = records.len();
        let accepted = self.ingest(records);
        self.progress.report_loaded(path, read);
        Ok(accepted)
    }

    /// Offer records to the index. Returns how many were accepted.
    pub fn ingest(&mut self, records: impl IntoIterator<Item = ArchiveRecord>) -> usize {
        let mut accepted = 0;
        for record in records {
            self.summary.records += 1;

            if self
                .config
                .url_filter()
                .is_some_and(|filter| filter.excludes(&record.url))
            {
                log::debug!("Excluded {}", record.url);
                self.summary.excluded += 1;
                continue;
            }

            let url = record.url.clone();
            match self.index.add(record) {
                Ok(AddOutcome::Rejected) => self.summary.rejected += 1,
                Ok(_) => accepted += 1,
                Err(e) => {
                    log::warn!("Skipping {url}: {e}");
                    self.summary.invalid += 1;
                }
            }
        }
        accepted
    }

    /// Run the redirect resolver in the configured mode, unless disabled.
    pub fn resolve_redirects(&mut self) -> ResolutionStats {
        if !self.config.resolve_redirects() {
            log::info!("Redirect resolution disabled");
            return ResolutionStats::default();
        }
        let stats = self.index.resolve_redirects(self.config.redirect_resolution());
        log::info!(
            "Resolved {} of {} redirects ({} unarchived targets, {} cycles)",
            stats.resolved,
            stats.redirects,
            stats.unresolved,
            stats.cycles
        );
        self.summary.redirects_resolved = stats.resolved;
        stats
    }

    /// Write every emittable snapshot under `out_dir`, then the manifest.
    ///
    /// # Errors
    ///
    /// Fails only if `out_dir` cannot be created or the manifest cannot be
    /// written. Per-snapshot failures are logged and counted.
    pub async fn write_to(&self, out_dir: &Path) -> ConvertResult<ConversionSummary> {
        tokio::fs::create_dir_all(out_dir)
            .await
            .map_err(|e| ConvertError::io(out_dir, e))?;

        let resolver = LinkResolver::new(&self.index);
        let total = self.index.emittable_count();
        let mut summary = self.summary;
        let mut entries = Vec::with_capacity(total);
        log::info!("Writing {total} resources to {}", out_dir.display());

        for (done, (id, snapshot)) in self.index.emittable().enumerate() {
            match self.write_snapshot(&resolver, out_dir, id, snapshot).await {
                Ok(entry) => {
                    summary.emitted += 1;
                    summary.links_rewritten += entry.links_rewritten;
                    entries.push(entry);
                }
                Err(e) => {
                    log::warn!(
                        "Failed to write {} -> {} ({}, status {}): {e}",
                        snapshot.url(),
                        snapshot.output_path().unwrap_or("?"),
                        snapshot.content_type(),
                        snapshot.status()
                    );
                    summary.failed += 1;
                    self.progress.report_failed(snapshot.url(), &e.to_string());
                }
            }
            self.progress.report_written(done + 1, total);
        }

        manifest::save(&out_dir.join(self.config.manifest_name()), &mut entries).await?;
        Ok(summary)
    }

    async fn write_snapshot(
        &self,
        resolver: &LinkResolver<'_>,
        out_dir: &Path,
        id: SnapshotId,
        snapshot: &Snapshot,
    ) -> ConvertResult<ManifestEntry> {
        let path = snapshot
            .output_path()
            .ok_or_else(|| ConvertError::Rewrite(format!("no output path for {}", snapshot.url())))?;

        let body = if BodyKind::of(snapshot).needs_body() {
            let (_, body) = self.source.fetch(snapshot.locator()).await?;
            body
        } else {
            Vec::new()
        };
        let rewritten = rewrite_snapshot(resolver, id, snapshot, body);

        let target = out_dir.join(decode_output_path(path));
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConvertError::io(parent, e))?;
        }
        tokio::fs::write(&target, &rewritten.body)
            .await
            .map_err(|e| ConvertError::io(&target, e))?;
        log::trace!("Wrote {} ({} bytes)", target.display(), rewritten.body.len());

        Ok(ManifestEntry {
            path: path.to_string(),
            url: snapshot.url().to_string(),
            content_type: snapshot.content_type().to_string(),
            status: snapshot.status(),
            captured_at: snapshot.captured_at(),
            kind: snapshot.kind().label().to_string(),
            links_rewritten: rewritten.links_rewritten,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::UrlFilter;
    use crate::resource_index::test_support::{record, redirect};

    fn converter(dir: &Path, filter: Option<UrlFilter>) -> Converter<NoOpProgress> {
        let mut builder = ConvertConfig::builder().output_dir(dir);
        if let Some(filter) = filter {
            builder = builder.url_filter(filter);
        }
        Converter::with_progress(builder.build().unwrap(), NoOpProgress).unwrap()
    }

    #[test]
    fn test_ingest_counts() {
        let dir = TempDir::new().unwrap();
        let filter = UrlFilter {
            starts_with: vec!["http://ads.ex.org/".to_string()],
            contains: vec!["/tracking/".to_string()],
        };
        let mut converter = converter(dir.path(), Some(filter));

        let accepted = converter.ingest([
            record("http://ex.org/", "text/html", 200, 1),
            record("http://ads.ex.org/banner", "image/gif", 200, 1),
            record("http://ex.org/tracking/pixel", "image/gif", 200, 1),
            record("http://ex.org/gone", "text/html", 404, 1),
            record("not a url", "text/html", 200, 1),
        ]);

        assert_eq!(accepted, 1);
        let summary = converter.summary();
        assert_eq!(summary.records, 5);
        assert_eq!(summary.excluded, 2);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.invalid, 1);
        assert!(converter.index().lookup("http://ads.ex.org/banner").is_none());
    }

    #[tokio::test]
    async fn test_redirect_only_run_needs_no_archive() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(dir.path(), None);
        converter.ingest([redirect("http://ex.org/old", "https://other.org/", 1)]);
        converter.resolve_redirects();

        let summary = converter.write_to(dir.path()).await.unwrap();
        assert_eq!(summary.emitted, 1);
        assert_eq!(summary.failed, 0);

        let page = std::fs::read_to_string(dir.path().join("ex.org").join("old.html")).unwrap();
        assert!(page.contains("url=https://other.org/"));

        let entries = manifest::load(&dir.path().join("manifest.json")).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, "redirect");
    }

    #[tokio::test]
    async fn test_missing_container_is_counted_not_fatal() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(dir.path(), None);
        converter.ingest([record("http://ex.org/a", "text/html", 200, 1)]);

        let summary = converter.write_to(dir.path()).await.unwrap();
        assert_eq!(summary.emitted, 0);
        assert_eq!(summary.failed, 1);
        assert!(manifest::load(&dir.path().join("manifest.json")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_input_is_recoverable() {
        let dir = TempDir::new().unwrap();
        let mut converter = converter(dir.path(), None);
        let err = converter.load_path(&dir.path().join("nope.warc")).await.unwrap_err();
        assert!(err.is_recoverable());
    }
}
