//! In-memory index of archived snapshots.
//!
//! The index owns every accepted snapshot for the whole run and maintains two
//! views over them:
//! - by canonical URL key, holding the selected representative per key
//! - by output path, ordered case-insensitively, holding every accepted
//!   snapshot
//!
//! Snapshots are stored in an arena and referenced by [`SnapshotId`] from both
//! maps. Ingestion mutates the index; rewriting only reads it, so a finished
//! index can be shared across threads without locking.

pub mod allocator;
pub mod redirects;
pub mod snapshot;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

pub use allocator::PathAllocator;
pub use redirects::{RedirectResolution, ResolutionStats};
pub use snapshot::{OutputPath, Snapshot, SnapshotId, SnapshotKind};

use crate::archive::ArchiveRecord;
use crate::canonical::{AggressiveCanonicalizer, Canonicalizer};
use crate::config::ForcedExtensions;
use crate::error::{ConvertError, ConvertResult};

/// Result of [`ResourceIndex::add`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The snapshot is now the representative for its key
    Selected {
        id: SnapshotId,
        replaced: Option<SnapshotId>,
    },
    /// The snapshot was stored and given a path, but an existing one won
    Superseded { id: SnapshotId, selected: SnapshotId },
    /// Filtered by status policy: no path, not indexed
    Rejected,
}

pub struct ResourceIndex {
    snapshots: Vec<Snapshot>,
    by_url_key: HashMap<String, SnapshotId>,
    /// Keyed by lowercased output path
    by_path: BTreeMap<String, SnapshotId>,
    superseded: HashSet<SnapshotId>,
    allocator: PathAllocator,
    canonicalizer: Arc<dyn Canonicalizer>,
    rejected: usize,
}

impl std::fmt::Debug for ResourceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceIndex")
            .field("snapshots", &self.snapshots.len())
            .field("selected", &self.by_url_key.len())
            .field("superseded", &self.superseded.len())
            .field("rejected", &self.rejected)
            .finish()
    }
}

impl ResourceIndex {
    /// Index using the aggressive canonicalizer
    #[must_use]
    pub fn new(forced_extensions: Arc<ForcedExtensions>) -> Self {
        Self::with_canonicalizer(forced_extensions, Arc::new(AggressiveCanonicalizer))
    }

    #[must_use]
    pub fn with_canonicalizer(
        forced_extensions: Arc<ForcedExtensions>,
        canonicalizer: Arc<dyn Canonicalizer>,
    ) -> Self {
        Self {
            snapshots: Vec::new(),
            by_url_key: HashMap::new(),
            by_path: BTreeMap::new(),
            superseded: HashSet::new(),
            allocator: PathAllocator::new(forced_extensions),
            canonicalizer,
            rejected: 0,
        }
    }

    /// Ingest one archive record.
    ///
    /// Rejected records are dropped before path allocation. Accepted ones
    /// get a unique output path, enter the path index, and then compete for
    /// selection under their canonical key:
    /// 1. no existing entry: incoming is selected
    /// 2. existing redirect, incoming content: incoming wins
    /// 3. existing content, incoming redirect: existing wins
    /// 4. same class: incoming wins unless strictly older
    ///
    /// # Errors
    ///
    /// Fails when the URL cannot be canonicalized or mapped to a path.
    pub fn add(&mut self, record: ArchiveRecord) -> ConvertResult<AddOutcome> {
        let snapshot = Snapshot::from_record(record);

        if matches!(snapshot.kind(), SnapshotKind::Rejected) {
            log::debug!("Rejected {} (status {})", snapshot.url(), snapshot.status());
            self.rejected += 1;
            return Ok(AddOutcome::Rejected);
        }

        let key = self
            .canonicalizer
            .canonicalize(snapshot.url())
            .ok_or_else(|| ConvertError::InvalidUrl(snapshot.url().to_string()))?;

        let by_path = &self.by_path;
        let output = self.allocator.allocate(snapshot.url(), snapshot.content_type(), |p| {
            by_path.contains_key(&p.to_lowercase())
        })?;
        let path_key = output.path.to_lowercase();
        snapshot.assign_output_path(output)?;

        let id = SnapshotId(self.snapshots.len());
        self.snapshots.push(snapshot);
        self.by_path.insert(path_key, id);

        let outcome = match self.by_url_key.get(&key).copied() {
            None => {
                self.by_url_key.insert(key, id);
                AddOutcome::Selected { id, replaced: None }
            }
            Some(existing) => {
                if incoming_wins(self.snapshot(existing), self.snapshot(id)) {
                    self.by_url_key.insert(key, id);
                    self.superseded.insert(existing);
                    AddOutcome::Selected {
                        id,
                        replaced: Some(existing),
                    }
                } else {
                    self.superseded.insert(id);
                    AddOutcome::Superseded { id, selected: existing }
                }
            }
        };

        log::trace!("Indexed {:?}: {:?}", self.snapshot(id).url(), outcome);
        Ok(outcome)
    }

    /// Snapshot for an id handed out by this index
    #[must_use]
    pub fn snapshot(&self, id: SnapshotId) -> &Snapshot {
        &self.snapshots[id.0]
    }

    /// Canonical key for a URL, using this index's canonicalizer
    #[must_use]
    pub fn url_key(&self, url: &str) -> Option<String> {
        self.canonicalizer.canonicalize(url)
    }

    #[must_use]
    pub fn lookup_key(&self, key: &str) -> Option<SnapshotId> {
        self.by_url_key.get(key).copied()
    }

    /// Selected snapshot for an absolute URL
    #[must_use]
    pub fn lookup(&self, url: &str) -> Option<(SnapshotId, &Snapshot)> {
        let id = self.lookup_key(&self.url_key(url)?)?;
        Some((id, self.snapshot(id)))
    }

    /// Snapshot stored at an output path, compared case-insensitively
    #[must_use]
    pub fn by_path(&self, path: &str) -> Option<&Snapshot> {
        self.by_path
            .get(&path.to_lowercase())
            .map(|id| self.snapshot(*id))
    }

    /// Id of the snapshot written at `path`, if it is emitted
    #[must_use]
    pub fn emitted_at(&self, path: &str) -> Option<SnapshotId> {
        self.by_path
            .get(&path.to_lowercase())
            .copied()
            .filter(|id| !self.superseded.contains(id))
    }

    /// Every accepted snapshot in output path order
    pub fn snapshots_by_path(&self) -> impl Iterator<Item = (SnapshotId, &Snapshot)> + '_ {
        self.by_path.values().map(|id| (*id, self.snapshot(*id)))
    }

    /// Snapshots to write, in output path order: every accepted snapshot
    /// that was not displaced during selection.
    pub fn emittable(&self) -> impl Iterator<Item = (SnapshotId, &Snapshot)> + '_ {
        self.snapshots_by_path()
            .filter(|(id, _)| !self.superseded.contains(id))
    }

    #[must_use]
    pub fn is_superseded(&self, id: SnapshotId) -> bool {
        self.superseded.contains(&id)
    }

    /// Number of accepted snapshots
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of distinct canonical keys
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.by_url_key.len()
    }

    #[must_use]
    pub fn emittable_count(&self) -> usize {
        self.snapshots.len() - self.superseded.len()
    }

    #[must_use]
    pub fn rejected_count(&self) -> usize {
        self.rejected
    }
}

fn incoming_wins(existing: &Snapshot, incoming: &Snapshot) -> bool {
    match (existing.is_redirect(), incoming.is_redirect()) {
        (true, false) => true,
        (false, true) => false,
        _ => incoming.captured_at() >= existing.captured_at(),
    }
}
