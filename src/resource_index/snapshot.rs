//! Snapshot data model.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::archive::{ArchiveRecord, SourceLocator};
use crate::error::{ConvertError, ConvertResult};
use crate::utils::REJECT_STATUS_FROM;

/// Stable handle to a snapshot stored in a [`super::ResourceIndex`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId(pub(crate) usize);

/// Closed classification of an archived response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Real content worth emitting and linking to
    Content,
    /// A response carrying a `Location` header; the raw value is kept
    Redirect { location: String },
    /// Hard error responses; never indexed
    Rejected,
}

impl SnapshotKind {
    /// Classify from status and `Location`.
    ///
    /// Status 400 and above is rejected. Otherwise the presence of a
    /// non-empty `Location` header, not the status code, decides whether the
    /// snapshot is a redirect.
    #[must_use]
    pub fn classify(status: u16, location: Option<&str>) -> Self {
        if status >= REJECT_STATUS_FROM {
            return Self::Rejected;
        }
        match location.map(str::trim).filter(|l| !l.is_empty()) {
            Some(location) => Self::Redirect {
                location: location.to_string(),
            },
            None => Self::Content,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Redirect { .. } => "redirect",
            Self::Rejected => "rejected",
        }
    }
}

/// An allocated output path together with the candidate it was derived from.
///
/// `base_path` is the path before any `~n` disambiguation suffix was added;
/// it equals `path` for the first snapshot that claimed the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPath {
    pub path: String,
    pub base_path: String,
}

impl OutputPath {
    #[must_use]
    pub fn is_suffixed(&self) -> bool {
        self.path != self.base_path
    }
}

/// One archived HTTP response. The body stays in the archive and is
/// re-fetched through `locator` when the snapshot is written.
#[derive(Debug)]
pub struct Snapshot {
    url: String,
    captured_at: DateTime<Utc>,
    status: u16,
    content_type: String,
    locator: SourceLocator,
    kind: SnapshotKind,
    output_path: OnceLock<OutputPath>,
}

impl Snapshot {
    #[must_use]
    pub fn from_record(record: ArchiveRecord) -> Self {
        let kind = SnapshotKind::classify(record.status, record.location.as_deref());
        Self {
            url: record.url,
            captured_at: record.captured_at,
            status: record.status,
            content_type: record.content_type,
            locator: record.locator,
            kind,
            output_path: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.status
    }

    #[must_use]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[must_use]
    pub fn locator(&self) -> &SourceLocator {
        &self.locator
    }

    #[must_use]
    pub fn kind(&self) -> &SnapshotKind {
        &self.kind
    }

    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(self.kind, SnapshotKind::Redirect { .. })
    }

    /// Raw `Location` value for redirects
    #[must_use]
    pub fn redirect_target(&self) -> Option<&str> {
        match &self.kind {
            SnapshotKind::Redirect { location } => Some(location),
            _ => None,
        }
    }

    /// Allocated output path, once the snapshot has been accepted
    #[must_use]
    pub fn output_path(&self) -> Option<&str> {
        self.output_path.get().map(|p| p.path.as_str())
    }

    /// Candidate path before disambiguation
    #[must_use]
    pub fn base_path(&self) -> Option<&str> {
        self.output_path.get().map(|p| p.base_path.as_str())
    }

    /// Assign the output path. Succeeds exactly once.
    pub(crate) fn assign_output_path(&self, path: OutputPath) -> ConvertResult<()> {
        self.output_path
            .set(path)
            .map_err(|_| ConvertError::PathAlreadyAssigned(self.url.clone()))
    }
}
