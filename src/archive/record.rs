//! Records yielded by the archive readers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a record's bytes live: container name plus byte range.
///
/// For gzip WARCs the range covers the compressed member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocator {
    pub container: String,
    pub offset: u64,
    /// Record length in bytes; 0 means "read to the end of the record"
    pub length: u64,
}

/// Metadata for one archived HTTP response, without its body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    pub url: String,
    pub captured_at: DateTime<Utc>,
    /// HTTP status, 0 when unknown
    pub status: u16,
    /// Base MIME type, lowercase, no parameters
    pub content_type: String,
    /// Raw `Location` header value
    pub location: Option<String>,
    pub locator: SourceLocator,
}
