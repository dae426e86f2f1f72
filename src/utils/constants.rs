//! Shared configuration constants for warcmirror
//!
//! Default values used by the config builder and the conversion pipeline.

/// HTTP statuses at or above this value are rejected at ingestion.
///
/// 3xx responses are kept so that redirects take part in selection and
/// redirect resolution.
pub const REJECT_STATUS_FROM: u16 = 400;

/// Content type used when a record's MIME type cannot be determined
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Default manifest file name written at the root of the output tree
pub const DEFAULT_MANIFEST_NAME: &str = "manifest.json";

/// Timeout for remote range requests against a WARC base location
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Emit a progress log line every N written resources
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Upper bound on hops when collapsing redirect chains to a fixed point
pub const DEFAULT_MAX_REDIRECT_HOPS: usize = 16;

/// File name used for directory-style URLs (`/`, `/docs/`)
pub const INDEX_FILE_STEM: &str = "index";

/// Maximum characters of a query string folded into a file name
pub const MAX_QUERY_IN_FILENAME: usize = 64;

/// Length of the random identifier namespace injected into scripts
pub const SCRIPT_NAMESPACE_LEN: usize = 16;

/// Byte window scanned for a `<meta charset>` declaration
pub const CHARSET_PRESCAN_BYTES: usize = 1024;
