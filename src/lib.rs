//! Convert web archives into a browsable static file tree.
//!
//! Every archived response becomes a file at a deterministic path, and the
//! links inside HTML, CSS and script content are rewritten to the relative
//! paths of the archived resources they point at.
//!
//! ```no_run
//! use std::path::PathBuf;
//!
//! use warcmirror::{ConvertConfig, Converter};
//!
//! # async fn run() -> warcmirror::ConvertResult<()> {
//! let config = ConvertConfig::builder().output_dir("site").build()?;
//! let summary = Converter::new(config)?
//!     .run(&[PathBuf::from("crawl.warc.gz")])
//!     .await?;
//! println!("{} files written", summary.emitted);
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod canonical;
pub mod config;
pub mod converter;
pub mod error;
pub mod link_rewriter;
pub mod resource_index;
pub mod utils;

pub use archive::{ArchiveRecord, RecordSource, SourceLocator};
pub use canonical::{AggressiveCanonicalizer, Canonicalizer};
pub use config::{ConvertConfig, ForcedExtensions, UrlFilter};
pub use converter::{ConversionSummary, Converter, LogProgress, ManifestEntry, NoOpProgress, ProgressReporter};
pub use error::{ConvertError, ConvertResult};
pub use link_rewriter::LinkResolver;
pub use resource_index::{AddOutcome, RedirectResolution, ResourceIndex, Snapshot, SnapshotId};
