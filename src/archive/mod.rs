//! Archive containers: WARC/ARC files, CDX indexes, and body re-fetching.

pub mod cdx;
pub mod http;
pub mod record;
pub mod source;
pub mod warc;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

pub use record::{ArchiveRecord, SourceLocator};
pub use source::{ContainerLocation, RecordSource};

use crate::error::{ConvertError, ConvertResult};

/// Container format, sniffed from the first bytes of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Warc,
    Arc,
    Gzip,
    Cdx,
}

impl ArchiveFormat {
    #[must_use]
    pub fn sniff(prefix: &[u8]) -> Self {
        match prefix {
            [0x1f, 0x8b, ..] => Self::Gzip,
            [b'W', ..] => Self::Warc,
            [b'f', ..] => Self::Arc,
            _ => Self::Cdx,
        }
    }
}

/// Read every record listed in or stored by an archive file.
///
/// Records from WARC/ARC inputs point back at the file by its absolute path;
/// records from CDX inputs keep the container name given in the index.
pub fn load_file(path: &Path) -> ConvertResult<Vec<ArchiveRecord>> {
    let file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    let mut reader = BufReader::new(file);
    let format = ArchiveFormat::sniff(reader.fill_buf().map_err(|e| ConvertError::io(path, e))?);
    log::info!("Loading {} ({format:?})", path.display());

    match format {
        ArchiveFormat::Cdx => cdx::read_cdx(reader),
        ArchiveFormat::Warc | ArchiveFormat::Arc | ArchiveFormat::Gzip => {
            let absolute = std::path::absolute(path).map_err(|e| ConvertError::io(path, e))?;
            warc::read_container(reader, &absolute.to_string_lossy())
        }
    }
}
