//! Re-reading record bodies from their containers.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::RANGE;

use super::http::HttpHead;
use super::record::SourceLocator;
use super::warc::read_record_payload;
use crate::config::ConvertConfig;
use crate::error::{ConvertError, ConvertResult};

/// Where a container lives once resolved against the base location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerLocation {
    Local(PathBuf),
    Remote(String),
}

/// Fetches decoded HTTP payloads for archived records.
///
/// Container names are resolved against an optional base: a directory or an
/// `http(s)://` prefix. Absolute local paths (as recorded for WARC inputs)
/// are used as-is.
#[derive(Debug, Clone)]
pub struct RecordSource {
    base: Option<String>,
    client: reqwest::Client,
}

impl RecordSource {
    pub fn new(base: Option<String>, timeout: Duration) -> ConvertResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ConvertError::Fetch {
                location: "client".to_string(),
                source,
            })?;
        Ok(Self { base, client })
    }

    pub fn from_config(config: &ConvertConfig) -> ConvertResult<Self> {
        Self::new(config.archive_base().map(str::to_string), config.fetch_timeout())
    }

    #[must_use]
    pub fn locate(&self, container: &str) -> ContainerLocation {
        if Path::new(container).is_absolute() {
            return ContainerLocation::Local(PathBuf::from(container));
        }
        match self.base.as_deref() {
            Some(base) if base.starts_with("http://") || base.starts_with("https://") => {
                ContainerLocation::Remote(format!("{base}{container}"))
            }
            Some(base) => ContainerLocation::Local(Path::new(base).join(container)),
            None => ContainerLocation::Local(PathBuf::from(container)),
        }
    }

    /// Fetch a record and return its HTTP head with the decoded payload.
    ///
    /// # Errors
    ///
    /// IO, network, timeout and parse failures are all reported per record.
    pub async fn fetch(&self, locator: &SourceLocator) -> ConvertResult<(HttpHead, Vec<u8>)> {
        match self.locate(&locator.container) {
            ContainerLocation::Local(path) => {
                let locator = locator.clone();
                tokio::task::spawn_blocking(move || read_local(&path, &locator)).await?
            }
            ContainerLocation::Remote(url) => {
                let bytes = self.fetch_range(&url, locator).await?;
                read_record_payload(bytes.as_slice())
            }
        }
    }

    async fn fetch_range(&self, url: &str, locator: &SourceLocator) -> ConvertResult<Vec<u8>> {
        let fetch_err = |source: reqwest::Error| ConvertError::Fetch {
            location: url.to_string(),
            source,
        };

        let mut request = self.client.get(url);
        if let Some(range) = range_header(url, locator)? {
            request = request.header(RANGE, range);
        }

        let response = request.send().await.map_err(fetch_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConvertError::FetchStatus {
                location: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(fetch_err)?;
        // Servers that ignore Range send the whole container
        if status == StatusCode::OK && locator.offset > 0 {
            let start = usize::try_from(locator.offset).unwrap_or(usize::MAX);
            return Ok(bytes.get(start..).map(<[u8]>::to_vec).unwrap_or_default());
        }
        Ok(bytes.to_vec())
    }
}

/// The `Range` header value for a record, `None` for a whole container.
fn range_header(location: &str, locator: &SourceLocator) -> ConvertResult<Option<String>> {
    if locator.length == 0 {
        return Ok((locator.offset > 0).then(|| format!("bytes={}-", locator.offset)));
    }
    let last = locator
        .offset
        .checked_add(locator.length - 1)
        .ok_or_else(|| ConvertError::InvalidRange {
            location: location.to_string(),
            offset: locator.offset,
            length: locator.length,
        })?;
    Ok(Some(format!("bytes={}-{last}", locator.offset)))
}

fn read_local(path: &Path, locator: &SourceLocator) -> ConvertResult<(HttpHead, Vec<u8>)> {
    let mut file = File::open(path).map_err(|e| ConvertError::io(path, e))?;
    file.seek(SeekFrom::Start(locator.offset))
        .map_err(|e| ConvertError::io(path, e))?;

    let limit = if locator.length > 0 { locator.length } else { u64::MAX };
    read_record_payload(BufReader::new(file.take(limit)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(base: Option<&str>) -> RecordSource {
        RecordSource::new(base.map(str::to_string), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_locate() {
        assert_eq!(
            source(Some("https://warcs.example.org/")).locate("a.warc.gz"),
            ContainerLocation::Remote("https://warcs.example.org/a.warc.gz".to_string())
        );
        assert_eq!(
            source(Some("/data/warcs")).locate("a.warc.gz"),
            ContainerLocation::Local(PathBuf::from("/data/warcs/a.warc.gz"))
        );
        assert_eq!(
            source(Some("https://warcs.example.org/")).locate("/abs/a.warc"),
            ContainerLocation::Local(PathBuf::from("/abs/a.warc"))
        );
        assert_eq!(source(None).locate("a.warc"), ContainerLocation::Local(PathBuf::from("a.warc")));
    }

    #[tokio::test]
    async fn test_fetch_local_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let http = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nabout us";
        let record = format!(
            "WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: http://ex.org/about\r\nWARC-Date: 2021-03-04T05:06:07Z\r\nContent-Length: {}\r\n\r\n{http}\r\n\r\n",
            http.len()
        );
        let padding = "\r\n".repeat(10);
        let path = dir.path().join("a.warc");
        std::fs::write(&path, format!("{padding}{record}")).unwrap();

        let locator = SourceLocator {
            container: "a.warc".to_string(),
            offset: padding.len() as u64,
            length: record.len() as u64,
        };
        let source = source(Some(dir.path().to_str().unwrap()));
        let (head, body) = source.fetch(&locator).await.unwrap();
        assert_eq!(head.status, 200);
        assert_eq!(body, b"about us");
    }

    fn locator(offset: u64, length: u64) -> SourceLocator {
        SourceLocator {
            container: "a.warc.gz".to_string(),
            offset,
            length,
        }
    }

    #[test]
    fn test_range_header() {
        let url = "https://warcs.example.org/a.warc.gz";
        assert_eq!(range_header(url, &locator(100, 50)).unwrap().as_deref(), Some("bytes=100-149"));
        assert_eq!(range_header(url, &locator(100, 0)).unwrap().as_deref(), Some("bytes=100-"));
        assert_eq!(range_header(url, &locator(0, 0)).unwrap(), None);
        assert_eq!(
            range_header(url, &locator(u64::MAX - 1, 2)).unwrap().as_deref(),
            Some(format!("bytes={}-{}", u64::MAX - 1, u64::MAX).as_str())
        );
    }

    #[tokio::test]
    async fn test_overflowing_range_is_recoverable() {
        let url = "https://warcs.example.org/a.warc.gz";
        let err = range_header(url, &locator(u64::MAX, 2)).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRange { offset: u64::MAX, length: 2, .. }));
        assert!(err.is_recoverable());

        // Rejected before any request goes out
        let err = source(Some("https://warcs.example.org/"))
            .fetch(&locator(u64::MAX, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidRange { .. }));
    }

    #[tokio::test]
    async fn test_missing_container_is_an_error() {
        let locator = SourceLocator {
            container: "/nonexistent/a.warc".to_string(),
            offset: 0,
            length: 0,
        };
        assert!(source(None).fetch(&locator).await.is_err());
    }
}
