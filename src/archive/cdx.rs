//! CDX index reading.
//!
//! A CDX file lists one capture per line as space-separated fields whose
//! meaning is given by a ` CDX` legend line. Without a legend the layout is
//! guessed from the field count.

use std::io::BufRead;

use super::http::base_content_type;
use super::record::{ArchiveRecord, SourceLocator};
use super::warc::parse_timestamp;
use crate::error::{ConvertError, ConvertResult};
use crate::utils::is_valid_url;

/// Legend used by most 11-field CDX writers
const CDX11: &str = "N b a m s k r M S V g";
/// 12-field variant with the uncompressed length before the file name
const CDX12: &str = "N b a m s k r M S V n g";

/// Column positions for the fields the converter needs
#[derive(Debug, Clone, PartialEq, Eq)]
struct Layout {
    width: usize,
    timestamp: usize,
    url: usize,
    mime: usize,
    status: usize,
    redirect: Option<usize>,
    length: Option<usize>,
    offset: usize,
    file: usize,
}

impl Layout {
    fn from_legend(letters: &str, line: usize) -> ConvertResult<Self> {
        let columns: Vec<&str> = letters.split_whitespace().collect();
        let find = |letter: &str| columns.iter().position(|c| *c == letter);
        let require = |letter: &str| {
            find(letter).ok_or_else(|| ConvertError::MalformedCdx {
                line,
                reason: format!("legend has no '{letter}' column"),
            })
        };

        Ok(Self {
            width: columns.len(),
            timestamp: require("b")?,
            url: require("a")?,
            mime: require("m")?,
            status: require("s")?,
            redirect: find("r"),
            length: find("S"),
            offset: require("V")?,
            file: require("g")?,
        })
    }

    fn guess(width: usize, line: usize) -> ConvertResult<Self> {
        match width {
            11 => Self::from_legend(CDX11, line),
            12 => Self::from_legend(CDX12, line),
            _ => Err(ConvertError::MalformedCdx {
                line,
                reason: format!("{width} fields and no CDX legend"),
            }),
        }
    }
}

/// Read all http(s) captures from a CDX stream.
///
/// # Errors
///
/// The first malformed line aborts the file with its line number.
pub fn read_cdx<R: BufRead>(reader: R) -> ConvertResult<Vec<ArchiveRecord>> {
    let mut layout: Option<Layout> = None;
    let mut records = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;

        if line.trim().is_empty() {
            continue;
        }
        if let Some(legend) = line.strip_prefix(" CDX ") {
            layout = Some(Layout::from_legend(legend, line_no)?);
            continue;
        }

        let fields: Vec<&str> = line.split(' ').collect();
        let current = match &layout {
            Some(layout) => layout.clone(),
            None => {
                let guessed = Layout::guess(fields.len(), line_no)?;
                layout = Some(guessed.clone());
                guessed
            }
        };

        if let Some(record) = parse_line(&fields, &current, line_no)? {
            records.push(record);
        }
    }

    log::debug!("CDX: {} captures", records.len());
    Ok(records)
}

fn parse_line(fields: &[&str], layout: &Layout, line: usize) -> ConvertResult<Option<ArchiveRecord>> {
    let malformed = |reason: String| ConvertError::MalformedCdx { line, reason };

    if fields.len() != layout.width {
        return Err(malformed(format!(
            "expected {} fields, found {}",
            layout.width,
            fields.len()
        )));
    }

    let url = fields[layout.url];
    if !is_valid_url(url) {
        log::trace!("CDX line {line}: skipping non-http capture {url}");
        return Ok(None);
    }

    let captured_at = parse_timestamp(fields[layout.timestamp])
        .ok_or_else(|| malformed(format!("bad timestamp '{}'", fields[layout.timestamp])))?;

    let status = match fields[layout.status] {
        "-" => 0,
        raw => raw
            .parse::<u16>()
            .map_err(|_| malformed(format!("bad status '{raw}'")))?,
    };

    let parse_number = |raw: &str, what: &str| match raw {
        "-" => Ok(0),
        raw => raw
            .parse::<u64>()
            .map_err(|_| malformed(format!("bad {what} '{raw}'"))),
    };
    let length = layout
        .length
        .map(|i| parse_number(fields[i], "length"))
        .transpose()?
        .unwrap_or(0);
    let offset = parse_number(fields[layout.offset], "offset")?;

    let location = layout
        .redirect
        .map(|i| fields[i])
        .filter(|r| *r != "-" && !r.is_empty())
        .map(str::to_string);

    let mime = fields[layout.mime];
    let content_type = base_content_type((mime != "-").then_some(mime));

    Ok(Some(ArchiveRecord {
        url: url.to_string(),
        captured_at,
        status,
        content_type,
        location,
        locator: SourceLocator {
            container: fields[layout.file].to_string(),
            offset,
            length,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legend_layout() {
        let cdx = " CDX N b a m s k r M S V g\n\
                   org,ex)/ 20210304050607 http://ex.org/ text/html 200 ABC - - 512 1024 a.warc.gz\n\
                   org,ex)/old 20210304050607 http://ex.org/old text/html 301 ABC http://ex.org/ - 300 2048 a.warc.gz\n";
        let records = read_cdx(cdx.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].locator.offset, 1024);
        assert_eq!(records[0].locator.length, 512);
        assert_eq!(records[0].location, None);
        assert_eq!(records[1].status, 301);
        assert_eq!(records[1].location.as_deref(), Some("http://ex.org/"));
        assert_eq!(records[1].locator.container, "a.warc.gz");
    }

    #[test]
    fn test_twelve_fields_without_legend() {
        let cdx = "org,ex)/ 20210304050607 http://ex.org/ text/html - ABC - - 512 1024 900 b.warc.gz\n";
        let records = read_cdx(cdx.as_bytes()).unwrap();
        assert_eq!(records[0].status, 0);
        assert_eq!(records[0].locator.container, "b.warc.gz");
        assert_eq!(records[0].locator.offset, 1024);
    }

    #[test]
    fn test_non_http_skipped() {
        let cdx = " CDX N b a m s k r M S V g\n\
                   ex.org 20210304050607 dns:ex.org text/dns 200 ABC - - 10 0 a.warc.gz\n";
        assert!(read_cdx(cdx.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let cdx = " CDX N b a m s k r M S V g\n\n\
                   org,ex)/ yesterday http://ex.org/ text/html 200 ABC - - 512 1024 a.warc.gz\n";
        match read_cdx(cdx.as_bytes()).unwrap_err() {
            ConvertError::MalformedCdx { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
    }
}
