//! WARC and ARC container reading.
//!
//! Containers are read sequentially; only the record headers and the embedded
//! HTTP head are parsed, the rest of each block is drained. Gzip containers
//! are expected to hold one record per member, which is what makes the
//! recorded (offset, length) pairs random-accessible later.

use std::io::{self, BufRead, BufReader, Read};

use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::bufread::GzDecoder;

use super::http::{HttpHead, read_line, read_payload};
use super::record::{ArchiveRecord, SourceLocator};
use crate::error::{ConvertError, ConvertResult};

const ARC_DATE_FORMAT: &str = "%Y%m%d%H%M%S";

/// Byte-counting `BufRead` adapter so record offsets can be reported in
/// container coordinates.
struct CountingReader<R> {
    inner: R,
    position: u64,
}

impl<R: BufRead> CountingReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, position: 0 }
    }
}

impl<R: BufRead> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

impl<R: BufRead> BufRead for CountingReader<R> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.inner.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.position += amt as u64;
        self.inner.consume(amt);
    }
}

/// Header fields shared by WARC and ARC records
#[derive(Debug)]
pub(crate) struct RecordHead {
    /// `WARC-Type`; `None` for ARC records
    pub warc_type: Option<String>,
    pub target: Option<String>,
    pub date: DateTime<Utc>,
    pub block_length: u64,
}

impl RecordHead {
    fn is_http_response(&self) -> bool {
        let is_response = self.warc_type.as_deref().is_none_or(|t| t.eq_ignore_ascii_case("response"));
        is_response
            && self
                .target
                .as_deref()
                .is_some_and(|t| t.starts_with("http://") || t.starts_with("https://"))
    }
}

pub(crate) fn is_gzip(prefix: &[u8]) -> bool {
    prefix.starts_with(&[0x1f, 0x8b])
}

/// Read every HTTP response record from a WARC or ARC stream, plain or
/// gzipped.
///
/// A malformed record header aborts the container; a malformed HTTP head
/// only skips that record.
pub fn read_container<R: BufRead>(reader: R, container: &str) -> ConvertResult<Vec<ArchiveRecord>> {
    let mut counting = CountingReader::new(reader);
    let gzipped = is_gzip(counting.fill_buf()?);
    let mut records = Vec::new();

    if gzipped {
        while !counting.fill_buf()?.is_empty() {
            let offset = counting.position;
            let mut member = BufReader::new(GzDecoder::new(&mut counting));
            let record = read_one(&mut member, offset, container)
                .map_err(|e| at_offset(e, offset))?;
            let leftover = drain(&mut member).map_err(|e| at_offset(e.into(), offset))?;
            drop(member);

            if leftover > 0 {
                log::warn!(
                    "{container}: gzip member at {offset} holds more than one record, only the first is indexed"
                );
            }
            if let Some(mut record) = record {
                record.locator.length = counting.position - offset;
                records.push(record);
            }
        }
    } else {
        while skip_blank_lines(&mut counting)? {
            let offset = counting.position;
            let record = read_one(&mut counting, offset, container)?;
            if let Some(mut record) = record {
                record.locator.length = counting.position - offset;
                records.push(record);
            }
        }
    }

    log::debug!("{container}: {} response records", records.len());
    Ok(records)
}

/// Read the single record at the start of `reader` and return its decoded
/// HTTP head and payload.
pub(crate) fn read_record_payload<R: BufRead>(mut reader: R) -> ConvertResult<(HttpHead, Vec<u8>)> {
    if is_gzip(reader.fill_buf()?) {
        payload_of(BufReader::new(GzDecoder::new(reader)))
    } else {
        payload_of(reader)
    }
}

fn payload_of<R: BufRead>(mut reader: R) -> ConvertResult<(HttpHead, Vec<u8>)> {
    skip_blank_lines(&mut reader)?;
    let head = read_record_head(&mut reader, 0)?
        .ok_or_else(|| ConvertError::MalformedWarc {
            offset: 0,
            reason: "no record at offset".to_string(),
        })?;
    let mut block = reader.take(head.block_length);
    let http = HttpHead::parse(&mut block)?;
    let body = read_payload(&http, block)?;
    Ok((http, body))
}

/// Parse one record and drain its block. `None` for records that are not
/// http(s) responses or whose HTTP head cannot be parsed.
fn read_one<R: BufRead>(
    reader: &mut R,
    offset: u64,
    container: &str,
) -> ConvertResult<Option<ArchiveRecord>> {
    skip_blank_lines(reader)?;
    let Some(head) = read_record_head(reader, offset)? else {
        return Ok(None);
    };

    let mut block = reader.take(head.block_length);
    let mut record = None;

    if head.is_http_response() {
        let url = head.target.clone().unwrap_or_default();
        match HttpHead::parse(&mut block) {
            Ok(http) => {
                record = Some(ArchiveRecord {
                    url,
                    captured_at: head.date,
                    status: http.status,
                    content_type: http.content_type(),
                    location: http.location().map(str::to_string),
                    locator: SourceLocator {
                        container: container.to_string(),
                        offset,
                        length: 0,
                    },
                });
            }
            Err(e) => log::warn!("{container}: skipping {url} at {offset}: {e}"),
        }
    }

    io::copy(&mut block, &mut io::sink())?;
    Ok(record)
}

/// Parse a WARC header block or an ARC header line.
fn read_record_head<R: BufRead>(reader: &mut R, offset: u64) -> ConvertResult<Option<RecordHead>> {
    let Some(first) = read_line(reader)? else {
        return Ok(None);
    };
    let malformed = |reason: String| ConvertError::MalformedWarc { offset, reason };

    if first.starts_with("WARC/") {
        let mut warc_type = None;
        let mut target = None;
        let mut date = None;
        let mut block_length = None;

        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "warc-type" => warc_type = Some(value.to_string()),
                "warc-target-uri" => {
                    target = Some(value.trim_start_matches('<').trim_end_matches('>').to_string());
                }
                "warc-date" => {
                    let parsed = DateTime::parse_from_rfc3339(value)
                        .map_err(|e| malformed(format!("bad WARC-Date '{value}': {e}")))?;
                    date = Some(parsed.with_timezone(&Utc));
                }
                "content-length" => {
                    let parsed = value
                        .parse::<u64>()
                        .map_err(|_| malformed(format!("bad Content-Length '{value}'")))?;
                    block_length = Some(parsed);
                }
                _ => {}
            }
        }

        let block_length = block_length.ok_or_else(|| malformed("missing Content-Length".to_string()))?;
        let date = date.ok_or_else(|| malformed("missing WARC-Date".to_string()))?;
        return Ok(Some(RecordHead {
            warc_type,
            target,
            date,
            block_length,
        }));
    }

    // ARC v1: "url ip-address archive-date content-type length"
    let fields: Vec<&str> = first.split_whitespace().collect();
    if fields.len() < 5 {
        return Err(malformed(format!("not a WARC or ARC header: '{first}'")));
    }
    let date = parse_timestamp(fields[2])
        .ok_or_else(|| malformed(format!("bad ARC date '{}'", fields[2])))?;
    let block_length = fields[fields.len() - 1]
        .parse::<u64>()
        .map_err(|_| malformed(format!("bad ARC length in '{first}'")))?;

    Ok(Some(RecordHead {
        warc_type: None,
        target: Some(fields[0].to_string()),
        date,
        block_length,
    }))
}

/// Parse a 14-digit `yyyyMMddHHmmss` archive timestamp as UTC. Longer
/// values (sub-second precision) are truncated.
pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let digits = raw.get(..14)?;
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDateTime::parse_from_str(digits, ARC_DATE_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Consume CR/LF bytes. Returns `false` at end of input.
fn skip_blank_lines<R: BufRead>(reader: &mut R) -> io::Result<bool> {
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(false);
        }
        let blank = buf.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        if blank == 0 {
            return Ok(true);
        }
        reader.consume(blank);
    }
}

/// Drain a reader, returning how many non-whitespace bytes were left.
fn drain<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    let mut leftover = 0;
    loop {
        let buf = reader.fill_buf()?;
        if buf.is_empty() {
            return Ok(leftover);
        }
        leftover += buf.iter().filter(|b| !b.is_ascii_whitespace()).count();
        let len = buf.len();
        reader.consume(len);
    }
}

fn at_offset(error: ConvertError, offset: u64) -> ConvertError {
    match error {
        ConvertError::Stream(source) => ConvertError::MalformedWarc {
            offset,
            reason: source.to_string(),
        },
        other => other,
    }
}
