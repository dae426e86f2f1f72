//! Parsing of the HTTP response embedded in an archive record.

use std::io::{BufRead, Read};

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use crate::error::{ConvertError, ConvertResult};
use crate::utils::DEFAULT_CONTENT_TYPE;

/// Status line and headers of an archived HTTP response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpHead {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HttpHead {
    /// Read a status line and header block, stopping after the blank line.
    pub fn parse<R: BufRead>(reader: &mut R) -> ConvertResult<Self> {
        let status_line = read_line(reader)?
            .ok_or_else(|| ConvertError::MalformedHttp("empty response".to_string()))?;

        let mut parts = status_line.split_whitespace();
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(ConvertError::MalformedHttp(format!("bad status line '{status_line}'")));
        }
        let status = parts
            .next()
            .and_then(|code| code.parse::<u16>().ok())
            .ok_or_else(|| ConvertError::MalformedHttp(format!("bad status code in '{status_line}'")))?;

        let mut headers = Vec::new();
        while let Some(line) = read_line(reader)? {
            if line.is_empty() {
                break;
            }
            // Malformed header lines are skipped
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        Ok(Self { status, headers })
    }

    /// First value of a header, matched case-insensitively
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> String {
        base_content_type(self.header("Content-Type"))
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.header("Location").filter(|l| !l.trim().is_empty())
    }

    fn is_chunked(&self) -> bool {
        self.header("Transfer-Encoding")
            .is_some_and(|te| te.to_ascii_lowercase().contains("chunked"))
    }
}

/// Reduce a `Content-Type` value to its lowercase base type.
///
/// Missing or unparseable values map to `application/octet-stream`.
#[must_use]
pub fn base_content_type(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return DEFAULT_CONTENT_TYPE.to_string();
    };
    let base = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match base.split_once('/') {
        Some((kind, sub))
            if !kind.is_empty() && !sub.is_empty() && !base.contains(char::is_whitespace) =>
        {
            base
        }
        _ => DEFAULT_CONTENT_TYPE.to_string(),
    }
}

/// Read the remaining body and undo transfer and content codings.
///
/// Unknown content codings are passed through unchanged. A body that fails
/// to decompress is returned as stored.
pub fn read_payload<R: Read>(head: &HttpHead, mut body: R) -> ConvertResult<Vec<u8>> {
    let mut raw = Vec::new();
    body.read_to_end(&mut raw)?;

    if head.is_chunked() {
        raw = dechunk(&raw)?;
    }

    let coding = head
        .header("Content-Encoding")
        .map(|c| c.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let decoded = match coding.as_str() {
        "gzip" | "x-gzip" => inflate(GzDecoder::new(raw.as_slice())),
        // "deflate" is zlib-wrapped per RFC, but raw deflate is common
        "deflate" => inflate(ZlibDecoder::new(raw.as_slice()))
            .or_else(|| inflate(DeflateDecoder::new(raw.as_slice()))),
        _ => return Ok(raw),
    };

    match decoded {
        Some(bytes) => Ok(bytes),
        None => {
            log::debug!("Could not decode '{coding}' body, keeping stored bytes");
            Ok(raw)
        }
    }
}

fn inflate<R: Read>(mut decoder: R) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    decoder.read_to_end(&mut out).ok()?;
    Some(out)
}

/// Decode a `Transfer-Encoding: chunked` body. A truncated final chunk keeps
/// whatever data was present.
fn dechunk(data: &[u8]) -> ConvertResult<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut rest = data;

    loop {
        let Some(line_end) = rest.iter().position(|&b| b == b'\n') else {
            break;
        };
        let size_line = String::from_utf8_lossy(&rest[..line_end]);
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16)
            .map_err(|_| ConvertError::MalformedHttp(format!("bad chunk size '{size_hex}'")))?;
        rest = &rest[line_end + 1..];

        if size == 0 {
            break;
        }
        let take = size.min(rest.len());
        out.extend_from_slice(&rest[..take]);
        rest = &rest[take..];

        // Chunk data is followed by CRLF
        let crlf = rest.iter().take(2).take_while(|&&b| b == b'\r' || b == b'\n').count();
        rest = &rest[crlf..];
    }

    Ok(out)
}

/// Read one line without its terminator. `None` at end of input.
pub(crate) fn read_line<R: BufRead>(reader: &mut R) -> ConvertResult<Option<String>> {
    let mut buf = Vec::new();
    if reader.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    while matches!(buf.last(), Some(b'\n' | b'\r')) {
        buf.pop();
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    #[test]
    fn test_parse_head() {
        let raw = b"HTTP/1.1 301 Moved Permanently\r\nContent-Type: text/html; charset=UTF-8\r\nlocation: /new\r\n\r\nbody";
        let mut reader = &raw[..];
        let head = HttpHead::parse(&mut reader).unwrap();

        assert_eq!(head.status, 301);
        assert_eq!(head.content_type(), "text/html");
        assert_eq!(head.location(), Some("/new"));
        assert_eq!(reader, b"body");
    }

    #[test]
    fn test_bad_status_line() {
        let mut reader = &b"garbage\r\n\r\n"[..];
        assert!(HttpHead::parse(&mut reader).is_err());
    }

    #[test]
    fn test_base_content_type() {
        assert_eq!(base_content_type(Some("Text/CSS ; charset=utf-8")), "text/css");
        assert_eq!(base_content_type(Some("nonsense")), DEFAULT_CONTENT_TYPE);
        assert_eq!(base_content_type(None), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_chunked_gzip_payload() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"hello archive").unwrap();
        let gz = encoder.finish().unwrap();

        let mut chunked = format!("{:x}\r\n", gz.len()).into_bytes();
        chunked.extend_from_slice(&gz);
        chunked.extend_from_slice(b"\r\n0\r\n\r\n");

        let head = HttpHead {
            status: 200,
            headers: vec![
                ("Transfer-Encoding".to_string(), "chunked".to_string()),
                ("Content-Encoding".to_string(), "gzip".to_string()),
            ],
        };
        assert_eq!(read_payload(&head, chunked.as_slice()).unwrap(), b"hello archive");
    }

    #[test]
    fn test_unknown_coding_passes_through() {
        let head = HttpHead {
            status: 200,
            headers: vec![("Content-Encoding".to_string(), "br".to_string())],
        };
        assert_eq!(read_payload(&head, &b"\x01\x02"[..]).unwrap(), b"\x01\x02");
    }
}
