//! Helpers for building synthetic archives in tests

use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;

/// One response to put in a synthetic WARC
#[derive(Debug, Clone)]
pub struct Response {
    pub url: String,
    pub date: String,
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[allow(dead_code)]
impl Response {
    pub fn ok(url: &str, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.to_string(),
            date: "2021-03-01T12:00:00Z".to_string(),
            status: 200,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
        }
    }

    pub fn redirect(url: &str, location: &str) -> Self {
        Self {
            url: url.to_string(),
            date: "2021-03-01T12:00:00Z".to_string(),
            status: 301,
            headers: vec![
                ("Content-Type".to_string(), "text/html".to_string()),
                ("Location".to_string(), location.to_string()),
            ],
            body: Vec::new(),
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn captured(mut self, date: &str) -> Self {
        self.date = date.to_string();
        self
    }

    fn http_block(&self) -> Vec<u8> {
        let mut block = format!("HTTP/1.1 {} X\r\n", self.status).into_bytes();
        for (name, value) in &self.headers {
            block.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
        }
        block.extend_from_slice(format!("Content-Length: {}\r\n\r\n", self.body.len()).as_bytes());
        block.extend_from_slice(&self.body);
        block
    }

    /// The complete WARC response record, trailing CRLFs included
    pub fn warc_record(&self) -> Vec<u8> {
        let block = self.http_block();
        let mut record = format!(
            "WARC/1.0\r\nWARC-Type: response\r\nWARC-Target-URI: {}\r\nWARC-Date: {}\r\nContent-Type: application/http; msgtype=response\r\nContent-Length: {}\r\n\r\n",
            self.url,
            self.date,
            block.len()
        )
        .into_bytes();
        record.extend_from_slice(&block);
        record.extend_from_slice(b"\r\n\r\n");
        record
    }
}

/// Where a record landed inside a written container
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub offset: u64,
    pub length: u64,
}

/// Write an uncompressed WARC and return each record's placement
#[allow(dead_code)]
pub fn write_warc(path: &Path, responses: &[Response]) -> Vec<Placement> {
    let mut data = Vec::new();
    let mut placements = Vec::new();
    for response in responses {
        let record = response.warc_record();
        placements.push(Placement {
            offset: data.len() as u64,
            length: record.len() as u64,
        });
        data.extend_from_slice(&record);
    }
    std::fs::write(path, data).unwrap();
    placements
}

/// Write a WARC with one gzip member per record
#[allow(dead_code)]
pub fn write_warc_gz(path: &Path, responses: &[Response]) -> Vec<Placement> {
    let mut data = Vec::new();
    let mut placements = Vec::new();
    for response in responses {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&response.warc_record()).unwrap();
        let member = encoder.finish().unwrap();
        placements.push(Placement {
            offset: data.len() as u64,
            length: member.len() as u64,
        });
        data.extend_from_slice(&member);
    }
    std::fs::write(path, data).unwrap();
    placements
}

/// Read a file from the output tree as text
#[allow(dead_code)]
pub fn read_output(root: &Path, relative: &str) -> String {
    let path: PathBuf = relative.split('/').fold(root.to_path_buf(), |p, s| p.join(s));
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}
