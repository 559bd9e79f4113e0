//! Byte-level `multipart/form-data` decoder.
//!
//! Uploaded files must round-trip exactly, so the body is never treated as a
//! string: segments are located by scanning raw bytes for the boundary token
//! and only the header block of each segment is decoded as text.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

static BOUNDARY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"boundary="?([^";]+)"?"#).expect("valid boundary regex"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(^|[\s;])name="([^"]+)""#).expect("valid name regex"));
static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"filename="([^"]*)""#).expect("valid filename regex"));
static CONTENT_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)content-type:\s*([^\r\n;]+)").expect("valid content-type regex"));

/// A binary file part with its declared MIME type.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Decoded form: text fields and file parts, each keyed by field name.
/// Duplicate field names are first-write-wins; later segments with the same
/// name are ignored.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: HashMap<String, FilePart>,
}

fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Splits `body` on every occurrence of `delimiter`. The first returned
/// segment is the preamble and the last is whatever follows the closing
/// boundary; callers drop both.
fn split_segments<'a>(body: &'a [u8], delimiter: &[u8]) -> Vec<&'a [u8]> {
    let mut segments = Vec::new();
    let mut rest = body;
    while let Some(pos) = find_bytes(rest, delimiter) {
        segments.push(&rest[..pos]);
        rest = &rest[pos + delimiter.len()..];
    }
    segments.push(rest);
    segments
}

/// Decodes a raw request body using the boundary from the `Content-Type`
/// header. A missing boundary parameter is the one hard failure; corrupt
/// segments are skipped.
pub fn parse(body: &[u8], content_type: &str) -> Result<FormData, ApiError> {
    let boundary = BOUNDARY_RE
        .captures(content_type)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|b| !b.is_empty())
        .ok_or_else(|| {
            ApiError::MalformedRequest("no boundary found in content-type".to_string())
        })?;

    let delimiter = format!("--{boundary}");
    let segments = split_segments(body, delimiter.as_bytes());

    let mut form = FormData::default();
    if segments.len() < 3 {
        // No complete part between an opening and closing boundary.
        return Ok(form);
    }

    for segment in &segments[1..segments.len() - 1] {
        let Some(header_end) = find_bytes(segment, b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&segment[..header_end]);

        let Some(name) = NAME_RE
            .captures(&headers)
            .and_then(|captures| captures.get(2))
            .map(|m| m.as_str().to_string())
        else {
            continue;
        };

        let body_start = header_end + 4;
        let mut body_end = segment.len();
        if body_end >= body_start + 2 && &segment[body_end - 2..] == b"\r\n" {
            body_end -= 2;
        }
        let value = &segment[body_start..body_end.max(body_start)];

        let has_filename = FILENAME_RE.is_match(&headers);
        let mime_type = CONTENT_TYPE_RE
            .captures(&headers)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().trim().to_string());

        match (has_filename, mime_type) {
            (true, Some(mime_type)) => {
                form.files.entry(name).or_insert_with(|| FilePart {
                    bytes: value.to_vec(),
                    mime_type,
                });
            }
            _ => {
                form.fields
                    .entry(name)
                    .or_insert_with(|| String::from_utf8_lossy(value).trim().to_string());
            }
        }
    }

    Ok(form)
}
