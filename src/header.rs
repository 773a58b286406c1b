use std::io::Read;

use http::header::{self, HeaderMap};

use crate::boundary::Boundary;
use crate::buffer::{find_bytes, StreamBuffer};
use crate::constants;
use crate::content_disposition::ContentDisposition;
use crate::helpers;

/// The parsed sub-header block of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FieldHeader {
    pub(crate) name: String,
    pub(crate) file_name: Option<String>,
    /// Declared type of a file field, lower-cased, parameters stripped. Empty
    /// when absent.
    pub(crate) content_type: String,
    /// `charset` parameter of a text field's `Content-Type`.
    pub(crate) charset: Option<String>,
}

impl FieldHeader {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    /// Parses header lines terminated by an empty line.
    pub fn parse(block: &[u8]) -> crate::Result<FieldHeader> {
        let mut headers = [httparse::EMPTY_HEADER; constants::MAX_HEADERS];

        let headers = match httparse::parse_headers(block, &mut headers) {
            Ok(httparse::Status::Complete((_, raw_headers))) => {
                helpers::convert_raw_headers_to_header_map(raw_headers)?
            }
            Ok(httparse::Status::Partial) => {
                return Err(crate::Error::malformed("failed to read field complete headers"));
            }
            Err(err) => return Err(crate::Error::ReadHeaderFailed(err)),
        };

        let disposition = ContentDisposition::parse(&headers)?;

        let (content_type, charset) = if disposition.file_name.is_some() {
            (declared_content_type(&headers), None)
        } else {
            (String::new(), declared_charset(&headers))
        };

        Ok(FieldHeader {
            name: disposition.field_name,
            file_name: disposition.file_name,
            content_type,
            charset,
        })
    }
}

fn declared_content_type(headers: &HeaderMap) -> String {
    headers
        .get(header::CONTENT_TYPE)
        .map(|val| {
            let essence = val.as_bytes().split(|b| *b == b';').next().unwrap_or_default();
            helpers::utf8_lossy(essence).trim().to_ascii_lowercase()
        })
        .unwrap_or_default()
}

fn declared_charset(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|val| val.to_str().ok())
        .and_then(|val| val.parse::<mime::Mime>().ok())
        .and_then(|m| m.get_param(mime::CHARSET).map(|charset| charset.as_str().to_owned()))
}

/// Consumes one field's delimiter line and sub-header block from the buffer.
///
/// The buffer must be positioned at a delimiter that is not the terminal one.
pub(crate) fn read_field_header<R: Read>(
    buffer: &mut StreamBuffer<R>,
    boundary: &Boundary,
) -> crate::Result<FieldHeader> {
    let idx = buffer
        .read_until_within(constants::CRLF_CRLF.as_bytes(), constants::MAX_HEADER_BLOCK_SIZE)?
        .ok_or_else(|| {
            crate::Error::malformed(format!(
                "field header block exceeds {} bytes",
                constants::MAX_HEADER_BLOCK_SIZE
            ))
        })?;

    let block = buffer.consume_until(idx, constants::CRLF_CRLF.len());
    let headers_start = skip_delimiter_line(&block, boundary)?;

    FieldHeader::parse(&block[headers_start..])
}

/// Returns the offset just past the `--boundary[padding]\r\n` line.
fn skip_delimiter_line(block: &[u8], boundary: &Boundary) -> crate::Result<usize> {
    let line_end = find_bytes(block, constants::CRLF.as_bytes())
        .ok_or_else(|| crate::Error::malformed("expected a boundary delimiter line"))?;

    match block[..line_end].strip_prefix(boundary.delimiter()) {
        Some(padding) if padding.iter().all(|b| *b == b' ' || *b == b'\t') => Ok(line_end + constants::CRLF.len()),
        _ => Err(crate::Error::malformed("expected a boundary delimiter line")),
    }
}
