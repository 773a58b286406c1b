use std::io::Read;

use crate::buffer::StreamBuffer;
use crate::constants;

/// Parses the `Content-Type` header to extract the boundary value.
///
/// The header is parsed as a mime type first; values `mime` rejects are
/// scanned for a raw `boundary=` parameter instead. The media type itself is
/// not checked here, callers pick the decoder from it.
///
/// # Examples
///
/// ```
/// let boundary = formdec::parse_boundary("multipart/form-data; boundary=ABCDEFG").unwrap();
/// assert_eq!(boundary, "ABCDEFG");
///
/// assert!(formdec::parse_boundary("text/plain").is_err());
/// ```
pub fn parse_boundary<T: AsRef<str>>(content_type: T) -> crate::Result<String> {
    let content_type = content_type.as_ref();

    let boundary = match content_type.parse::<mime::Mime>() {
        Ok(m) => m
            .get_param(mime::BOUNDARY)
            .map(|name| name.as_str().trim_matches('"').to_owned()),
        Err(_) => scan_boundary_param(content_type),
    };

    boundary
        .filter(|boundary| !boundary.is_empty())
        .ok_or(crate::Error::MissingBoundary)
}

/// Finds a `boundary=` parameter in a header `mime` could not parse. Only a
/// whole parameter name matches, so `xboundary=` is ignored.
fn scan_boundary_param(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|param| {
        let eq = param.find('=')?;
        if !param[..eq].trim().eq_ignore_ascii_case("boundary") {
            return None;
        }

        let value = param[eq + 1..].trim_start();
        let end = value.find(|c: char| c.is_ascii_whitespace()).unwrap_or_else(|| value.len());

        Some(value[..end].trim_matches('"').to_owned())
    })
}

/// The delimiter strings derived from one boundary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Boundary {
    /// `--` + token.
    delimiter: String,
    /// `delimiter` + `--`.
    terminal: String,
    /// CRLF + `delimiter`, the marker that ends a field body.
    body_delimiter: String,
}

impl Boundary {
    pub fn new<B: AsRef<str>>(token: B) -> Boundary {
        let delimiter = format!("{}{}", constants::BOUNDARY_EXT, token.as_ref());
        let terminal = format!("{}{}", delimiter, constants::BOUNDARY_EXT);
        let body_delimiter = format!("{}{}", constants::CRLF, delimiter);

        Boundary {
            delimiter,
            terminal,
            body_delimiter,
        }
    }

    pub fn from_content_type(content_type: &str) -> crate::Result<Boundary> {
        parse_boundary(content_type).map(Boundary::new)
    }

    pub fn delimiter(&self) -> &[u8] {
        self.delimiter.as_bytes()
    }

    pub fn terminal(&self) -> &[u8] {
        self.terminal.as_bytes()
    }

    pub fn body_delimiter(&self) -> &[u8] {
        self.body_delimiter.as_bytes()
    }

    /// Returns `false` once the buffer head is the terminal boundary.
    ///
    /// Must be called with the buffer positioned at a delimiter.
    pub fn has_more_fields<R: Read>(&self, buffer: &mut StreamBuffer<R>) -> crate::Result<bool> {
        buffer.ensure(self.terminal.len())?;
        Ok(!buffer.starts_with(self.terminal()))
    }
}
