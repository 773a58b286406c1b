use std::convert::TryFrom;
use std::io::Read;

use encoding_rs::{Encoding, UTF_8};

use crate::boundary::Boundary;
use crate::buffer::StreamBuffer;
use crate::constants;
use crate::header::FieldHeader;

/// Reads a text field's value and leaves the buffer at the next delimiter.
///
/// The line break in front of the delimiter belongs to the framing, not to the
/// value. Values longer than `limit` bytes abort with
/// [`Error::FieldSizeExceeded`](crate::Error::FieldSizeExceeded).
pub(crate) fn read_text_value<R: Read>(
    buffer: &mut StreamBuffer<R>,
    boundary: &Boundary,
    field: &FieldHeader,
    limit: u64,
) -> crate::Result<String> {
    let max_offset = usize::try_from(limit).unwrap_or(usize::MAX);

    let idx = match buffer.read_until_within(boundary.body_delimiter(), max_offset)? {
        Some(idx) if idx <= max_offset => idx,
        _ => {
            return Err(crate::Error::FieldSizeExceeded {
                limit,
                field_name: Some(field.name.clone()),
            });
        }
    };

    let mut raw = buffer.consume_until(idx, constants::CRLF.len());
    raw.truncate(idx);

    Ok(decode_text(&raw, field.charset.as_deref()))
}

/// Decodes `bytes` with the named charset, falling back to UTF-8 for unknown
/// or missing labels.
pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}
