use std::io::Read;

use percent_encoding::percent_decode;

use crate::{DecodeLimits, FormData, Value};

/// Decodes `application/x-www-form-urlencoded` bodies into [`FormData`].
///
/// The whole body is read into memory, bounded by
/// [`DecodeLimits::max_field_size`].
#[derive(Debug, Clone, Default)]
pub struct UrlEncodedDecoder {
    limits: DecodeLimits,
}

impl UrlEncodedDecoder {
    pub fn new(limits: DecodeLimits) -> UrlEncodedDecoder {
        UrlEncodedDecoder { limits }
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    pub fn decode<R: Read>(&self, source: R, content_length: Option<u64>) -> crate::Result<FormData> {
        let limit = self.limits.max_field_size;
        let mut body = Vec::new();

        source.take(limit.saturating_add(1)).read_to_end(&mut body)?;

        if body.len() as u64 > limit {
            return Err(crate::Error::FieldSizeExceeded { limit, field_name: None });
        }

        trace!(
            "decoding urlencoded body of {} bytes, declared length {:?}",
            body.len(),
            content_length
        );

        Ok(parse_query_string(&body))
    }
}

/// Splits a query string into decoded key/value pairs and accumulates them.
///
/// # Examples
///
/// ```
/// let form = formdec::parse_query_string(b"a=1&a=2&user%5Bname%5D=ann+lee");
///
/// assert_eq!(form.get("a").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
/// assert_eq!(form.get("user").and_then(|v| v.get("name")).and_then(|v| v.as_text()), Some("ann lee"));
/// ```
pub fn parse_query_string(input: &[u8]) -> FormData {
    let mut form = FormData::new();

    for pair in input.split(|b| *b == b'&').filter(|pair| !pair.is_empty()) {
        let (key, value) = decode_pair(pair);
        form.add_value(&key, Value::Text(value));
    }

    form
}

fn decode_pair(pair: &[u8]) -> (String, String) {
    match pair.iter().position(|b| *b == b'=') {
        Some(idx) => (decode_component(&pair[..idx]), decode_component(&pair[idx + 1..])),
        None => (decode_component(pair), String::new()),
    }
}

fn decode_component(raw: &[u8]) -> String {
    let raw: Vec<u8> = raw.iter().map(|b| if *b == b'+' { b' ' } else { *b }).collect();
    percent_decode(&raw).decode_utf8_lossy().into_owned()
}
