use std::io::Read;

use crate::{parse_boundary, DecodeLimits, FormData, MultipartDecoder, UrlEncodedDecoder};

/// A body decoder picked from the request's `Content-Type`.
///
/// The multipart boundary is taken from the same header when the decoder is
/// selected, so decoding only needs the body.
///
/// # Examples
///
/// ```
/// use formdec::{DecodeLimits, FormDecoder};
///
/// let content_type = "application/x-www-form-urlencoded";
/// let decoder = FormDecoder::for_content_type(content_type, DecodeLimits::default()).unwrap();
///
/// let form = decoder.decode(&b"q=rust+lang"[..], None).unwrap();
/// assert_eq!(form.text("q"), Some("rust lang"));
/// ```
pub enum FormDecoder {
    Multipart { decoder: MultipartDecoder, boundary: String },
    UrlEncoded(UrlEncodedDecoder),
}

impl FormDecoder {
    /// Selects the decoder for `content_type`.
    ///
    /// Fails with [`Error::UnsupportedContentType`](crate::Error::UnsupportedContentType)
    /// for anything but multipart or urlencoded form data, and with
    /// [`Error::MissingBoundary`](crate::Error::MissingBoundary) for multipart
    /// without a boundary.
    pub fn for_content_type(content_type: &str, limits: DecodeLimits) -> crate::Result<FormDecoder> {
        let m = content_type
            .parse::<mime::Mime>()
            .map_err(crate::Error::DecodeContentType)?;

        if m.type_() == mime::MULTIPART && m.subtype() == mime::FORM_DATA {
            Ok(FormDecoder::Multipart {
                decoder: MultipartDecoder::new(limits),
                boundary: parse_boundary(content_type)?,
            })
        } else if m.type_() == mime::APPLICATION && m.subtype() == mime::WWW_FORM_URLENCODED {
            Ok(FormDecoder::UrlEncoded(UrlEncodedDecoder::new(limits)))
        } else {
            Err(crate::Error::UnsupportedContentType(m.essence_str().to_owned()))
        }
    }

    pub fn decode<R: Read>(&self, source: R, content_length: Option<u64>) -> crate::Result<FormData> {
        match self {
            FormDecoder::Multipart { decoder, boundary } => decoder.decode_boundary(source, boundary, content_length),
            FormDecoder::UrlEncoded(decoder) => decoder.decode(source, content_length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_content_type() {
        let limits = DecodeLimits::default();

        match FormDecoder::for_content_type("multipart/form-data; boundary=B", limits) {
            Ok(FormDecoder::Multipart { boundary, .. }) => assert_eq!(boundary, "B"),
            _ => panic!("expected a multipart decoder"),
        }
        assert!(matches!(
            FormDecoder::for_content_type("multipart/form-data", limits),
            Err(crate::Error::MissingBoundary)
        ));
        assert!(matches!(
            FormDecoder::for_content_type("Application/X-WWW-Form-Urlencoded; charset=utf-8", limits),
            Ok(FormDecoder::UrlEncoded(_))
        ));
        assert!(matches!(
            FormDecoder::for_content_type("text/plain", limits),
            Err(crate::Error::UnsupportedContentType(_))
        ));
        assert!(matches!(
            FormDecoder::for_content_type("not a mime", limits),
            Err(crate::Error::DecodeContentType(_))
        ));
    }

    #[test]
    fn test_decode_dispatch() {
        let content_type = "multipart/form-data; boundary=B";
        let decoder = FormDecoder::for_content_type(content_type, DecodeLimits::default()).unwrap();
        let body = "--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue1\r\n--B--\r\n";

        let form = decoder.decode(body.as_bytes(), None).unwrap();
        assert_eq!(form.text("a"), Some("value1"));
    }
}
