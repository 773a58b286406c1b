use std::fmt::{self, Debug, Display, Formatter};

use derive_more::Display;
use http::StatusCode;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A set of errors that can abort decoding of a form body.
///
/// Per-file outcomes such as an empty or oversized upload are not errors; they
/// are reported through [`UploadedFile::error`](crate::UploadedFile::error) so
/// that one bad upload does not fail the whole request.
#[derive(Display)]
#[non_exhaustive]
pub enum Error {
    /// No boundary found in the `Content-Type` header.
    #[display(fmt = "missing value for 'boundary' in content-type header")]
    MissingBoundary,

    /// Failed to convert the `Content-Type` to [`mime::Mime`] type.
    #[display(fmt = "failed to convert Content-Type to `mime::Mime` type: {}", _0)]
    DecodeContentType(mime::FromStrError),

    /// The `Content-Type` is neither multipart nor urlencoded form data.
    #[display(fmt = "unsupported content type for form decoding: {}", _0)]
    UnsupportedContentType(String),

    /// The stream ended before an expected delimiter or header terminator.
    #[display(fmt = "invalid multipart data encountered; end of content was reached before expected")]
    Truncated,

    /// A field's sub-header lacks a parsable `Content-Disposition`.
    #[display(fmt = "invalid multipart data; {}", reason)]
    MalformedHeader { reason: String },

    /// Failed to tokenise a field's sub-header block.
    #[display(fmt = "failed to read headers: {}", _0)]
    ReadHeaderFailed(httparse::Error),

    /// Failed to decode the field's raw header name to
    /// [`HeaderName`](http::header::HeaderName) type.
    #[display(fmt = "failed to decode field's raw header name: {:?} {}", name, cause)]
    DecodeHeaderName { name: String, cause: BoxError },

    /// Failed to decode the field's raw header value to
    /// [`HeaderValue`](http::header::HeaderValue) type.
    #[display(fmt = "failed to decode field's raw header value: {}", cause)]
    DecodeHeaderValue { value: Vec<u8>, cause: BoxError },

    /// An in-memory field value exceeded the maximum size limit.
    #[display(
        fmt = "field '{}' exceeded the maximum size limit: {} bytes",
        "field_name.as_deref().unwrap_or(\"<unknown>\")",
        limit
    )]
    FieldSizeExceeded { limit: u64, field_name: Option<String> },

    /// Reading the source or writing a temp file failed.
    #[display(fmt = "i/o failure: {}", _0)]
    IoFailure(std::io::Error),

    /// Failed to decode the field data as `JSON` in
    /// [`FormData::json`](crate::FormData::json).
    #[cfg(feature = "json")]
    #[cfg_attr(nightly, doc(cfg(feature = "json")))]
    #[display(fmt = "failed to decode field data as JSON: {}", _0)]
    DecodeJson(serde_json::Error),
}

impl Error {
    pub(crate) fn malformed<R: Into<String>>(reason: R) -> Error {
        Error::MalformedHeader { reason: reason.into() }
    }

    /// Returns `true` for every variant describing an unreadable field header.
    pub fn is_malformed_header(&self) -> bool {
        matches!(
            self,
            Error::MalformedHeader { .. }
                | Error::ReadHeaderFailed(_)
                | Error::DecodeHeaderName { .. }
                | Error::DecodeHeaderValue { .. }
        )
    }

    /// The response status a caller would typically answer with.
    ///
    /// Decoding never retries: the stream position is lost once an error is
    /// raised, so every variant maps to a final status.
    pub fn status_hint(&self) -> StatusCode {
        match self {
            Error::FieldSizeExceeded { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::UnsupportedContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::IoFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoFailure(err)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(self, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoFailure(err) => Some(err),
            Error::ReadHeaderFailed(err) => Some(err),
            Error::DecodeContentType(err) => Some(err),
            _ => None,
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string().eq(&other.to_string())
    }
}

impl Eq for Error {}
