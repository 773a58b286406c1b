//! A blocking, streaming decoder for `multipart/form-data` and
//! `application/x-www-form-urlencoded` request bodies.
//!
//! Multipart bodies are read chunk by chunk from any [`std::io::Read`] source.
//! Text fields are collected into a [`FormData`]; file fields are streamed
//! straight into temp files and returned as [`UploadedFile`]s, so memory use
//! stays bounded by the read size no matter how large an upload is.
//!
//! # Examples
//!
//! ```
//! use formdec::{DecodeLimits, FormDecoder, UploadError};
//!
//! # fn run() -> formdec::Result<()> {
//! let content_type = "multipart/form-data; boundary=X-BOUNDARY";
//! let body = "--X-BOUNDARY\r\n\
//!             Content-Disposition: form-data; name=\"title\"\r\n\r\n\
//!             Holiday\r\n\
//!             --X-BOUNDARY\r\n\
//!             Content-Disposition: form-data; name=\"photo\"; filename=\"beach.txt\"\r\n\
//!             Content-Type: text/plain\r\n\r\n\
//!             sand and sea\r\n\
//!             --X-BOUNDARY--\r\n";
//!
//! let limits = DecodeLimits::new().max_file_size(1024).max_file_count(4);
//! let decoder = FormDecoder::for_content_type(content_type, limits)?;
//! let form = decoder.decode(body.as_bytes(), Some(body.len() as u64))?;
//!
//! assert_eq!(form.text("title"), Some("Holiday"));
//!
//! let photo = form.file("photo").unwrap();
//! assert_eq!(photo.error(), UploadError::None);
//! assert_eq!(photo.size(), 12);
//!
//! // The temp file now belongs to the caller.
//! photo.clone().remove()?;
//! # Ok(())
//! # }
//! # run().unwrap();
//! ```
//!
//! # Optional features
//!
//! * `json`: [`FormData::json`] parses a text field as JSON.
//! * `log`: emits `trace` and `warn` records through the `log` facade.

#[cfg(feature = "log")]
macro_rules! trace {
    ($($t:tt)*) => (log::trace!($($t)*))
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

#[cfg(feature = "log")]
macro_rules! warn {
    ($($t:tt)*) => (log::warn!($($t)*))
}

#[cfg(not(feature = "log"))]
macro_rules! warn {
    ($($t:tt)*) => {{
        if false {
            let _ = format_args!($($t)*);
        }
    }};
}

pub use boundary::parse_boundary;
pub use decoder::FormDecoder;
pub use error::Error;
pub use form_data::{FormData, Value};
pub use limits::DecodeLimits;
pub use multipart::MultipartDecoder;
pub use temp::{SystemTempStorage, TempFileGuard, TempStorage};
pub use upload::{UploadError, UploadedFile};
pub use urlencoded::{parse_query_string, UrlEncodedDecoder};

mod boundary;
mod buffer;
mod constants;
mod content_disposition;
mod decoder;
mod error;
mod field;
mod form_data;
mod header;
mod helpers;
mod limits;
mod multipart;
mod spool;
mod state;
mod temp;
mod upload;
mod urlencoded;

/// A Result type often returned from methods that can have `formdec` errors.
pub type Result<T> = std::result::Result<T, Error>;
