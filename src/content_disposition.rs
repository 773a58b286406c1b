use crate::constants;
use crate::helpers;
use http::header::{self, HeaderMap};

/// The `name` and optional `filename` of a field's `Content-Disposition`.
///
/// A non-empty `filename` alone marks a field as a file upload; `filename=""`
/// is read as a text field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ContentDisposition {
    pub(crate) field_name: String,
    pub(crate) file_name: Option<String>,
}

impl ContentDisposition {
    pub fn parse(headers: &HeaderMap) -> crate::Result<ContentDisposition> {
        let content_disposition = headers
            .get(header::CONTENT_DISPOSITION)
            .map(|val| val.as_bytes())
            .ok_or_else(|| crate::Error::malformed("'Content-Disposition' missing in field header"))?;

        if !constants::CONTENT_DISPOSITION_TYPE_RE.is_match(content_disposition) {
            return Err(crate::Error::malformed("'Content-Disposition' is not form-data"));
        }

        let field_name = constants::CONTENT_DISPOSITION_FIELD_NAME_RE
            .captures(content_disposition)
            .and_then(|cap| cap.get(1))
            .map(|m| helpers::utf8_lossy(m.as_bytes()))
            .ok_or_else(|| crate::Error::malformed("'Content-Disposition' has no field name"))?;

        let file_name = constants::CONTENT_DISPOSITION_FILE_NAME_RE
            .captures(content_disposition)
            .and_then(|cap| cap.get(1))
            .map(|m| helpers::utf8_lossy(m.as_bytes()))
            .filter(|file_name| !file_name.is_empty());

        Ok(ContentDisposition { field_name, file_name })
    }
}
