use lazy_static::lazy_static;
use regex::bytes::Regex;

pub(crate) const DEFAULT_MAX_FILE_SIZE: u64 = std::u64::MAX;
pub(crate) const DEFAULT_MAX_FILE_COUNT: usize = std::usize::MAX;
pub(crate) const DEFAULT_MAX_FIELD_SIZE: u64 = std::u64::MAX;

pub(crate) const DEFAULT_READ_SIZE: usize = 8192;

pub(crate) const MAX_HEADERS: usize = 32;
pub(crate) const MAX_HEADER_BLOCK_SIZE: usize = 8 * 1024;
pub(crate) const BOUNDARY_EXT: &str = "--";
pub(crate) const CRLF: &str = "\r\n";
pub(crate) const CRLF_CRLF: &str = "\r\n\r\n";

pub(crate) const TEMP_FILE_PREFIX: &str = "uploaded-file-";

lazy_static! {
    pub(crate) static ref CONTENT_DISPOSITION_TYPE_RE: Regex = Regex::new(r#"(?i-u)^\s*form-data\s*(?:;|$)"#).unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FIELD_NAME_RE: Regex =
        Regex::new(r#"(?i-u);\s*name\s*=\s*"([^"]*)""#).unwrap();
    pub(crate) static ref CONTENT_DISPOSITION_FILE_NAME_RE: Regex =
        Regex::new(r#"(?i-u);\s*filename\s*=\s*"([^"]*)""#).unwrap();
}
