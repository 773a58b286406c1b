use crate::constants;

/// Limits applied to a single decode call.
///
/// Files over [`max_file_size`](DecodeLimits::max_file_size) are still read
/// through but reported with [`UploadError::SizeExceeded`](crate::UploadError::SizeExceeded).
/// Files past [`max_file_count`](DecodeLimits::max_file_count) are parsed and
/// discarded, and the first `N` files are kept.
///
/// # Examples
///
/// ```
/// use formdec::DecodeLimits;
///
/// let limits = DecodeLimits::new()
///     .max_file_size(2 * 1024 * 1024)
///     .max_file_count(20)
///     .max_field_size(64 * 1024);
///
/// assert_eq!(limits.file_size(), 2 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    pub(crate) max_file_size: u64,
    pub(crate) max_file_count: usize,
    pub(crate) max_field_size: u64,
}

impl DecodeLimits {
    /// Creates limits with no restriction on file size, file count or text
    /// field size.
    pub fn new() -> DecodeLimits {
        DecodeLimits::default()
    }

    /// Sets the maximum size in bytes of one uploaded file.
    pub fn max_file_size(mut self, limit: u64) -> DecodeLimits {
        self.max_file_size = limit;
        self
    }

    /// Sets the maximum number of uploaded files kept per request.
    pub fn max_file_count(mut self, limit: usize) -> DecodeLimits {
        self.max_file_count = limit;
        self
    }

    /// Sets the maximum size in bytes of a text value held in memory.
    ///
    /// Unlike the file limits, exceeding it aborts decoding with
    /// [`Error::FieldSizeExceeded`](crate::Error::FieldSizeExceeded).
    pub fn max_field_size(mut self, limit: u64) -> DecodeLimits {
        self.max_field_size = limit;
        self
    }

    pub fn file_size(&self) -> u64 {
        self.max_file_size
    }

    pub fn file_count(&self) -> usize {
        self.max_file_count
    }

    pub fn field_size(&self) -> u64 {
        self.max_field_size
    }
}

impl Default for DecodeLimits {
    fn default() -> Self {
        DecodeLimits {
            max_file_size: constants::DEFAULT_MAX_FILE_SIZE,
            max_file_count: constants::DEFAULT_MAX_FILE_COUNT,
            max_field_size: constants::DEFAULT_MAX_FIELD_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unlimited() {
        let limits = DecodeLimits::default();
        assert_eq!(limits.file_size(), u64::MAX);
        assert_eq!(limits.file_count(), usize::MAX);
        assert_eq!(limits.field_size(), u64::MAX);
    }

    #[test]
    fn test_builder() {
        let limits = DecodeLimits::new().max_file_size(10).max_file_count(1).max_field_size(5);
        assert_eq!(limits.file_size(), 10);
        assert_eq!(limits.file_count(), 1);
        assert_eq!(limits.field_size(), 5);
    }
}
