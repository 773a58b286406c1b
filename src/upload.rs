use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// The per-file outcome of spooling an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadError {
    /// The file was stored.
    None,
    /// The field carried a file name but no content.
    NoFile,
    /// The content was larger than
    /// [`DecodeLimits::max_file_size`](crate::DecodeLimits::max_file_size).
    SizeExceeded,
}

impl UploadError {
    /// The matching PHP `UPLOAD_ERR_*` code.
    pub fn php_code(self) -> u8 {
        match self {
            UploadError::None => 0,
            UploadError::SizeExceeded => 1,
            UploadError::NoFile => 4,
        }
    }
}

/// A file field spooled to temporary storage.
///
/// The caller owns the file at [`path`](UploadedFile::path) and is expected
/// to [`persist`](UploadedFile::persist) or [`remove`](UploadedFile::remove)
/// it. Failed uploads never have a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub(crate) file_name: String,
    pub(crate) content_type: String,
    pub(crate) size: u64,
    pub(crate) path: Option<PathBuf>,
    pub(crate) error: UploadError,
}

impl UploadedFile {
    pub(crate) fn stored(file_name: String, content_type: String, size: u64, path: PathBuf) -> UploadedFile {
        UploadedFile {
            file_name,
            content_type,
            size,
            path: Some(path),
            error: UploadError::None,
        }
    }

    pub(crate) fn failed(file_name: String, content_type: String, error: UploadError) -> UploadedFile {
        UploadedFile {
            file_name,
            content_type,
            size: 0,
            path: None,
            error,
        }
    }

    /// The file name as sent by the client.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The lower-cased, client-declared content type, empty if none was sent.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn error(&self) -> UploadError {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error == UploadError::None
    }

    /// Moves the stored file to `to`.
    pub fn persist<P: AsRef<Path>>(&mut self, to: P) -> io::Result<()> {
        let from = self
            .path
            .as_deref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "upload has no stored file"))?;
        let to = to.as_ref();

        if fs::rename(from, to).is_err() {
            // Likely a cross-device move.
            fs::copy(from, to)?;
            fs::remove_file(from)?;
        }

        self.path = Some(to.to_owned());
        Ok(())
    }

    /// Deletes the stored file, if any.
    pub fn remove(self) -> io::Result<()> {
        match self.path {
            Some(path) => fs::remove_file(path),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_php_codes() {
        assert_eq!(UploadError::None.php_code(), 0);
        assert_eq!(UploadError::SizeExceeded.php_code(), 1);
        assert_eq!(UploadError::NoFile.php_code(), 4);
    }

    #[test]
    fn test_failed_upload_has_no_path() {
        let file = UploadedFile::failed("x.txt".to_owned(), "text/plain".to_owned(), UploadError::NoFile);
        assert!(!file.is_ok());
        assert_eq!(file.size(), 0);
        assert_eq!(file.path(), None);
        assert!(file.remove().is_ok());
    }

    #[test]
    fn test_persist_and_remove() {
        let dir = std::env::temp_dir().join(format!("formdec-upload-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let from = dir.join("spooled.tmp");
        fs::write(&from, b"HELLO").unwrap();

        let mut file = UploadedFile::stored("x.txt".to_owned(), "text/plain".to_owned(), 5, from.clone());
        let to = dir.join("kept.txt");
        file.persist(&to).unwrap();

        assert!(!from.exists());
        assert_eq!(file.path(), Some(to.as_path()));
        assert_eq!(fs::read(&to).unwrap(), b"HELLO");

        file.remove().unwrap();
        assert!(!to.exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
