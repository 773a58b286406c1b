use std::io::Read;

use crate::boundary::Boundary;
use crate::buffer::StreamBuffer;
use crate::constants;
use crate::header::FieldHeader;
use crate::temp::{TempFileGuard, TempStorage};
use crate::upload::{UploadError, UploadedFile};

/// Streams a file field's payload into a temp file and leaves the buffer at
/// the next delimiter.
///
/// At most one read chunk plus the delimiter length is held in memory. Once
/// the payload passes `max_file_size` nothing more is written, but the rest of
/// the payload is still consumed so the next field can be read. The temp file
/// is removed for every outcome other than a stored upload, including errors.
pub(crate) fn spool_file<R: Read>(
    buffer: &mut StreamBuffer<R>,
    boundary: &Boundary,
    field: &FieldHeader,
    max_file_size: u64,
    storage: &dyn TempStorage,
) -> crate::Result<UploadedFile> {
    let mut temp = TempFileGuard::create(storage)?;

    let delimiter = boundary.body_delimiter();
    let tail = delimiter.len() - 1;
    let mut size: u64 = 0;

    loop {
        if let Some(idx) = buffer.find(delimiter) {
            let chunk = buffer.consume_until(idx, constants::CRLF.len());
            write_bounded(&mut temp, &chunk[..idx], &mut size, max_file_size)?;
            break;
        }

        // Keep a possible partial delimiter at the end of the buffer.
        if buffer.len() > tail {
            let chunk = buffer.consume_until(buffer.len() - tail, 0);
            write_bounded(&mut temp, &chunk, &mut size, max_file_size)?;
        }

        if buffer.fill()? == 0 {
            return Err(crate::Error::Truncated);
        }
    }

    let file_name = field.file_name.clone().unwrap_or_default();
    let content_type = field.content_type.clone();

    if size == 0 {
        trace!("file field '{}' is empty", field.name);
        return Ok(UploadedFile::failed(file_name, content_type, UploadError::NoFile));
    }

    if size > max_file_size {
        trace!(
            "file field '{}' is {} bytes, over the {} byte limit",
            field.name,
            size,
            max_file_size
        );
        return Ok(UploadedFile::failed(file_name, content_type, UploadError::SizeExceeded));
    }

    let path = temp.keep()?;
    trace!("spooled file field '{}' ({} bytes) to {}", field.name, size, path.display());

    Ok(UploadedFile::stored(file_name, content_type, size, path))
}

fn write_bounded(temp: &mut TempFileGuard<'_>, bytes: &[u8], size: &mut u64, max_file_size: u64) -> crate::Result<()> {
    let next = *size + bytes.len() as u64;

    if next <= max_file_size {
        temp.write_all(bytes)?;
    }

    *size = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    struct ScratchStorage {
        dir: PathBuf,
    }

    impl ScratchStorage {
        fn new(name: &str) -> ScratchStorage {
            let dir = std::env::temp_dir().join(format!("formdec-spool-{}-{}", name, std::process::id()));
            fs::create_dir_all(&dir).unwrap();
            ScratchStorage { dir }
        }

        fn entries(&self) -> usize {
            fs::read_dir(&self.dir).unwrap().count()
        }
    }

    impl TempStorage for ScratchStorage {
        fn create(&self) -> std::io::Result<(PathBuf, fs::File)> {
            let path = self.dir.join("upload.tmp");
            let file = fs::File::create(&path)?;
            Ok((path, file))
        }
    }

    impl Drop for ScratchStorage {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    /// Hands out files opened read-only, so every write fails.
    struct ReadOnlyStorage(ScratchStorage);

    impl TempStorage for ReadOnlyStorage {
        fn create(&self) -> std::io::Result<(PathBuf, fs::File)> {
            let (path, _) = self.0.create()?;
            let file = fs::File::open(&path)?;
            Ok((path, file))
        }
    }

    fn file_field() -> FieldHeader {
        FieldHeader {
            name: "f".to_owned(),
            file_name: Some("x.txt".to_owned()),
            content_type: "text/plain".to_owned(),
            charset: None,
        }
    }

    #[test]
    fn test_spool_file_across_chunk_sizes() {
        let boundary = Boundary::new("B");
        let data = b"HELLO\r\n-\r\n--X\r\nWORLD\r\n--B--\r\n";

        for read_size in &[1, 2, 5, 8192] {
            let storage = ScratchStorage::new(&format!("chunks-{}", read_size));
            let mut buffer = StreamBuffer::new(&data[..], *read_size);

            let file = spool_file(&mut buffer, &boundary, &file_field(), u64::MAX, &storage).unwrap();
            assert!(file.is_ok());
            assert_eq!(file.size(), 20);
            assert_eq!(file.file_name(), "x.txt");
            assert_eq!(file.content_type(), "text/plain");
            assert_eq!(fs::read(file.path().unwrap()).unwrap(), b"HELLO\r\n-\r\n--X\r\nWORLD");

            buffer.ensure(boundary.terminal().len()).unwrap();
            assert!(buffer.starts_with(boundary.terminal()));
        }
    }

    #[test]
    fn test_spool_empty_file() {
        let storage = ScratchStorage::new("empty");
        let boundary = Boundary::new("B");
        let mut buffer = StreamBuffer::new(&b"\r\n--B--\r\n"[..], 8192);

        let file = spool_file(&mut buffer, &boundary, &file_field(), u64::MAX, &storage).unwrap();
        assert_eq!(file.error(), UploadError::NoFile);
        assert_eq!(file.size(), 0);
        assert_eq!(file.path(), None);
        assert_eq!(storage.entries(), 0);
    }

    #[test]
    fn test_spool_file_too_large() {
        let storage = ScratchStorage::new("large");
        let boundary = Boundary::new("B");
        let mut buffer = StreamBuffer::new(&b"0123456789\r\n--B--\r\n"[..], 3);

        let file = spool_file(&mut buffer, &boundary, &file_field(), 9, &storage).unwrap();
        assert_eq!(file.error(), UploadError::SizeExceeded);
        assert_eq!(file.path(), None);
        assert_eq!(storage.entries(), 0);

        buffer.ensure(boundary.terminal().len()).unwrap();
        assert!(buffer.starts_with(boundary.terminal()));
    }

    #[test]
    fn test_spool_file_at_limit() {
        let storage = ScratchStorage::new("limit");
        let boundary = Boundary::new("B");
        let mut buffer = StreamBuffer::new(&b"0123456789\r\n--B--\r\n"[..], 4);

        let file = spool_file(&mut buffer, &boundary, &file_field(), 10, &storage).unwrap();
        assert!(file.is_ok());
        assert_eq!(file.size(), 10);
    }

    #[test]
    fn test_spool_truncated_removes_temp_file() {
        let storage = ScratchStorage::new("truncated");
        let boundary = Boundary::new("B");
        let mut buffer = StreamBuffer::new(&b"partial upload\r\n--"[..], 4);

        let result = spool_file(&mut buffer, &boundary, &file_field(), u64::MAX, &storage);
        assert_eq!(result, Err(crate::Error::Truncated));
        assert_eq!(storage.entries(), 0);
    }

    #[test]
    fn test_spool_write_failure_removes_temp_file() {
        let storage = ReadOnlyStorage(ScratchStorage::new("write-failure"));
        let boundary = Boundary::new("B");
        let mut buffer = StreamBuffer::new(&b"HELLO\r\n--B--\r\n"[..], 8192);

        let result = spool_file(&mut buffer, &boundary, &file_field(), u64::MAX, &storage);
        assert!(matches!(result, Err(crate::Error::IoFailure(_))));
        assert_eq!(storage.0.entries(), 0);
    }
}
