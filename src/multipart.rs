use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::boundary::Boundary;
use crate::buffer::StreamBuffer;
use crate::field::read_text_value;
use crate::header::read_field_header;
use crate::spool::spool_file;
use crate::state::DecodeStage;
use crate::temp::{SystemTempStorage, TempStorage};
use crate::{constants, DecodeLimits, FormData, UploadedFile, Value};

/// Decodes `multipart/form-data` bodies from a blocking byte source.
///
/// Text fields are collected in memory; file fields are streamed to temp
/// storage and returned as [`UploadedFile`]s whose files the caller then owns.
/// A decoder holds configuration only, so one instance can serve any number of
/// sequential or concurrent decode calls.
///
/// # Examples
///
/// ```
/// use formdec::{DecodeLimits, MultipartDecoder};
///
/// let body = "--X-BOUNDARY\r\nContent-Disposition: form-data; name=\"my_text_field\"\r\n\r\nabcd\r\n--X-BOUNDARY--\r\n";
/// let decoder = MultipartDecoder::new(DecodeLimits::default());
///
/// let form = decoder
///     .decode(body.as_bytes(), "multipart/form-data; boundary=X-BOUNDARY", Some(body.len() as u64))
///     .unwrap();
///
/// assert_eq!(form.text("my_text_field"), Some("abcd"));
/// ```
pub struct MultipartDecoder {
    limits: DecodeLimits,
    read_size: usize,
    storage: Arc<dyn TempStorage + Send + Sync>,
}

impl MultipartDecoder {
    pub fn new(limits: DecodeLimits) -> MultipartDecoder {
        MultipartDecoder {
            limits,
            read_size: constants::DEFAULT_READ_SIZE,
            storage: Arc::new(SystemTempStorage::default()),
        }
    }

    /// Sets how many bytes are requested from the source per read. Values
    /// below 1 are treated as 1.
    pub fn with_read_size(mut self, read_size: usize) -> MultipartDecoder {
        self.read_size = read_size.max(1);
        self
    }

    /// Replaces the storage uploaded files are spooled to.
    pub fn with_temp_storage<T>(mut self, storage: T) -> MultipartDecoder
    where
        T: TempStorage + Send + Sync + 'static,
    {
        self.storage = Arc::new(storage);
        self
    }

    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decodes the body read from `source`.
    ///
    /// The boundary is taken from `content_type` before anything is read.
    /// `content_length` is informational only; the boundaries alone frame the
    /// body. The source is dropped before this returns.
    pub fn decode<R: Read>(&self, source: R, content_type: &str, content_length: Option<u64>) -> crate::Result<FormData> {
        let boundary = Boundary::from_content_type(content_type)?;
        trace!(
            "decoding multipart body, boundary {:?}, declared length {:?}",
            String::from_utf8_lossy(boundary.delimiter()),
            content_length
        );

        self.decode_with_boundary(source, boundary)
    }

    /// Decodes the body read from `source` with an already parsed boundary
    /// token, as returned by [`parse_boundary`](crate::parse_boundary).
    pub fn decode_boundary<R: Read>(
        &self,
        source: R,
        boundary: &str,
        content_length: Option<u64>,
    ) -> crate::Result<FormData> {
        if boundary.is_empty() {
            return Err(crate::Error::MissingBoundary);
        }

        trace!("decoding multipart body, boundary {:?}, declared length {:?}", boundary, content_length);
        self.decode_with_boundary(source, Boundary::new(boundary))
    }

    /// Decodes a body stored at `path`.
    pub fn decode_path<P: AsRef<Path>>(
        &self,
        path: P,
        content_type: &str,
        content_length: Option<u64>,
    ) -> crate::Result<FormData> {
        let boundary = Boundary::from_content_type(content_type)?;
        let file = File::open(path.as_ref())?;
        trace!(
            "decoding multipart body from {}, declared length {:?}",
            path.as_ref().display(),
            content_length
        );

        self.decode_with_boundary(file, boundary)
    }

    fn decode_with_boundary<R: Read>(&self, source: R, boundary: Boundary) -> crate::Result<FormData> {
        let mut buffer = StreamBuffer::new(source, self.read_size);
        let mut form = FormData::new();

        match self.run(&mut buffer, &boundary, &mut form) {
            Ok(()) => {
                trace!("decoded {} fields, {} files seen", form.len(), form.file_count());
                Ok(form)
            }
            Err(err) => {
                trace!("multipart decoding failed: {}", err);
                for file in form.files() {
                    self.discard(file);
                }
                Err(err)
            }
        }
    }

    fn run<R: Read>(&self, buffer: &mut StreamBuffer<R>, boundary: &Boundary, form: &mut FormData) -> crate::Result<()> {
        let mut stage = DecodeStage::FindingFirstBoundary;

        loop {
            stage = match stage {
                DecodeStage::FindingFirstBoundary => {
                    let idx = buffer.read_until(boundary.delimiter())?;
                    if idx > 0 {
                        trace!("skipping {} bytes of preamble", idx);
                    }
                    buffer.consume_until(idx, 0);
                    DecodeStage::ScanningForMoreFields
                }
                DecodeStage::ScanningForMoreFields => {
                    if boundary.has_more_fields(buffer)? {
                        DecodeStage::ParsingHeader
                    } else {
                        DecodeStage::Done
                    }
                }
                DecodeStage::ParsingHeader => {
                    let field = read_field_header(buffer, boundary)?;
                    trace!("field '{}', file name {:?}", field.name, field.file_name);

                    if field.is_file() {
                        DecodeStage::SpoolingFile(field)
                    } else {
                        DecodeStage::ExtractingValue(field)
                    }
                }
                DecodeStage::ExtractingValue(field) => {
                    let value = read_text_value(buffer, boundary, &field, self.limits.max_field_size)?;
                    form.add_value(&field.name, Value::Text(value));
                    DecodeStage::ScanningForMoreFields
                }
                DecodeStage::SpoolingFile(field) => {
                    let file = spool_file(buffer, boundary, &field, self.limits.max_file_size, &*self.storage)?;

                    if form.file_count() < self.limits.max_file_count {
                        form.add_value(&field.name, Value::File(file));
                    } else {
                        trace!(
                            "dropping file field '{}', over the limit of {} files",
                            field.name,
                            self.limits.max_file_count
                        );
                        self.discard(&file);
                    }

                    form.record_file();
                    DecodeStage::ScanningForMoreFields
                }
                DecodeStage::Done => return Ok(()),
            };
        }
    }

    fn discard(&self, file: &UploadedFile) {
        if let Some(path) = file.path() {
            if let Err(err) = self.storage.remove(path) {
                warn!("failed to remove temp file {}: {}", path.display(), err);
            }
        }
    }
}

impl Default for MultipartDecoder {
    fn default() -> Self {
        MultipartDecoder::new(DecodeLimits::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UploadError;
    use std::fs;
    use std::path::PathBuf;

    const CONTENT_TYPE: &str = "multipart/form-data; boundary=B";

    fn scratch_storage(name: &str) -> SystemTempStorage {
        let dir = std::env::temp_dir().join(format!("formdec-multipart-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        SystemTempStorage::in_dir(dir)
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir).unwrap().map(|entry| entry.unwrap().path()).collect()
    }

    #[test]
    fn test_decode_text_field() {
        let body = "--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nvalue1\r\n--B--\r\n";
        let form = MultipartDecoder::default()
            .decode(body.as_bytes(), CONTENT_TYPE, None)
            .unwrap();

        assert_eq!(form.len(), 1);
        assert_eq!(form.get("a"), Some(&Value::Text("value1".to_owned())));
        assert_eq!(form.file_count(), 0);
    }

    #[test]
    fn test_decode_empty_body() {
        let form = MultipartDecoder::default()
            .decode(&b"--B--\r\n"[..], CONTENT_TYPE, None)
            .unwrap();
        assert!(form.is_empty());
    }

    #[test]
    fn test_decode_skips_preamble() {
        let body = "This is a preamble.\r\n--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nx\r\n--B--";
        let form = MultipartDecoder::default()
            .with_read_size(3)
            .decode(body.as_bytes(), CONTENT_TYPE, None)
            .unwrap();
        assert_eq!(form.text("a"), Some("x"));
    }

    #[test]
    fn test_empty_file_name_is_text() {
        let body = "--B\r\nContent-Disposition: form-data; name=\"a\"; filename=\"\"\r\n\r\nplain\r\n--B--\r\n";
        let form = MultipartDecoder::default()
            .decode(body.as_bytes(), CONTENT_TYPE, None)
            .unwrap();

        assert_eq!(form.text("a"), Some("plain"));
        assert_eq!(form.file_count(), 0);
    }

    #[test]
    fn test_decode_boundary() {
        let body = "--B\r\nContent-Disposition: form-data; name=\"a\"\r\n\r\nx\r\n--B--\r\n";
        let form = MultipartDecoder::default()
            .decode_boundary(body.as_bytes(), "B", None)
            .unwrap();
        assert_eq!(form.text("a"), Some("x"));

        let result = MultipartDecoder::default().decode_boundary(body.as_bytes(), "", None);
        assert_eq!(result, Err(crate::Error::MissingBoundary));
    }

    #[test]
    fn test_missing_boundary_reads_nothing() {
        struct Untouchable;

        impl Read for Untouchable {
            fn read(&mut self, _: &mut [u8]) -> std::io::Result<usize> {
                panic!("source must not be read");
            }
        }

        let result = MultipartDecoder::default().decode(Untouchable, "multipart/form-data", None);
        assert_eq!(result, Err(crate::Error::MissingBoundary));
    }

    #[test]
    fn test_count_limit_removes_dropped_files() {
        let storage = scratch_storage("count");
        let dir = storage.dir().to_owned();
        let body = "--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"1.txt\"\r\n\r\none\r\n\
                    --B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"2.txt\"\r\n\r\ntwo\r\n--B--\r\n";

        let form = MultipartDecoder::new(DecodeLimits::new().max_file_count(1))
            .with_temp_storage(storage)
            .decode(body.as_bytes(), CONTENT_TYPE, None)
            .unwrap();

        assert_eq!(form.file_count(), 2);
        assert_eq!(form.files().len(), 1);

        let file = form.file("f").unwrap();
        assert_eq!(file.file_name(), "1.txt");
        assert_eq!(entries(&dir), vec![file.path().unwrap().to_owned()]);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_error_removes_earlier_files() {
        let storage = scratch_storage("error");
        let dir = storage.dir().to_owned();
        let body = "--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"1.txt\"\r\n\r\none\r\n\
                    --B\r\nContent-Disposition: form-data; name=\"g\"; filename=\"2.txt\"\r\n\r\ntw";

        let result = MultipartDecoder::default()
            .with_temp_storage(storage)
            .decode(body.as_bytes(), CONTENT_TYPE, None);

        assert_eq!(result, Err(crate::Error::Truncated));
        assert!(entries(&dir).is_empty());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_decode_path() {
        let storage = scratch_storage("path");
        let dir = storage.dir().to_owned();
        let body_path = std::env::temp_dir().join(format!("formdec-body-{}.bin", std::process::id()));
        fs::write(
            &body_path,
            "--B\r\nContent-Disposition: form-data; name=\"f\"; filename=\"empty.bin\"\r\n\r\n\r\n--B--\r\n",
        )
        .unwrap();

        let form = MultipartDecoder::default()
            .with_temp_storage(storage)
            .decode_path(&body_path, CONTENT_TYPE, None)
            .unwrap();

        let file = form.file("f").unwrap();
        assert_eq!(file.error(), UploadError::NoFile);
        assert!(entries(&dir).is_empty());

        fs::remove_file(&body_path).unwrap();
        fs::remove_dir_all(&dir).unwrap();

        let missing = MultipartDecoder::default().decode_path(&body_path, CONTENT_TYPE, None);
        assert!(matches!(missing, Err(crate::Error::IoFailure(_))));
    }
}
