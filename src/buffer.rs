use std::io::{self, Read};

use bytes::{Bytes, BytesMut};

/// Returns the offset of the first occurrence of `needle` in `haystack`.
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    memchr::memmem::find(haystack, needle)
}

/// Bytes pulled from a source but not yet consumed by the decoder.
///
/// The source is owned by the buffer and dropped with it, so it is released on
/// every exit path of a decode call.
pub(crate) struct StreamBuffer<R> {
    pub(crate) eof: bool,
    pub(crate) buf: BytesMut,
    source: R,
    read_size: usize,
}

impl<R: Read> StreamBuffer<R> {
    pub fn new(source: R, read_size: usize) -> Self {
        let read_size = read_size.max(1);

        StreamBuffer {
            eof: false,
            buf: BytesMut::with_capacity(read_size),
            source,
            read_size,
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Appends at most one chunk from the source and returns how many bytes
    /// arrived. `Ok(0)` means the source is exhausted.
    pub fn fill(&mut self) -> crate::Result<usize> {
        if self.eof {
            return Ok(0);
        }

        let start = self.buf.len();
        self.buf.resize(start + self.read_size, 0);

        loop {
            match self.source.read(&mut self.buf[start..]) {
                Ok(0) => {
                    self.buf.truncate(start);
                    self.eof = true;
                    return Ok(0);
                }
                Ok(n) => {
                    self.buf.truncate(start + n);
                    return Ok(n);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.buf.truncate(start);
                    return Err(err.into());
                }
            }
        }
    }

    /// Reads until at least `len` bytes are buffered.
    pub fn ensure(&mut self, len: usize) -> crate::Result<()> {
        while self.buf.len() < len {
            if self.fill()? == 0 {
                return Err(crate::Error::Truncated);
            }
        }

        Ok(())
    }

    pub fn find(&self, pattern: &[u8]) -> Option<usize> {
        find_bytes(&self.buf, pattern)
    }

    /// Reads until `pattern` is buffered and returns its offset.
    pub fn read_until(&mut self, pattern: &[u8]) -> crate::Result<usize> {
        self.read_until_within(pattern, usize::MAX)?
            .ok_or(crate::Error::Truncated)
    }

    /// Like [`read_until`](Self::read_until), but gives up with `Ok(None)` as
    /// soon as the pattern can no longer start within the first `max_offset`
    /// bytes.
    pub fn read_until_within(&mut self, pattern: &[u8], max_offset: usize) -> crate::Result<Option<usize>> {
        let tail = pattern.len().saturating_sub(1);
        let mut searched = 0;

        loop {
            if let Some(idx) = find_bytes(&self.buf[searched..], pattern) {
                return Ok(Some(searched + idx));
            }

            // The pattern may still straddle the last `tail` bytes.
            searched = self.buf.len().saturating_sub(tail);

            if searched > max_offset {
                return Ok(None);
            }

            if self.fill()? == 0 {
                return Err(crate::Error::Truncated);
            }
        }
    }

    /// Removes and returns everything before `offset + skip`.
    pub fn consume_until(&mut self, offset: usize, skip: usize) -> Bytes {
        let at = (offset + skip).min(self.buf.len());
        self.buf.split_to(at).freeze()
    }

    pub fn starts_with(&self, pattern: &[u8]) -> bool {
        self.buf.starts_with(pattern)
    }
}
