use std::io::{self, SeekFrom};

use crate::stateless_reader::StatelessReader;

/// Exposes a window of a [`StatelessReader`] as a regular `Read + Seek` stream.
///
/// Positions are relative to the start of the window; reads stop at its end.
#[derive(Debug, Clone)]
pub struct RangeReader<S> {
    inner: S,
    start: u64,
    len: u64,
    position: u64,
}

impl<S: StatelessReader> RangeReader<S> {
    /// Covers the whole underlying reader.
    pub fn new(inner: S) -> Self {
        let len = inner.size();
        Self::with_range(inner, 0, len)
    }

    /// Covers `len` bytes starting at `start`.
    ///
    /// The window is not validated against the size of the reader; reading past the end of the
    /// underlying data fails with [`io::ErrorKind::UnexpectedEof`].
    pub fn with_range(inner: S, start: u64, len: u64) -> Self {
        Self {
            inner,
            start,
            len,
            position: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }
}

impl<S: StatelessReader> io::Read for RangeReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let to_read = std::cmp::min(buf.len() as u64, self.remaining()) as usize;
        if to_read == 0 {
            return Ok(0);
        }

        self.inner
            .read_at_exact(self.start + self.position, &mut buf[..to_read])?;
        self.position += to_read as u64;

        Ok(to_read)
    }
}

impl<S: StatelessReader> io::Seek for RangeReader<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.len.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(target) if target <= self.len => {
                self.position = target;
                Ok(target)
            }
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek beyond the end of the range",
            )),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "invalid seek to a negative position",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read as _, Seek as _, SeekFrom};

    use super::RangeReader;
    use crate::stateless_reader::StatelessCursor;

    #[test]
    fn reads_only_the_window() {
        let data = StatelessCursor::new(b"0123456789".to_vec());
        let mut reader = RangeReader::with_range(&data, 3, 4);

        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "3456");
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn seek_is_relative_to_window() {
        let data = StatelessCursor::new(b"abcdefgh".to_vec());
        let mut reader = RangeReader::with_range(&data, 2, 5);

        assert_eq!(reader.seek(SeekFrom::End(-1)).unwrap(), 4);
        let mut byte = [0u8];
        reader.read_exact(&mut byte).unwrap();
        assert_eq!(&byte, b"g");

        assert!(reader.seek(SeekFrom::Current(-10)).is_err());
        assert!(reader.seek(SeekFrom::Start(6)).is_err());
    }

    #[test]
    fn window_past_data_is_an_error() {
        let data = StatelessCursor::new(b"abc".to_vec());
        let mut reader = RangeReader::with_range(&data, 1, 8);

        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
