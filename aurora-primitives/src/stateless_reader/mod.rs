//! Reading at arbitrary offsets without a shared cursor.
//!
//! Archive containers hand out many independent streams over the same file. Instead of reopening
//! the file for every stream, they share one [`StatelessFile`] and read with explicit offsets.

use std::{fs::File, path::Path, sync::Arc};

pub use self::range::RangeReader;
use self::sys::PositionalFile;

mod range;
mod sys;

pub trait StatelessReader {
    fn size(&self) -> u64;
    fn read_at_exact(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()>;
}

impl<T> StatelessReader for &T
where
    T: StatelessReader + ?Sized,
{
    fn size(&self) -> u64 {
        T::size(*self)
    }

    fn read_at_exact(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        T::read_at_exact(*self, offset, buf)
    }
}

impl<T> StatelessReader for Arc<T>
where
    T: StatelessReader + ?Sized,
{
    fn size(&self) -> u64 {
        T::size(self)
    }

    fn read_at_exact(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        T::read_at_exact(self, offset, buf)
    }
}

/// Implements a stateless reading for a file
///
/// <div class="warning">Does not function correctly if the file is modified after being open</div>
#[derive(Debug)]
pub struct StatelessFile {
    file: PositionalFile,
    size: u64,
}

impl StatelessFile {
    pub fn new(file: File) -> std::io::Result<Self> {
        let size = file.metadata()?.len();

        Ok(Self {
            file: PositionalFile::new(file),
            size,
        })
    }

    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl StatelessReader for StatelessFile {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at_exact(&self, mut offset: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
        while !buf.is_empty() {
            let read = self.file.read_at(offset, buf)?;
            if read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "failed to read whole buffer",
                ));
            }
            offset += read as u64;
            buf = &mut buf[read..];
        }

        Ok(())
    }
}

/// An in-memory [`StatelessReader`], mostly useful for tests.
#[derive(Debug, Clone)]
pub struct StatelessCursor<B> {
    inner: B,
}

impl<B> StatelessCursor<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: AsRef<[u8]>> StatelessReader for StatelessCursor<B> {
    fn size(&self) -> u64 {
        self.inner.as_ref().len() as u64
    }

    fn read_at_exact(&self, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
        let buffer = self.inner.as_ref();
        let end = offset.checked_add(buf.len() as u64);
        match end {
            Some(end) if end <= buffer.len() as u64 => {
                buf.copy_from_slice(&buffer[offset as usize..end as usize]);
                Ok(())
            }
            _ => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "read out of bounds of StatelessCursor",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::{StatelessFile, StatelessReader};

    #[test]
    fn file_reads_at_offsets() {
        let mut file = tempfile::tempfile().unwrap();
        file.write_all(b"hello, stateless world").unwrap();

        let file = StatelessFile::new(file).unwrap();
        assert_eq!(file.size(), 22);

        let mut buf = [0u8; 9];
        file.read_at_exact(7, &mut buf).unwrap();
        assert_eq!(&buf, b"stateless");

        // reads do not depend on each other
        let mut buf = [0u8; 5];
        file.read_at_exact(0, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");

        let mut buf = [0u8; 4];
        let err = file.read_at_exact(20, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
