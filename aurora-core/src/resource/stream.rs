use std::{
    fs::File,
    io::{self, Read},
    sync::Arc,
};

use aurora_primitives::stateless_reader::{RangeReader, StatelessFile};

use crate::format::zip::ZipEntryReader;

pub type SharedFile = Arc<StatelessFile>;

const MAX_PREALLOCATION: u64 = 1 << 20;

enum ResourceStreamInner {
    File(File),
    Range(RangeReader<SharedFile>),
    Zip(ZipEntryReader<SharedFile>),
    Memory(io::Cursor<Vec<u8>>),
}

/// A byte stream over the contents of one resource.
///
/// Reading may block on file I/O. Data that has to be decoded (compressed ZIP entries) is decoded
/// while reading, so damaged data surfaces as an error from [`io::Read::read`].
pub struct ResourceStream {
    inner: ResourceStreamInner,
    size: u64,
}

impl ResourceStream {
    pub(crate) fn from_file(file: File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            inner: ResourceStreamInner::File(file),
            size,
        })
    }

    pub(crate) fn from_range(reader: RangeReader<SharedFile>) -> Self {
        let size = reader.len();
        Self {
            inner: ResourceStreamInner::Range(reader),
            size,
        }
    }

    pub(crate) fn from_zip(reader: ZipEntryReader<SharedFile>, size: u64) -> Self {
        Self {
            inner: ResourceStreamInner::Zip(reader),
            size,
        }
    }

    pub(crate) fn from_memory(data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            inner: ResourceStreamInner::Memory(io::Cursor::new(data)),
            size,
        }
    }

    /// Size of the decoded resource, as recorded by its container.
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        // the recorded size comes from the container and may be bogus
        let capacity = std::cmp::min(self.size, MAX_PREALLOCATION) as usize;
        let mut result = Vec::with_capacity(capacity);
        self.read_to_end(&mut result)?;
        Ok(result)
    }
}

impl Read for ResourceStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match &mut self.inner {
            ResourceStreamInner::File(file) => file.read(buf),
            ResourceStreamInner::Range(reader) => reader.read(buf),
            ResourceStreamInner::Zip(reader) => reader.read(buf),
            ResourceStreamInner::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl std::fmt::Debug for ResourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            ResourceStreamInner::File(_) => "File",
            ResourceStreamInner::Range(_) => "Range",
            ResourceStreamInner::Zip(_) => "Zip",
            ResourceStreamInner::Memory(_) => "Memory",
        };
        f.debug_struct("ResourceStream")
            .field("kind", &kind)
            .field("size", &self.size)
            .finish()
    }
}
