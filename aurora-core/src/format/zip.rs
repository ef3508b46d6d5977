//! Support for reading ZIP archives.
//!
//! Locating the archive and walking its central directory is done by `rawzip`, over positional
//! reads of the shared file. Only stored and deflated entries are supported.
//!
//! The central directory is read when the archive is opened. Everything concerning a single entry
//! (the local header, the compressed data and its checksum) is only looked at when the entry is
//! read, so a damaged entry shows up as a read error and not as a failure to open it.

use std::{
    io::{self, Read},
    sync::Arc,
};

use anyhow::{Result, anyhow};
use aurora_primitives::stateless_reader::{RangeReader, StatelessReader};
use flate2::{CrcReader, read::DeflateDecoder};
use rawzip::{CompressionMethod, ReaderAt, ZipArchiveEntryWayfinder};
use smartstring::alias::CompactString;

/// The end record may be followed by a comment of up to 64 KiB.
const MAX_SEARCH_SPACE: u64 = 0xffff + 22;

/// Adapts a [`StatelessReader`] to the positional reads `rawzip` works with.
#[derive(Debug, Clone)]
pub struct ZipSource<S>(S);

impl<S: StatelessReader> ReaderAt for ZipSource<S> {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> io::Result<usize> {
        let available = self.0.size().saturating_sub(offset);
        let len = std::cmp::min(buf.len() as u64, available) as usize;
        self.0.read_at_exact(offset, &mut buf[..len])?;
        Ok(len)
    }
}

#[derive(Debug, Clone)]
pub struct ZipEntry {
    /// Full path of the entry inside the archive, with `/` separators.
    pub path: CompactString,
    method: CompressionMethod,
    crc32: u32,
    uncompressed_size: u64,
    wayfinder: ZipArchiveEntryWayfinder,
}

impl ZipEntry {
    /// The last path component.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn size(&self) -> u64 {
        self.uncompressed_size
    }

    pub fn method(&self) -> CompressionMethod {
        self.method
    }
}

/// An opened ZIP archive.
///
/// Assumes that the underlying file will not change
pub struct ZipArchive<S: StatelessReader> {
    entries: Vec<ZipEntry>,
    archive: Arc<rawzip::ZipArchive<ZipSource<S>>>,
}

impl<S: StatelessReader> std::fmt::Debug for ZipArchive<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl<S: StatelessReader> ZipArchive<S> {
    pub fn new(reader: S) -> Result<Self> {
        let size = reader.size();
        let mut buf = vec![0u8; rawzip::RECOMMENDED_BUFFER_SIZE];
        let archive = rawzip::ZipArchive::with_max_search_space(MAX_SEARCH_SPACE)
            .locate_in_reader(ZipSource(reader), &mut buf, size)
            .map_err(|(_, err)| anyhow!("Not a ZIP archive: {}", err))?;

        let mut entries = Vec::new();
        let mut records = archive.entries(&mut buf);
        while let Some(record) = records
            .next_entry()
            .map_err(|err| anyhow!("Reading the central directory: {}", err))?
        {
            let path = String::from_utf8_lossy(record.file_path().as_ref()).into_owned();
            if record.is_dir() || path.ends_with('/') {
                continue;
            }

            entries.push(ZipEntry {
                path: path.as_str().into(),
                method: record.compression_method(),
                crc32: record.crc32(),
                uncompressed_size: record.uncompressed_size_hint(),
                wayfinder: record.wayfinder(),
            });
        }

        Ok(Self {
            entries,
            archive: Arc::new(archive),
        })
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ZipEntry> {
        self.entries.get(index)
    }
}

impl<S: StatelessReader + Clone> ZipArchive<S> {
    /// Returns a lazily initialized reader for the entry.
    pub fn open_entry(&self, index: usize) -> Option<ZipEntryReader<S>> {
        let entry = self.entries.get(index)?.clone();
        Some(ZipEntryReader {
            state: ReaderState::Pending {
                archive: self.archive.clone(),
                entry,
            },
        })
    }
}

enum ReaderState<S: StatelessReader> {
    Pending {
        archive: Arc<rawzip::ZipArchive<ZipSource<S>>>,
        entry: ZipEntry,
    },
    Stored(ChecksummedReader<RangeReader<S>>),
    Deflated(ChecksummedReader<DeflateDecoder<RangeReader<S>>>),
    Failed,
}

/// Verifies the CRC-32 and the length of the decoded data when the end of the stream is reached.
struct ChecksummedReader<R: Read> {
    inner: CrcReader<R>,
    expected_crc: u32,
    expected_len: u64,
}

impl<R: Read> ChecksummedReader<R> {
    fn new(inner: R, entry: &ZipEntry) -> Self {
        Self {
            inner: CrcReader::new(inner),
            expected_crc: entry.crc32,
            expected_len: entry.uncompressed_size,
        }
    }
}

impl<R: Read> Read for ChecksummedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if read == 0 && !buf.is_empty() {
            let crc = self.inner.crc();
            if crc.amount() as u64 != self.expected_len {
                return Err(invalid_data(format!(
                    "ZIP entry decoded to {} bytes, expected {}",
                    crc.amount(),
                    self.expected_len
                )));
            }
            if crc.sum() != self.expected_crc {
                return Err(invalid_data(format!(
                    "ZIP entry CRC mismatch: got {:08x}, expected {:08x}",
                    crc.sum(),
                    self.expected_crc
                )));
            }
        }
        Ok(read)
    }
}

/// Streams the decoded contents of a ZIP entry.
pub struct ZipEntryReader<S: StatelessReader> {
    state: ReaderState<S>,
}

fn invalid_data(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn start_entry<S: StatelessReader + Clone>(
    archive: &rawzip::ZipArchive<ZipSource<S>>,
    entry: &ZipEntry,
) -> io::Result<ReaderState<S>> {
    // checks the local header against the central directory
    let (start, end) = archive
        .get_entry(entry.wayfinder)
        .map_err(|err| invalid_data(format!("Invalid local header for {:?}: {}", entry.path, err)))?
        .compressed_data_range();

    let reader = archive.get_ref().0.clone();
    if start > end || end > reader.size() {
        return Err(invalid_data(format!(
            "ZIP entry {:?} extends past the end of the archive",
            entry.path
        )));
    }

    let data = RangeReader::with_range(reader, start, end - start);
    if entry.method == CompressionMethod::Store {
        Ok(ReaderState::Stored(ChecksummedReader::new(data, entry)))
    } else if entry.method == CompressionMethod::Deflate {
        Ok(ReaderState::Deflated(ChecksummedReader::new(
            DeflateDecoder::new(data),
            entry,
        )))
    } else {
        Err(invalid_data(format!(
            "ZIP entry {:?} uses unsupported compression method {:?}",
            entry.path, entry.method
        )))
    }
}

impl<S: StatelessReader + Clone> Read for ZipEntryReader<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        // a failed start leaves the reader in the failed state
        self.state = match std::mem::replace(&mut self.state, ReaderState::Failed) {
            ReaderState::Pending { archive, entry } => start_entry(&archive, &entry)?,
            state => state,
        };

        match &mut self.state {
            ReaderState::Stored(reader) => reader.read(buf),
            ReaderState::Deflated(reader) => reader
                .read(buf)
                .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err)),
            ReaderState::Pending { .. } | ReaderState::Failed => {
                Err(invalid_data("ZIP entry could not be opened"))
            }
        }
    }
}
