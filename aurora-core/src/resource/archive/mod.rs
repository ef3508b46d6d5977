//! The containers resources are indexed from.
//!
//! Every container kind exposes the same two capabilities: listing its entries as
//! `(name, raw type code)` pairs and opening a stream for one of them.

mod directory;

use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use aurora_primitives::stateless_reader::StatelessFile;
use serde::{Deserialize, Serialize};
use smartstring::alias::CompactString;
use snafu::OptionExt as _;
use strum::{EnumString, IntoStaticStr};
use tracing::{debug, instrument};

pub use self::directory::{DirectoryReader, SearchDepth};
use crate::{
    format::{erf::ErfArchive, pe::PeFile, zip::ZipArchive},
    resource::{
        ResourceError, ResourceType,
        error::{Result, UnknownArchiveKindSnafu},
        stream::{ResourceStream, SharedFile},
    },
};

/// The kind of an archive container.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveKind {
    Zip,
    Erf,
    Exe,
}

impl ArchiveKind {
    /// Guesses the kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_string_lossy().to_ascii_lowercase();
        match extension.as_str() {
            "zip" => Some(ArchiveKind::Zip),
            "erf" | "mod" | "hak" | "sav" | "nwm" => Some(ArchiveKind::Erf),
            "exe" => Some(ArchiveKind::Exe),
            _ => None,
        }
    }
}

impl std::fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.into())
    }
}

/// The kind of any registered source, archive or not.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Directory,
    Archive(ArchiveKind),
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Directory => f.write_str("dir"),
            SourceKind::Archive(kind) => std::fmt::Display::fmt(kind, f),
        }
    }
}

/// Where an entry lives inside its container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Path(PathBuf),
    Index(usize),
}

#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Resource name, without extension, in whatever case the container uses.
    pub name: CompactString,
    /// Type code as found in the container, before aliasing.
    pub type_code: u32,
    pub locator: Locator,
}

/// A container of resources.
#[derive(Debug)]
pub enum ArchiveReader {
    Directory(DirectoryReader),
    Zip(ZipArchive<SharedFile>),
    Erf(ErfArchive<SharedFile>),
    Exe(PeFile<SharedFile>),
}

fn open_shared_file(path: &Path) -> Result<SharedFile> {
    if path.is_dir() {
        return Err(ResourceError::corrupt(
            path,
            anyhow::anyhow!("Expected an archive file, found a directory"),
        ));
    }
    match StatelessFile::open(path) {
        Ok(file) => Ok(Arc::new(file)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(ResourceError::SourceNotFound {
            path: path.to_path_buf(),
        }),
        Err(err) => Err(ResourceError::SourceUnreadable {
            path: path.to_path_buf(),
            source: err,
        }),
    }
}

fn split_file_name(file_name: &str) -> Option<(&str, ResourceType)> {
    let (name, extension) = file_name.rsplit_once('.')?;
    Some((name, ResourceType::from_extension(extension)?))
}

impl ArchiveReader {
    /// Opens an archive of the given kind and reads its index.
    ///
    /// A missing file is [`SourceNotFound`](ResourceError::SourceNotFound), a file that cannot be
    /// parsed is [`ArchiveCorrupt`](ResourceError::ArchiveCorrupt).
    #[instrument]
    pub fn open_archive(kind: ArchiveKind, path: &Path) -> Result<Self> {
        let file = open_shared_file(path)?;
        let reader = match kind {
            ArchiveKind::Zip => ZipArchive::new(file).map(ArchiveReader::Zip),
            ArchiveKind::Erf => ErfArchive::new(file).map(ArchiveReader::Erf),
            ArchiveKind::Exe => PeFile::new(file).map(ArchiveReader::Exe),
        }
        .map_err(|err| ResourceError::corrupt(path, err))?;

        debug!("Opened {} archive {:?}", kind, path);
        Ok(reader)
    }

    /// Opens an archive, telling its kind by the file extension.
    pub fn open_by_extension(path: &Path) -> Result<Self> {
        let kind = ArchiveKind::from_path(path).context(UnknownArchiveKindSnafu { path })?;
        Self::open_archive(kind, path)
    }

    #[instrument]
    pub fn open_directory(
        path: &Path,
        depth: SearchDepth,
        type_filter: Option<u32>,
    ) -> Result<Self> {
        DirectoryReader::new(path, depth, type_filter).map(ArchiveReader::Directory)
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            ArchiveReader::Directory(_) => SourceKind::Directory,
            ArchiveReader::Zip(_) => SourceKind::Archive(ArchiveKind::Zip),
            ArchiveReader::Erf(_) => SourceKind::Archive(ArchiveKind::Erf),
            ArchiveReader::Exe(_) => SourceKind::Archive(ArchiveKind::Exe),
        }
    }

    /// Lists the entries of the container.
    ///
    /// ZIP entries and directory files are typed by their extension; entries with unknown
    /// extensions are left out.
    pub fn entries(&self) -> Vec<ArchiveEntry> {
        match self {
            ArchiveReader::Directory(dir) => dir.entries().to_vec(),
            ArchiveReader::Zip(zip) => zip
                .entries()
                .iter()
                .enumerate()
                .filter_map(|(index, entry)| {
                    let (name, ty) = split_file_name(entry.file_name())?;
                    Some(ArchiveEntry {
                        name: name.into(),
                        type_code: ty.code(),
                        locator: Locator::Index(index),
                    })
                })
                .collect(),
            ArchiveReader::Erf(erf) => erf
                .entries()
                .iter()
                .enumerate()
                .map(|(index, entry)| ArchiveEntry {
                    name: entry.name.clone(),
                    type_code: entry.type_code,
                    locator: Locator::Index(index),
                })
                .collect(),
            ArchiveReader::Exe(pe) => pe
                .cursor_groups()
                .iter()
                .enumerate()
                .map(|(index, group)| ArchiveEntry {
                    name: format!("cursor{}", group.id).as_str().into(),
                    type_code: ResourceType::Cur.code(),
                    locator: Locator::Index(index),
                })
                .collect(),
        }
    }

    /// Opens a stream for an entry previously returned by [`ArchiveReader::entries`].
    pub fn open(&self, locator: &Locator) -> io::Result<ResourceStream> {
        let not_found = || io::Error::new(io::ErrorKind::NotFound, "no such archive entry");

        match (self, locator) {
            (ArchiveReader::Directory(_), Locator::Path(path)) => {
                ResourceStream::from_file(std::fs::File::open(path)?)
            }
            (ArchiveReader::Zip(zip), &Locator::Index(index)) => {
                let size = zip.entry(index).ok_or_else(not_found)?.size();
                let reader = zip.open_entry(index).ok_or_else(not_found)?;
                Ok(ResourceStream::from_zip(reader, size))
            }
            (ArchiveReader::Erf(erf), &Locator::Index(index)) => erf
                .open_entry(index)
                .map(ResourceStream::from_range)
                .ok_or_else(not_found),
            (ArchiveReader::Exe(pe), &Locator::Index(index)) => {
                pe.assemble_cursor(index).map(ResourceStream::from_memory)
            }
            _ => Err(not_found()),
        }
    }
}
