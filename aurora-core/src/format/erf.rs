//! Support for ERF, BioWare's generic archive format.
//!
//! The same container is used for modules (`MOD `), hak paks (`HAK `), save games (`SAV `) and
//! plain archives (`ERF `). V1.0 stores 16-byte resource names, V1.1 (NWN2) 32-byte ones.
//!
//! Only the key and resource lists are read into memory, resource data is streamed from the file.

use std::io::{BufReader, Seek as _, SeekFrom};

use anyhow::{Context, Result, bail};
use aurora_primitives::stateless_reader::{RangeReader, StatelessReader};
use binrw::{BinRead, BinWrite};
use smartstring::alias::CompactString;

pub(super) const HEADER_SIZE: u64 = 160;
pub(super) const RESOURCE_SIZE: u64 = 8;

#[derive(BinRead, BinWrite, Debug)]
#[brw(little)]
pub(super) struct RawHeader {
    pub file_type: [u8; 4],
    pub version: [u8; 4],
    pub language_count: u32,
    pub localized_string_size: u32,
    pub entry_count: u32,
    pub localized_string_offset: u32,
    pub key_list_offset: u32,
    pub resource_list_offset: u32,
    pub build_year: u32,
    pub build_day: u32,
    pub description_strref: u32,
    pub reserved: [u8; 116],
}

#[derive(BinRead, BinWrite, Debug)]
#[brw(little)]
#[br(import(name_len: usize))]
pub(super) struct RawKey {
    #[br(count = name_len)]
    pub name: Vec<u8>,
    pub resource_id: u32,
    pub resource_type: u16,
    pub unused: u16,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone)]
#[brw(little)]
pub(super) struct RawResource {
    pub offset: u32,
    pub size: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErfKind {
    Erf,
    Mod,
    Hak,
    Sav,
}

impl ErfKind {
    fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            b"ERF " => Some(ErfKind::Erf),
            b"MOD " => Some(ErfKind::Mod),
            b"HAK " => Some(ErfKind::Hak),
            b"SAV " => Some(ErfKind::Sav),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErfVersion {
    V10,
    V11,
}

impl ErfVersion {
    fn from_magic(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            b"V1.0" => Some(ErfVersion::V10),
            b"V1.1" => Some(ErfVersion::V11),
            _ => None,
        }
    }

    pub(super) fn name_len(self) -> usize {
        match self {
            ErfVersion::V10 => 16,
            ErfVersion::V11 => 32,
        }
    }

    pub(super) fn key_size(self) -> u64 {
        self.name_len() as u64 + 8
    }
}

#[derive(Debug, Clone)]
pub struct ErfEntry {
    pub name: CompactString,
    pub type_code: u32,
    offset: u64,
    size: u32,
}

impl ErfEntry {
    pub fn size(&self) -> u32 {
        self.size
    }
}

/// An opened ERF archive.
///
/// Assumes that the underlying file will not change
pub struct ErfArchive<S: StatelessReader> {
    kind: ErfKind,
    version: ErfVersion,
    entries: Vec<ErfEntry>,
    reader: S,
}

impl<S: StatelessReader> std::fmt::Debug for ErfArchive<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErfArchive")
            .field("kind", &self.kind)
            .field("version", &self.version)
            .field("entries", &self.entries.len())
            .finish()
    }
}

fn decode_name(raw: &[u8]) -> CompactString {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    CompactString::from(&*String::from_utf8_lossy(&raw[..end]))
}

fn check_table(what: &str, offset: u64, count: u64, item_size: u64, file_size: u64) -> Result<()> {
    let end = count
        .checked_mul(item_size)
        .and_then(|len| len.checked_add(offset));
    match end {
        Some(end) if end <= file_size => Ok(()),
        _ => bail!(
            "{} ({} entries at 0x{:x}) extends past the end of the file (0x{:x} bytes)",
            what,
            count,
            offset,
            file_size
        ),
    }
}

impl<S: StatelessReader> ErfArchive<S> {
    pub fn new(reader: S) -> Result<Self> {
        let file_size = reader.size();
        let mut io = BufReader::new(RangeReader::new(&reader));

        let header = RawHeader::read(&mut io).context("Reading ERF header")?;
        let kind = ErfKind::from_magic(&header.file_type).with_context(|| {
            format!(
                "Unknown ERF signature {:?}",
                String::from_utf8_lossy(&header.file_type)
            )
        })?;
        let version = ErfVersion::from_magic(&header.version).with_context(|| {
            format!(
                "Unsupported ERF version {:?}",
                String::from_utf8_lossy(&header.version)
            )
        })?;

        let count = header.entry_count as u64;
        check_table(
            "Key list",
            header.key_list_offset as u64,
            count,
            version.key_size(),
            file_size,
        )?;
        check_table(
            "Resource list",
            header.resource_list_offset as u64,
            count,
            RESOURCE_SIZE,
            file_size,
        )?;

        io.seek(SeekFrom::Start(header.key_list_offset as u64))?;
        let keys = (0..header.entry_count)
            .map(|_| RawKey::read_le_args(&mut io, (version.name_len(),)))
            .collect::<binrw::BinResult<Vec<_>>>()
            .context("Reading ERF key list")?;

        io.seek(SeekFrom::Start(header.resource_list_offset as u64))?;
        let resources = (0..header.entry_count)
            .map(|_| RawResource::read(&mut io))
            .collect::<binrw::BinResult<Vec<_>>>()
            .context("Reading ERF resource list")?;

        let entries = keys
            .into_iter()
            .zip(resources)
            .map(|(key, resource)| {
                let name = decode_name(&key.name);
                if resource.offset as u64 + resource.size as u64 > file_size {
                    bail!(
                        "Resource {:?} (0x{:x}+0x{:x}) lies outside of the file",
                        name,
                        resource.offset,
                        resource.size
                    );
                }
                Ok(ErfEntry {
                    name,
                    type_code: key.resource_type as u32,
                    offset: resource.offset as u64,
                    size: resource.size,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            kind,
            version,
            entries,
            reader,
        })
    }

    pub fn kind(&self) -> ErfKind {
        self.kind
    }

    pub fn version(&self) -> ErfVersion {
        self.version
    }

    pub fn entries(&self) -> &[ErfEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ErfEntry> {
        self.entries.get(index)
    }
}

impl<S: StatelessReader + Clone> ErfArchive<S> {
    pub fn open_entry(&self, index: usize) -> Option<RangeReader<S>> {
        let entry = self.entries.get(index)?;
        Some(RangeReader::with_range(
            self.reader.clone(),
            entry.offset,
            entry.size as u64,
        ))
    }
}
