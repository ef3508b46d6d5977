//! Builders for archive fixtures.
//!
//! ERF and PE fixtures are written with the same structures the readers parse.

use std::{collections::BTreeMap, io::Cursor, io::Write as _};

use binrw::{BinRead, BinWrite};
use flate2::{Compression, Crc, write::DeflateEncoder};

use super::{erf, pe};

const ZIP_LOCAL_HEADER_SIZE: usize = 30;
const ZIP_METHOD_STORED: u16 = 0;
const ZIP_METHOD_DEFLATE: u16 = 8;

#[derive(BinRead, BinWrite)]
#[brw(little, magic = b"PK\x05\x06")]
struct RawEndOfCentralDirectory {
    disk_number: u16,
    directory_disk: u16,
    disk_entries: u16,
    total_entries: u16,
    directory_size: u32,
    directory_offset: u32,
    comment_len: u16,
}

#[derive(BinRead, BinWrite)]
#[brw(little, magic = b"PK\x01\x02")]
struct RawCentralHeader {
    version_made_by: u16,
    version_needed: u16,
    flags: u16,
    method: u16,
    mtime: u16,
    mdate: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    name_len: u16,
    extra_len: u16,
    comment_len: u16,
    disk_start: u16,
    internal_attributes: u16,
    external_attributes: u32,
    local_header_offset: u32,
    #[br(count = name_len)]
    name: Vec<u8>,
    #[br(count = extra_len)]
    extra: Vec<u8>,
    #[br(count = comment_len)]
    comment: Vec<u8>,
}

#[derive(BinRead, BinWrite)]
#[brw(little, magic = b"PK\x03\x04")]
struct RawLocalHeader {
    version_needed: u16,
    flags: u16,
    method: u16,
    mtime: u16,
    mdate: u16,
    crc32: u32,
    compressed_size: u32,
    uncompressed_size: u32,
    name_len: u16,
    extra_len: u16,
}

#[derive(Debug, Copy, Clone)]
pub enum ErfFixtureVersion {
    V10,
    V11,
}

pub struct ErfBuilder {
    file_type: [u8; 4],
    version: ErfFixtureVersion,
    entries: Vec<(String, u16, Vec<u8>)>,
}

impl ErfBuilder {
    pub fn new(file_type: [u8; 4], version: ErfFixtureVersion) -> Self {
        Self {
            file_type,
            version,
            entries: Vec::new(),
        }
    }

    pub fn entry(mut self, name: &str, type_code: u16, data: &[u8]) -> Self {
        self.entries.push((name.to_string(), type_code, data.to_vec()));
        self
    }

    pub fn build(self) -> Vec<u8> {
        let (version, name_len) = match self.version {
            ErfFixtureVersion::V10 => (*b"V1.0", 16usize),
            ErfFixtureVersion::V11 => (*b"V1.1", 32usize),
        };
        let count = self.entries.len() as u32;
        let key_list_offset = erf::HEADER_SIZE as u32;
        let resource_list_offset = key_list_offset + count * (name_len as u32 + 8);
        let mut data_offset = resource_list_offset + count * erf::RESOURCE_SIZE as u32;

        let mut out = Cursor::new(Vec::new());
        erf::RawHeader {
            file_type: self.file_type,
            version,
            language_count: 0,
            localized_string_size: 0,
            entry_count: count,
            localized_string_offset: key_list_offset,
            key_list_offset,
            resource_list_offset,
            build_year: 108,
            build_day: 42,
            description_strref: 0xffff_ffff,
            reserved: [0; 116],
        }
        .write(&mut out)
        .unwrap();

        for (id, (name, type_code, _)) in self.entries.iter().enumerate() {
            let mut raw_name = name.as_bytes().to_vec();
            raw_name.resize(name_len, 0);
            erf::RawKey {
                name: raw_name,
                resource_id: id as u32,
                resource_type: *type_code,
                unused: 0,
            }
            .write(&mut out)
            .unwrap();
        }

        for (_, _, data) in &self.entries {
            erf::RawResource {
                offset: data_offset,
                size: data.len() as u32,
            }
            .write(&mut out)
            .unwrap();
            data_offset += data.len() as u32;
        }

        let mut out = out.into_inner();
        for (_, _, data) in &self.entries {
            out.extend_from_slice(data);
        }
        out
    }
}

struct ZipFixtureEntry {
    path: String,
    method: u16,
    crc32: u32,
    uncompressed_size: u32,
    data: Vec<u8>,
}

#[derive(Default)]
pub struct ZipBuilder {
    entries: Vec<ZipFixtureEntry>,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, path: &str, method: u16, contents: &[u8], data: Vec<u8>) -> Self {
        let mut crc = Crc::new();
        crc.update(contents);
        self.entries.push(ZipFixtureEntry {
            path: path.to_string(),
            method,
            crc32: crc.sum(),
            uncompressed_size: contents.len() as u32,
            data,
        });
        self
    }

    pub fn stored(self, path: &str, contents: &[u8]) -> Self {
        self.push(path, ZIP_METHOD_STORED, contents, contents.to_vec())
    }

    pub fn deflated(self, path: &str, contents: &[u8]) -> Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(contents).unwrap();
        let data = encoder.finish().unwrap();
        self.push(path, ZIP_METHOD_DEFLATE, contents, data)
    }

    pub fn directory(self, path: &str) -> Self {
        self.push(path, ZIP_METHOD_STORED, &[], Vec::new())
    }

    pub fn comment(mut self, comment: &[u8]) -> Self {
        self.comment = comment.to_vec();
        self
    }

    /// The byte range of the data of the most recently added entry in the built archive.
    pub fn last_data_range(&self) -> (usize, usize) {
        let mut offset = 0;
        let mut range = (0, 0);
        for entry in &self.entries {
            offset += ZIP_LOCAL_HEADER_SIZE + entry.path.len();
            range = (offset, entry.data.len());
            offset += entry.data.len();
        }
        range
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        let mut offsets = Vec::new();

        for entry in &self.entries {
            offsets.push(out.position() as u32);
            RawLocalHeader {
                version_needed: 20,
                flags: 0,
                method: entry.method,
                mtime: 0,
                mdate: 0,
                crc32: entry.crc32,
                compressed_size: entry.data.len() as u32,
                uncompressed_size: entry.uncompressed_size,
                name_len: entry.path.len() as u16,
                extra_len: 0,
            }
            .write(&mut out)
            .unwrap();
            out.write_all(entry.path.as_bytes()).unwrap();
            out.write_all(&entry.data).unwrap();
        }

        let directory_offset = out.position() as u32;
        for (entry, offset) in self.entries.iter().zip(offsets) {
            RawCentralHeader {
                version_made_by: 20,
                version_needed: 20,
                flags: 0,
                method: entry.method,
                mtime: 0,
                mdate: 0,
                crc32: entry.crc32,
                compressed_size: entry.data.len() as u32,
                uncompressed_size: entry.uncompressed_size,
                name_len: entry.path.len() as u16,
                extra_len: 0,
                comment_len: 0,
                disk_start: 0,
                internal_attributes: 0,
                external_attributes: 0,
                local_header_offset: offset,
                name: entry.path.as_bytes().to_vec(),
                extra: Vec::new(),
                comment: Vec::new(),
            }
            .write(&mut out)
            .unwrap();
        }
        let directory_size = out.position() as u32 - directory_offset;

        RawEndOfCentralDirectory {
            disk_number: 0,
            directory_disk: 0,
            disk_entries: self.entries.len() as u16,
            total_entries: self.entries.len() as u16,
            directory_size,
            directory_offset,
            comment_len: self.comment.len() as u16,
        }
        .write(&mut out)
        .unwrap();
        out.write_all(&self.comment).unwrap();

        out.into_inner()
    }
}

/// Data of an `RT_CURSOR` resource: the hotspot followed by the bitmap.
pub fn cursor_image(hotspot_x: u16, hotspot_y: u16, bitmap: &[u8]) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(&hotspot_x.to_le_bytes());
    data.extend_from_slice(&hotspot_y.to_le_bytes());
    data.extend_from_slice(bitmap);
    data
}

/// Data of an `RT_GROUP_CURSOR` resource, from `(size in pixels, cursor id, bitmap length)`.
pub fn cursor_group(images: &[(u16, u16, u32)]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    pe::RawGroupHeader {
        reserved: 0,
        kind: 2,
        count: images.len() as u16,
    }
    .write(&mut out)
    .unwrap();
    for &(size, cursor_id, bitmap_len) in images {
        pe::RawGroupCursorEntry {
            width: size,
            height: size * 2,
            planes: 1,
            bit_count: 1,
            size: bitmap_len + 4,
            cursor_id,
        }
        .write(&mut out)
        .unwrap();
    }
    out.into_inner()
}

pub struct PeBuilder {
    resources: BTreeMap<u32, BTreeMap<u32, Vec<u8>>>,
    with_resource_section: bool,
}

const SECTION_VIRTUAL_ADDRESS: u32 = 0x1000;
const SECTION_RAW_OFFSET: u32 = 0x200;

impl PeBuilder {
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
            with_resource_section: true,
        }
    }

    pub fn resource(mut self, type_id: u32, id: u32, data: Vec<u8>) -> Self {
        self.resources.entry(type_id).or_default().insert(id, data);
        self
    }

    pub fn without_resource_section(mut self) -> Self {
        self.with_resource_section = false;
        self
    }

    fn build_resource_section(&self) -> Vec<u8> {
        let directory = |id_count: usize| pe::RawResourceDirectory {
            characteristics: 0,
            timestamp: 0,
            major_version: 4,
            minor_version: 0,
            named_count: 0,
            id_count: id_count as u16,
        };
        let directory_len =
            |count: usize| pe::DIRECTORY_SIZE + pe::DIRECTORY_ENTRY_SIZE * count as u64;
        let subdirectory = 0x8000_0000u32;

        let resource_count: usize = self.resources.values().map(|ids| ids.len()).sum();

        // layout: type directory, id directories, language directories, data entries, data
        let mut offset = directory_len(self.resources.len());
        let mut id_directories = Vec::new();
        for ids in self.resources.values() {
            id_directories.push(offset);
            offset += directory_len(ids.len());
        }
        let language_directories = offset;
        offset += directory_len(1) * resource_count as u64;
        let data_entries = offset;
        offset += pe::DATA_ENTRY_SIZE * resource_count as u64;
        let data_start = offset;

        let mut out = Cursor::new(Vec::new());
        directory(self.resources.len()).write(&mut out).unwrap();
        for (type_id, id_directory) in self.resources.keys().zip(&id_directories) {
            pe::RawResourceDirectoryEntry {
                name_or_id: *type_id,
                offset: *id_directory as u32 | subdirectory,
            }
            .write(&mut out)
            .unwrap();
        }

        let mut resource_index = 0u64;
        for ids in self.resources.values() {
            directory(ids.len()).write(&mut out).unwrap();
            for id in ids.keys() {
                pe::RawResourceDirectoryEntry {
                    name_or_id: *id,
                    offset: (language_directories + resource_index * directory_len(1)) as u32
                        | subdirectory,
                }
                .write(&mut out)
                .unwrap();
                resource_index += 1;
            }
        }

        for index in 0..resource_count as u64 {
            directory(1).write(&mut out).unwrap();
            pe::RawResourceDirectoryEntry {
                name_or_id: 1033,
                offset: (data_entries + index * pe::DATA_ENTRY_SIZE) as u32,
            }
            .write(&mut out)
            .unwrap();
        }

        let mut data_offset = data_start;
        for data in self.resources.values().flat_map(|ids| ids.values()) {
            pe::RawResourceData {
                rva: SECTION_VIRTUAL_ADDRESS + data_offset as u32,
                size: data.len() as u32,
                codepage: 0,
                reserved: 0,
            }
            .write(&mut out)
            .unwrap();
            data_offset += data.len() as u64;
        }

        let mut out = out.into_inner();
        for data in self.resources.values().flat_map(|ids| ids.values()) {
            out.extend_from_slice(data);
        }
        out
    }

    pub fn build(self) -> Vec<u8> {
        let section = self.build_resource_section();

        let mut out = Cursor::new(vec![0u8; pe::DOS_HEADER_SIZE as usize]);
        {
            let dos = out.get_mut();
            dos[..2].copy_from_slice(b"MZ");
            dos[0x3c..0x40].copy_from_slice(&(pe::DOS_HEADER_SIZE as u32).to_le_bytes());
        }
        out.set_position(pe::DOS_HEADER_SIZE);

        pe::RawCoffHeader {
            machine: 0x14c,
            section_count: 1,
            timestamp: 0,
            symbol_table_offset: 0,
            symbol_count: 0,
            optional_header_size: 0,
            characteristics: 0x0102,
        }
        .write(&mut out)
        .unwrap();

        let name = if self.with_resource_section {
            *b".rsrc\0\0\0"
        } else {
            *b".data\0\0\0"
        };
        pe::RawSectionHeader {
            name,
            virtual_size: section.len() as u32,
            virtual_address: SECTION_VIRTUAL_ADDRESS,
            raw_size: section.len() as u32,
            raw_offset: SECTION_RAW_OFFSET,
            relocations_offset: 0,
            line_numbers_offset: 0,
            relocation_count: 0,
            line_number_count: 0,
            characteristics: 0x4000_0040,
        }
        .write(&mut out)
        .unwrap();

        let mut out = out.into_inner();
        debug_assert!(
            out.len() as u64 <= pe::DOS_HEADER_SIZE + pe::COFF_HEADER_SIZE + pe::SECTION_HEADER_SIZE
        );
        out.resize(SECTION_RAW_OFFSET as usize, 0);
        out.extend_from_slice(&section);
        out
    }
}
