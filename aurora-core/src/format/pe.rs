//! Support for resources embedded into Windows executables (PE files).
//!
//! The resource section is a three-level tree: resource type, resource id, language. Only entries
//! addressed by numeric ids are read; named entries are skipped.
//!
//! Cursors are stored split in two: an `RT_GROUP_CURSOR` resource listing the images and one
//! `RT_CURSOR` resource per image. [`PeFile::assemble_cursor`] glues them back together into a
//! standalone `.cur` file.

use std::io::{self, BufReader, Cursor, Seek as _, SeekFrom};

use anyhow::{Context, Result, bail};
use aurora_primitives::stateless_reader::{RangeReader, StatelessReader};
use binrw::{BinRead, BinWrite};

pub const RT_CURSOR: u32 = 1;
pub const RT_GROUP_CURSOR: u32 = 12;

pub(super) const DOS_HEADER_SIZE: u64 = 0x40;
const NEW_HEADER_POINTER: u64 = 0x3c;
pub(super) const COFF_HEADER_SIZE: u64 = 24;
pub(super) const SECTION_HEADER_SIZE: u64 = 40;
pub(super) const DIRECTORY_SIZE: u64 = 16;
pub(super) const DIRECTORY_ENTRY_SIZE: u64 = 8;
pub(super) const DATA_ENTRY_SIZE: u64 = 16;
const SUBDIRECTORY_FLAG: u32 = 0x8000_0000;
const CUR_HEADER_SIZE: u32 = 6;
const CUR_ENTRY_SIZE: u32 = 16;
const HOTSPOT_SIZE: u32 = 4;

#[derive(BinRead, BinWrite, Debug)]
#[brw(little, magic = b"PE\0\0")]
pub(super) struct RawCoffHeader {
    pub machine: u16,
    pub section_count: u16,
    pub timestamp: u32,
    pub symbol_table_offset: u32,
    pub symbol_count: u32,
    pub optional_header_size: u16,
    pub characteristics: u16,
}

#[derive(BinRead, BinWrite, Debug)]
#[brw(little)]
pub(super) struct RawSectionHeader {
    pub name: [u8; 8],
    pub virtual_size: u32,
    pub virtual_address: u32,
    pub raw_size: u32,
    pub raw_offset: u32,
    pub relocations_offset: u32,
    pub line_numbers_offset: u32,
    pub relocation_count: u16,
    pub line_number_count: u16,
    pub characteristics: u32,
}

#[derive(BinRead, BinWrite, Debug)]
#[brw(little)]
pub(super) struct RawResourceDirectory {
    pub characteristics: u32,
    pub timestamp: u32,
    pub major_version: u16,
    pub minor_version: u16,
    pub named_count: u16,
    pub id_count: u16,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone)]
#[brw(little)]
pub(super) struct RawResourceDirectoryEntry {
    pub name_or_id: u32,
    pub offset: u32,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone)]
#[brw(little)]
pub(super) struct RawResourceData {
    pub rva: u32,
    pub size: u32,
    pub codepage: u32,
    pub reserved: u32,
}

#[derive(BinRead, BinWrite, Debug)]
#[brw(little)]
pub(super) struct RawGroupHeader {
    pub reserved: u16,
    pub kind: u16,
    pub count: u16,
}

#[derive(BinRead, BinWrite, Debug, Copy, Clone)]
#[brw(little)]
pub(super) struct RawGroupCursorEntry {
    pub width: u16,
    pub height: u16,
    pub planes: u16,
    pub bit_count: u16,
    pub size: u32,
    pub cursor_id: u16,
}

#[derive(BinWrite, Debug)]
#[bw(little)]
struct RawCurEntry {
    width: u8,
    height: u8,
    color_count: u8,
    reserved: u8,
    hotspot_x: u16,
    hotspot_y: u16,
    size: u32,
    offset: u32,
}

#[derive(Debug, Copy, Clone)]
pub struct PeResource {
    pub type_id: u32,
    pub id: u32,
    pub language: u32,
    offset: u64,
    size: u32,
}

impl PeResource {
    pub fn size(&self) -> u32 {
        self.size
    }
}

#[derive(Debug, Clone)]
pub struct CursorGroup {
    pub id: u32,
    images: Vec<(RawGroupCursorEntry, PeResource)>,
}

impl CursorGroup {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }
}

/// The resources of a PE file.
///
/// Assumes that the underlying file will not change
pub struct PeFile<S: StatelessReader> {
    resources: Vec<PeResource>,
    cursor_groups: Vec<CursorGroup>,
    reader: S,
}

impl<S: StatelessReader> std::fmt::Debug for PeFile<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeFile")
            .field("resources", &self.resources.len())
            .field("cursor_groups", &self.cursor_groups.len())
            .finish()
    }
}

struct ResourceSection {
    raw_offset: u64,
    raw_size: u64,
    virtual_address: u64,
}

fn find_resource_section<S: StatelessReader>(reader: &S) -> Result<Option<ResourceSection>> {
    let mut magic = [0u8; 2];
    reader
        .read_at_exact(0, &mut magic)
        .context("Reading DOS header")?;
    if &magic != b"MZ" {
        bail!("Not an executable, missing MZ signature");
    }
    let mut new_header = [0u8; 4];
    reader
        .read_at_exact(NEW_HEADER_POINTER, &mut new_header)
        .context("Reading DOS header")?;
    let new_header = u32::from_le_bytes(new_header) as u64;

    let mut io = BufReader::new(RangeReader::new(reader));
    io.seek(SeekFrom::Start(new_header))?;
    let coff = RawCoffHeader::read(&mut io).context("Reading COFF header")?;
    io.seek(SeekFrom::Current(coff.optional_header_size as i64))?;

    for index in 0..coff.section_count {
        let section = RawSectionHeader::read(&mut io)
            .with_context(|| format!("Reading section header {}", index))?;
        if &section.name == b".rsrc\0\0\0" {
            let raw_offset = section.raw_offset as u64;
            let raw_size = section.raw_size as u64;
            if raw_offset + raw_size > reader.size() {
                bail!("Resource section extends past the end of the file");
            }
            return Ok(Some(ResourceSection {
                raw_offset,
                raw_size,
                virtual_address: section.virtual_address as u64,
            }));
        }
    }

    Ok(None)
}

fn read_directory<R: io::Read + io::Seek>(
    io: &mut R,
    offset: u64,
) -> Result<Vec<RawResourceDirectoryEntry>> {
    io.seek(SeekFrom::Start(offset))?;
    let directory = RawResourceDirectory::read(io).context("Reading resource directory")?;
    let entries = (0..directory.named_count as u32 + directory.id_count as u32)
        .map(|_| RawResourceDirectoryEntry::read(io))
        .collect::<binrw::BinResult<Vec<_>>>()
        .context("Reading resource directory entries")?;

    Ok(entries
        .into_iter()
        .filter(|entry| entry.name_or_id & SUBDIRECTORY_FLAG == 0)
        .collect())
}

fn subdirectory(entry: &RawResourceDirectoryEntry) -> Result<u64> {
    if entry.offset & SUBDIRECTORY_FLAG == 0 {
        bail!("Expected a resource subdirectory for id {}", entry.name_or_id);
    }
    Ok((entry.offset & !SUBDIRECTORY_FLAG) as u64)
}

fn read_resources<S: StatelessReader>(
    reader: &S,
    section: &ResourceSection,
) -> Result<Vec<PeResource>> {
    let mut io = BufReader::new(RangeReader::with_range(
        reader,
        section.raw_offset,
        section.raw_size,
    ));

    let mut resources = Vec::new();
    for type_entry in read_directory(&mut io, 0)? {
        for id_entry in read_directory(&mut io, subdirectory(&type_entry)?)? {
            // the first language is as good as any other
            let Some(language_entry) = read_directory(&mut io, subdirectory(&id_entry)?)?
                .into_iter()
                .next()
            else {
                continue;
            };
            if language_entry.offset & SUBDIRECTORY_FLAG != 0 {
                bail!("Resource {} has a nested language directory", id_entry.name_or_id);
            }

            io.seek(SeekFrom::Start(language_entry.offset as u64))?;
            let data = RawResourceData::read(&mut io).context("Reading resource data entry")?;

            let offset = (data.rva as u64)
                .checked_sub(section.virtual_address)
                .map(|relative| relative + section.raw_offset)
                .filter(|offset| offset + data.size as u64 <= reader.size())
                .with_context(|| {
                    format!(
                        "Resource {}/{} points outside of the file (rva 0x{:x})",
                        type_entry.name_or_id, id_entry.name_or_id, data.rva
                    )
                })?;

            resources.push(PeResource {
                type_id: type_entry.name_or_id,
                id: id_entry.name_or_id,
                language: language_entry.name_or_id,
                offset,
                size: data.size,
            });
        }
    }

    Ok(resources)
}

fn read_cursor_groups<S: StatelessReader>(
    reader: &S,
    resources: &[PeResource],
) -> Result<Vec<CursorGroup>> {
    let find_cursor = |id: u32| {
        resources
            .iter()
            .find(|r| r.type_id == RT_CURSOR && r.id == id)
            .copied()
    };

    resources
        .iter()
        .filter(|r| r.type_id == RT_GROUP_CURSOR)
        .map(|group| {
            let mut io = RangeReader::with_range(reader, group.offset, group.size as u64);
            let header = RawGroupHeader::read(&mut io)
                .with_context(|| format!("Reading cursor group {}", group.id))?;

            let images = (0..header.count)
                .map(|_| {
                    let entry = RawGroupCursorEntry::read(&mut io)?;
                    let image = find_cursor(entry.cursor_id as u32).with_context(|| {
                        format!(
                            "Cursor group {} references missing cursor {}",
                            group.id, entry.cursor_id
                        )
                    })?;
                    if image.size < HOTSPOT_SIZE {
                        bail!("Cursor {} is too small", entry.cursor_id);
                    }
                    Ok((entry, image))
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(CursorGroup {
                id: group.id,
                images,
            })
        })
        .collect()
}

impl<S: StatelessReader> PeFile<S> {
    pub fn new(reader: S) -> Result<Self> {
        let (resources, cursor_groups) = match find_resource_section(&reader)? {
            Some(section) => {
                let resources = read_resources(&reader, &section)?;
                let cursor_groups = read_cursor_groups(&reader, &resources)?;
                (resources, cursor_groups)
            }
            None => (Vec::new(), Vec::new()),
        };

        Ok(Self {
            resources,
            cursor_groups,
            reader,
        })
    }

    pub fn resources(&self) -> &[PeResource] {
        &self.resources
    }

    pub fn cursor_groups(&self) -> &[CursorGroup] {
        &self.cursor_groups
    }

    /// Builds a `.cur` file out of a cursor group and its images.
    pub fn assemble_cursor(&self, group: usize) -> io::Result<Vec<u8>> {
        let group = self.cursor_groups.get(group).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no such cursor group")
        })?;

        let image_sizes = group
            .images
            .iter()
            .map(|(_, image)| image.size)
            .collect::<Vec<_>>();
        let offsets = cursor_data_offsets(&image_sizes)?;
        let count = group.images.len() as u32;
        let mut out = Cursor::new(Vec::new());
        let to_io = |err: binrw::Error| io::Error::new(io::ErrorKind::InvalidData, err.to_string());

        RawGroupHeader {
            reserved: 0,
            kind: 2,
            count: count as u16,
        }
        .write(&mut out)
        .map_err(to_io)?;

        let mut bitmaps = Vec::new();
        for ((entry, image), data_offset) in group.images.iter().zip(offsets) {
            let mut data = vec![0u8; image.size as usize];
            self.reader.read_at_exact(image.offset, &mut data)?;
            let hotspot_x = u16::from_le_bytes([data[0], data[1]]);
            let hotspot_y = u16::from_le_bytes([data[2], data[3]]);
            let bitmap = data.split_off(HOTSPOT_SIZE as usize);

            RawCurEntry {
                // 256 pixels wraps to 0, as the format intends
                width: entry.width as u8,
                // group entries count the AND mask into the height
                height: (entry.height / 2) as u8,
                color_count: 0,
                reserved: 0,
                hotspot_x,
                hotspot_y,
                size: bitmap.len() as u32,
                offset: data_offset,
            }
            .write(&mut out)
            .map_err(to_io)?;

            bitmaps.push(bitmap);
        }

        let mut out = out.into_inner();
        for bitmap in bitmaps {
            out.extend_from_slice(&bitmap);
        }
        Ok(out)
    }
}

/// Offsets of the bitmaps in an assembled `.cur` file, given the sizes of the cursor images.
fn cursor_data_offsets(image_sizes: &[u32]) -> io::Result<Vec<u32>> {
    let too_large = || io::Error::new(io::ErrorKind::InvalidData, "Cursor group is too large");

    let count = u32::try_from(image_sizes.len()).map_err(|_| too_large())?;
    let mut offset = CUR_ENTRY_SIZE
        .checked_mul(count)
        .and_then(|entries| entries.checked_add(CUR_HEADER_SIZE))
        .ok_or_else(too_large)?;
    image_sizes
        .iter()
        .map(|&size| {
            let start = offset;
            offset = offset
                .checked_add(size.saturating_sub(HOTSPOT_SIZE))
                .ok_or_else(too_large)?;
            Ok(start)
        })
        .collect()
}

impl<S: StatelessReader + Clone> PeFile<S> {
    pub fn open_resource(&self, index: usize) -> Option<RangeReader<S>> {
        let resource = self.resources.get(index)?;
        Some(RangeReader::with_range(
            self.reader.clone(),
            resource.offset,
            resource.size as u64,
        ))
    }
}
