use std::path::{Path, PathBuf};

use snafu::{ResultExt as _, ensure};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::resource::{
    ResourceType,
    archive::{ArchiveEntry, Locator},
    error::{Result, SourceNotFoundSnafu, SourceUnreadableSnafu},
};

/// How deep to descend into subdirectories when indexing a directory.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SearchDepth {
    /// Only the files directly inside the directory.
    Flat,
    /// Up to this many levels of subdirectories.
    Limited(u32),
    Unbounded,
}

impl SearchDepth {
    /// Converts the numeric convention used by load plans: `-1` (or any negative value) is
    /// unbounded, `0` is flat.
    pub fn from_raw(depth: i32) -> Self {
        match depth {
            d if d < 0 => SearchDepth::Unbounded,
            0 => SearchDepth::Flat,
            d => SearchDepth::Limited(d as u32),
        }
    }

    fn max_walk_depth(self) -> usize {
        match self {
            SearchDepth::Flat => 1,
            SearchDepth::Limited(depth) => depth as usize + 1,
            SearchDepth::Unbounded => usize::MAX,
        }
    }
}

/// Loose resource files in a directory tree.
///
/// The tree is scanned once, when the reader is created.
#[derive(Debug)]
pub struct DirectoryReader {
    root: PathBuf,
    entries: Vec<ArchiveEntry>,
}

impl DirectoryReader {
    /// Scans `root`.
    ///
    /// `type_filter` restricts the scan to files whose raw type code matches.
    pub fn new(root: &Path, depth: SearchDepth, type_filter: Option<u32>) -> Result<Self> {
        ensure!(root.is_dir(), SourceNotFoundSnafu { path: root });

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .min_depth(1)
            .max_depth(depth.max_walk_depth())
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(std::io::Error::from)
                .context(SourceUnreadableSnafu { path: root })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let Some((name, extension)) = file_name.rsplit_once('.') else {
                trace!("Skipping {:?}, no extension", entry.path());
                continue;
            };
            let Some(ty) = ResourceType::from_extension(extension) else {
                trace!("Skipping {:?}, unknown extension", entry.path());
                continue;
            };
            if type_filter.is_some_and(|filter| filter != ty.code()) {
                continue;
            }

            entries.push(ArchiveEntry {
                name: name.into(),
                type_code: ty.code(),
                locator: Locator::Path(entry.path().to_path_buf()),
            });
        }

        debug!("Found {} resource files in {:?}", entries.len(), root);
        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }
}
