use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use snafu::{OptionExt as _, ResultExt as _, ensure};
use tracing::{debug, info, instrument, trace};

use crate::resource::{
    GameId, ResourceError, ResourceKey, ResourceType, TypeAliasTable,
    archive::{ArchiveKind, ArchiveReader, SearchDepth},
    error::{Result, SourceNotFoundSnafu, SourceUnreadableSnafu, StreamReadSnafu},
    fs::resolve_nocase,
    index::{IndexEntry, ResourceIndex, Source, SourceId, SourceInfo},
    stream::ResourceStream,
};

#[derive(Debug, Default)]
struct ManagerState {
    index: ResourceIndex,
    aliases: TypeAliasTable,
    base_dir: Option<PathBuf>,
    archive_dirs: Vec<(ArchiveKind, PathBuf)>,
}

/// The resource service of one engine session.
///
/// Registration is the write phase: sources are opened and scanned without holding the lock,
/// then inserted under one exclusive lock, so a reader never sees half of a source. Queries only
/// take the shared lock, and [`ResourceManager::open`] releases it before touching the container.
#[derive(Debug)]
pub struct ResourceManager {
    scope: GameId,
    state: RwLock<ManagerState>,
}

impl ResourceManager {
    pub fn new(scope: GameId) -> Self {
        Self {
            scope,
            state: RwLock::new(ManagerState::default()),
        }
    }

    /// The engine scope that type aliases and sources are registered in.
    pub fn scope(&self) -> GameId {
        self.scope
    }

    /// Sets the installation root that relative paths are resolved against.
    #[instrument(skip(self))]
    pub fn set_base_dir(&self, path: &Path) -> Result<()> {
        ensure!(path.is_dir(), SourceNotFoundSnafu { path });
        let path = path.canonicalize().context(SourceUnreadableSnafu { path })?;
        debug!("Base directory is {:?}", path);
        self.state.write().base_dir = Some(path);
        Ok(())
    }

    pub fn base_dir(&self) -> Option<PathBuf> {
        self.state.read().base_dir.clone()
    }

    /// Case-insensitively resolves a path relative to the base directory.
    ///
    /// `Err` carries the path that was looked for.
    fn resolve(&self, path: &Path) -> std::result::Result<PathBuf, PathBuf> {
        let base = self.base_dir().unwrap_or_else(|| PathBuf::from("."));
        resolve_nocase(&base, path).ok_or_else(|| base.join(path))
    }

    /// Like [`ResourceManager::resolve`], but bare file names are also looked up in the archive
    /// directories of `kind`.
    fn resolve_archive(
        &self,
        kind: ArchiveKind,
        path: &Path,
    ) -> std::result::Result<PathBuf, PathBuf> {
        let missing = match self.resolve(path) {
            Ok(found) if found.is_file() => return Ok(found),
            Ok(found) => found,
            Err(missing) => missing,
        };
        if path.components().count() != 1 {
            return Err(missing);
        }

        let archive_dirs = self.state.read().archive_dirs.clone();
        archive_dirs
            .iter()
            .filter(|(dir_kind, _)| *dir_kind == kind)
            .find_map(|(_, dir)| resolve_nocase(dir, path).filter(|found| found.is_file()))
            .ok_or(missing)
    }

    fn insert(&self, source: Source, priority: u32) -> SourceId {
        let state = &mut *self.state.write();
        state.index.register_source(source, priority, &state.aliases)
    }

    fn index_directory(
        &self,
        path: &Path,
        depth: i32,
        type_filter: Option<u32>,
        priority: u32,
        required: bool,
    ) -> Result<Option<SourceId>> {
        let resolved = match self.resolve(path) {
            Ok(resolved) => resolved,
            Err(missing) if required => return SourceNotFoundSnafu { path: missing }.fail(),
            Err(missing) => {
                info!("Skipping optional directory {:?}, it does not exist", missing);
                return Ok(None);
            }
        };

        let reader =
            ArchiveReader::open_directory(&resolved, SearchDepth::from_raw(depth), type_filter)?;
        let label = match path.as_os_str().is_empty() {
            true => ".".into(),
            false => path.to_string_lossy(),
        };
        let source = Source::new(&*label, resolved, self.scope, reader);
        Ok(Some(self.insert(source, priority)))
    }

    /// Indexes the resource files in a directory, failing if it does not exist.
    ///
    /// `depth` is `0` for the directory alone, `-1` for the whole tree. `type_filter` restricts
    /// indexing to one raw type code.
    #[instrument(skip(self))]
    pub fn index_mandatory_directory(
        &self,
        path: &Path,
        depth: i32,
        type_filter: Option<u32>,
        priority: u32,
    ) -> Result<SourceId> {
        self.index_directory(path, depth, type_filter, priority, true)?
            .context(SourceNotFoundSnafu { path })
    }

    /// Like [`ResourceManager::index_mandatory_directory`], but a missing directory is skipped.
    #[instrument(skip(self))]
    pub fn index_optional_directory(
        &self,
        path: &Path,
        depth: i32,
        type_filter: Option<u32>,
        priority: u32,
    ) -> Result<Option<SourceId>> {
        self.index_directory(path, depth, type_filter, priority, false)
    }

    fn index_archive(
        &self,
        kind: ArchiveKind,
        path: &Path,
        priority: u32,
        required: bool,
    ) -> Result<Option<SourceId>> {
        let resolved = match self.resolve_archive(kind, path) {
            Ok(resolved) => resolved,
            Err(missing) if required => return SourceNotFoundSnafu { path: missing }.fail(),
            Err(missing) => {
                info!("Skipping optional archive {:?}, it does not exist", missing);
                return Ok(None);
            }
        };

        // corruption is fatal even for optional archives
        let reader = ArchiveReader::open_archive(kind, &resolved)?;
        let label = resolved
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_else(|| path.to_string_lossy());
        let source = Source::new(&*label, resolved.clone(), self.scope, reader);
        Ok(Some(self.insert(source, priority)))
    }

    /// Indexes an archive, failing if it does not exist.
    ///
    /// A bare file name is looked up in the base directory first, then in the archive
    /// directories registered for `kind`.
    #[instrument(skip(self))]
    pub fn index_mandatory_archive(
        &self,
        kind: ArchiveKind,
        path: &Path,
        priority: u32,
    ) -> Result<SourceId> {
        self.index_archive(kind, path, priority, true)?
            .context(SourceNotFoundSnafu { path })
    }

    /// Like [`ResourceManager::index_mandatory_archive`], but a missing archive is skipped.
    #[instrument(skip(self))]
    pub fn index_optional_archive(
        &self,
        kind: ArchiveKind,
        path: &Path,
        priority: u32,
    ) -> Result<Option<SourceId>> {
        self.index_archive(kind, path, priority, false)
    }

    /// Registers a directory holding archives of `kind`.
    ///
    /// Nothing is indexed: the archives are only found by name later.
    #[instrument(skip(self))]
    pub fn add_archive_dir(&self, kind: ArchiveKind, path: &Path) -> Result<()> {
        let resolved = self
            .resolve(path)
            .map_err(|missing| ResourceError::SourceNotFound { path: missing })?;
        ensure!(resolved.is_dir(), SourceNotFoundSnafu { path: resolved });

        debug!("Looking for {} archives in {:?}", kind, resolved);
        self.state.write().archive_dirs.push((kind, resolved));
        Ok(())
    }

    /// Lists the archives of `kind` found in the registered archive directories.
    pub fn archives(&self, kind: ArchiveKind) -> Result<Vec<PathBuf>> {
        let archive_dirs = self.state.read().archive_dirs.clone();

        let mut archives = Vec::new();
        for (_, dir) in archive_dirs.iter().filter(|(dir_kind, _)| *dir_kind == kind) {
            for entry in std::fs::read_dir(dir).context(SourceUnreadableSnafu { path: dir })? {
                let path = entry.context(SourceUnreadableSnafu { path: dir })?.path();
                if path.is_file() && ArchiveKind::from_path(&path) == Some(kind) {
                    archives.push(path);
                }
            }
        }
        archives.sort();
        Ok(archives)
    }

    /// Aliases a raw type code in the scope of this manager.
    ///
    /// Only affects sources registered afterwards.
    pub fn add_type_alias(&self, code: u32, canonical: ResourceType) -> Result<()> {
        self.state
            .write()
            .aliases
            .register(self.scope, code, canonical)
    }

    pub fn remove_source(&self, id: SourceId) -> bool {
        self.state.write().index.remove_source(id)
    }

    pub fn has(&self, name: &str, ty: ResourceType) -> bool {
        self.state.read().index.has(&ResourceKey::new(name, ty))
    }

    pub fn winner(&self, name: &str, ty: ResourceType) -> Result<IndexEntry> {
        self.state
            .read()
            .index
            .winner(&ResourceKey::new(name, ty))
            .cloned()
    }

    /// Every provider of a resource, the winner last.
    pub fn candidates(&self, name: &str, ty: ResourceType) -> Vec<IndexEntry> {
        self.state
            .read()
            .index
            .candidates(&ResourceKey::new(name, ty))
            .to_vec()
    }

    /// Opens the winning provider of a resource. May block on container I/O.
    #[instrument(skip(self))]
    pub fn open(&self, name: &str, ty: ResourceType) -> Result<ResourceStream> {
        let entry = self.winner(name, ty)?;
        trace!("{} resolves to {}", entry.key(), entry.source().label());
        entry.open().context(StreamReadSnafu {
            key: entry.key().clone(),
        })
    }

    /// Reads a whole resource into memory.
    pub fn read_all(&self, name: &str, ty: ResourceType) -> Result<Vec<u8>> {
        let key = ResourceKey::new(name, ty);
        self.open(name, ty)?
            .read_all()
            .context(StreamReadSnafu { key })
    }

    pub fn sources(&self) -> Vec<SourceInfo> {
        self.state.read().index.sources().collect()
    }

    /// Snapshot of the winner of every key, sorted by key.
    pub fn winners(&self) -> Vec<IndexEntry> {
        let mut winners = self
            .state
            .read()
            .index
            .iter_winners()
            .cloned()
            .collect::<Vec<_>>();
        winners.sort_by(|a, b| a.key().cmp(b.key()));
        winners
    }

    /// Number of distinct resources.
    pub fn resource_count(&self) -> usize {
        self.state.read().index.len()
    }
}
