//! The priority-ordered resource namespace.

use std::{
    collections::{BTreeMap, HashMap},
    io,
    path::{Path, PathBuf},
    sync::Arc,
};

use smartstring::alias::CompactString;
use snafu::{OptionExt as _, ResultExt as _};
use tracing::{debug, trace};

use crate::resource::{
    GameId, ResourceKey, TypeAliasTable,
    archive::{ArchiveReader, Locator, SourceKind},
    error::{ResourceNotFoundSnafu, Result, StreamReadSnafu},
    stream::ResourceStream,
};

/// Identifies a registered source. Doubles as its registration ordinal.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    pub fn ordinal(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A container about to be registered with a [`ResourceIndex`].
#[derive(Debug)]
pub struct Source {
    pub label: CompactString,
    pub path: PathBuf,
    /// Engine scope used to alias the raw type codes of this source.
    pub scope: GameId,
    pub reader: ArchiveReader,
}

impl Source {
    pub fn new(
        label: impl Into<CompactString>,
        path: impl Into<PathBuf>,
        scope: GameId,
        reader: ArchiveReader,
    ) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            scope,
            reader,
        }
    }
}

/// A source owned by the index.
#[derive(Debug)]
pub struct IndexedSource {
    id: SourceId,
    priority: u32,
    entry_count: usize,
    source: Source,
}

impl IndexedSource {
    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn label(&self) -> &str {
        &self.source.label
    }

    pub fn path(&self) -> &Path {
        &self.source.path
    }

    pub fn kind(&self) -> SourceKind {
        self.source.reader.kind()
    }

    pub fn reader(&self) -> &ArchiveReader {
        &self.source.reader
    }

    /// The rank used to pick winners: priority first, then registration order.
    fn rank(&self) -> (u32, u64) {
        (self.priority, self.id.0)
    }
}

/// Summary of a registered source, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: SourceId,
    pub label: CompactString,
    pub kind: SourceKind,
    pub path: PathBuf,
    pub priority: u32,
    pub entry_count: usize,
}

/// One provider of a resource.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    key: ResourceKey,
    source: Arc<IndexedSource>,
    locator: Locator,
}

impl IndexEntry {
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn source(&self) -> &IndexedSource {
        &self.source
    }

    pub fn priority(&self) -> u32 {
        self.source.priority
    }

    pub fn ordinal(&self) -> u64 {
        self.source.id.0
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    /// Opens the resource. May block on container I/O.
    pub fn open(&self) -> io::Result<ResourceStream> {
        self.source.reader().open(&self.locator)
    }
}

/// Maps resource keys to their providers.
///
/// All candidates for a key are kept, sorted by (priority, ordinal), so that removing a source
/// can fall back to the next best provider. The last candidate is the winner.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    sources: BTreeMap<SourceId, Arc<IndexedSource>>,
    entries: HashMap<ResourceKey, Vec<IndexEntry>>,
    next_ordinal: u64,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a source and indexes every entry it exposes.
    ///
    /// Raw type codes are resolved with `aliases` in the scope of the source. Entries whose code
    /// resolves to nothing are not indexed.
    pub fn register_source(
        &mut self,
        source: Source,
        priority: u32,
        aliases: &TypeAliasTable,
    ) -> SourceId {
        let id = SourceId(self.next_ordinal);
        self.next_ordinal += 1;

        let keyed = source
            .reader
            .entries()
            .into_iter()
            .filter_map(|entry| match aliases.resolve(source.scope, entry.type_code) {
                Some(ty) => Some((ResourceKey::new(&entry.name, ty), entry.locator)),
                None => {
                    trace!(
                        "Skipping {} from {}, unknown type code {}",
                        entry.name, source.label, entry.type_code
                    );
                    None
                }
            })
            .collect::<Vec<_>>();

        let source = Arc::new(IndexedSource {
            id,
            priority,
            entry_count: keyed.len(),
            source,
        });
        debug!(
            "Indexed {} resources from {} ({}, priority {})",
            keyed.len(),
            source.label(),
            id,
            priority
        );

        let rank = source.rank();
        for (key, locator) in keyed {
            let candidates = self.entries.entry(key.clone()).or_default();
            // equal ranks only happen inside one source; the later entry wins there too
            let position = candidates.partition_point(|c| c.source.rank() <= rank);
            candidates.insert(
                position,
                IndexEntry {
                    key,
                    source: source.clone(),
                    locator,
                },
            );
        }
        self.sources.insert(id, source);

        id
    }

    /// Drops a source and everything it contributed. Returns `false` if it was not registered.
    pub fn remove_source(&mut self, id: SourceId) -> bool {
        let Some(source) = self.sources.remove(&id) else {
            return false;
        };

        self.entries.retain(|_, candidates| {
            candidates.retain(|c| c.source.id != id);
            !candidates.is_empty()
        });
        debug!("Removed source {} ({})", source.label(), id);
        true
    }

    pub fn has(&self, key: &ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    /// The provider with the highest priority, ties going to the later registration.
    pub fn winner(&self, key: &ResourceKey) -> Result<&IndexEntry> {
        self.entries
            .get(key)
            .and_then(|candidates| candidates.last())
            .context(ResourceNotFoundSnafu { key: key.clone() })
    }

    /// Every provider of `key`, from the lowest rank to the winner.
    pub fn candidates(&self, key: &ResourceKey) -> &[IndexEntry] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn open(&self, key: &ResourceKey) -> Result<ResourceStream> {
        self.winner(key)?
            .open()
            .context(StreamReadSnafu { key: key.clone() })
    }

    /// The winner of every key, in no particular order.
    pub fn iter_winners(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values().filter_map(|candidates| candidates.last())
    }

    /// Registered sources in registration order.
    pub fn sources(&self) -> impl Iterator<Item = SourceInfo> + '_ {
        self.sources.values().map(|source| SourceInfo {
            id: source.id,
            label: source.source.label.clone(),
            kind: source.kind(),
            path: source.source.path.clone(),
            priority: source.priority,
            entry_count: source.entry_count,
        })
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{ResourceIndex, Source};
    use crate::resource::{
        GameId, ResourceError, ResourceKey, ResourceType, TypeAliasTable,
        archive::{ArchiveReader, SearchDepth},
    };

    fn directory(path: &Path, files: &[(&str, &[u8])]) -> Source {
        std::fs::create_dir_all(path).unwrap();
        for (name, data) in files {
            std::fs::write(path.join(name), data).unwrap();
        }
        let reader = ArchiveReader::open_directory(path, SearchDepth::Flat, None).unwrap();
        Source::new(
            path.file_name().unwrap().to_string_lossy().into_owned(),
            path,
            GameId::Nwn2,
            reader,
        )
    }

    fn read(index: &ResourceIndex, key: &ResourceKey) -> Vec<u8> {
        index.open(key).unwrap().read_all().unwrap()
    }

    #[test]
    fn empty_index() {
        let index = ResourceIndex::new();
        let key = ResourceKey::new("creature", ResourceType::Utc);
        assert!(!index.has(&key));
        assert!(index.is_empty());
        assert!(matches!(
            index.open(&key).unwrap_err(),
            ResourceError::ResourceNotFound { .. }
        ));
    }

    #[test]
    fn override_beats_data() {
        let dir = tempfile::tempdir().unwrap();
        let aliases = TypeAliasTable::new();
        let mut index = ResourceIndex::new();

        index.register_source(
            directory(&dir.path().join("data"), &[("creature.utc", b"base")]),
            1,
            &aliases,
        );
        index.register_source(
            directory(&dir.path().join("override"), &[("Creature.UTC", b"modded")]),
            100,
            &aliases,
        );

        let key = ResourceKey::new("CREATURE", ResourceType::Utc);
        let winner = index.winner(&key).unwrap();
        assert_eq!(winner.source().label(), "override");
        assert_eq!(winner.priority(), 100);
        assert_eq!(read(&index, &key), b"modded");
    }

    #[test]
    fn priority_then_ordinal() {
        let dir = tempfile::tempdir().unwrap();
        let aliases = TypeAliasTable::new();
        let mut index = ResourceIndex::new();
        let key = ResourceKey::new("a", ResourceType::TwoDa);

        // higher priority registered first still wins
        let high = directory(&dir.path().join("high"), &[("a.2da", b"high")]);
        let low = directory(&dir.path().join("low"), &[("a.2da", b"low")]);
        index.register_source(high, 50, &aliases);
        index.register_source(low, 10, &aliases);
        assert_eq!(read(&index, &key), b"high");

        // equal priority goes to the later registration
        let late = index.register_source(
            directory(&dir.path().join("late"), &[("a.2da", b"late")]),
            50,
            &aliases,
        );
        assert_eq!(read(&index, &key), b"late");
        assert_eq!(index.winner(&key).unwrap().ordinal(), late.ordinal());

        // repeated queries are stable
        for _ in 0..3 {
            assert_eq!(index.winner(&key).unwrap().source().id(), late);
        }

        let ranks = index
            .candidates(&key)
            .iter()
            .map(|c| (c.priority(), c.ordinal()))
            .collect::<Vec<_>>();
        assert_eq!(ranks, [(10, 1), (50, 0), (50, 2)]);
    }

    #[test]
    fn removal_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let aliases = TypeAliasTable::new();
        let mut index = ResourceIndex::new();

        let base = index.register_source(
            directory(&dir.path().join("data"), &[("a.2da", b"base"), ("b.2da", b"only")]),
            1,
            &aliases,
        );
        let modded = index.register_source(
            directory(&dir.path().join("override"), &[("a.2da", b"modded")]),
            100,
            &aliases,
        );
        assert_eq!(index.len(), 2);

        assert!(index.remove_source(modded));
        assert!(!index.remove_source(modded));
        assert_eq!(read(&index, &ResourceKey::new("a", ResourceType::TwoDa)), b"base");

        assert!(index.remove_source(base));
        assert!(index.is_empty());
        assert_eq!(index.source_count(), 0);
    }

    #[test]
    fn aliases_apply_per_scope() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fx.hak");
        let data = crate::format::test_util::ErfBuilder::new(
            *b"HAK ",
            crate::format::test_util::ErfFixtureVersion::V11,
        )
        .entry("glow", 3006, b"sef data")
        .entry("mystery", 65000, b"???")
        .build();
        std::fs::write(&path, data).unwrap();

        let mut aliases = TypeAliasTable::new();
        aliases.register(GameId::Nwn2, 3006, ResourceType::Sef).unwrap();

        let mut index = ResourceIndex::new();
        let reader = ArchiveReader::open_archive(crate::resource::ArchiveKind::Erf, &path).unwrap();
        index.register_source(Source::new("fx.hak", &path, GameId::Nwn2, reader), 5, &aliases);

        assert!(index.has(&ResourceKey::new("glow", ResourceType::Sef)));
        assert_eq!(index.len(), 1);

        let info = index.sources().next().unwrap();
        assert_eq!(info.entry_count, 1);
        assert_eq!(info.priority, 5);
        assert_eq!(info.kind.to_string(), "erf");
    }

    #[test]
    fn iter_winners_lists_each_key_once() {
        let dir = tempfile::tempdir().unwrap();
        let aliases = TypeAliasTable::new();
        let mut index = ResourceIndex::new();
        index.register_source(
            directory(&dir.path().join("one"), &[("a.2da", b"1"), ("b.2da", b"1")]),
            1,
            &aliases,
        );
        index.register_source(directory(&dir.path().join("two"), &[("a.2da", b"2")]), 2, &aliases);

        let mut winners = index
            .iter_winners()
            .map(|e| (e.key().to_string(), e.source().label().to_string()))
            .collect::<Vec<_>>();
        winners.sort();
        assert_eq!(
            winners,
            [
                ("a.2da".to_string(), "two".to_string()),
                ("b.2da".to_string(), "one".to_string())
            ]
        );
    }
}
