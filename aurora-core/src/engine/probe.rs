use std::{
    collections::BTreeSet,
    fs::File,
    io::{BufReader, Read},
    path::{Path, PathBuf},
};

use snafu::{ResultExt as _, ensure};
use tracing::{debug, instrument, trace};

use crate::{
    engine::{EngineSession, LoadPlan},
    resource::{
        GameId,
        error::{EmptyTargetSnafu, Result, SourceNotFoundSnafu, SourceUnreadableSnafu},
    },
};

/// The files at the root of a candidate installation.
///
/// Names are stored lowercased and anchored with a leading `/`, so `contains("/NWN2.ini")`
/// matches a file called `nwn2.INI` in the root but nothing in subdirectories.
#[derive(Debug, Clone, Default)]
pub struct FileList {
    root: PathBuf,
    files: BTreeSet<String>,
}

impl FileList {
    /// Lists the files directly inside `root`.
    #[instrument]
    pub fn from_dir(root: &Path) -> Result<Self> {
        ensure!(root.is_dir(), SourceNotFoundSnafu { path: root });

        let mut files = BTreeSet::new();
        for entry in std::fs::read_dir(root).context(SourceUnreadableSnafu { path: root })? {
            let entry = entry.context(SourceUnreadableSnafu { path: root })?;
            let file_type = entry
                .file_type()
                .context(SourceUnreadableSnafu { path: entry.path() })?;
            if file_type.is_file() {
                files.insert(Self::anchor(&entry.file_name().to_string_lossy()));
            }
        }

        trace!("{} files in {:?}", files.len(), root);
        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    pub fn from_names<'a>(root: &Path, names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            root: root.to_path_buf(),
            files: names.into_iter().map(Self::anchor).collect(),
        }
    }

    fn anchor(name: &str) -> String {
        format!("/{}", name.trim_start_matches('/').to_ascii_lowercase())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Case-insensitive lookup of a root-anchored name like `/nwn2main.exe`.
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains(&Self::anchor(name))
    }

    /// Whether any of `markers` is present.
    pub fn contains_any(&self, markers: &[&str]) -> bool {
        markers.iter().any(|marker| self.contains(marker))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Decides whether an installation belongs to an engine, and creates sessions for it.
pub trait EngineProbe: std::fmt::Debug + Send + Sync {
    fn game_id(&self) -> GameId;

    fn game_name(&self) -> String {
        self.game_id().to_string()
    }

    /// Checks the root listing of an installation directory.
    fn probe_files(&self, files: &FileList) -> bool;

    /// Checks the header of a single file. Engines detected by their root listing never claim
    /// streams.
    fn probe_stream(&self, _stream: &mut dyn Read) -> bool {
        false
    }

    /// The resources this engine indexes on startup.
    fn load_plan(&self) -> LoadPlan;

    fn create_engine(&self, target: &Path) -> EngineSession {
        EngineSession::new(target, self.load_plan())
    }
}

/// Finds the first probe that claims `target`.
///
/// Directories are probed by their root listing, files by their contents. An empty directory or
/// an empty file is an [`EmptyTarget`](crate::resource::ResourceError::EmptyTarget) error, since
/// there is nothing any probe could recognize.
#[instrument(skip(probes))]
pub fn detect_engine<'a>(
    target: &Path,
    probes: &'a [Box<dyn EngineProbe>],
) -> Result<Option<&'a dyn EngineProbe>> {
    ensure!(target.exists(), SourceNotFoundSnafu { path: target });

    if target.is_dir() {
        let files = FileList::from_dir(target)?;
        let has_subdirectories = std::fs::read_dir(target)
            .context(SourceUnreadableSnafu { path: target })?
            .next()
            .is_some();
        ensure!(
            !files.is_empty() || has_subdirectories,
            EmptyTargetSnafu { path: target }
        );

        for probe in probes {
            if probe.probe_files(&files) {
                debug!("{:?} is {}", target, probe.game_name());
                return Ok(Some(&**probe));
            }
        }
    } else {
        let size = target
            .metadata()
            .context(SourceUnreadableSnafu { path: target })?
            .len();
        ensure!(size > 0, EmptyTargetSnafu { path: target });

        for probe in probes {
            let file = File::open(target).context(SourceUnreadableSnafu { path: target })?;
            if probe.probe_stream(&mut BufReader::new(file)) {
                debug!("{:?} is {}", target, probe.game_name());
                return Ok(Some(&**probe));
            }
        }
    }

    debug!("No engine claims {:?}", target);
    Ok(None)
}

#[cfg(test)]
mod tests {
    use std::{io::Read, path::Path};

    use super::{EngineProbe, FileList, detect_engine};
    use crate::{
        engine::{LoadPlan, builtin_probes},
        resource::{GameId, ResourceError},
    };

    #[test]
    fn file_list_is_anchored_and_case_insensitive() {
        let files = FileList::from_names(Path::new("/games/nwn2"), ["NWN2Main.exe", "dialog.TLK"]);
        assert!(files.contains("/nwn2main.exe"));
        assert!(files.contains("/DIALOG.tlk"));
        assert!(!files.contains("/data/2da.zip"));
        assert!(files.contains_any(&["/nwn2.ini", "/nwn2main.exe"]));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn lists_root_files_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NWN2.ini"), b"[Display]").unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data").join("2da.zip"), b"").unwrap();

        let files = FileList::from_dir(dir.path()).unwrap();
        assert_eq!(files.iter().collect::<Vec<_>>(), ["/nwn2.ini"]);
    }

    #[test]
    fn detects_engines() {
        let probes = builtin_probes();
        let dir = tempfile::tempdir().unwrap();

        let nwn2 = dir.path().join("nwn2");
        std::fs::create_dir(&nwn2).unwrap();
        std::fs::write(nwn2.join("nwn2main.EXE"), b"MZ").unwrap();
        let probe = detect_engine(&nwn2, &probes).unwrap().unwrap();
        assert_eq!(probe.game_id(), GameId::Nwn2);
        assert_eq!(probe.game_name(), "Neverwinter Nights 2");

        let kotor2 = dir.path().join("kotor2");
        std::fs::create_dir(&kotor2).unwrap();
        std::fs::write(kotor2.join("swkotor2.ini"), b"").unwrap();
        let probe = detect_engine(&kotor2, &probes).unwrap().unwrap();
        assert_eq!(probe.game_id(), GameId::Kotor2);

        let other = dir.path().join("other");
        std::fs::create_dir(&other).unwrap();
        std::fs::write(other.join("readme.txt"), b"hello").unwrap();
        assert!(detect_engine(&other, &probes).unwrap().is_none());

        // a single file is only probed by its contents, which no engine claims
        assert!(
            detect_engine(&nwn2.join("nwn2main.EXE"), &probes)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn empty_targets() {
        let probes = builtin_probes();
        let dir = tempfile::tempdir().unwrap();

        let err = detect_engine(dir.path(), &probes).unwrap_err();
        assert!(matches!(err, ResourceError::EmptyTarget { .. }));

        let file = dir.path().join("empty.bin");
        std::fs::write(&file, b"").unwrap();
        let err = detect_engine(&file, &probes).unwrap_err();
        assert!(matches!(err, ResourceError::EmptyTarget { .. }));

        let err = detect_engine(&dir.path().join("missing"), &probes).unwrap_err();
        assert!(matches!(err, ResourceError::SourceNotFound { .. }));
    }

    #[derive(Debug)]
    struct MagicProbe;

    impl EngineProbe for MagicProbe {
        fn game_id(&self) -> GameId {
            GameId::Jade
        }

        fn probe_files(&self, _files: &FileList) -> bool {
            false
        }

        fn probe_stream(&self, stream: &mut dyn Read) -> bool {
            let mut magic = [0u8; 4];
            stream.read_exact(&mut magic).is_ok() && &magic == b"JADE"
        }

        fn load_plan(&self) -> LoadPlan {
            LoadPlan::new(GameId::Jade)
        }
    }

    #[test]
    fn stream_probes_see_file_contents() {
        let probes: Vec<Box<dyn EngineProbe>> = vec![Box::new(MagicProbe)];
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("game.bin");
        std::fs::write(&file, b"JADE and more").unwrap();

        let probe = detect_engine(&file, &probes).unwrap().unwrap();
        assert_eq!(probe.game_id(), GameId::Jade);
    }
}
