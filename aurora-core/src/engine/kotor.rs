//! Star Wars: Knights of the Old Republic and its sequel.
//!
//! Both games use the 3000s type codes natively, so they need no type aliases. The key/BIF
//! archives (`chitin.key`) are not indexed.

use crate::{
    engine::{EngineProbe, FileList, LoadPlan, LoadStep},
    resource::{ArchiveKind, GameId},
};

fn load_plan(game: GameId, executable: &str, voice_dir: &str) -> LoadPlan {
    LoadPlan::new(game)
        .step(LoadStep::new("Setting base directory").mandatory_directory("", 0, 1))
        .step(
            LoadStep::new("Adding extra archive directories")
                .archive_dir(ArchiveKind::Erf, "modules")
                .archive_dir(ArchiveKind::Erf, "lips")
                .archive_dir(ArchiveKind::Erf, "texturepacks"),
        )
        .step(
            LoadStep::new("Loading texture packs")
                .mandatory_archive(ArchiveKind::Erf, "swpc_tex_gui.erf", 10)
                .mandatory_archive(ArchiveKind::Erf, "swpc_tex_tpa.erf", 11),
        )
        .step(
            LoadStep::new("Indexing extra sound resources")
                .mandatory_directory("streammusic", 0, 20)
                .mandatory_directory("streamsounds", -1, 21)
                .mandatory_directory(voice_dir, -1, 22),
        )
        .step(LoadStep::new("Indexing Windows-specific resources").mandatory_archive(
            ArchiveKind::Exe,
            executable,
            30,
        ))
        .step(
            LoadStep::new("Indexing override files")
                .enabled_by("override")
                .optional_directory("override", 0, 100),
        )
}

#[derive(Debug, Default, Copy, Clone)]
pub struct KotorProbe;

impl EngineProbe for KotorProbe {
    fn game_id(&self) -> GameId {
        GameId::Kotor
    }

    fn probe_files(&self, files: &FileList) -> bool {
        files.contains_any(&["/swkotor.exe", "/swkotor.ini"])
    }

    fn load_plan(&self) -> LoadPlan {
        load_plan(GameId::Kotor, "swkotor.exe", "streamwaves")
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Kotor2Probe;

impl EngineProbe for Kotor2Probe {
    fn game_id(&self) -> GameId {
        GameId::Kotor2
    }

    fn probe_files(&self, files: &FileList) -> bool {
        files.contains_any(&["/swkotor2.exe", "/swkotor2.ini"])
    }

    fn load_plan(&self) -> LoadPlan {
        load_plan(GameId::Kotor2, "swkotor2.exe", "streamvoice")
    }
}
