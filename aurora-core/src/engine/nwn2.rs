//! Neverwinter Nights 2.

use crate::{
    engine::{EngineProbe, FileList, LoadPlan, LoadStep},
    resource::{ArchiveKind, GameId, ResourceType},
};

const MARKERS: &[&str] = &["/nwn2.ini", "/nwn2main.exe"];

/// NWN2 file types live in the 3000s block, which the other engines use for something else.
const TYPE_ALIASES: &[(u32, ResourceType)] = &[
    (3000, ResourceType::Osc),
    (3001, ResourceType::Usc),
    (3002, ResourceType::Trn),
    (3003, ResourceType::Utr),
    (3004, ResourceType::Uen),
    (3005, ResourceType::Ult),
    (3006, ResourceType::Sef),
    (3007, ResourceType::Pfx),
    (3008, ResourceType::Cam),
    (3009, ResourceType::Lfx),
    (3010, ResourceType::Bfx),
    (3011, ResourceType::Upe),
    (3012, ResourceType::Ros),
    (3013, ResourceType::Rst),
    (3014, ResourceType::Ifx),
    (3015, ResourceType::Pfb),
    (3016, ResourceType::Zip),
    (3017, ResourceType::Wmp),
    (3018, ResourceType::Bbx),
    (3019, ResourceType::Tfx),
    (3020, ResourceType::Wlk),
    (3021, ResourceType::Xml),
    (3022, ResourceType::Scc),
    (3033, ResourceType::Ptx),
    (3034, ResourceType::Ltx),
    (3035, ResourceType::Trx),
];

const BASE_ARCHIVES: &[&str] = &[
    "2da",
    "actors",
    "animtags",
    "convo",
    "ini",
    "lod-merged",
    "music",
    "nwn2_materials",
    "nwn2_models",
    "nwn2_vfx",
    "prefabs",
    "scripts",
    "sounds",
    "soundsets",
    "speedtree",
    "templates",
    "vo",
    "walkmesh",
];

/// Mask of the Betrayer. Same set as the base game, with soundsets sorted before sounds.
const X1_ARCHIVES: &[&str] = &[
    "2da",
    "actors",
    "animtags",
    "convo",
    "ini",
    "lod-merged",
    "music",
    "nwn2_materials",
    "nwn2_models",
    "nwn2_vfx",
    "prefabs",
    "scripts",
    "soundsets",
    "sounds",
    "speedtree",
    "templates",
    "vo",
    "walkmesh",
];

/// Storm of Zehir.
const X2_ARCHIVES: &[&str] = &[
    "2da",
    "actors",
    "animtags",
    "lod-merged",
    "music",
    "nwn2_materials",
    "nwn2_models",
    "nwn2_vfx",
    "prefabs",
    "scripts",
    "soundsets",
    "sounds",
    "speedtree",
    "templates",
    "vo",
];

/// Adds `<name><suffix>.zip` for every name, with priorities counting up from `first_priority`.
fn zip_band(
    mut step: LoadStep,
    names: &[&str],
    suffix: &str,
    first_priority: u32,
    optional: bool,
) -> LoadStep {
    for (priority, name) in (first_priority..).zip(names) {
        let path = format!("{}{}.zip", name, suffix);
        step = match optional {
            true => step.optional_archive(ArchiveKind::Zip, &path, priority),
            false => step.mandatory_archive(ArchiveKind::Zip, &path, priority),
        };
    }
    step
}

/// The resources of a NWN2 installation.
///
/// Base game archives take priorities 1-18, the first expansion 20-37, the second 40-54. Loose
/// directories follow at 60-69, the executable at 70 and the override directory tops it at 100.
pub fn load_plan() -> LoadPlan {
    let plan = TYPE_ALIASES
        .iter()
        .fold(LoadPlan::new(GameId::Nwn2), |plan, &(code, canonical)| {
            plan.alias(code, canonical)
        });

    plan.step(LoadStep::new("Setting base directory").mandatory_directory("", 0, 1))
        .step(
            LoadStep::new("Adding extra archive directories")
                .archive_dir(ArchiveKind::Zip, "data")
                .archive_dir(ArchiveKind::Erf, "modules")
                .archive_dir(ArchiveKind::Erf, "hak"),
        )
        .step(zip_band(
            LoadStep::new("Loading main resource files"),
            BASE_ARCHIVES,
            "",
            1,
            false,
        ))
        .step(zip_band(
            zip_band(
                LoadStep::new("Loading expansions resource files"),
                X1_ARCHIVES,
                "_x1",
                20,
                true,
            ),
            X2_ARCHIVES,
            "_x2",
            40,
            true,
        ))
        .step(
            LoadStep::new("Indexing extra sound resources")
                .mandatory_directory("ambient", 0, 60)
                .optional_directory("ambient_x1", 0, 61)
                .optional_directory("ambient_x2", 0, 62),
        )
        .step(
            LoadStep::new("Indexing extra music resources")
                .mandatory_directory("music", 0, 63)
                .optional_directory("music_x1", 0, 64)
                .optional_directory("music_x2", 0, 65),
        )
        .step(LoadStep::new("Indexing extra movie resources").mandatory_directory("movies", 0, 66))
        .step(
            LoadStep::new("Indexing extra effects resources").mandatory_directory("effects", 0, 67),
        )
        .step(
            LoadStep::new("Indexing extra character resources")
                .mandatory_directory("localvault", 0, 68),
        )
        .step(LoadStep::new("Indexing extra UI resources").mandatory_directory("ui", -1, 69))
        .step(
            LoadStep::new("Indexing Windows-specific resources").mandatory_archive(
                ArchiveKind::Exe,
                "nwn2main.exe",
                70,
            ),
        )
        .step(
            LoadStep::new("Indexing override files")
                .enabled_by("override")
                .optional_directory("override", 0, 100),
        )
        .cursor("cursor0", "default", "up")
        .cursor("cursor1", "default", "down")
}

#[derive(Debug, Default, Copy, Clone)]
pub struct Nwn2Probe;

impl EngineProbe for Nwn2Probe {
    fn game_id(&self) -> GameId {
        GameId::Nwn2
    }

    fn probe_files(&self, files: &FileList) -> bool {
        // either the ini or the binary will do
        files.contains_any(MARKERS)
    }

    fn load_plan(&self) -> LoadPlan {
        load_plan()
    }
}
