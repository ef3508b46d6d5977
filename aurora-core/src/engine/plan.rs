//! Declarative load plans.
//!
//! A plan lists what an engine indexes and in which order: type aliases first, then steps of
//! directories and archives with their priorities. Plans are plain data and can be written as RON:
//!
//! ```ron
//! (
//!     game: Nwn2,
//!     aliases: [(code: 3000, canonical: osc)],
//!     steps: [
//!         (label: "Loading main resource files", sources: [
//!             Archive(kind: zip, path: "2da.zip", priority: 1),
//!         ]),
//!     ],
//! )
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::resource::{ArchiveKind, GameId, ResourceType};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeAliasSpec {
    pub code: u32,
    pub canonical: ResourceType,
}

/// One source to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceSpec {
    Directory {
        path: PathBuf,
        /// `0` for the directory alone, `-1` for the whole tree.
        #[serde(default)]
        depth: i32,
        #[serde(default)]
        type_filter: Option<u32>,
        priority: u32,
        #[serde(default)]
        optional: bool,
    },
    Archive {
        kind: ArchiveKind,
        path: PathBuf,
        priority: u32,
        #[serde(default)]
        optional: bool,
    },
    ArchiveDir {
        kind: ArchiveKind,
        path: PathBuf,
    },
}

/// A labelled group of sources, reported as one progress step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStep {
    pub label: String,
    /// Name of a boolean option that has to be enabled (the default) for the step to run.
    #[serde(default)]
    pub enabled_by: Option<String>,
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

impl LoadStep {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            enabled_by: None,
            sources: Vec::new(),
        }
    }

    pub fn enabled_by(mut self, option: impl Into<String>) -> Self {
        self.enabled_by = Some(option.into());
        self
    }

    fn directory(mut self, path: &str, depth: i32, priority: u32, optional: bool) -> Self {
        self.sources.push(SourceSpec::Directory {
            path: path.into(),
            depth,
            type_filter: None,
            priority,
            optional,
        });
        self
    }

    pub fn mandatory_directory(self, path: &str, depth: i32, priority: u32) -> Self {
        self.directory(path, depth, priority, false)
    }

    pub fn optional_directory(self, path: &str, depth: i32, priority: u32) -> Self {
        self.directory(path, depth, priority, true)
    }

    fn archive(mut self, kind: ArchiveKind, path: &str, priority: u32, optional: bool) -> Self {
        self.sources.push(SourceSpec::Archive {
            kind,
            path: path.into(),
            priority,
            optional,
        });
        self
    }

    pub fn mandatory_archive(self, kind: ArchiveKind, path: &str, priority: u32) -> Self {
        self.archive(kind, path, priority, false)
    }

    pub fn optional_archive(self, kind: ArchiveKind, path: &str, priority: u32) -> Self {
        self.archive(kind, path, priority, true)
    }

    pub fn archive_dir(mut self, kind: ArchiveKind, path: &str) -> Self {
        self.sources.push(SourceSpec::ArchiveDir {
            kind,
            path: path.into(),
        });
        self
    }
}

/// Binds a cursor resource to a cursor group and state, like `cursor0` to `default`/`up`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSpec {
    pub resource: String,
    pub group: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadPlan {
    pub game: GameId,
    #[serde(default)]
    pub aliases: Vec<TypeAliasSpec>,
    pub steps: Vec<LoadStep>,
    #[serde(default)]
    pub cursors: Vec<CursorSpec>,
}

impl LoadPlan {
    pub fn new(game: GameId) -> Self {
        Self {
            game,
            aliases: Vec::new(),
            steps: Vec::new(),
            cursors: Vec::new(),
        }
    }

    pub fn alias(mut self, code: u32, canonical: ResourceType) -> Self {
        self.aliases.push(TypeAliasSpec { code, canonical });
        self
    }

    pub fn step(mut self, step: LoadStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn cursor(mut self, resource: &str, group: &str, state: &str) -> Self {
        self.cursors.push(CursorSpec {
            resource: resource.to_string(),
            group: group.to_string(),
            state: state.to_string(),
        });
        self
    }

    /// All sources of the plan, in execution order.
    pub fn sources(&self) -> impl Iterator<Item = &SourceSpec> {
        self.steps.iter().flat_map(|step| step.sources.iter())
    }

    pub fn from_ron(source: &str) -> Result<Self> {
        ron::from_str(source).context("Parsing load plan")
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .context("Serializing load plan")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Reading load plan from {:?}", path))?;
        Self::from_ron(&source).with_context(|| format!("Parsing load plan from {:?}", path))
    }
}
