use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::{
    engine::plan::{CursorSpec, LoadPlan, SourceSpec},
    options::{OptionSource, Options},
    progress::LoadProgress,
    resource::{GameId, ResourceManager, ResourceType},
};

/// A running engine: one installation, its load plan and the resources indexed from it.
///
/// Dropping the session drops every source it registered.
#[derive(Debug)]
pub struct EngineSession {
    target: PathBuf,
    plan: LoadPlan,
    options: Options,
    resources: ResourceManager,
    initialized: bool,
}

impl EngineSession {
    pub fn new(target: &Path, plan: LoadPlan) -> Self {
        Self {
            target: target.to_path_buf(),
            resources: ResourceManager::new(plan.game),
            plan,
            options: Options::new(),
            initialized: false,
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn game(&self) -> GameId {
        self.plan.game
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn plan(&self) -> &LoadPlan {
        &self.plan
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn register(&self, source: &SourceSpec) -> Result<()> {
        let resources = &self.resources;
        match source {
            SourceSpec::Directory {
                path,
                depth,
                type_filter,
                priority,
                optional: false,
            } => {
                resources.index_mandatory_directory(path, *depth, *type_filter, *priority)?;
            }
            SourceSpec::Directory {
                path,
                depth,
                type_filter,
                priority,
                optional: true,
            } => {
                resources.index_optional_directory(path, *depth, *type_filter, *priority)?;
            }
            SourceSpec::Archive {
                kind,
                path,
                priority,
                optional: false,
            } => {
                resources.index_mandatory_archive(*kind, path, *priority)?;
            }
            SourceSpec::Archive {
                kind,
                path,
                priority,
                optional: true,
            } => {
                resources.index_optional_archive(*kind, path, *priority)?;
            }
            SourceSpec::ArchiveDir { kind, path } => {
                resources.add_archive_dir(*kind, path)?;
            }
        }
        Ok(())
    }

    /// Executes the load plan.
    ///
    /// Type aliases are registered before anything is indexed. A missing mandatory source, a
    /// corrupt archive or a conflicting alias aborts the initialization.
    #[instrument(skip(self), fields(game = ?self.plan.game))]
    pub fn init(&mut self) -> Result<()> {
        if self.initialized {
            bail!("{} is already initialized", self.plan.game);
        }

        let cursor_step = usize::from(!self.plan.cursors.is_empty());
        let mut progress = LoadProgress::new(self.plan.steps.len() + cursor_step + 1);

        self.resources
            .set_base_dir(&self.target)
            .with_context(|| format!("Using {:?} as the game directory", self.target))?;

        for alias in &self.plan.aliases {
            self.resources
                .add_type_alias(alias.code, alias.canonical)
                .context("Registering type aliases")?;
        }

        for step in &self.plan.steps {
            progress.step(&step.label);
            let enabled = step
                .enabled_by
                .as_deref()
                .is_none_or(|option| self.options.get_bool(option, true));
            if !enabled {
                info!("Skipping {:?}, disabled by an option", step.label);
                continue;
            }
            for source in &step.sources {
                self.register(source)
                    .with_context(|| format!("Failed to initialize {}", self.plan.game))?;
            }
        }

        if cursor_step > 0 {
            progress.step("Loading game cursors");
            for cursor in &self.plan.cursors {
                if !self.resources.has(&cursor.resource, ResourceType::Cur) {
                    warn!(
                        "Cursor {} ({}/{}) is missing",
                        cursor.resource, cursor.group, cursor.state
                    );
                }
            }
        }

        progress.step("Successfully initialized the engine");
        self.initialized = true;
        Ok(())
    }

    fn find_cursor(&self, group: &str, state: &str) -> Option<&CursorSpec> {
        self.plan
            .cursors
            .iter()
            .find(|c| c.group.eq_ignore_ascii_case(group) && c.state.eq_ignore_ascii_case(state))
    }

    /// Reads the `.cur` file bound to a cursor group and state.
    pub fn cursor(&self, group: &str, state: &str) -> Result<Vec<u8>> {
        let cursor = self
            .find_cursor(group, state)
            .with_context(|| format!("No cursor is bound to {}/{}", group, state))?;
        self.resources
            .read_all(&cursor.resource, ResourceType::Cur)
            .with_context(|| format!("Loading cursor {}", cursor.resource))
    }
}
