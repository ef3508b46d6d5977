use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use aurora_core::engine::{EngineProbe, detect_engine};
use tracing::{debug, instrument, trace};

pub const GAME_DIR_ENV: &str = "AURORA_GAME_DIR";

/// A located installation and the engine that claimed it, if any did.
pub struct Located<'a> {
    pub game_dir: PathBuf,
    pub probe: Option<&'a dyn EngineProbe>,
}

#[instrument(skip(probes))]
fn try_game_directory<'a>(
    path: &Path,
    probes: &'a [Box<dyn EngineProbe>],
) -> Option<&'a dyn EngineProbe> {
    debug!("Trying game directory {:?}...", path);
    if !path.is_dir() {
        debug!("Cannot use {:?} as game directory, not a directory", path);
        return None;
    }
    match detect_engine(path, probes) {
        Ok(Some(probe)) => Some(probe),
        Ok(None) => {
            trace!("No engine claims {:?}", path);
            None
        }
        Err(err) => {
            trace!("Cannot use {:?} as game directory: {}", path, err);
            None
        }
    }
}

/// Implements the logic for locating a game installation.
///
/// The candidate directories are (in order)
/// 1. The directory specified on the command line with the `--game-dir` option
/// 2. The directory specified in the `AURORA_GAME_DIR` environment variable
/// 3. The current working directory
/// 4. The directory "aurora/game" in the user's shared data directory (see [`dirs_next::data_dir`])
///
/// The first directory that some engine claims is used. With `any_directory`, the first existing
/// directory is accepted even if no engine claims it, which is what a custom load plan needs.
pub fn locate_game<'a>(
    cli_game_dir: Option<&Path>,
    probes: &'a [Box<dyn EngineProbe>],
    any_directory: bool,
) -> Result<Located<'a>> {
    let mut try_list = Vec::new();

    if let Some(cli_game_dir) = cli_game_dir {
        try_list.push(cli_game_dir.to_path_buf());
    }

    if let Some(env_game_dir) = std::env::var_os(GAME_DIR_ENV) {
        try_list.push(PathBuf::from(env_game_dir));
    }

    try_list.push(std::env::current_dir()?);

    if let Some(shared_game_dir) = dirs_next::data_dir().map(|p| p.join("aurora").join("game")) {
        try_list.push(shared_game_dir);
    }

    for path in try_list.iter() {
        if let Some(probe) = try_game_directory(path, probes) {
            return Ok(Located {
                game_dir: path.clone(),
                probe: Some(probe),
            });
        }
    }

    if let Some(path) = try_list.iter().find(|path| any_directory && path.is_dir()) {
        return Ok(Located {
            game_dir: path.clone(),
            probe: None,
        });
    }

    bail!("Failed to locate a game installation, tried: {:#?}", try_list);
}
