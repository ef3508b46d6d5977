//! Case-insensitive path resolution.
//!
//! Game data is authored on Windows, where `Data/2DA.zip` and `data/2da.zip` are the same file.
//! Load plans spell file names the way the installer usually does, so lookups have to ignore case
//! on case-sensitive file systems.

use std::path::{Component, Path, PathBuf};

use tracing::trace;

fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }

    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

/// Resolves `relative` against `base`, matching every component case-insensitively.
///
/// An empty `relative` path resolves to `base` itself. Returns `None` if some component does not
/// exist.
pub fn resolve_nocase(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(name) => {
                let name = name.to_string_lossy();
                current = find_in_dir(&current, &name)?;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                current.pop();
            }
            Component::RootDir | Component::Prefix(_) => {
                current = PathBuf::from(component.as_os_str());
            }
        }
    }

    if current.exists() {
        Some(current)
    } else {
        trace!("{:?} does not exist", current);
        None
    }
}
