use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use aurora_core::resource::{ArchiveEntry, ArchiveKind, ArchiveReader, ResourceType};
use tracing::warn;

#[derive(clap::Subcommand, Debug)]
pub enum ArchiveCommand {
    /// List the entries of an archive
    List {
        /// Path to the archive (ZIP, ERF/MOD/HAK/SAV or EXE)
        archive_path: PathBuf,
        /// Archive kind, guessed from the extension if not given
        #[clap(short, long)]
        kind: Option<ArchiveKind>,
    },
    /// Extract entries of an archive into a directory
    Extract {
        /// Path to the archive
        archive_path: PathBuf,
        /// Path to the output directory (will be created if it does not exist)
        output_dir: PathBuf,
        /// Names of the entries to extract, like `c_dog.utc`. Everything is extracted if none are
        /// given.
        file_names: Vec<String>,
        #[clap(short, long)]
        kind: Option<ArchiveKind>,
    },
}

fn open(path: &Path, kind: Option<ArchiveKind>) -> Result<ArchiveReader> {
    let reader = match kind {
        Some(kind) => ArchiveReader::open_archive(kind, path),
        None => ArchiveReader::open_by_extension(path),
    };
    reader.with_context(|| format!("Opening archive {:?}", path))
}

/// File name of an entry. Entries with codes no known type has keep the raw code as extension.
fn entry_file_name(entry: &ArchiveEntry) -> String {
    match ResourceType::from_code(entry.type_code) {
        Some(ty) => format!("{}.{}", entry.name, ty),
        None => format!("{}.{}", entry.name, entry.type_code),
    }
}

/// Where an extracted resource goes, or `None` if its name would leave the output directory.
///
/// Names come straight from the archive, so anything that is not a plain file name is refused.
pub fn output_path(output_dir: &Path, file_name: &str) -> Option<PathBuf> {
    let plain = !file_name.is_empty()
        && !file_name.contains(['/', '\\', ':'])
        && file_name != "."
        && file_name != ".."
        && !file_name.starts_with("..");
    plain.then(|| output_dir.join(file_name))
}

pub fn archive_command(command: ArchiveCommand) -> Result<()> {
    match command {
        ArchiveCommand::List { archive_path, kind } => {
            let reader = open(&archive_path, kind)?;
            for entry in reader.entries() {
                println!("{:>6} {}", entry.type_code, entry_file_name(&entry));
            }
            Ok(())
        }
        ArchiveCommand::Extract {
            archive_path,
            output_dir,
            file_names,
            kind,
        } => {
            let reader = open(&archive_path, kind)?;
            let entries = reader
                .entries()
                .into_iter()
                .map(|entry| (entry_file_name(&entry), entry))
                .filter(|(name, _)| {
                    file_names.is_empty()
                        || file_names.iter().any(|wanted| wanted.eq_ignore_ascii_case(name))
                })
                .collect::<Vec<_>>();
            if entries.is_empty() {
                bail!("Nothing to extract from {:?}", archive_path);
            }

            std::fs::create_dir_all(&output_dir).context("Creating output directory")?;
            for (name, entry) in entries {
                let Some(output_path) = output_path(&output_dir, &name) else {
                    warn!("Skipping entry with unsafe name {:?}", name);
                    continue;
                };
                let data = reader
                    .open(&entry.locator)
                    .and_then(|stream| stream.read_all())
                    .with_context(|| format!("Reading {}", name))?;
                std::fs::write(&output_path, data)
                    .with_context(|| format!("Writing {:?}", output_path))?;
                println!("{}", name);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::output_path;

    #[test]
    fn output_path_stays_in_output_dir() {
        let out = Path::new("/work/out");
        assert_eq!(
            output_path(out, "c_dog.utc"),
            Some(Path::new("/work/out/c_dog.utc").to_path_buf())
        );
        assert_eq!(
            output_path(out, "x2_.mod..2da"),
            Some(Path::new("/work/out/x2_.mod..2da").to_path_buf())
        );

        assert_eq!(output_path(out, "../../../tmp/pwned.2da"), None);
        assert_eq!(output_path(out, "..\\boot.ini"), None);
        assert_eq!(output_path(out, "/etc/passwd.txt"), None);
        assert_eq!(output_path(out, "C:evil.2da"), None);
        assert_eq!(output_path(out, ".."), None);
        assert_eq!(output_path(out, ""), None);
    }
}
