use std::path::PathBuf;

use snafu::Snafu;

use crate::resource::{GameId, ResourceKey, ResourceType};

/// Failures of the resource system.
///
/// Configuration-time failures ([`SourceNotFound`](ResourceError::SourceNotFound),
/// [`SourceUnreadable`](ResourceError::SourceUnreadable),
/// [`ArchiveCorrupt`](ResourceError::ArchiveCorrupt),
/// [`AliasConflict`](ResourceError::AliasConflict)) abort engine initialization. Query-time
/// failures ([`ResourceNotFound`](ResourceError::ResourceNotFound),
/// [`StreamRead`](ResourceError::StreamRead)) are left to the caller.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ResourceError {
    #[snafu(display("Resource source {path:?} does not exist"))]
    SourceNotFound { path: PathBuf },

    #[snafu(display("Resource source {path:?} cannot be read"))]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Archive {path:?} is corrupt: {message}"))]
    ArchiveCorrupt { path: PathBuf, message: String },

    #[snafu(display("Resource {key} not found"))]
    ResourceNotFound { key: ResourceKey },

    #[snafu(display(
        "Type code {code} is already aliased to {existing} for {scope:?}, refusing to alias it to {requested}"
    ))]
    AliasConflict {
        scope: GameId,
        code: u32,
        existing: ResourceType,
        requested: ResourceType,
    },

    #[snafu(display("Failed to open a stream for resource {key}"))]
    StreamRead {
        key: ResourceKey,
        source: std::io::Error,
    },

    #[snafu(display("Cannot tell the archive kind of {path:?}"))]
    UnknownArchiveKind { path: PathBuf },

    #[snafu(display("{path:?} is empty, nothing to probe"))]
    EmptyTarget { path: PathBuf },
}

impl ResourceError {
    /// Whether this error is a missing resource, as opposed to a broken one.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResourceError::ResourceNotFound { .. })
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, err: anyhow::Error) -> Self {
        ResourceError::ArchiveCorrupt {
            path: path.into(),
            message: format!("{:#}", err),
        }
    }
}

pub type Result<T, E = ResourceError> = std::result::Result<T, E>;
