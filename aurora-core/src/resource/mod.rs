//! The layered resource system.
//!
//! Directories and archives are registered as sources with a priority. Every entry they expose
//! is keyed by its name and canonical type (raw on-disk type codes go through the engine's
//! [`TypeAliasTable`]), and a lookup returns the provider with the highest priority. Among
//! sources of equal priority, the one registered last wins.

mod alias;
pub mod archive;
pub(crate) mod error;
pub mod fs;
mod index;
mod key;
mod manager;
mod stream;
mod types;

pub use self::{
    alias::TypeAliasTable,
    archive::{ArchiveEntry, ArchiveKind, ArchiveReader, Locator, SearchDepth, SourceKind},
    error::{ResourceError, Result},
    index::{IndexEntry, IndexedSource, ResourceIndex, Source, SourceId, SourceInfo},
    key::ResourceKey,
    manager::ResourceManager,
    stream::{ResourceStream, SharedFile},
    types::{GameId, ResourceType},
};
