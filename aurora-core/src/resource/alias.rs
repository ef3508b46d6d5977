//! Engine-scoped mapping from raw on-disk type codes to canonical types.

use std::collections::{HashMap, hash_map::Entry};

use snafu::ensure;
use tracing::trace;

use crate::resource::{
    GameId, ResourceType,
    error::{AliasConflictSnafu, Result},
};

/// Type aliases, keyed by engine scope and raw code.
///
/// Different engines reuse the same numeric codes for different types, so an alias only applies
/// inside its own scope. Codes without an alias fall back to [`ResourceType::from_code`].
#[derive(Debug, Default, Clone)]
pub struct TypeAliasTable {
    aliases: HashMap<(GameId, u32), ResourceType>,
}

impl TypeAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an alias.
    ///
    /// Registering the same alias twice is a no-op, remapping a code to a different type is an
    /// [`AliasConflict`](crate::resource::ResourceError::AliasConflict).
    pub fn register(&mut self, scope: GameId, code: u32, canonical: ResourceType) -> Result<()> {
        match self.aliases.entry((scope, code)) {
            Entry::Occupied(existing) => {
                let existing = *existing.get();
                ensure!(
                    existing == canonical,
                    AliasConflictSnafu {
                        scope,
                        code,
                        existing,
                        requested: canonical,
                    }
                );
            }
            Entry::Vacant(vacant) => {
                trace!("Aliasing type code {} to {} for {:?}", code, canonical, scope);
                vacant.insert(canonical);
            }
        }
        Ok(())
    }

    pub fn resolve(&self, scope: GameId, code: u32) -> Option<ResourceType> {
        self.aliases
            .get(&(scope, code))
            .copied()
            .or_else(|| ResourceType::from_code(code))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
