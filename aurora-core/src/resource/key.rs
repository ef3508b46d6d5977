use smartstring::alias::CompactString;

use crate::resource::ResourceType;

/// Addresses a resource: a case-insensitive, extension-free name and a canonical type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    name: CompactString,
    ty: ResourceType,
}

impl ResourceKey {
    /// Creates a key, folding the name to lowercase.
    pub fn new(name: &str, ty: ResourceType) -> Self {
        let mut folded = CompactString::new();
        folded.extend(name.chars().map(|c| c.to_ascii_lowercase()));
        Self { name: folded, ty }
    }

    /// Builds a key from a file name like `creature.utc`.
    ///
    /// Returns `None` when the extension is missing or does not name a known type.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let (name, extension) = file_name.rsplit_once('.')?;
        let ty = ResourceType::from_extension(extension)?;
        Some(Self::new(name, ty))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> ResourceType {
        self.ty
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.name, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::ResourceKey;
    use crate::resource::ResourceType;

    #[test]
    fn names_are_case_insensitive() {
        assert_eq!(
            ResourceKey::new("Creature", ResourceType::Utc),
            ResourceKey::new("CREATURE", ResourceType::Utc)
        );
        assert_ne!(
            ResourceKey::new("creature", ResourceType::Utc),
            ResourceKey::new("creature", ResourceType::Uti)
        );
    }

    #[test]
    fn from_file_name() {
        let key = ResourceKey::from_file_name("NW_Chicken.UTC").unwrap();
        assert_eq!(key.name(), "nw_chicken");
        assert_eq!(key.ty(), ResourceType::Utc);
        assert_eq!(key.to_string(), "nw_chicken.utc");

        assert_eq!(ResourceKey::from_file_name("readme"), None);
        assert_eq!(ResourceKey::from_file_name("archive.tar"), None);
    }
}
