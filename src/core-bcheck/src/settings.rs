use crate::{
    errors::Error,
    hash_format::{Cost, VersionTag},
};

/// How new hashes are generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HashSettings {
    pub cost: Cost,
    pub version: VersionTag,
}

impl HashSettings {
    pub fn new(cost: Cost, version: VersionTag) -> Self {
        HashSettings { cost, version }
    }

    /// Settings from optional overrides, falling back to cost 10 and version `2b`.
    pub fn with_overrides(cost: Option<u32>, version: Option<VersionTag>) -> Result<Self, Error> {
        let defaults = HashSettings::default();
        Ok(HashSettings {
            cost: cost.map(Cost::new).transpose()?.unwrap_or(defaults.cost),
            version: version.unwrap_or(defaults.version),
        })
    }
}
