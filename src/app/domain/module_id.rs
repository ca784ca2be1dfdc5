use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a feature module.
///
/// The name doubles as the settings store key suffix and the registry key,
/// so renaming a variant orphans the user's saved settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleId {
    HeaderCustomizer,
    Miscellaneous,
    ImageScaler,
    PoolNavigator,
    InstantSearch,
    InfiniteScroll,
    TagSubscriptions,
}

impl ModuleId {
    /// Every module, in load order.
    pub const ALL: [ModuleId; 7] = [
        ModuleId::HeaderCustomizer,
        ModuleId::Miscellaneous,
        ModuleId::ImageScaler,
        ModuleId::PoolNavigator,
        ModuleId::InfiniteScroll,
        ModuleId::InstantSearch,
        ModuleId::TagSubscriptions,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::HeaderCustomizer => "HeaderCustomizer",
            Self::Miscellaneous => "Miscellaneous",
            Self::ImageScaler => "ImageScaler",
            Self::PoolNavigator => "PoolNavigator",
            Self::InstantSearch => "InstantSearch",
            Self::InfiniteScroll => "InfiniteScroll",
            Self::TagSubscriptions => "TagSubscriptions",
        }
    }

    /// Key of this module's record in the settings store.
    pub fn storage_key(&self, namespace: &str) -> String {
        format!("{}.{}", namespace, self.name())
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
