use std::collections::HashMap;

use crate::app::domain::messages::Action;
use crate::app::domain::module_id::ModuleId;

/// A settings key holding a `|`-separated list of key combos, and the
/// action those combos trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HotkeyDef {
    pub setting: &'static str,
    pub action: Action,
}

impl HotkeyDef {
    pub const fn new(setting: &'static str, action: Action) -> Self {
        Self { setting, action }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Action { owner: ModuleId, action: Action },
    /// Claimed by an inactive module; the key is swallowed.
    Noop { owner: ModuleId },
}

impl Binding {
    pub fn owner(&self) -> ModuleId {
        match self {
            Binding::Action { owner, .. } | Binding::Noop { owner } => *owner,
        }
    }
}

/// Split a combo string into normalized keys, dropping empty alternatives.
pub fn split_combos(combos: &str) -> Vec<String> {
    combos
        .split('|')
        .map(|key| key.trim().to_lowercase())
        .filter(|key| !key.is_empty())
        .collect()
}

/// Key → binding table shared by every module.
#[derive(Debug, Default)]
pub struct HotkeyRegistry {
    bindings: HashMap<String, Binding>,
}

impl HotkeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a key. A later registration for the same key replaces the earlier one.
    pub fn register(&mut self, key: &str, binding: Binding) {
        if let Some(previous) = self.bindings.insert(key.to_lowercase(), binding) {
            if previous.owner() != binding.owner() {
                tracing::debug!(
                    "Hotkey '{}' moved from {} to {}",
                    key,
                    previous.owner(),
                    binding.owner()
                );
            }
        }
    }

    pub fn resolve(&self, key: &str) -> Option<&Binding> {
        self.bindings.get(&key.to_lowercase())
    }

    /// Drop every binding held by `owner`.
    pub fn release(&mut self, owner: ModuleId) {
        self.bindings.retain(|_, binding| binding.owner() != owner);
    }

    pub fn keys_for(&self, owner: ModuleId) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .bindings
            .iter()
            .filter(|(_, binding)| binding.owner() == owner)
            .map(|(key, _)| key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn clear(&mut self) {
        self.bindings.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_combos() {
        assert_eq!(split_combos("a|Left"), vec!["a", "left"]);
        assert_eq!(split_combos(" x | . "), vec!["x", "."]);
        assert!(split_combos("").is_empty());
        assert_eq!(split_combos("v||0"), vec!["v", "0"]);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut registry = HotkeyRegistry::new();
        registry.register(
            "q",
            Binding::Action {
                owner: ModuleId::Miscellaneous,
                action: Action::FocusSearch,
            },
        );
        registry.register(
            "Q",
            Binding::Noop {
                owner: ModuleId::ImageScaler,
            },
        );

        assert_eq!(
            registry.resolve("q"),
            Some(&Binding::Noop {
                owner: ModuleId::ImageScaler
            })
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_release_only_touches_owner() {
        let mut registry = HotkeyRegistry::new();
        registry.register(
            "a",
            Binding::Action {
                owner: ModuleId::PoolNavigator,
                action: Action::PrevPost,
            },
        );
        registry.register(
            "d",
            Binding::Action {
                owner: ModuleId::PoolNavigator,
                action: Action::NextPost,
            },
        );
        registry.register(
            "v",
            Binding::Action {
                owner: ModuleId::ImageScaler,
                action: Action::CycleScale,
            },
        );

        assert_eq!(registry.keys_for(ModuleId::PoolNavigator), vec!["a", "d"]);
        registry.release(ModuleId::PoolNavigator);
        assert!(registry.keys_for(ModuleId::PoolNavigator).is_empty());
        assert!(registry.resolve("v").is_some());
    }
}
