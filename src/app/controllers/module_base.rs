//! State and settings plumbing shared by every feature module.

use std::any::Any;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::hotkeys::{Binding, HotkeyDef, HotkeyRegistry, split_combos};
use crate::app::domain::config::{Config, InactiveHotkeys};
use crate::app::domain::messages::{Action, Effect, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::{Constraint, Page};
use crate::app::domain::page_model::PageModel;
use crate::app::domain::settings::{ENABLED_KEY, SettingsMap, SettingsRecord, schema};
use crate::app::infrastructure::api::HostApi;
use crate::app::infrastructure::error::{AppError, Result};
use crate::app::infrastructure::store::SharedStore;

/// What a module hook may touch while it runs.
pub struct ModuleContext<'a> {
    pub model: &'a mut PageModel,
    pub api: &'a dyn HostApi,
    pub config: &'a Config,
    pub effects: &'a mut Vec<Effect>,
    /// Messages queued for delivery after the current pass
    pub outbox: &'a mut Vec<Message>,
}

impl ModuleContext<'_> {
    pub fn page(&self) -> &Page {
        &self.model.page
    }

    pub fn emit(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn send(&mut self, message: Message) {
        self.outbox.push(message);
    }
}

/// Feature behaviour plugged into the lifecycle.
///
/// Hooks are only ever called by the controller: `create` when
/// [`ModuleBase::can_initialize`] holds, `destroy` when the module is
/// initialized, `on_hotkey` and `on_message` while it is initialized.
pub trait Module: Any {
    fn id(&self) -> ModuleId;

    fn constraint(&self) -> Constraint {
        Constraint::any()
    }

    /// Settings schema. Must declare `enabled` as a boolean.
    fn default_settings(&self) -> SettingsMap {
        enabled_only()
    }

    fn hotkeys(&self) -> Vec<HotkeyDef> {
        Vec::new()
    }

    fn create(&mut self, base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()>;

    /// Must undo everything `create` added.
    fn destroy(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn on_hotkey(
        &mut self,
        _action: Action,
        _base: &mut ModuleBase,
        _ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn on_message(
        &mut self,
        _message: &Message,
        _base: &mut ModuleBase,
        _ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The minimal schema: `{ "enabled": true }`.
pub fn enabled_only() -> SettingsMap {
    schema(std::iter::empty::<(String, Value)>())
}

pub struct ModuleBase {
    id: ModuleId,
    storage_key: String,
    constraint: Constraint,
    defaults: SettingsMap,
    settings: SettingsRecord,
    store: SharedStore,
    enabled: bool,
    initialized: bool,
    hotkeys: Vec<HotkeyDef>,
}

impl ModuleBase {
    pub fn new(
        id: ModuleId,
        constraint: Constraint,
        defaults: SettingsMap,
        store: SharedStore,
        namespace: &str,
    ) -> Result<Self> {
        if !matches!(defaults.get(ENABLED_KEY), Some(Value::Bool(_))) {
            return Err(AppError::Schema {
                module: id,
                reason: format!("'{}' must be declared as a boolean", ENABLED_KEY),
            });
        }

        let storage_key = id.storage_key(namespace);
        let stored = store.borrow().get(&storage_key)?;
        let settings = SettingsRecord::merge(stored, &defaults);
        let enabled = settings.enabled();

        Ok(Self {
            id,
            storage_key,
            constraint,
            defaults,
            settings,
            store,
            enabled,
            initialized: false,
            hotkeys: Vec::new(),
        })
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn constraint(&self) -> &Constraint {
        &self.constraint
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub(crate) fn set_initialized(&mut self, initialized: bool) {
        self.initialized = initialized;
    }

    pub fn page_matches(&self, page: &Page) -> bool {
        self.constraint.matches(page)
    }

    pub fn can_initialize(&self, page: &Page) -> bool {
        !self.initialized && self.page_matches(page) && self.enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// In-memory only; push `enabled` to persist it.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn default_settings(&self) -> &SettingsMap {
        &self.defaults
    }

    pub fn fetch_settings(&mut self, refresh: bool) -> Result<&SettingsRecord> {
        if refresh {
            self.reload()?;
        }
        Ok(&self.settings)
    }

    pub fn fetch_setting(&mut self, key: &str, refresh: bool) -> Result<Value> {
        let default = self.known_key(key)?.clone();
        if refresh {
            self.reload()?;
        }
        Ok(self.settings.get(key).cloned().unwrap_or(default))
    }

    pub fn fetch_setting_as<T: DeserializeOwned>(&mut self, key: &str, refresh: bool) -> Result<T> {
        let value = self.fetch_setting(key, refresh)?;
        serde_json::from_value(value)
            .map_err(|e| AppError::Settings(format!("{}.{}: {}", self.id, key, e)))
    }

    /// Write one field and persist the record.
    ///
    /// With `preserve`, the record is reloaded first so fields written by
    /// someone else since the last load survive.
    pub fn push_setting(&mut self, key: &str, value: Value, preserve: bool) -> Result<()> {
        self.known_key(key)?;
        if preserve {
            self.reload()?;
        }
        self.settings.set(key, value);
        self.save()
    }

    pub fn push_setting_as<T: Serialize>(&mut self, key: &str, value: &T, preserve: bool) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.push_setting(key, value, preserve)
    }

    pub fn reload(&mut self) -> Result<()> {
        let stored = self.store.borrow().get(&self.storage_key)?;
        self.settings = SettingsRecord::merge(stored, &self.defaults);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        self.store
            .borrow_mut()
            .set(&self.storage_key, self.settings.to_value())
    }

    fn known_key(&self, key: &str) -> Result<&Value> {
        self.defaults
            .get(key)
            .ok_or_else(|| AppError::UnknownSettingsKey {
                module: self.id,
                key: key.to_string(),
            })
    }

    pub fn register_hotkeys(
        &mut self,
        defs: impl IntoIterator<Item = HotkeyDef>,
        registry: &mut HotkeyRegistry,
        page: &Page,
        mode: InactiveHotkeys,
    ) -> Result<()> {
        self.hotkeys.extend(defs);
        self.reset_hotkeys(registry, page, mode)
    }

    /// Rebind this module's keys from its current settings.
    ///
    /// On a page the constraint rejects, keys become no-ops or are left
    /// unbound depending on `mode`.
    pub fn reset_hotkeys(
        &mut self,
        registry: &mut HotkeyRegistry,
        page: &Page,
        mode: InactiveHotkeys,
    ) -> Result<()> {
        registry.release(self.id);
        if self.hotkeys.is_empty() {
            return Ok(());
        }

        let active = self.page_matches(page);
        if !active && mode == InactiveHotkeys::Unregister {
            return Ok(());
        }

        self.reload()?;
        for def in self.hotkeys.clone() {
            let combos: String = self.fetch_setting_as(def.setting, false)?;
            for key in split_combos(&combos) {
                let binding = if active {
                    Binding::Action {
                        owner: self.id,
                        action: def.action,
                    }
                } else {
                    Binding::Noop { owner: self.id }
                };
                registry.register(&key, binding);
            }
        }
        Ok(())
    }
}
