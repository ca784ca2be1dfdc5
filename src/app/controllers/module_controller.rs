//! Registry of feature modules and the reconciliation pass that drives
//! their lifecycle.

use std::collections::HashMap;

use serde_json::Value;

use super::hotkeys::{Binding, HotkeyRegistry};
use super::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::config::InactiveHotkeys;
use crate::app::domain::messages::{Action, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::Page;
use crate::app::infrastructure::error::{AppError, Result};
use crate::app::infrastructure::store::SharedStore;

struct Entry {
    base: ModuleBase,
    module: Box<dyn Module>,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReconcileReport {
    pub created: Vec<ModuleId>,
    pub destroyed: Vec<ModuleId>,
    /// Kept running across a page change, destroyed and created again
    pub reloaded: Vec<ModuleId>,
    pub failed: Vec<(ModuleId, String)>,
}

enum Change {
    None,
    Created,
    Destroyed,
    Reloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled(ModuleId, Action),
    /// Bound to a module that cannot act on this page.
    Swallowed(ModuleId),
    Unbound,
}

pub struct ModuleController {
    entries: Vec<Entry>,
    index: HashMap<ModuleId, usize>,
    hotkeys: HotkeyRegistry,
    store: SharedStore,
    namespace: String,
    inactive_hotkeys: InactiveHotkeys,
}

impl ModuleController {
    pub fn new(store: SharedStore, namespace: &str, inactive_hotkeys: InactiveHotkeys) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            hotkeys: HotkeyRegistry::new(),
            store,
            namespace: namespace.to_string(),
            inactive_hotkeys,
        }
    }

    /// Register a module. Registering an identity twice keeps the first instance.
    pub fn register(&mut self, module: Box<dyn Module>, ctx: &ModuleContext<'_>) -> Result<ModuleId> {
        let id = module.id();
        if self.index.contains_key(&id) {
            tracing::debug!("{} is already registered", id);
            return Ok(id);
        }

        let mut base = ModuleBase::new(
            id,
            module.constraint(),
            module.default_settings(),
            self.store.clone(),
            &self.namespace,
        )?;
        base.register_hotkeys(
            module.hotkeys(),
            &mut self.hotkeys,
            ctx.page(),
            self.inactive_hotkeys,
        )?;

        self.index.insert(id, self.entries.len());
        self.entries.push(Entry { base, module });
        tracing::debug!("Registered {}", id);
        Ok(id)
    }

    /// Registered identities, in registration order.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.entries.iter().map(|e| e.base.id()).collect()
    }

    pub fn get(&self, id: ModuleId) -> Option<&ModuleBase> {
        self.entry(id).map(|e| &e.base)
    }

    pub fn get_mut(&mut self, id: ModuleId) -> Option<&mut ModuleBase> {
        self.entry_mut(id).map(|e| &mut e.base)
    }

    /// Typed access to a feature instance.
    pub fn module<T: Module>(&self, id: ModuleId) -> Option<&T> {
        self.entry(id)?.module.as_any().downcast_ref::<T>()
    }

    /// Typed access to a feature instance together with its base.
    pub fn module_mut<T: Module>(&mut self, id: ModuleId) -> Option<(&mut T, &mut ModuleBase)> {
        let entry = self.entry_mut(id)?;
        let module = entry.module.as_any_mut().downcast_mut::<T>()?;
        Some((module, &mut entry.base))
    }

    pub fn hotkeys(&self) -> &HotkeyRegistry {
        &self.hotkeys
    }

    pub fn active(&self) -> Vec<ModuleId> {
        self.entries
            .iter()
            .filter(|e| e.base.is_initialized())
            .map(|e| e.base.id())
            .collect()
    }

    fn entry(&self, id: ModuleId) -> Option<&Entry> {
        self.index.get(&id).map(|&i| &self.entries[i])
    }

    fn entry_mut(&mut self, id: ModuleId) -> Option<&mut Entry> {
        let i = *self.index.get(&id)?;
        Some(&mut self.entries[i])
    }

    /// Initialize a module if its guard allows it. Returns whether it ran.
    pub fn create(&mut self, id: ModuleId, ctx: &mut ModuleContext<'_>) -> Result<bool> {
        let entry = self.entry_mut(id).ok_or(AppError::UnknownModule(id))?;
        create_entry(entry, ctx)
    }

    /// Tear a module down if it is initialized. Returns whether it ran.
    pub fn destroy(&mut self, id: ModuleId, ctx: &mut ModuleContext<'_>) -> Result<bool> {
        let entry = self.entry_mut(id).ok_or(AppError::UnknownModule(id))?;
        destroy_entry(entry, ctx)
    }

    pub fn set_enabled(&mut self, id: ModuleId, enabled: bool) -> Result<()> {
        self.get_mut(id)
            .ok_or(AppError::UnknownModule(id))?
            .set_enabled(enabled);
        Ok(())
    }

    /// Write a setting on behalf of a settings panel and rebind hotkeys.
    pub fn push_setting(
        &mut self,
        id: ModuleId,
        key: &str,
        value: Value,
        ctx: &ModuleContext<'_>,
    ) -> Result<()> {
        let i = *self.index.get(&id).ok_or(AppError::UnknownModule(id))?;
        self.entries[i].base.push_setting(key, value, true)?;
        self.rebind_hotkeys(ctx.page())
    }

    /// Re-resolve every module's keys in registration order, so a key one
    /// module gives up falls back to the earlier module that also binds it.
    pub fn rebind_hotkeys(&mut self, page: &Page) -> Result<()> {
        let mode = self.inactive_hotkeys;
        for entry in &mut self.entries {
            entry.base.reset_hotkeys(&mut self.hotkeys, page, mode)?;
        }
        Ok(())
    }

    /// One pass over every module against the current page.
    ///
    /// Modules whose constraint no longer matches (or that were disabled) are
    /// destroyed, modules that may initialize are created, and every
    /// module's hotkeys are re-resolved. A failing hook is reported and the
    /// pass moves on.
    pub fn reconcile(&mut self, ctx: &mut ModuleContext<'_>) -> ReconcileReport {
        self.pass(ctx, false)
    }

    /// Reconcile after the page changed under running modules. Modules that
    /// stay on are destroyed and created again so they read the new page.
    pub fn reload(&mut self, ctx: &mut ModuleContext<'_>) -> ReconcileReport {
        self.pass(ctx, true)
    }

    fn pass(&mut self, ctx: &mut ModuleContext<'_>, reload: bool) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let mode = self.inactive_hotkeys;

        for entry in &mut self.entries {
            let id = entry.base.id();
            let page = ctx.page().clone();

            let outcome = if !entry.base.is_initialized() {
                create_entry(entry, ctx).map(|ran| if ran { Change::Created } else { Change::None })
            } else if !entry.base.page_matches(&page) || !entry.base.is_enabled() {
                destroy_entry(entry, ctx).map(|_| Change::Destroyed)
            } else if reload {
                reload_entry(entry, ctx)
            } else {
                Ok(Change::None)
            };

            match outcome {
                Ok(Change::Created) => report.created.push(id),
                Ok(Change::Destroyed) => report.destroyed.push(id),
                Ok(Change::Reloaded) => report.reloaded.push(id),
                Ok(Change::None) => {}
                Err(e) => {
                    tracing::warn!("{} failed during reconciliation: {}", id, e);
                    report.failed.push((id, e.to_string()));
                }
            }

            if let Err(e) = entry.base.reset_hotkeys(&mut self.hotkeys, &page, mode) {
                tracing::warn!("Failed to rebind hotkeys for {}: {}", id, e);
                report.failed.push((id, e.to_string()));
            }
        }

        tracing::info!(
            "Reconciled {}: {} created, {} destroyed, {} reloaded, {} failed",
            ctx.page().url(),
            report.created.len(),
            report.destroyed.len(),
            report.reloaded.len(),
            report.failed.len()
        );
        report
    }

    /// Route a key press to the module that owns it.
    pub fn dispatch_key(&mut self, key: &str, ctx: &mut ModuleContext<'_>) -> Result<KeyOutcome> {
        let (owner, action) = match self.hotkeys.resolve(key) {
            Some(Binding::Action { owner, action }) => (*owner, *action),
            Some(Binding::Noop { owner }) => return Ok(KeyOutcome::Swallowed(*owner)),
            None => return Ok(KeyOutcome::Unbound),
        };

        let i = *self.index.get(&owner).ok_or(AppError::UnknownModule(owner))?;
        let entry = &mut self.entries[i];
        if !entry.base.is_initialized() {
            return Ok(KeyOutcome::Swallowed(owner));
        }

        entry.module.on_hotkey(action, &mut entry.base, ctx)?;
        self.rebind_hotkeys(ctx.page())?;
        Ok(KeyOutcome::Handled(owner, action))
    }

    /// Deliver a message to every initialized module.
    pub fn broadcast(&mut self, message: &Message, ctx: &mut ModuleContext<'_>) {
        for entry in &mut self.entries {
            if !entry.base.is_initialized() {
                continue;
            }
            if let Err(e) = entry.module.on_message(message, &mut entry.base, ctx) {
                tracing::warn!("{} failed to handle {:?}: {}", entry.base.id(), message, e);
            }
        }
    }

    /// Destroy everything and release every hotkey.
    pub fn teardown(&mut self, ctx: &mut ModuleContext<'_>) {
        for entry in self.entries.iter_mut().rev() {
            if let Err(e) = destroy_entry(entry, ctx) {
                tracing::warn!("{} failed to tear down: {}", entry.base.id(), e);
            }
        }
        self.hotkeys.clear();
    }
}

fn create_entry(entry: &mut Entry, ctx: &mut ModuleContext<'_>) -> Result<bool> {
    if !entry.base.can_initialize(ctx.page()) {
        return Ok(false);
    }
    entry.module.create(&mut entry.base, ctx)?;
    entry.base.set_initialized(true);
    tracing::debug!("Created {}", entry.base.id());
    Ok(true)
}

fn reload_entry(entry: &mut Entry, ctx: &mut ModuleContext<'_>) -> Result<Change> {
    destroy_entry(entry, ctx)?;
    create_entry(entry, ctx)?;
    Ok(Change::Reloaded)
}

fn destroy_entry(entry: &mut Entry, ctx: &mut ModuleContext<'_>) -> Result<bool> {
    if !entry.base.is_initialized() {
        return Ok(false);
    }
    // Marked down even if the hook fails so a broken module is not retried
    // as if it were still live.
    entry.base.set_initialized(false);
    entry.module.destroy(&mut entry.base, ctx)?;
    tracing::debug!("Destroyed {}", entry.base.id());
    Ok(true)
}
