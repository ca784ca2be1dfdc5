//! Controllers layer - module lifecycle orchestration.
//!
//! This module contains:
//! - The per-module base (settings, activation, hotkeys)
//! - The module controller and its reconciliation pass
//! - The shared hotkey registry

pub mod hotkeys;
pub mod module_base;
pub mod module_controller;

pub use hotkeys::{Binding, HotkeyDef, HotkeyRegistry};
pub use module_base::{Module, ModuleBase, ModuleContext};
pub use module_controller::{KeyOutcome, ModuleController, ReconcileReport};
