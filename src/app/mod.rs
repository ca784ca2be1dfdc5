//! Application layer - organized by Clean Architecture principles.
//!
//! # Structure
//!
//! - `domain/` - Core data structures (ModuleId, Page, Settings, Config, Messages)
//! - `controllers/` - Orchestration (ModuleBase, ModuleController, hotkeys)
//! - `services/` - Pure helpers (debouncing, text operations)
//! - `infrastructure/` - External integrations (settings store, host API, DOM readiness, error)
//! - `modules/` - Feature modules
//! - `state.rs` - Process-wide context

pub mod controllers;
pub mod domain;
pub mod infrastructure;
pub mod modules;
pub mod services;
pub mod state;

// Re-exports for convenient external access
pub use controllers::{KeyOutcome, Module, ModuleBase, ModuleContext, ModuleController, ReconcileReport};
pub use domain::{Action, Config, Effect, Message, ModuleId, Page, PageKind};
pub use infrastructure::{AppError, FileStore, HostApi, HttpApi, MemoryStore, Result, SettingsStore};
pub use state::AppState;
