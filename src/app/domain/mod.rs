//! Domain layer - core data structures and types.
//!
//! This module contains the fundamental domain models:
//! - Module identity and page classification
//! - Settings records and process configuration
//! - Posts and the headless page model
//! - Message, action and effect types for the event system

pub mod config;
pub mod messages;
pub mod module_id;
pub mod page;
pub mod page_model;
pub mod post;
pub mod settings;

pub use config::{Config, InactiveHotkeys, UserInfo};
pub use messages::{Action, Effect, Message};
pub use module_id::ModuleId;
pub use page::{Constraint, Page, PageKind};
pub use page_model::PageModel;
pub use settings::{SettingsMap, SettingsRecord};
