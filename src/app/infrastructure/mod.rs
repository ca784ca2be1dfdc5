//! Infrastructure layer - external integrations and utilities.
//!
//! This module contains code that interfaces with external systems:
//! - Settings persistence
//! - The host site's JSON API
//! - DOM readiness waiting
//! - Error types

pub mod api;
pub mod error;
pub mod readiness;
pub mod store;

pub use api::{HostApi, HttpApi};
pub use error::{AppError, Result};
pub use store::{FileStore, MemoryStore, SettingsStore, SharedStore};
