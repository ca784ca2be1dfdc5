//! Headless core of the re621 site enhancement suite.
//!
//! Feature modules declare their settings, the pages they run on and their
//! hotkeys; [`app::ModuleController`] creates and destroys them as the user
//! navigates, and [`app::AppState`] ties everything to one page session.

pub mod app;

pub use app::{AppError, AppState, Config, Result};
