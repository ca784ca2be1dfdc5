//! Services layer - pure operations and utilities.
//!
//! This module contains logic with no lifecycle of its own:
//! - Input debouncing
//! - Text operations (quotes, tab links, tag queries)

pub mod debounce;
pub mod text_ops;
