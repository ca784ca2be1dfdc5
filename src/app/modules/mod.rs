//! Feature modules - one type per site feature.
//!
//! Every module implements [`Module`]; page side effects are returned as
//! [`Effect`](crate::app::domain::messages::Effect)s instead of touching the
//! document directly.

pub mod header_customizer;
pub mod image_scaler;
pub mod infinite_scroll;
pub mod instant_search;
pub mod miscellaneous;
pub mod pool_navigator;
pub mod tag_subscriptions;

pub use header_customizer::{HeaderCustomizer, Tab};
pub use image_scaler::ImageScaler;
pub use infinite_scroll::InfiniteScroll;
pub use instant_search::InstantSearch;
pub use miscellaneous::Miscellaneous;
pub use pool_navigator::{Navbar, PoolNavigator};
pub use tag_subscriptions::{TagSubscriptions, UpdateData};

use crate::app::controllers::module_base::Module;
use crate::app::domain::config::Config;
use crate::app::domain::module_id::ModuleId;

/// One instance of every feature, in load order.
pub fn default_modules(config: &Config) -> Vec<Box<dyn Module>> {
    ModuleId::ALL
        .iter()
        .map(|id| -> Box<dyn Module> {
            match id {
                ModuleId::HeaderCustomizer => Box::new(HeaderCustomizer::new()),
                ModuleId::Miscellaneous => Box::new(Miscellaneous::new()),
                ModuleId::ImageScaler => Box::new(ImageScaler::new()),
                ModuleId::PoolNavigator => Box::new(PoolNavigator::new()),
                ModuleId::InfiniteScroll => Box::new(InfiniteScroll::new()),
                ModuleId::InstantSearch => Box::new(InstantSearch::new(config.search_debounce())),
                ModuleId::TagSubscriptions => Box::new(TagSubscriptions::new()),
            }
        })
        .collect()
}
