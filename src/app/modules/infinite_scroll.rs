//! Loads the next result page when the user scrolls to the bottom.

use std::any::Any;

use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Effect, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::{Constraint, PageKind};
use crate::app::infrastructure::error::Result;

/// Pixels from the bottom at which the next page is requested
const LOAD_MARGIN: f64 = 50.0;

#[derive(Debug, Default)]
pub struct InfiniteScroll {
    query: String,
    next_page: u32,
    pages_left: bool,
}

impl InfiniteScroll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn next_page(&self) -> u32 {
        self.next_page
    }

    pub fn has_pages_left(&self) -> bool {
        self.pages_left
    }

    /// Fetch and append the next page. Returns whether posts were added.
    ///
    /// A failed request leaves everything as it was so the next scroll retries.
    pub fn load_next_page(&mut self, ctx: &mut ModuleContext<'_>) -> bool {
        if !self.pages_left {
            return false;
        }

        ctx.emit(Effect::ShowLoading(true));
        let loaded = match ctx.api.posts(&self.query, self.next_page) {
            Ok(posts) if posts.is_empty() => {
                tracing::debug!("No posts on page {}", self.next_page);
                self.pages_left = false;
                false
            }
            Ok(posts) => {
                let page = self.next_page;
                ctx.model.append_posts(posts);
                ctx.model.page.set_query_param("page", &page.to_string());
                let url = ctx.page().url().to_string();
                ctx.emit(Effect::ReplaceUrl(url.clone()));
                ctx.emit(Effect::PageSeparator { page, url });
                ctx.send(Message::PostsAppended);
                self.next_page += 1;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to load page {}: {}", self.next_page, e);
                false
            }
        };
        ctx.emit(Effect::ShowLoading(false));
        loaded
    }
}

impl Module for InfiniteScroll {
    fn id(&self) -> ModuleId {
        ModuleId::InfiniteScroll
    }

    fn constraint(&self) -> Constraint {
        Constraint::only(&[PageKind::Search])
    }

    fn create(&mut self, _base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let page = ctx.page();
        self.query = page.query_param("tags").unwrap_or_default();
        self.next_page = page
            .query_param("page")
            .and_then(|p| p.parse::<u32>().ok())
            .map_or(2, |p| p.saturating_add(1));
        self.pages_left = true;

        // With few posts per page the viewport may already reach the end
        if ctx.model.scroll.is_some_and(|m| m.near_bottom(LOAD_MARGIN)) {
            self.load_next_page(ctx);
        }
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.pages_left = false;
        Ok(())
    }

    fn on_message(
        &mut self,
        message: &Message,
        _base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        if let Message::Scrolled(metrics) = message {
            if metrics.near_bottom(LOAD_MARGIN) {
                self.load_next_page(ctx);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::controllers::module_controller::fixtures::{Harness, started};
    use crate::app::domain::messages::ScrollMetrics;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const ID: ModuleId = ModuleId::InfiniteScroll;

    const BOTTOM: Message = Message::Scrolled(ScrollMetrics {
        scroll_top: 1000.0,
        viewport_height: 800.0,
        document_height: 1820.0,
    });

    fn page_of(ids: &[u64]) -> serde_json::Value {
        let posts: Vec<_> = ids
            .iter()
            .map(|id| json!({"id": id, "created_at": "2021-01-01T00:00:00Z"}))
            .collect();
        json!({ "posts": posts })
    }

    #[test]
    fn test_next_page_from_url() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf&page=4");
        let controller = started(Box::new(InfiniteScroll::new()), &mut harness);
        assert_eq!(controller.module::<InfiniteScroll>(ID).unwrap().next_page(), 5);

        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        let controller = started(Box::new(InfiniteScroll::new()), &mut harness);
        assert_eq!(controller.module::<InfiniteScroll>(ID).unwrap().next_page(), 2);
    }

    #[test]
    fn test_short_page_loads_on_create() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        harness.api = harness.api.with("/posts.json?tags=wolf&page=2", page_of(&[1]));
        harness.model.scroll = Some(ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 900.0,
            document_height: 900.0,
        });

        let controller = started(Box::new(InfiniteScroll::new()), &mut harness);
        assert_eq!(harness.model.posts.len(), 1);
        assert_eq!(controller.module::<InfiniteScroll>(ID).unwrap().next_page(), 3);
    }

    #[test]
    fn test_no_initial_load_without_scroll_position() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        started(Box::new(InfiniteScroll::new()), &mut harness);
        assert!(harness.api.requests.borrow().is_empty());
    }

    #[test]
    fn test_scroll_loads_pages_until_empty() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        harness.api = harness
            .api
            .with("/posts.json?tags=wolf&page=2", page_of(&[1, 2]))
            .with("/posts.json?tags=wolf&page=3", page_of(&[]));
        let mut controller = started(Box::new(InfiniteScroll::new()), &mut harness);

        controller.broadcast(&BOTTOM, &mut harness.ctx());
        assert_eq!(harness.model.posts.len(), 2);
        assert_eq!(harness.model.page.query_param("page").as_deref(), Some("2"));
        assert!(harness.effects.contains(&Effect::PageSeparator {
            page: 2,
            url: "https://e621.net/posts?tags=wolf&page=2".to_string(),
        }));
        assert!(matches!(harness.outbox.as_slice(), [Message::PostsAppended]));

        controller.broadcast(&BOTTOM, &mut harness.ctx());
        let module = controller.module::<InfiniteScroll>(ID).unwrap();
        assert!(!module.has_pages_left());

        // Exhausted: no more requests
        controller.broadcast(&BOTTOM, &mut harness.ctx());
        assert_eq!(harness.api.requests.borrow().len(), 2);
    }

    #[test]
    fn test_far_from_bottom_does_nothing() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        let mut controller = started(Box::new(InfiniteScroll::new()), &mut harness);

        let top = Message::Scrolled(ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 800.0,
            document_height: 4000.0,
        });
        controller.broadcast(&top, &mut harness.ctx());
        assert!(harness.api.requests.borrow().is_empty());
    }

    #[test]
    fn test_failed_request_keeps_state() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        let mut controller = started(Box::new(InfiniteScroll::new()), &mut harness);

        controller.broadcast(&BOTTOM, &mut harness.ctx());
        let module = controller.module::<InfiniteScroll>(ID).unwrap();
        assert_eq!(module.next_page(), 2);
        assert!(module.has_pages_left());
        assert!(harness.model.posts.is_empty());
        assert_eq!(
            harness.effects,
            vec![Effect::ShowLoading(true), Effect::ShowLoading(false)]
        );
    }
}
