//! Filter the posts already on a search page while the user types.

use std::any::Any;
use std::time::Duration;

use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Effect, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::{Constraint, PageKind};
use crate::app::domain::post::PostFilter;
use crate::app::infrastructure::error::Result;
use crate::app::services::debounce::Debouncer;

#[derive(Debug)]
pub struct InstantSearch {
    input: Debouncer<String>,
    filter: PostFilter,
}

impl InstantSearch {
    pub fn new(delay: Duration) -> Self {
        Self {
            input: Debouncer::new(delay),
            filter: PostFilter::default(),
        }
    }

    pub fn filter(&self) -> &PostFilter {
        &self.filter
    }

    fn apply(&self, ctx: &mut ModuleContext<'_>) {
        for post in &mut ctx.model.posts {
            post.visible = self.filter.is_empty() || self.filter.matches(&post.data);
        }
        let visible = ctx.model.visible_count();
        let hidden = ctx.model.posts.len() - visible;
        ctx.emit(Effect::PostsFiltered { visible, hidden });
    }
}

impl Module for InstantSearch {
    fn id(&self) -> ModuleId {
        ModuleId::InstantSearch
    }

    fn constraint(&self) -> Constraint {
        Constraint::only(&[PageKind::Search])
    }

    fn create(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.filter = PostFilter::default();
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.input.cancel();
        self.filter = PostFilter::default();
        self.apply(ctx);
        Ok(())
    }

    fn on_message(
        &mut self,
        message: &Message,
        _base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        match message {
            Message::SearchInput { text, at } => self.input.input(text.clone(), *at),
            Message::Tick(now) => {
                if let Some(text) = self.input.poll(*now) {
                    tracing::debug!("Filtering posts by '{}'", text);
                    self.filter = PostFilter::parse(&text);
                    self.apply(ctx);
                }
            }
            Message::PostsAppended => self.apply(ctx),
            _ => {}
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
