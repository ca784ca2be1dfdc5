//! Keyboard navigation through the search and pool sequences a post is in.

use std::any::Any;

use serde_json::json;

use crate::app::controllers::hotkeys::HotkeyDef;
use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Action, Effect, NavDirection};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::{Constraint, Page, PageKind};
use crate::app::domain::settings::{SettingsMap, schema};
use crate::app::infrastructure::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navbar {
    /// Sequence of the search the post was opened from
    Search(String),
    Pool(u64),
}

#[derive(Debug, Default)]
pub struct PoolNavigator {
    navbars: Vec<Navbar>,
    active: usize,
}

impl PoolNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navbars(&self) -> &[Navbar] {
        &self.navbars
    }

    pub fn active(&self) -> Option<&Navbar> {
        self.navbars.get(self.active)
    }

    fn build(page: &Page, pools: &[u64]) -> Vec<Navbar> {
        let search = page
            .query_param("q")
            .or_else(|| page.query_param("tags"))
            .filter(|q| !q.trim().is_empty())
            .map(Navbar::Search);
        search
            .into_iter()
            .chain(pools.iter().copied().map(Navbar::Pool))
            .collect()
    }

    fn cycle(&mut self, ctx: &mut ModuleContext<'_>) {
        if self.navbars.is_empty() {
            return;
        }
        self.active = (self.active + 1) % self.navbars.len();
        ctx.emit(Effect::SelectNavbar(self.active));
    }

    fn follow(&self, direction: NavDirection, ctx: &mut ModuleContext<'_>) {
        if self.navbars.is_empty() {
            return;
        }
        ctx.emit(Effect::FollowNavbar {
            index: self.active,
            direction,
        });
    }
}

impl Module for PoolNavigator {
    fn id(&self) -> ModuleId {
        ModuleId::PoolNavigator
    }

    fn constraint(&self) -> Constraint {
        Constraint::only(&[PageKind::Post])
    }

    fn default_settings(&self) -> SettingsMap {
        schema([
            ("hotkeyCycle", json!("x|.")),
            ("hotkeyPrev", json!("a|left")),
            ("hotkeyNext", json!("d|right")),
        ])
    }

    fn hotkeys(&self) -> Vec<HotkeyDef> {
        vec![
            HotkeyDef::new("hotkeyCycle", Action::CycleNavbar),
            HotkeyDef::new("hotkeyPrev", Action::PrevPost),
            HotkeyDef::new("hotkeyNext", Action::NextPost),
        ]
    }

    fn create(&mut self, _base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.navbars = Self::build(ctx.page(), &ctx.model.pools);
        self.active = 0;
        if !self.navbars.is_empty() {
            ctx.emit(Effect::SelectNavbar(self.active));
        }
        tracing::debug!("Found {} post navbars", self.navbars.len());
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.navbars.clear();
        self.active = 0;
        Ok(())
    }

    fn on_hotkey(
        &mut self,
        action: Action,
        _base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        match action {
            Action::CycleNavbar => self.cycle(ctx),
            Action::NextPost => self.follow(NavDirection::Next, ctx),
            Action::PrevPost => self.follow(NavDirection::Prev, ctx),
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
