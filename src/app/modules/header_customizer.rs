//! Editable navigation tabs in the site header.

use std::any::Any;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::app::controllers::hotkeys::HotkeyDef;
use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::config::UserInfo;
use crate::app::domain::messages::{Action, Effect};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::Page;
use crate::app::domain::settings::{SettingsMap, schema};
use crate::app::infrastructure::error::{AppError, Result};
use crate::app::services::text_ops::substitute_tab_variables;

const TABS_KEY: &str = "tabs";

const TAB_HOTKEYS: [HotkeyDef; 9] = [
    HotkeyDef::new("hotkeyTab1", Action::OpenTab(1)),
    HotkeyDef::new("hotkeyTab2", Action::OpenTab(2)),
    HotkeyDef::new("hotkeyTab3", Action::OpenTab(3)),
    HotkeyDef::new("hotkeyTab4", Action::OpenTab(4)),
    HotkeyDef::new("hotkeyTab5", Action::OpenTab(5)),
    HotkeyDef::new("hotkeyTab6", Action::OpenTab(6)),
    HotkeyDef::new("hotkeyTab7", Action::OpenTab(7)),
    HotkeyDef::new("hotkeyTab8", Action::OpenTab(8)),
    HotkeyDef::new("hotkeyTab9", Action::OpenTab(9)),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tab {
    #[serde(default = "default_tab_name")]
    pub name: String,
    /// May contain `%userid%` and `%username%`
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub title: String,
}

fn default_tab_name() -> String {
    "New Tab".to_string()
}

impl Default for Tab {
    fn default() -> Self {
        Self {
            name: default_tab_name(),
            href: String::new(),
            title: String::new(),
        }
    }
}

impl Tab {
    pub fn new(name: &str, href: &str) -> Self {
        Self {
            name: name.to_string(),
            href: href.to_string(),
            title: String::new(),
        }
    }

    /// Link with user variables filled in
    pub fn resolved_href(&self, user: Option<&UserInfo>) -> String {
        substitute_tab_variables(&self.href, user)
    }

    /// Whether the tab points at the page being viewed.
    pub fn is_active(&self, page: &Page, user: Option<&UserInfo>) -> bool {
        let href = self.resolved_href(user);
        let path = href.split('?').next().unwrap_or_default();
        !path.is_empty() && page.path().contains(path)
    }
}

pub fn default_tabs() -> Vec<Tab> {
    [
        ("Account", "/users/home"),
        ("Posts", "/posts"),
        ("Comments", "/comments?group_by=post"),
        ("Artists", "/artists"),
        ("Tags", "/tags"),
        ("Blips", "/blips"),
        ("Pools", "/pools"),
        ("Sets", "/post_sets"),
        ("Wiki", "/wiki_pages?title=help%3Ahome"),
        ("Forum", "/forum_topics"),
        ("Discord", "/static/discord"),
        ("Help", "/help"),
        ("More »", "/static/site_map"),
    ]
    .into_iter()
    .map(|(name, href)| Tab::new(name, href))
    .collect()
}

#[derive(Debug, Default)]
pub struct HeaderCustomizer {
    /// Index of the tab matching the current page, if any
    active: Option<usize>,
}

impl HeaderCustomizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_tab(&self) -> Option<usize> {
        self.active
    }

    pub fn tabs(&self, base: &mut ModuleBase) -> Result<Vec<Tab>> {
        base.fetch_setting_as(TABS_KEY, false)
    }

    /// Append a tab, returning its index.
    pub fn add_tab(&self, base: &mut ModuleBase, tab: Tab) -> Result<usize> {
        let mut tabs = self.tabs(base)?;
        tabs.push(tab);
        save_tabs(base, &tabs)?;
        Ok(tabs.len() - 1)
    }

    pub fn update_tab(&self, base: &mut ModuleBase, index: usize, tab: Tab) -> Result<()> {
        let mut tabs = self.tabs(base)?;
        let slot = tabs.get_mut(index).ok_or_else(|| out_of_range(index))?;
        *slot = tab;
        save_tabs(base, &tabs)
    }

    pub fn delete_tab(&self, base: &mut ModuleBase, index: usize) -> Result<Tab> {
        let mut tabs = self.tabs(base)?;
        if index >= tabs.len() {
            return Err(out_of_range(index));
        }
        let removed = tabs.remove(index);
        save_tabs(base, &tabs)?;
        Ok(removed)
    }

    pub fn move_tab(&self, base: &mut ModuleBase, from: usize, to: usize) -> Result<()> {
        let mut tabs = self.tabs(base)?;
        if from >= tabs.len() || to >= tabs.len() {
            return Err(out_of_range(from.max(to)));
        }
        let tab = tabs.remove(from);
        tabs.insert(to, tab);
        save_tabs(base, &tabs)
    }
}

fn save_tabs(base: &mut ModuleBase, tabs: &[Tab]) -> Result<()> {
    base.push_setting_as(TABS_KEY, &tabs, true)
}

fn out_of_range(index: usize) -> AppError {
    AppError::Settings(format!("no header tab at index {}", index))
}

impl Module for HeaderCustomizer {
    fn id(&self) -> ModuleId {
        ModuleId::HeaderCustomizer
    }

    fn default_settings(&self) -> SettingsMap {
        let mut fields: Vec<(String, serde_json::Value)> = TAB_HOTKEYS
            .iter()
            .enumerate()
            .map(|(i, def)| (def.setting.to_string(), json!((i + 1).to_string())))
            .collect();
        fields.push((TABS_KEY.to_string(), json!(default_tabs())));
        schema(fields)
    }

    fn hotkeys(&self) -> Vec<HotkeyDef> {
        TAB_HOTKEYS.to_vec()
    }

    fn create(&mut self, base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let tabs = self.tabs(base)?;
        let user = ctx.model.user.as_ref();
        self.active = tabs.iter().position(|tab| tab.is_active(ctx.page(), user));
        tracing::debug!("Header has {} tabs, active {:?}", tabs.len(), self.active);
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.active = None;
        Ok(())
    }

    fn on_hotkey(
        &mut self,
        action: Action,
        base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        let Action::OpenTab(n) = action else {
            return Ok(());
        };
        let tabs = self.tabs(base)?;
        let Some(tab) = (n as usize).checked_sub(1).and_then(|i| tabs.get(i)) else {
            return Ok(());
        };

        let href = tab.resolved_href(ctx.model.user.as_ref());
        if href.is_empty() {
            return Ok(());
        }
        let url = if href.starts_with('/') {
            format!("{}{}", ctx.page().origin(), href)
        } else {
            href
        };
        ctx.emit(Effect::OpenUrl(url));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
