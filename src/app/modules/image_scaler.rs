use std::any::Any;

use serde_json::json;

use crate::app::controllers::hotkeys::HotkeyDef;
use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Action, Effect, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::{Constraint, PageKind};
use crate::app::domain::post::ScaleMode;
use crate::app::domain::settings::{SettingsMap, schema};
use crate::app::infrastructure::error::Result;

/// Resizes the image on post pages.
#[derive(Debug, Default)]
pub struct ImageScaler {
    /// Size currently shown, which an image click may change without saving
    current: ScaleMode,
}

impl ImageScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> ScaleMode {
        self.current
    }

    fn stored_size(base: &mut ModuleBase) -> Result<ScaleMode> {
        let name: String = base.fetch_setting_as("size", false)?;
        Ok(ScaleMode::from_name(&name).unwrap_or_else(|| {
            tracing::warn!("Unknown image size '{}', using the default", name);
            ScaleMode::default()
        }))
    }

    fn show(&mut self, mode: ScaleMode, ctx: &mut ModuleContext<'_>) {
        self.current = mode;
        ctx.emit(Effect::SetImageSize(mode));
    }
}

impl Module for ImageScaler {
    fn id(&self) -> ModuleId {
        ModuleId::ImageScaler
    }

    fn constraint(&self) -> Constraint {
        Constraint::only(&[PageKind::Post])
    }

    fn default_settings(&self) -> SettingsMap {
        schema([
            ("hotkeyScale", json!("v|0")),
            ("hotkeyFullscreen", json!("")),
            ("clickScale", json!(true)),
            ("size", json!(ScaleMode::FitVertical.as_str())),
        ])
    }

    fn hotkeys(&self) -> Vec<HotkeyDef> {
        vec![
            HotkeyDef::new("hotkeyScale", Action::CycleScale),
            HotkeyDef::new("hotkeyFullscreen", Action::Fullscreen),
        ]
    }

    fn create(&mut self, base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let mode = Self::stored_size(base)?;
        self.show(mode, ctx);
        Ok(())
    }

    fn on_hotkey(
        &mut self,
        action: Action,
        base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        match action {
            Action::CycleScale => {
                let mode = self.current.next();
                base.push_setting("size", json!(mode.as_str()), true)?;
                self.show(mode, ctx);
            }
            Action::Fullscreen => {
                let file = ctx
                    .model
                    .posts
                    .first()
                    .and_then(|post| post.data.file.url.clone());
                match file {
                    Some(url) => ctx.emit(Effect::OpenUrl(url)),
                    None => tracing::debug!("No file to open on {}", ctx.page().url()),
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        message: &Message,
        base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        if matches!(message, Message::ImageClicked) && base.fetch_setting_as::<bool>("clickScale", false)? {
            let mode = self.current.next();
            self.show(mode, ctx);
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
