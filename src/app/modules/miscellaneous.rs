//! Small site tweaks that don't deserve a module of their own.

use std::any::Any;

use serde_json::json;

use crate::app::controllers::hotkeys::HotkeyDef;
use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Action, Effect, Message, QuoteRequest, QuoteSource};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::page::PageKind;
use crate::app::domain::settings::{SettingsMap, schema};
use crate::app::infrastructure::error::Result;
use crate::app::services::text_ops::{format_quote, strip_nested_quotes};

pub const REDESIGN_FIXES: &str = "redesignFixes";
pub const TAG_COUNT: &str = "improveTagCount";
pub const SEARCH_BOX: &str = "section#search-box input";

#[derive(Debug, Default)]
pub struct Miscellaneous {
    stylesheets: Vec<&'static str>,
}

impl Miscellaneous {
    pub fn new() -> Self {
        Self::default()
    }

    fn inject(&mut self, ctx: &mut ModuleContext<'_>, sheet: &'static str) {
        self.stylesheets.push(sheet);
        ctx.emit(Effect::InjectStylesheet(sheet));
    }

    fn quote(&self, request: &QuoteRequest, ctx: &mut ModuleContext<'_>) {
        let (path, target, reply_button) = match request.source {
            QuoteSource::ForumPost(id) => (
                format!("/forum_posts/{}.json", id),
                "#forum_post_body",
                "a#new-response-link",
            ),
            QuoteSource::Comment(id) => (
                format!("/comments/{}.json", id),
                "#comment_body_for_",
                "a.expand-comment-response",
            ),
        };

        let body = if request.selection.is_empty() {
            match ctx.api.body_of(&path) {
                Ok(body) => strip_nested_quotes(&body),
                Err(e) => {
                    tracing::warn!("Could not fetch {} for quoting: {}", path, e);
                    return;
                }
            }
        } else {
            request.selection.clone()
        };

        let text = format_quote(&request.creator, request.creator_id, &body, &request.existing);
        ctx.emit(Effect::Click(reply_button));
        ctx.emit(Effect::InsertText { target, text });
    }
}

impl Module for Miscellaneous {
    fn id(&self) -> ModuleId {
        ModuleId::Miscellaneous
    }

    fn default_settings(&self) -> SettingsMap {
        schema([
            ("hotkeyFocusSearch", json!("q")),
            ("hotkeyRandomPost", json!("r")),
            ("hotkeyNewComment", json!("n")),
            ("hotkeyEditPost", json!("e")),
            ("removeSearchQueryString", json!(true)),
            ("loadRedesignFixes", json!(true)),
            ("improveTagCount", json!(true)),
        ])
    }

    fn hotkeys(&self) -> Vec<HotkeyDef> {
        vec![
            HotkeyDef::new("hotkeyFocusSearch", Action::FocusSearch),
            HotkeyDef::new("hotkeyRandomPost", Action::RandomPost),
            HotkeyDef::new("hotkeyNewComment", Action::NewComment),
            HotkeyDef::new("hotkeyEditPost", Action::EditPost),
        ]
    }

    fn create(&mut self, base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        if base.fetch_setting_as::<bool>("loadRedesignFixes", false)? {
            self.inject(ctx, REDESIGN_FIXES);
        }

        let kind = ctx.page().kind();
        if base.fetch_setting_as::<bool>("improveTagCount", false)?
            && matches!(kind, PageKind::Post | PageKind::Search)
        {
            self.inject(ctx, TAG_COUNT);
        }

        if kind == PageKind::Post
            && base.fetch_setting_as::<bool>("removeSearchQueryString", false)?
            && ctx.page().query_param("q").is_some()
        {
            ctx.model.page.remove_query_param("q");
            let url = ctx.page().url().to_string();
            ctx.emit(Effect::ReplaceUrl(url));
        }

        if kind == PageKind::Search {
            ctx.emit(Effect::Focus(SEARCH_BOX));
        }
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, ctx: &mut ModuleContext<'_>) -> Result<()> {
        for sheet in self.stylesheets.drain(..) {
            ctx.emit(Effect::RemoveStylesheet(sheet));
        }
        Ok(())
    }

    fn on_hotkey(
        &mut self,
        action: Action,
        _base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        let kind = ctx.page().kind();
        match (action, kind) {
            (Action::FocusSearch, _) => ctx.emit(Effect::Focus(SEARCH_BOX)),
            (Action::RandomPost, _) => ctx.emit(Effect::Click("a#random-post")),
            (Action::NewComment, PageKind::Post) => {
                ctx.emit(Effect::Click("menu#post-sections a[href='#comments']"));
                ctx.emit(Effect::Click("a.expand-comment-response"));
            }
            (Action::NewComment, PageKind::Forum) => ctx.emit(Effect::Click("a#new-response-link")),
            (Action::EditPost, PageKind::Post) => {
                ctx.emit(Effect::Click("menu#post-sections a[href='#edit']"))
            }
            _ => {}
        }
        Ok(())
    }

    fn on_message(
        &mut self,
        message: &Message,
        _base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        if let Message::Quote(request) = message {
            self.quote(request, ctx);
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
    use crate::app::infrastructure::api::fixtures::StubApi;
    use pretty_assertions::assert_eq;

    const ID: ModuleId = ModuleId::Miscellaneous;

    fn request(source: QuoteSource, selection: &str, existing: &str) -> QuoteRequest {
        QuoteRequest {
            source,
            creator: "wolfy".to_string(),
            creator_id: 3,
            selection: selection.to_string(),
            existing: existing.to_string(),
        }
    }

    #[test]
    fn test_post_page_strips_search_query() {
        let mut harness = Harness::new("https://e621.net/posts/12?q=wolf&lang=en");
        let _controller = started(Box::new(Miscellaneous::new()), &mut harness);

        assert_eq!(harness.model.page.query_param("q"), None);
        assert_eq!(
            harness.effects,
            vec![
                Effect::InjectStylesheet(REDESIGN_FIXES),
                Effect::InjectStylesheet(TAG_COUNT),
                Effect::ReplaceUrl("https://e621.net/posts/12?lang=en".to_string()),
            ]
        );
    }

    #[test]
    fn test_search_page_focuses_search_box() {
        let mut harness = Harness::new("https://e621.net/posts?tags=wolf");
        let _controller = started(Box::new(Miscellaneous::new()), &mut harness);
        assert_eq!(harness.effects.last(), Some(&Effect::Focus(SEARCH_BOX)));
    }

    #[test]
    fn test_destroy_removes_stylesheets() {
        let mut harness = Harness::new("https://e621.net/forum_topics/5");
        let mut controller = started(Box::new(Miscellaneous::new()), &mut harness);
        harness.effects.clear();

        controller.destroy(ID, &mut harness.ctx()).unwrap();
        assert_eq!(harness.effects, vec![Effect::RemoveStylesheet(REDESIGN_FIXES)]);
    }

    #[test]
    fn test_new_comment_depends_on_page() {
        let mut harness = Harness::new("https://e621.net/forum_topics/5");
        let mut controller = started(Box::new(Miscellaneous::new()), &mut harness);
        harness.effects.clear();

        controller.dispatch_key("n", &mut harness.ctx()).unwrap();
        controller.dispatch_key("e", &mut harness.ctx()).unwrap();
        assert_eq!(harness.effects, vec![Effect::Click("a#new-response-link")]);
    }

    #[test]
    fn test_quote_fetches_and_strips_body() {
        let mut harness = Harness::new("https://e621.net/forum_topics/5");
        harness.api = StubApi::default().with(
            "/forum_posts/9.json",
            json!({"body": "[quote]older[/quote]\nactual text"}),
        );
        let mut controller = started(Box::new(Miscellaneous::new()), &mut harness);
        harness.effects.clear();

        let message = Message::Quote(request(QuoteSource::ForumPost(9), "", "draft"));
        controller.broadcast(&message, &mut harness.ctx());
        assert_eq!(
            harness.effects,
            vec![
                Effect::Click("a#new-response-link"),
                Effect::InsertText {
                    target: "#forum_post_body",
                    text: "\n\n[quote]\"wolfy\":/user/show/3 said:\nactual text\n[/quote]".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_quote_uses_selection_verbatim() {
        let mut harness = Harness::new("https://e621.net/posts/1");
        let mut controller = started(Box::new(Miscellaneous::new()), &mut harness);
        harness.effects.clear();

        let message = Message::Quote(request(QuoteSource::Comment(4), "[quote]x[/quote]", ""));
        controller.broadcast(&message, &mut harness.ctx());
        assert!(harness.api.requests.borrow().is_empty());
        assert!(matches!(
            harness.effects.last(),
            Some(Effect::InsertText { text, .. }) if text.contains("[quote]x[/quote]")
        ));
    }

    #[test]
    fn test_quote_fetch_failure_changes_nothing() {
        let mut harness = Harness::new("https://e621.net/posts/1");
        let mut controller = started(Box::new(Miscellaneous::new()), &mut harness);
        harness.effects.clear();

        let message = Message::Quote(request(QuoteSource::Comment(4), "", ""));
        controller.broadcast(&message, &mut harness.ctx());
        assert!(harness.effects.is_empty());
    }
}
