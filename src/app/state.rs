use std::collections::VecDeque;
use std::time::Instant;

use serde_json::Value;

use super::controllers::module_base::{Module, ModuleContext};
use super::controllers::module_controller::{KeyOutcome, ModuleController, ReconcileReport};
use super::domain::config::Config;
use super::domain::messages::{Effect, Message};
use super::domain::module_id::ModuleId;
use super::domain::page::Page;
use super::domain::page_model::PageModel;
use super::domain::settings::ENABLED_KEY;
use super::infrastructure::api::HostApi;
use super::infrastructure::error::{AppError, Result};
use super::infrastructure::readiness::{DomProbe, ElementWatcher, Readiness};
use super::infrastructure::store::SharedStore;
use super::modules::default_modules;

/// Elements every module may assume exist once structure is ready
pub const STRUCTURE_SELECTORS: [&str; 2] = ["head", "body"];

/// Upper bound on messages handled by one `pump`, so modules that keep
/// answering each other cannot spin forever.
const MAX_PUMPED: usize = 1024;

/// Process-wide context: constructed once at startup and passed around by
/// reference.
pub struct AppState {
    pub config: Config,
    pub store: SharedStore,
    api: Box<dyn HostApi>,
    model: PageModel,
    controller: ModuleController,
    queue: VecDeque<Message>,
    effects: Vec<Effect>,
    started: bool,
}

impl AppState {
    pub fn new(config: Config, store: SharedStore, api: Box<dyn HostApi>, url: &str) -> Result<Self> {
        let page = Page::parse(url)?;
        let model = PageModel::new(page, config.user.clone());
        let controller =
            ModuleController::new(store.clone(), &config.namespace, config.inactive_hotkeys);

        Ok(Self {
            config,
            store,
            api,
            model,
            controller,
            queue: VecDeque::new(),
            effects: Vec::new(),
            started: false,
        })
    }

    pub fn page(&self) -> &Page {
        &self.model.page
    }

    pub fn model(&self) -> &PageModel {
        &self.model
    }

    /// Host-side updates to the scraped page state (posts, pools).
    pub fn model_mut(&mut self) -> &mut PageModel {
        &mut self.model
    }

    pub fn controller(&self) -> &ModuleController {
        &self.controller
    }

    /// Run `f` with the controller and a context over the rest of the state.
    /// Messages sent by hooks are queued, not delivered.
    fn with_context<R>(
        &mut self,
        f: impl FnOnce(&mut ModuleController, &mut ModuleContext<'_>) -> R,
    ) -> R {
        let mut outbox = Vec::new();
        let result = {
            let mut ctx = ModuleContext {
                model: &mut self.model,
                api: &*self.api,
                config: &self.config,
                effects: &mut self.effects,
                outbox: &mut outbox,
            };
            f(&mut self.controller, &mut ctx)
        };
        self.queue.extend(outbox);
        result
    }

    pub fn register(&mut self, module: Box<dyn Module>) -> Result<ModuleId> {
        self.with_context(|controller, ctx| controller.register(module, ctx))
    }

    pub fn register_default_modules(&mut self) -> Result<()> {
        for module in default_modules(&self.config) {
            self.register(module)?;
        }
        Ok(())
    }

    /// A watcher for the page structure, bounded by the configured limits.
    pub fn structure_watcher(&self) -> ElementWatcher {
        let mut watcher = ElementWatcher::new(
            self.config.readiness_max_iterations,
            self.config.readiness_timeout(),
        );
        for selector in STRUCTURE_SELECTORS {
            watcher.watch(selector, move || tracing::debug!("Structure element '{}' found", selector));
        }
        watcher
    }

    /// Feed one DOM notification to `watcher`. Once it settles (ready or
    /// timed out), the first reconciliation runs. An aborted wait starts
    /// nothing.
    pub fn await_structure(
        &mut self,
        probe: &dyn DomProbe,
        watcher: &mut ElementWatcher,
        now: Instant,
    ) -> Readiness {
        let outcome = watcher.observe(probe, now);
        if matches!(outcome, Readiness::Ready | Readiness::TimedOut) && !self.started {
            self.start();
        }
        outcome
    }

    /// The document finished loading; whatever the watcher still waits on
    /// is given up and modules start anyway.
    pub fn structure_complete(&mut self, probe: &dyn DomProbe, watcher: &mut ElementWatcher) -> Readiness {
        let outcome = watcher.finish(probe);
        if outcome != Readiness::Aborted && !self.started {
            self.start();
        }
        outcome
    }

    fn start(&mut self) -> ReconcileReport {
        self.started = true;
        let report = self.reconcile();
        self.pump();
        report
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn reconcile(&mut self) -> ReconcileReport {
        self.with_context(|controller, ctx| controller.reconcile(ctx))
    }

    /// Move to a new page and bring every module in line with it.
    pub fn navigate(&mut self, url: &str) -> Result<ReconcileReport> {
        self.navigate_with(url, |_| {})
    }

    /// Like `navigate`, with `scrape` filling in what the host read off the
    /// new page (posts, pools, scroll position) before any module starts.
    pub fn navigate_with(
        &mut self,
        url: &str,
        scrape: impl FnOnce(&mut PageModel),
    ) -> Result<ReconcileReport> {
        let report = self.navigate_to(url, scrape)?;
        self.pump();
        Ok(report)
    }

    /// Modules already running are reloaded when the URL changes, as after
    /// a full page load.
    fn navigate_to(
        &mut self,
        url: &str,
        scrape: impl FnOnce(&mut PageModel),
    ) -> Result<ReconcileReport> {
        let page = Page::parse(url)?;
        tracing::debug!("Navigating to {}", page.url());
        let moved = page.url() != self.model.page.url();
        self.model.navigate(page);
        scrape(&mut self.model);
        self.started = true;

        if moved {
            Ok(self.with_context(|controller, ctx| controller.reload(ctx)))
        } else {
            Ok(self.reconcile())
        }
    }

    pub fn press_key(&mut self, key: &str) -> Result<KeyOutcome> {
        let outcome = self.with_context(|controller, ctx| controller.dispatch_key(key, ctx))?;
        self.pump();
        Ok(outcome)
    }

    pub fn send(&mut self, message: Message) {
        self.queue.push_back(message);
    }

    /// Deliver queued messages, including those sent while delivering.
    /// Returns how many were handled.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.queue.pop_front() {
            if handled == MAX_PUMPED {
                tracing::warn!("Dropping {} queued messages", self.queue.len() + 1);
                self.queue.clear();
                break;
            }
            handled += 1;

            match message {
                Message::Navigate(url) => {
                    if let Err(e) = self.navigate_to(&url, |_| {}) {
                        tracing::warn!("Cannot navigate to {}: {}", url, e);
                    }
                }
                Message::KeyPressed(key) => {
                    if let Err(e) = self.with_context(|c, ctx| c.dispatch_key(&key, ctx)) {
                        tracing::warn!("Hotkey '{}' failed: {}", key, e);
                    }
                }
                Message::Scrolled(metrics) => {
                    self.model.scroll = Some(metrics);
                    self.with_context(|c, ctx| c.broadcast(&Message::Scrolled(metrics), ctx));
                }
                other => self.with_context(|c, ctx| c.broadcast(&other, ctx)),
            }
        }
        handled
    }

    /// Settings panel write: persists the value and rebinds hotkeys.
    pub fn push_setting(&mut self, id: ModuleId, key: &str, value: Value) -> Result<()> {
        if key == ENABLED_KEY {
            let enabled = value.as_bool().ok_or_else(|| {
                AppError::Settings(format!("{}.{} must be a boolean", id, ENABLED_KEY))
            })?;
            self.set_module_enabled(id, enabled)?;
            return Ok(());
        }
        self.with_context(|controller, ctx| controller.push_setting(id, key, value, ctx))
    }

    /// Persist a module's enabled flag and apply it right away.
    pub fn set_module_enabled(&mut self, id: ModuleId, enabled: bool) -> Result<ReconcileReport> {
        self.with_context(|controller, ctx| {
            controller.push_setting(id, ENABLED_KEY, Value::Bool(enabled), ctx)?;
            controller.set_enabled(id, enabled)
        })?;
        let report = self.reconcile();
        self.pump();
        Ok(report)
    }

    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn teardown(&mut self) {
        self.queue.clear();
        self.with_context(|controller, ctx| controller.teardown(ctx));
        self.started = false;
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::app::domain::messages::{Action, ScrollMetrics};
    use crate::app::domain::post::ScaleMode;
    use crate::app::infrastructure::api::fixtures::StubApi;
    use crate::app::infrastructure::store::{MemoryStore, SettingsStore};
    use crate::app::modules::header_customizer::HeaderCustomizer;
    use crate::app::modules::infinite_scroll::InfiniteScroll;
    use crate::app::modules::pool_navigator::{Navbar, PoolNavigator};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SEARCH: &str = "https://e621.net/posts?tags=wolf";
    const POST: &str = "https://e621.net/posts/42";

    struct Dom(Vec<&'static str>);

    impl DomProbe for Dom {
        fn exists(&self, selector: &str) -> bool {
            self.0.iter().any(|present| *present == selector)
        }
    }

    fn state_with(store: Rc<RefCell<MemoryStore>>, api: StubApi, url: &str) -> AppState {
        let mut state = AppState::new(Config::default(), store, Box::new(api), url).unwrap();
        state.register_default_modules().unwrap();
        state
    }

    fn state(url: &str) -> AppState {
        state_with(MemoryStore::shared(), StubApi::default(), url)
    }

    #[test]
    fn test_nothing_runs_before_structure_is_ready() {
        let mut state = state(SEARCH);
        assert!(state.controller().active().is_empty());

        let mut watcher = state.structure_watcher();
        let now = Instant::now();
        assert_eq!(
            state.await_structure(&Dom(vec!["head"]), &mut watcher, now),
            Readiness::Pending
        );
        assert!(!state.is_started());

        let dom = Dom(STRUCTURE_SELECTORS.to_vec());
        assert_eq!(state.await_structure(&dom, &mut watcher, now), Readiness::Ready);
        assert!(state.controller().active().contains(&ModuleId::InstantSearch));
    }

    #[test]
    fn test_timed_out_structure_still_starts_modules() {
        let mut state = state(SEARCH);
        let mut watcher = state.structure_watcher();
        let start = Instant::now();

        state.await_structure(&Dom(vec![]), &mut watcher, start);
        let late = start + state.config.readiness_timeout() + Duration::from_millis(1);
        assert_eq!(
            state.await_structure(&Dom(vec![]), &mut watcher, late),
            Readiness::TimedOut
        );
        assert!(state.is_started());
    }

    #[test]
    fn test_aborted_structure_starts_nothing() {
        let mut state = state(SEARCH);
        let mut watcher = state.structure_watcher();
        watcher.abort_signal().abort();

        let dom = Dom(STRUCTURE_SELECTORS.to_vec());
        assert_eq!(state.structure_complete(&dom, &mut watcher), Readiness::Aborted);
        assert!(state.controller().active().is_empty());
    }

    #[test]
    fn test_navigation_swaps_page_modules() {
        let mut state = state(SEARCH);
        let report = state.navigate(SEARCH).unwrap();
        assert!(report.created.contains(&ModuleId::InfiniteScroll));
        assert!(!report.created.contains(&ModuleId::ImageScaler));

        let report = state.navigate(POST).unwrap();
        assert_eq!(report.created, vec![ModuleId::ImageScaler, ModuleId::PoolNavigator]);
        assert_eq!(
            report.destroyed,
            vec![ModuleId::InfiniteScroll, ModuleId::InstantSearch]
        );
        assert!(report.reloaded.contains(&ModuleId::HeaderCustomizer));
        assert!(report.failed.is_empty());
    }

    #[test]
    fn test_search_to_search_starts_a_fresh_query() {
        let api = StubApi::default().with("/posts.json?tags=wolf&page=5", json!({"posts": []}));
        let mut state = state_with(MemoryStore::shared(), api, SEARCH);
        state.navigate("https://e621.net/posts?tags=wolf&page=4").unwrap();
        state.send(Message::Scrolled(ScrollMetrics {
            scroll_top: 950.0,
            viewport_height: 100.0,
            document_height: 1000.0,
        }));
        state.pump();

        let scroll = |state: &AppState| {
            let module = state.controller().module::<InfiniteScroll>(ModuleId::InfiniteScroll);
            let module = module.unwrap();
            (module.query().to_string(), module.next_page(), module.has_pages_left())
        };
        assert_eq!(scroll(&state), ("wolf".to_string(), 5, false));

        let report = state.navigate("https://e621.net/posts?tags=fox").unwrap();
        assert!(report.reloaded.contains(&ModuleId::InfiniteScroll));
        assert_eq!(scroll(&state), ("fox".to_string(), 2, true));
    }

    #[test]
    fn test_post_to_post_rereads_scraped_pools() {
        let mut state = state(POST);
        state.navigate_with(POST, |model| model.pools = vec![6, 7]).unwrap();
        let navbars = |state: &AppState| {
            let module = state.controller().module::<PoolNavigator>(ModuleId::PoolNavigator);
            module.unwrap().navbars().to_vec()
        };
        assert_eq!(navbars(&state), vec![Navbar::Pool(6), Navbar::Pool(7)]);
        assert_eq!(
            state.press_key("x").unwrap(),
            KeyOutcome::Handled(ModuleId::PoolNavigator, Action::CycleNavbar)
        );

        state
            .navigate_with("https://e621.net/posts/43", |model| model.pools = vec![8, 9])
            .unwrap();
        assert_eq!(navbars(&state), vec![Navbar::Pool(8), Navbar::Pool(9)]);
        let module = state.controller().module::<PoolNavigator>(ModuleId::PoolNavigator);
        assert_eq!(module.unwrap().active(), Some(&Navbar::Pool(8)));
    }

    #[test]
    fn test_same_kind_navigation_moves_active_tab() {
        let forum = "https://e621.net/forum_topics";
        let mut state = state(forum);
        state.navigate(forum).unwrap();
        let active = |state: &AppState| {
            let module = state.controller().module::<HeaderCustomizer>(ModuleId::HeaderCustomizer);
            module.unwrap().active_tab()
        };
        assert_eq!(active(&state), Some(9));

        state.navigate("https://e621.net/wiki_pages?title=help%3Ahome").unwrap();
        assert_eq!(active(&state), Some(8));
    }

    #[test]
    fn test_scroll_position_is_remembered() {
        let mut state = state(SEARCH);
        state.navigate(SEARCH).unwrap();
        let metrics = ScrollMetrics {
            scroll_top: 0.0,
            viewport_height: 800.0,
            document_height: 4000.0,
        };
        state.send(Message::Scrolled(metrics));
        state.pump();
        assert_eq!(state.model().scroll, Some(metrics));

        state.navigate(POST).unwrap();
        assert!(state.model().scroll.is_none());
    }

    #[test]
    fn test_keys_route_to_active_modules() {
        let mut state = state(SEARCH);
        state.navigate(SEARCH).unwrap();

        // ImageScaler owns "v" but only works on post pages
        assert_eq!(
            state.press_key("v").unwrap(),
            KeyOutcome::Swallowed(ModuleId::ImageScaler)
        );

        state.navigate(POST).unwrap();
        state.take_effects();
        assert_eq!(
            state.press_key("v").unwrap(),
            KeyOutcome::Handled(ModuleId::ImageScaler, Action::CycleScale)
        );
        assert_eq!(
            state.take_effects(),
            vec![Effect::SetImageSize(ScaleMode::FitHorizontal)]
        );
    }

    #[test]
    fn test_appended_posts_are_refiltered() {
        let api = StubApi::default().with(
            "/posts.json?tags=wolf&page=2",
            json!({"posts": [{"id": 9, "created_at": "2021-01-01T00:00:00Z", "tags": {"general": ["fox"]}}]}),
        );
        let mut state = state_with(MemoryStore::shared(), api, SEARCH);
        state.navigate(SEARCH).unwrap();

        let now = Instant::now();
        state.send(Message::SearchInput {
            text: "wolf".to_string(),
            at: now - state.config.search_debounce(),
        });
        state.send(Message::Tick(now));
        state.send(Message::Scrolled(ScrollMetrics {
            scroll_top: 950.0,
            viewport_height: 100.0,
            document_height: 1000.0,
        }));
        state.pump();

        // InfiniteScroll appended a fox post; InstantSearch hid it
        assert_eq!(state.model().posts.len(), 1);
        assert!(!state.model().posts[0].visible);
        assert_eq!(
            state.take_effects().last(),
            Some(&Effect::PostsFiltered {
                visible: 0,
                hidden: 1
            })
        );
    }

    #[test]
    fn test_disabling_a_module_destroys_it_and_persists() {
        let store = MemoryStore::shared();
        let mut state = state_with(store.clone(), StubApi::default(), POST);
        state.navigate(POST).unwrap();

        let report = state.set_module_enabled(ModuleId::ImageScaler, false).unwrap();
        assert_eq!(report.destroyed, vec![ModuleId::ImageScaler]);
        assert_eq!(
            store.borrow().get("re621.ImageScaler").unwrap().unwrap()["enabled"],
            json!(false)
        );

        // The flag survives a restart
        let mut state = state_with(store, StubApi::default(), POST);
        let report = state.navigate(POST).unwrap();
        assert!(!report.created.contains(&ModuleId::ImageScaler));
    }

    #[test]
    fn test_push_setting_rejects_non_boolean_enabled() {
        let mut state = state(POST);
        assert!(matches!(
            state.push_setting(ModuleId::ImageScaler, ENABLED_KEY, json!("yes")),
            Err(AppError::Settings(_))
        ));
    }

    #[test]
    fn test_navigate_message_is_handled_by_pump() {
        let mut state = state(SEARCH);
        state.navigate(SEARCH).unwrap();
        state.send(Message::Navigate(POST.to_string()));
        assert_eq!(state.pump(), 1);
        assert_eq!(state.page().url(), POST);
    }

    #[test]
    fn test_teardown_stops_everything() {
        let mut state = state(POST);
        state.navigate(POST).unwrap();
        state.teardown();
        assert!(state.controller().active().is_empty());
        assert_eq!(state.press_key("v").unwrap(), KeyOutcome::Unbound);
    }
}
