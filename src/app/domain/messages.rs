use std::time::Instant;

use chrono::{DateTime, Utc};

use super::post::ScaleMode;

/// Hotkey actions, dispatched to the module owning the binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    // ImageScaler
    CycleScale,
    Fullscreen,

    // PoolNavigator
    CycleNavbar,
    NextPost,
    PrevPost,

    // Miscellaneous
    FocusSearch,
    RandomPost,
    NewComment,
    EditPost,

    // HeaderCustomizer, 1-based
    OpenTab(u8),
}

/// Events delivered by the host to the running modules.
#[derive(Debug, Clone)]
pub enum Message {
    Navigate(String),
    KeyPressed(String),

    // Search
    SearchInput { text: String, at: Instant },
    Tick(Instant),
    Scrolled(ScrollMetrics),
    PostsAppended,

    // Post
    ImageClicked,

    // Background
    PollSubscriptions(DateTime<Utc>),
    Quote(QuoteRequest),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub document_height: f64,
}

impl ScrollMetrics {
    /// True once the viewport bottom is within `margin` pixels of the end.
    pub fn near_bottom(&self, margin: f64) -> bool {
        self.scroll_top + self.viewport_height > self.document_height - margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteSource {
    ForumPost(u64),
    Comment(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub source: QuoteSource,
    pub creator: String,
    pub creator_id: u64,
    /// Text the user highlighted, empty for none
    pub selection: String,
    /// Current contents of the reply box
    pub existing: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavDirection {
    Next,
    Prev,
}

/// Page-side work requested by a module, performed by the embedding shell.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    InjectStylesheet(&'static str),
    RemoveStylesheet(&'static str),
    Focus(&'static str),
    Click(&'static str),
    OpenUrl(String),
    ReplaceUrl(String),
    SetImageSize(ScaleMode),
    ShowLoading(bool),
    PageSeparator { page: u32, url: String },
    PostsFiltered { visible: usize, hidden: usize },
    SelectNavbar(usize),
    FollowNavbar { index: usize, direction: NavDirection },
    InsertText { target: &'static str, text: String },
    SubscriptionUpdates(usize),
}
