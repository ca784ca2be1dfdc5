use super::config::UserInfo;
use super::messages::ScrollMetrics;
use super::page::Page;
use super::post::{ApiPost, Post};

/// Headless view of the host page that modules read and modify.
#[derive(Debug, Clone)]
pub struct PageModel {
    pub page: Page,
    pub posts: Vec<Post>,
    /// Pools the viewed post belongs to
    pub pools: Vec<u64>,
    /// Last known scroll position, if the host has reported one
    pub scroll: Option<ScrollMetrics>,
    pub user: Option<UserInfo>,
}

impl PageModel {
    pub fn new(page: Page, user: Option<UserInfo>) -> Self {
        Self {
            page,
            posts: Vec::new(),
            pools: Vec::new(),
            scroll: None,
            user,
        }
    }

    /// Replace the page, dropping everything scraped from the previous one.
    pub fn navigate(&mut self, page: Page) {
        self.page = page;
        self.posts.clear();
        self.pools.clear();
        self.scroll = None;
    }

    pub fn append_posts(&mut self, posts: impl IntoIterator<Item = ApiPost>) {
        self.posts.extend(posts.into_iter().map(Post::new));
    }

    pub fn visible_count(&self) -> usize {
        self.posts.iter().filter(|p| p.visible).count()
    }
}
