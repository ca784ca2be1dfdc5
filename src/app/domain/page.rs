//! Page classification for activation constraints.

use std::sync::LazyLock;

use regex_lite::Regex;
use url::Url;

use crate::app::infrastructure::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageKind {
    Post,
    Search,
    Favorites,
    Forum,
    Pool,
    Upload,
    Other,
}

static PAGE_PATTERNS: LazyLock<Vec<(PageKind, Regex)>> = LazyLock::new(|| {
    [
        (PageKind::Post, r"^/posts/\d+/?$"),
        (PageKind::Search, r"^/(posts/?)?$"),
        (PageKind::Favorites, r"^/favorites/?$"),
        (PageKind::Forum, r"^/forum_topics/\d+/?$"),
        (PageKind::Pool, r"^/pools/\d+/?$"),
        (PageKind::Upload, r"^/uploads/new/?$"),
    ]
    .into_iter()
    .filter_map(|(kind, pattern)| Regex::new(pattern).ok().map(|re| (kind, re)))
    .collect()
});

impl PageKind {
    pub fn classify(path: &str) -> PageKind {
        PAGE_PATTERNS
            .iter()
            .find(|(_, re)| re.is_match(path))
            .map(|(kind, _)| *kind)
            .unwrap_or(PageKind::Other)
    }
}

/// The page currently shown by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    url: Url,
    kind: PageKind,
}

impl Page {
    pub fn parse(address: &str) -> Result<Self> {
        let url = Url::parse(address)?;
        let kind = PageKind::classify(url.path());
        Ok(Self { url, kind })
    }

    pub fn kind(&self) -> PageKind {
        self.kind
    }

    pub fn matches(&self, kind: PageKind) -> bool {
        self.kind == kind
    }

    pub fn matches_any(&self, kinds: &[PageKind]) -> bool {
        kinds.contains(&self.kind)
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Scheme and host, without a trailing slash.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    pub fn query_param(&self, name: &str) -> Option<String> {
        self.url
            .query_pairs()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.into_owned())
    }

    pub fn set_query_param(&mut self, name: &str, value: &str) {
        let mut pairs = self.other_pairs(name);
        pairs.push((name.to_string(), value.to_string()));
        self.replace_query(pairs);
    }

    pub fn remove_query_param(&mut self, name: &str) {
        let pairs = self.other_pairs(name);
        self.replace_query(pairs);
    }

    fn other_pairs(&self, name: &str) -> Vec<(String, String)> {
        self.url
            .query_pairs()
            .filter(|(key, _)| key != name)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    fn replace_query(&mut self, pairs: Vec<(String, String)>) {
        if pairs.is_empty() {
            self.url.set_query(None);
        } else {
            self.url.set_query(None);
            self.url.query_pairs_mut().extend_pairs(pairs);
        }
    }
}

/// Pages a module is allowed to initialize on.
///
/// An empty constraint matches every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Constraint {
    kinds: Vec<PageKind>,
}

impl Constraint {
    pub fn any() -> Self {
        Self::default()
    }

    pub fn only(kinds: &[PageKind]) -> Self {
        Self {
            kinds: kinds.to_vec(),
        }
    }

    pub fn matches(&self, page: &Page) -> bool {
        self.kinds.is_empty() || page.matches_any(&self.kinds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(address: &str) -> Page {
        Page::parse(address).unwrap()
    }

    #[test]
    fn test_classify_paths() {
        assert_eq!(PageKind::classify("/posts/12345"), PageKind::Post);
        assert_eq!(PageKind::classify("/posts"), PageKind::Search);
        assert_eq!(PageKind::classify("/posts/"), PageKind::Search);
        assert_eq!(PageKind::classify("/"), PageKind::Search);
        assert_eq!(PageKind::classify("/favorites"), PageKind::Favorites);
        assert_eq!(PageKind::classify("/forum_topics/77"), PageKind::Forum);
        assert_eq!(PageKind::classify("/pools/9"), PageKind::Pool);
        assert_eq!(PageKind::classify("/uploads/new"), PageKind::Upload);
        assert_eq!(PageKind::classify("/wiki_pages"), PageKind::Other);
        assert_eq!(PageKind::classify("/posts/abc"), PageKind::Other);
    }

    #[test]
    fn test_query_params() {
        let mut p = page("https://e621.net/posts?tags=canine+solo&page=3&q=x");
        assert_eq!(p.query_param("tags").as_deref(), Some("canine solo"));
        assert_eq!(p.query_param("page").as_deref(), Some("3"));

        p.set_query_param("page", "4");
        assert_eq!(p.query_param("page").as_deref(), Some("4"));

        p.remove_query_param("q");
        assert_eq!(p.query_param("q"), None);
        assert_eq!(p.query_param("tags").as_deref(), Some("canine solo"));
    }

    #[test]
    fn test_remove_last_param_drops_question_mark() {
        let mut p = page("https://e621.net/posts/1?q=wolf");
        p.remove_query_param("q");
        assert_eq!(p.url(), "https://e621.net/posts/1");
    }

    #[test]
    fn test_constraint_matching() {
        let post = page("https://e621.net/posts/1");
        let search = page("https://e621.net/posts?tags=wolf");

        assert!(Constraint::any().matches(&post));
        assert!(Constraint::any().matches(&search));

        let post_only = Constraint::only(&[PageKind::Post]);
        assert!(post_only.matches(&post));
        assert!(!post_only.matches(&search));

        let either = Constraint::only(&[PageKind::Search, PageKind::Favorites]);
        assert!(either.matches(&search));
        assert!(!either.matches(&post));
    }

    #[test]
    fn test_origin() {
        assert_eq!(page("https://e621.net/posts/1").origin(), "https://e621.net");
    }

    #[test]
    fn test_parse_rejects_relative() {
        assert!(Page::parse("/posts/1").is_err());
    }
}
