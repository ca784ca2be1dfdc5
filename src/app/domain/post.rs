use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Post record as returned by `/posts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiPost {
    pub id: u64,
    pub created_at: DateTime<FixedOffset>,
    #[serde(default)]
    pub file: ApiFile,
    #[serde(default)]
    pub tags: ApiTags,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub pools: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiFile {
    #[serde(default)]
    pub md5: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiTags {
    pub general: Vec<String>,
    pub species: Vec<String>,
    pub character: Vec<String>,
    pub copyright: Vec<String>,
    pub artist: Vec<String>,
    pub invalid: Vec<String>,
    pub lore: Vec<String>,
    pub meta: Vec<String>,
}

impl ApiTags {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.general
            .iter()
            .chain(&self.species)
            .chain(&self.character)
            .chain(&self.copyright)
            .chain(&self.artist)
            .chain(&self.invalid)
            .chain(&self.lore)
            .chain(&self.meta)
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub posts: Vec<ApiPost>,
}

/// Preview thumbnail address derived from a file hash.
pub fn preview_url(md5: &str) -> Option<String> {
    if md5.len() < 4 || !md5.is_ascii() {
        return None;
    }
    Some(format!(
        "https://static1.e621.net/data/preview/{}/{}/{}.jpg",
        &md5[0..2],
        &md5[2..4],
        md5
    ))
}

/// A post thumbnail on the current page.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub data: ApiPost,
    pub visible: bool,
}

impl Post {
    pub fn new(data: ApiPost) -> Self {
        Self {
            data,
            visible: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Term {
    Tag(String),
    Rating(char),
    Id(u64),
}

/// Tag query evaluated against posts already on the page.
///
/// Whitespace separated terms, all of which must hold. A leading `-`
/// negates a term. `rating:<s|q|e>` and `id:<n>` are understood, anything
/// else is a tag name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    terms: Vec<(Term, bool)>,
}

impl PostFilter {
    pub fn parse(text: &str) -> Self {
        let terms = text
            .split_whitespace()
            .filter_map(|raw| {
                let (negated, body) = match raw.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, raw),
                };
                let body = body.to_lowercase();
                if body.is_empty() {
                    return None;
                }

                let term = if let Some(rating) = body.strip_prefix("rating:") {
                    Term::Rating(rating.chars().next()?)
                } else if let Some(id) = body.strip_prefix("id:") {
                    Term::Id(id.parse().ok()?)
                } else {
                    Term::Tag(body)
                };
                Some((term, negated))
            })
            .collect();
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn matches(&self, post: &ApiPost) -> bool {
        self.terms.iter().all(|(term, negated)| {
            let hit = match term {
                Term::Tag(name) => post.tags.all().any(|tag| tag.eq_ignore_ascii_case(name)),
                Term::Rating(rating) => post
                    .rating
                    .chars()
                    .next()
                    .is_some_and(|r| r.eq_ignore_ascii_case(rating)),
                Term::Id(id) => post.id == *id,
            };
            hit != *negated
        })
    }
}

/// Display size of the image on a post page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleMode {
    Sample,
    #[default]
    FitVertical,
    FitHorizontal,
    Original,
}

impl ScaleMode {
    pub const ALL: [ScaleMode; 4] = [
        ScaleMode::Sample,
        ScaleMode::FitVertical,
        ScaleMode::FitHorizontal,
        ScaleMode::Original,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sample => "sample",
            Self::FitVertical => "fit-vertical",
            Self::FitHorizontal => "fit-horizontal",
            Self::Original => "original",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.as_str() == name)
    }

    /// The next mode in selector order, wrapping around.
    pub fn next(self) -> Self {
        let index = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn post(id: u64, created_at: &str, general: &[&str], rating: &str) -> ApiPost {
        ApiPost {
            id,
            created_at: DateTime::parse_from_rfc3339(created_at).unwrap(),
            file: ApiFile {
                md5: Some(format!("{:032x}", id)),
                url: None,
            },
            tags: ApiTags {
                general: general.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            },
            rating: rating.to_string(),
            pools: Vec::new(),
        }
    }
}
