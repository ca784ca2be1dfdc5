use std::sync::LazyLock;

use regex_lite::Regex;

use crate::app::domain::config::UserInfo;

static NESTED_QUOTE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[quote\](?:.|\n|\r)+?\[/quote\][\n\r]*").ok());

/// Remove every `[quote]...[/quote]` block from a DText body
pub fn strip_nested_quotes(body: &str) -> String {
    match NESTED_QUOTE.as_ref() {
        Some(re) => re.replace_all(body, "").into_owned(),
        None => body.to_string(),
    }
}

/// Build a DText quote attributed to a user.
///
/// A separating blank line is added when the reply box already has text.
pub fn format_quote(creator: &str, creator_id: u64, body: &str, existing: &str) -> String {
    let quote = format!(
        "[quote]\"{}\":/user/show/{} said:\n{}\n[/quote]",
        creator, creator_id, body
    );
    if existing.is_empty() {
        quote
    } else {
        format!("\n\n{}", quote)
    }
}

/// Replace `%userid%` and `%username%` in a tab link.
///
/// Without a logged-in user the variables expand to empty strings.
pub fn substitute_tab_variables(href: &str, user: Option<&UserInfo>) -> String {
    let (id, name) = match user {
        Some(user) => (user.id.to_string(), user.name.as_str()),
        None => (String::new(), ""),
    };
    href.replace("%userid%", &id).replace("%username%", name)
}

/// Tag name as it appears in a search query
pub fn tag_query(name: &str) -> String {
    name.trim().replace(' ', "_")
}
