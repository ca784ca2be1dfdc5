//! Client for the host site's JSON API.

use serde_json::Value;

use super::error::{AppError, Result};
use crate::app::domain::config::Config;
use crate::app::domain::post::{ApiPost, PostsResponse};

pub trait HostApi {
    /// GET a site-relative path and parse the body as JSON.
    fn get_json(&self, path: &str) -> Result<Value>;

    fn posts(&self, query: &str, page: u32) -> Result<Vec<ApiPost>> {
        let value = self.get_json(&posts_path(query, page))?;
        let response: PostsResponse = serde_json::from_value(value)?;
        Ok(response.posts)
    }

    /// Body text of a forum post or comment record.
    fn body_of(&self, path: &str) -> Result<String> {
        let value = self.get_json(path)?;
        value
            .get("body")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| AppError::Api(format!("{} has no body", path)))
    }
}

pub fn posts_path(query: &str, page: u32) -> String {
    format!(
        "/posts.json?tags={}&page={}",
        urlencoding::encode(query),
        page
    )
}

pub struct HttpApi {
    base_url: String,
    user_agent: String,
    timeout_secs: u64,
}

impl HttpApi {
    pub fn new(config: &Config) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout_secs: config.request_timeout_secs,
        }
    }
}

impl HostApi for HttpApi {
    fn get_json(&self, path: &str) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = minreq::get(&url)
            .with_header("User-Agent", self.user_agent.as_str())
            .with_header("Accept", "application/json")
            .with_timeout(self.timeout_secs)
            .send()?;

        if !(200..300).contains(&response.status_code) {
            return Err(AppError::Api(format!(
                "{} returned {} {}",
                path, response.status_code, response.reason_phrase
            )));
        }

        Ok(response.json()?)
    }
}
