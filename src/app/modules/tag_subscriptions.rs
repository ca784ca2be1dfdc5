//! Tag subscriptions: periodically looks for new posts under followed tags.

use std::any::Any;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::app::controllers::module_base::{Module, ModuleBase, ModuleContext};
use crate::app::domain::messages::{Effect, Message};
use crate::app::domain::module_id::ModuleId;
use crate::app::domain::post::preview_url;
use crate::app::domain::settings::{SettingsMap, schema};
use crate::app::infrastructure::api::HostApi;
use crate::app::infrastructure::error::Result;
use crate::app::infrastructure::readiness::AbortSignal;
use crate::app::services::text_ops::tag_query;

const DATA_KEY: &str = "data";
const LAST_UPDATE_KEY: &str = "lastUpdate";

/// A post that appeared under a subscribed tag since the last check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateData {
    pub id: u64,
    /// Subscribed tag that produced the update
    pub name: String,
    pub date: DateTime<Utc>,
    pub thumbnail: Option<String>,
}

#[derive(Debug, Default)]
pub struct TagSubscriptions {
    abort: AbortSignal,
    updates: Vec<UpdateData>,
}

impl TagSubscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results of the most recent poll
    pub fn updates(&self) -> &[UpdateData] {
        &self.updates
    }

    pub fn abort_signal(&self) -> AbortSignal {
        self.abort.clone()
    }

    /// Subscribed tag names, in storage order.
    pub fn subscriptions(&self, base: &mut ModuleBase) -> Result<Vec<String>> {
        Ok(subscription_data(base, true)?.keys().cloned().collect())
    }

    pub fn is_subscribed(&self, base: &mut ModuleBase, tag: &str) -> Result<bool> {
        Ok(subscription_data(base, true)?.contains_key(tag.trim()))
    }

    pub fn subscribe(&self, base: &mut ModuleBase, tag: &str) -> Result<()> {
        let tag = tag.trim();
        let mut data = subscription_data(base, true)?;
        if data.contains_key(tag) {
            return Ok(());
        }
        data.insert(tag.to_string(), json!({}));
        tracing::debug!("Subscribed to '{}'", tag);
        base.push_setting(DATA_KEY, Value::Object(data), true)
    }

    /// Returns whether the tag was subscribed.
    pub fn unsubscribe(&self, base: &mut ModuleBase, tag: &str) -> Result<bool> {
        let mut data = subscription_data(base, true)?;
        if data.remove(tag.trim()).is_none() {
            return Ok(false);
        }
        base.push_setting(DATA_KEY, Value::Object(data), true)?;
        Ok(true)
    }

    /// Last successful poll, as milliseconds since the epoch.
    pub fn last_update(&self, base: &mut ModuleBase) -> Result<i64> {
        base.fetch_setting_as(LAST_UPDATE_KEY, true)
    }

    pub fn is_due(&self, base: &mut ModuleBase, now: DateTime<Utc>, interval: std::time::Duration) -> Result<bool> {
        let elapsed = now.timestamp_millis() - self.last_update(base)?;
        Ok(elapsed >= interval.as_millis() as i64)
    }

    /// Collect posts newer than the last update for every subscribed tag.
    ///
    /// Tags whose request fails are skipped. When `abort` fires, polling stops
    /// before the next request and `lastUpdate` is left alone so the skipped
    /// tags are picked up next time.
    pub fn poll(
        &self,
        base: &mut ModuleBase,
        api: &dyn HostApi,
        now: DateTime<Utc>,
        abort: &AbortSignal,
    ) -> Result<Vec<UpdateData>> {
        let data = subscription_data(base, true)?;
        let since = self.last_update(base)?;
        let mut results = Vec::new();

        for tag in data.keys() {
            if abort.is_aborted() {
                tracing::debug!("Subscription poll aborted");
                return Ok(results);
            }
            let posts = match api.posts(&tag_query(tag), 1) {
                Ok(posts) => posts,
                Err(e) => {
                    tracing::warn!("Skipping subscription '{}': {}", tag, e);
                    continue;
                }
            };
            results.extend(
                posts
                    .into_iter()
                    .filter(|post| post.created_at.timestamp_millis() > since)
                    .map(|post| UpdateData {
                        id: post.id,
                        name: tag.clone(),
                        date: post.created_at.with_timezone(&Utc),
                        thumbnail: post.file.md5.as_deref().and_then(preview_url),
                    }),
            );
        }

        base.push_setting(LAST_UPDATE_KEY, json!(now.timestamp_millis()), true)?;
        Ok(results)
    }
}

fn subscription_data(base: &mut ModuleBase, refresh: bool) -> Result<Map<String, Value>> {
    base.fetch_setting_as(DATA_KEY, refresh)
}

impl Module for TagSubscriptions {
    fn id(&self) -> ModuleId {
        ModuleId::TagSubscriptions
    }

    fn default_settings(&self) -> SettingsMap {
        schema([(DATA_KEY, json!({})), (LAST_UPDATE_KEY, json!(0))])
    }

    fn create(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.abort = AbortSignal::new();
        Ok(())
    }

    fn destroy(&mut self, _base: &mut ModuleBase, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        self.abort.abort();
        Ok(())
    }

    fn on_message(
        &mut self,
        message: &Message,
        base: &mut ModuleBase,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<()> {
        let Message::PollSubscriptions(now) = message else {
            return Ok(());
        };
        if !self.is_due(base, *now, ctx.config.subscription_interval())? {
            return Ok(());
        }

        let abort = self.abort.clone();
        self.updates = self.poll(base, ctx.api, *now, &abort)?;
        tracing::info!("{} new posts under subscribed tags", self.updates.len());
        ctx.emit(Effect::SubscriptionUpdates(self.updates.len()));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
