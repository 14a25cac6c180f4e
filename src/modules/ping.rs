//! `ping` module - answers a trigger message in the same channel

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::Deserialize;
use std::sync::Arc;
use crate::application::messaging::{Context, EventHandler, HandlerResult};
use crate::domain::entities::{Event, EventKind};
use crate::infrastructure::modules::HandlerSettings;

pub const NAME: &str = "ping";

/// Leading user mention, e.g. `<@123>` or `<@!123>`
static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<@!?\d+>\s*").unwrap());

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PingSettings {
    pub trigger: String,
    pub reply: String,
    pub ignore_bots: bool,
}

impl Default for PingSettings {
    fn default() -> Self {
        Self {
            trigger: "!ping".to_string(),
            reply: "pong".to_string(),
            ignore_bots: true,
        }
    }
}

pub struct PingHandler {
    trigger: Regex,
    reply: String,
    ignore_bots: bool,
}

impl PingHandler {
    pub fn new(settings: PingSettings) -> Result<Self, regex_lite::Error> {
        let pattern = format!(r"^{}(\s|$)", regex_lite::escape(settings.trigger.trim()));
        Ok(Self {
            trigger: Regex::new(&pattern)?,
            reply: settings.reply,
            ignore_bots: settings.ignore_bots,
        })
    }

    pub fn matches(&self, content: &str) -> bool {
        let content = MENTION.replace(content.trim(), "");
        self.trigger.is_match(&content)
    }
}

#[async_trait]
impl EventHandler for PingHandler {
    async fn handle(&self, ctx: &Context, event: &Event) -> HandlerResult {
        if self.ignore_bots && event.bool_field(&["author", "bot"]) == Some(true) {
            return Ok(());
        }
        let content = event.str_field(&["content"]).unwrap_or_default();
        if self.matches(content) {
            ctx.reply(event, &self.reply).await?;
        }
        Ok(())
    }
}

pub fn factory(kind: EventKind, settings: &HandlerSettings) -> Option<Arc<dyn EventHandler>> {
    if kind != EventKind::Message {
        return None;
    }
    let settings: PingSettings = match settings.parse() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Invalid {} settings: {}", NAME, e);
            return None;
        }
    };
    match PingHandler::new(settings) {
        Ok(handler) => Some(Arc::new(handler)),
        Err(e) => {
            tracing::warn!("Invalid {} trigger: {}", NAME, e);
            None
        }
    }
}
