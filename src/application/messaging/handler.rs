//! Event handler trait and the context handed to every handler

use async_trait::async_trait;
use std::sync::Arc;
use crate::domain::entities::Event;
use crate::domain::traits::{MessagingClient, Store};
use crate::application::errors::BotError;

/// Handler result
pub type HandlerResult = Result<(), BotError>;

/// Context passed to every handler invocation
#[derive(Clone)]
pub struct Context {
    pub client: Arc<dyn MessagingClient>,
    pub store: Arc<dyn Store>,
}

impl Context {
    pub fn new(client: Arc<dyn MessagingClient>, store: Arc<dyn Store>) -> Self {
        Self { client, store }
    }

    /// Reply in the channel an event came from
    pub async fn reply(&self, event: &Event, text: &str) -> Result<String, BotError> {
        let channel_id = event
            .str_field(&["channel_id"])
            .ok_or_else(|| BotError::Parse(format!("{} has no channel_id", event.kind)))?;
        self.client.send_message(channel_id, text).await
    }
}

/// Handler for one event, provided by a module
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, ctx: &Context, event: &Event) -> HandlerResult;
}
