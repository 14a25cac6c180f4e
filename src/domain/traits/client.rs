use async_trait::async_trait;
use std::sync::Arc;
use crate::application::messaging::{Context, EventDispatcher};
use crate::application::errors::BotError;

/// Messaging client trait - abstraction over the chat platform connection
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Authenticate with the platform
    async fn login(&self, token: &str) -> Result<BotInfo, BotError>;

    /// Run the event loop, delivering events to the dispatcher until the session ends
    async fn connect(&self, ctx: Context, dispatcher: Arc<EventDispatcher>) -> Result<(), BotError>;

    /// Close the session
    async fn logout(&self) -> Result<(), BotError>;

    /// Send a message to a channel, returning the new message id
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<String, BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Bot information
#[derive(Debug, Clone, Default)]
pub struct BotInfo {
    pub id: String,
    pub name: String,
    pub username: String,
}
