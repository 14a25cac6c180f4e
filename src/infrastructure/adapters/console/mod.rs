//! Console adapter for development/testing

use async_trait::async_trait;
use serde_json::json;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use crate::application::errors::BotError;
use crate::application::messaging::{Context, EventDispatcher};
use crate::domain::entities::{Event, EventKind};
use crate::domain::traits::{BotInfo, MessagingClient};

const CONSOLE_CHANNEL: &str = "console";

type Input = Box<dyn AsyncBufRead + Unpin + Send>;

/// Console client: each input line becomes an `on_message` event
pub struct ConsoleClient {
    info: BotInfo,
    input: tokio::sync::Mutex<Option<Input>>,
    transcript: Mutex<Vec<String>>,
    echo: bool,
    shutdown: Notify,
}

impl ConsoleClient {
    /// Read from stdin, print replies to stdout
    pub fn new() -> Self {
        Self::with_input(BufReader::new(tokio::io::stdin())).with_echo(true)
    }

    pub fn with_input<R>(input: R) -> Self
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        Self {
            info: BotInfo {
                id: "console".to_string(),
                name: "modis".to_string(),
                username: "console".to_string(),
            },
            input: tokio::sync::Mutex::new(Some(Box::new(input))),
            transcript: Mutex::new(Vec::new()),
            echo: false,
            shutdown: Notify::new(),
        }
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Messages the bot has sent so far
    pub fn transcript(&self) -> Vec<String> {
        self.transcript.lock().map(|t| t.clone()).unwrap_or_default()
    }

    fn message_event(&self, line: &str, index: usize) -> Event {
        Event::new(
            EventKind::Message,
            json!({
                "id": index.to_string(),
                "channel_id": CONSOLE_CHANNEL,
                "content": line,
                "author": { "id": "console-user", "username": "you", "bot": false },
            }),
        )
    }
}

impl Default for ConsoleClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingClient for ConsoleClient {
    async fn login(&self, _token: &str) -> Result<BotInfo, BotError> {
        tracing::info!("Starting console bot (dev mode)");
        Ok(self.info.clone())
    }

    async fn connect(&self, ctx: Context, dispatcher: Arc<EventDispatcher>) -> Result<(), BotError> {
        let mut input = self.input.lock().await.take().ok_or(BotError::NotConnected)?;

        dispatcher.spawn(
            ctx.clone(),
            Event::new(
                EventKind::Ready,
                json!({ "user": { "id": self.info.id, "username": self.info.username }, "guilds": [] }),
            ),
        );

        let mut line = String::new();
        let mut index = 0;
        loop {
            line.clear();
            let read = tokio::select! {
                _ = self.shutdown.notified() => break,
                read = input.read_line(&mut line) => read.map_err(|e| BotError::Network(e.to_string()))?,
            };
            if read == 0 {
                break;
            }

            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            index += 1;
            dispatcher.spawn(ctx.clone(), self.message_event(text, index));
        }

        // Let handlers for the last lines finish before reporting the session over
        dispatcher.drain().await;
        Ok(())
    }

    async fn logout(&self) -> Result<(), BotError> {
        self.shutdown.notify_one();
        Ok(())
    }

    async fn send_message(&self, _channel_id: &str, text: &str) -> Result<String, BotError> {
        if self.echo {
            println!("[BOT] {}", text);
        }
        let mut transcript = self.transcript
            .lock()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        transcript.push(text.to_string());
        Ok(transcript.len().to_string())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}
