//! Discord adapter

pub mod gateway;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, RwLock};
use tokio::sync::Notify;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;

use crate::application::errors::BotError;
use crate::application::messaging::{Context, EventDispatcher};
use crate::domain::entities::{Event, EventKind};
use crate::domain::traits::{BotInfo, MessagingClient};
use gateway::{Action, GatewayPayload, GatewaySession};

/// Discord REST API base URL
const API_BASE: &str = "https://discord.com/api/v10";

/// Discord bot client
pub struct DiscordClient {
    client: Client,
    api_base: String,
    intents: u64,
    token: RwLock<Option<String>>,
    info: RwLock<BotInfo>,
    shutdown: Notify,
}

impl DiscordClient {
    pub fn new(intents: u64) -> Self {
        Self {
            client: Client::new(),
            api_base: API_BASE.to_string(),
            intents,
            token: RwLock::new(None),
            info: RwLock::new(BotInfo::default()),
            shutdown: Notify::new(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn token(&self) -> Result<String, BotError> {
        self.token
            .read()
            .map_err(|_| BotError::Internal("Lock poisoned".to_string()))?
            .clone()
            .ok_or(BotError::NotConnected)
    }

    fn auth_header(token: &str) -> String {
        format!("Bot {}", token)
    }

    /// Fetch the gateway websocket URL
    pub async fn gateway_url(&self) -> Result<String, BotError> {
        #[derive(Deserialize)]
        struct GatewayResponse {
            url: String,
        }

        let token = self.token()?;
        let response = self.client
            .get(self.api_url("/gateway/bot"))
            .header("Authorization", Self::auth_header(&token))
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Discord API error: {}", response.status())));
        }

        let data: GatewayResponse = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(format!("{}/?v=10&encoding=json", data.url.trim_end_matches('/')))
    }

    async fn run_session(&self, ctx: &Context, dispatcher: &Arc<EventDispatcher>) -> Result<(), BotError> {
        let token = self.token()?;
        let url = self.gateway_url().await?;

        tracing::debug!("Connecting to gateway {}", url);
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let mut session = GatewaySession::new(token, self.intents);
        let mut heartbeat: Option<Interval> = None;

        loop {
            let outgoing: Vec<Value> = tokio::select! {
                _ = self.shutdown.notified() => {
                    tracing::debug!("Closing gateway connection");
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
                _ = tick(&mut heartbeat) => {
                    tracing::trace!("Heartbeat at seq {:?}", session.seq());
                    vec![session.heartbeat()]
                }
                frame = stream.next() => {
                    let text = match frame {
                        Some(Ok(WsMessage::Text(text))) => text,
                        Some(Ok(WsMessage::Close(close))) => {
                            let reason = close
                                .map(|c| format!("{} {}", u16::from(c.code), c.reason))
                                .unwrap_or_else(|| "no close frame".to_string());
                            return Err(BotError::GatewayClosed(reason));
                        }
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => return Err(BotError::Network(e.to_string())),
                        None => return Err(BotError::GatewayClosed("stream ended".to_string())),
                    };

                    dispatcher.spawn(
                        ctx.clone(),
                        Event::new(EventKind::SocketRawReceive, json!({ "data": text })),
                    );

                    let payload: GatewayPayload = match serde_json::from_str(&text) {
                        Ok(p) => p,
                        Err(e) => {
                            tracing::warn!("Malformed gateway frame: {}", e);
                            continue;
                        }
                    };

                    let mut outgoing = Vec::new();
                    for action in session.handle(payload) {
                        match action {
                            Action::Send(value) => outgoing.push(value),
                            Action::StartHeartbeat(period) => {
                                tracing::debug!("Heartbeat every {:?}", period);
                                let mut interval = tokio::time::interval_at(
                                    tokio::time::Instant::now() + period,
                                    period,
                                );
                                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                                heartbeat = Some(interval);
                            }
                            Action::Dispatch(event) => {
                                if event.kind == EventKind::Ready {
                                    tracing::info!("Gateway session {} ready", session.session_id().unwrap_or("-"));
                                }
                                dispatcher.spawn(ctx.clone(), event)
                            }
                            Action::Close(e) => return Err(e),
                        }
                    }
                    outgoing
                }
            };

            for value in outgoing {
                let text = value.to_string();
                sink.send(WsMessage::Text(text.clone()))
                    .await
                    .map_err(|e| BotError::Network(e.to_string()))?;
                dispatcher.spawn(
                    ctx.clone(),
                    Event::new(EventKind::SocketRawSend, json!({ "data": text })),
                );
            }
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[async_trait]
impl MessagingClient for DiscordClient {
    async fn login(&self, token: &str) -> Result<BotInfo, BotError> {
        #[derive(Deserialize)]
        struct CurrentUser {
            id: String,
            username: String,
            global_name: Option<String>,
        }

        let response = self.client
            .get(self.api_url("/users/@me"))
            .header("Authorization", Self::auth_header(token))
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED => return Err(BotError::Auth("Improper token has been passed".to_string())),
            status if !status.is_success() => {
                return Err(BotError::Network(format!("Discord API error: {}", status)));
            }
            _ => {}
        }

        let user: CurrentUser = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        let info = BotInfo {
            id: user.id,
            name: user.global_name.unwrap_or_else(|| user.username.clone()),
            username: user.username,
        };

        *self.token.write().map_err(|_| BotError::Internal("Lock poisoned".to_string()))? = Some(token.to_string());
        *self.info.write().map_err(|_| BotError::Internal("Lock poisoned".to_string()))? = info.clone();

        tracing::info!("Logged in as {} (@{}, {})", info.name, info.username, info.id);
        Ok(info)
    }

    async fn connect(&self, ctx: Context, dispatcher: Arc<EventDispatcher>) -> Result<(), BotError> {
        self.run_session(&ctx, &dispatcher).await
    }

    async fn logout(&self) -> Result<(), BotError> {
        self.shutdown.notify_one();
        let mut token = self.token.write().map_err(|_| BotError::Internal("Lock poisoned".to_string()))?;
        *token = None;
        Ok(())
    }

    async fn send_message(&self, channel_id: &str, text: &str) -> Result<String, BotError> {
        #[derive(Deserialize)]
        struct CreatedMessage {
            id: String,
        }

        let token = self.token()?;
        let response = self.client
            .post(self.api_url(&format!("/channels/{}/messages", channel_id)))
            .header("Authorization", Self::auth_header(&token))
            .json(&json!({ "content": text }))
            .send()
            .await
            .map_err(|e| BotError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BotError::Network(format!("Discord API error: {}", response.status())));
        }

        let message: CreatedMessage = response
            .json()
            .await
            .map_err(|e| BotError::Parse(e.to_string()))?;

        Ok(message.id)
    }

    fn bot_info(&self) -> BotInfo {
        self.info.read().map(|i| i.clone()).unwrap_or_default()
    }
}
