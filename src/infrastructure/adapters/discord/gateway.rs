//! Discord gateway session state

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::time::Duration;
use crate::application::errors::BotError;
use crate::domain::entities::{Event, EventKind};

pub const OP_DISPATCH: u8 = 0;
pub const OP_HEARTBEAT: u8 = 1;
pub const OP_IDENTIFY: u8 = 2;
pub const OP_RECONNECT: u8 = 7;
pub const OP_INVALID_SESSION: u8 = 9;
pub const OP_HELLO: u8 = 10;
pub const OP_HEARTBEAT_ACK: u8 = 11;

/// Gateway frame
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayload {
    pub op: u8,
    #[serde(default)]
    pub d: Value,
    #[serde(default)]
    pub s: Option<u64>,
    #[serde(default)]
    pub t: Option<String>,
}

/// What the connection loop should do after a frame
#[derive(Debug)]
pub enum Action {
    Send(Value),
    StartHeartbeat(Duration),
    Dispatch(Event),
    Close(BotError),
}

/// Per-connection gateway state
pub struct GatewaySession {
    token: String,
    intents: u64,
    seq: Option<u64>,
    session_id: Option<String>,
    /// Guilds announced unavailable in READY, not yet streamed in
    pending_guilds: HashSet<String>,
}

impl GatewaySession {
    pub fn new(token: impl Into<String>, intents: u64) -> Self {
        Self {
            token: token.into(),
            intents,
            seq: None,
            session_id: None,
            pending_guilds: HashSet::new(),
        }
    }

    pub fn seq(&self) -> Option<u64> {
        self.seq
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn heartbeat(&self) -> Value {
        json!({ "op": OP_HEARTBEAT, "d": self.seq })
    }

    fn identify(&self) -> Value {
        json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "modis",
                    "device": "modis",
                },
            },
        })
    }

    pub fn handle(&mut self, payload: GatewayPayload) -> Vec<Action> {
        match payload.op {
            OP_HELLO => {
                let Some(interval) = payload.d.get("heartbeat_interval").and_then(Value::as_u64) else {
                    return vec![Action::Close(BotError::Parse("HELLO without heartbeat_interval".into()))];
                };
                vec![
                    Action::StartHeartbeat(Duration::from_millis(interval)),
                    Action::Send(self.identify()),
                ]
            }
            OP_HEARTBEAT => vec![Action::Send(self.heartbeat())],
            OP_HEARTBEAT_ACK => Vec::new(),
            OP_DISPATCH => {
                if payload.s.is_some() {
                    self.seq = payload.s;
                }
                let Some(name) = payload.t.as_deref() else {
                    return Vec::new();
                };
                self.dispatch(name, payload.d).into_iter().map(Action::Dispatch).collect()
            }
            OP_RECONNECT => vec![Action::Close(BotError::GatewayClosed("reconnect requested".into()))],
            OP_INVALID_SESSION => vec![Action::Close(BotError::Auth("invalid session".into()))],
            op => {
                tracing::debug!("Ignoring gateway opcode {}", op);
                Vec::new()
            }
        }
    }

    fn dispatch(&mut self, name: &str, data: Value) -> Vec<Event> {
        match name {
            "READY" => {
                self.session_id = data.get("session_id").and_then(Value::as_str).map(str::to_string);
                self.pending_guilds = data
                    .get("guilds")
                    .and_then(Value::as_array)
                    .map(|guilds| {
                        guilds
                            .iter()
                            .filter_map(|g| g.get("id").and_then(Value::as_str).map(str::to_string))
                            .collect()
                    })
                    .unwrap_or_default();
            }
            "GUILD_CREATE" => {
                let known = data
                    .get("id")
                    .and_then(Value::as_str)
                    .map(|id| self.pending_guilds.remove(id))
                    .unwrap_or(false);
                if known {
                    return vec![Event::new(EventKind::ServerAvailable, data)];
                }
            }
            "MESSAGE_DELETE_BULK" => return split_bulk_delete(data),
            _ => {}
        }

        match EventKind::from_dispatch(name, &data) {
            Some(kind) => vec![Event::new(kind, data)],
            None => {
                tracing::trace!("Unhandled dispatch {}", name);
                Vec::new()
            }
        }
    }
}

/// One `on_message_delete` per id, each shaped like a single MESSAGE_DELETE
fn split_bulk_delete(data: Value) -> Vec<Event> {
    let Value::Object(mut fields) = data else {
        return Vec::new();
    };
    let ids = match fields.remove("ids") {
        Some(Value::Array(ids)) => ids,
        _ => return Vec::new(),
    };

    ids.into_iter()
        .filter(Value::is_string)
        .map(|id| {
            let mut payload = fields.clone();
            payload.insert("id".to_string(), id);
            Event::new(EventKind::MessageDelete, Value::Object(payload))
        })
        .collect()
}
