use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Recognized messaging-client events.
///
/// The set is closed: a module can only subscribe to one of these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    Ready,
    Resume,
    Error,
    Message,
    SocketRawReceive,
    SocketRawSend,
    MessageDelete,
    MessageEdit,
    ReactionAdd,
    ReactionRemove,
    ReactionClear,
    ChannelDelete,
    ChannelCreate,
    ChannelUpdate,
    MemberJoin,
    MemberRemove,
    MemberUpdate,
    ServerJoin,
    ServerRemove,
    ServerUpdate,
    ServerRoleCreate,
    ServerRoleDelete,
    ServerRoleUpdate,
    ServerEmojisUpdate,
    ServerAvailable,
    ServerUnavailable,
    VoiceStateUpdate,
    MemberBan,
    MemberUnban,
    Typing,
    GroupJoin,
    GroupRemove,
}

impl EventKind {
    /// Every event, in the order modules are scanned for them
    pub const ALL: [EventKind; 32] = [
        EventKind::Ready,
        EventKind::Resume,
        EventKind::Error,
        EventKind::Message,
        EventKind::SocketRawReceive,
        EventKind::SocketRawSend,
        EventKind::MessageDelete,
        EventKind::MessageEdit,
        EventKind::ReactionAdd,
        EventKind::ReactionRemove,
        EventKind::ReactionClear,
        EventKind::ChannelDelete,
        EventKind::ChannelCreate,
        EventKind::ChannelUpdate,
        EventKind::MemberJoin,
        EventKind::MemberRemove,
        EventKind::MemberUpdate,
        EventKind::ServerJoin,
        EventKind::ServerRemove,
        EventKind::ServerUpdate,
        EventKind::ServerRoleCreate,
        EventKind::ServerRoleDelete,
        EventKind::ServerRoleUpdate,
        EventKind::ServerEmojisUpdate,
        EventKind::ServerAvailable,
        EventKind::ServerUnavailable,
        EventKind::VoiceStateUpdate,
        EventKind::MemberBan,
        EventKind::MemberUnban,
        EventKind::Typing,
        EventKind::GroupJoin,
        EventKind::GroupRemove,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ready => "on_ready",
            EventKind::Resume => "on_resume",
            EventKind::Error => "on_error",
            EventKind::Message => "on_message",
            EventKind::SocketRawReceive => "on_socket_raw_receive",
            EventKind::SocketRawSend => "on_socket_raw_send",
            EventKind::MessageDelete => "on_message_delete",
            EventKind::MessageEdit => "on_message_edit",
            EventKind::ReactionAdd => "on_reaction_add",
            EventKind::ReactionRemove => "on_reaction_remove",
            EventKind::ReactionClear => "on_reaction_clear",
            EventKind::ChannelDelete => "on_channel_delete",
            EventKind::ChannelCreate => "on_channel_create",
            EventKind::ChannelUpdate => "on_channel_update",
            EventKind::MemberJoin => "on_member_join",
            EventKind::MemberRemove => "on_member_remove",
            EventKind::MemberUpdate => "on_member_update",
            EventKind::ServerJoin => "on_server_join",
            EventKind::ServerRemove => "on_server_remove",
            EventKind::ServerUpdate => "on_server_update",
            EventKind::ServerRoleCreate => "on_server_role_create",
            EventKind::ServerRoleDelete => "on_server_role_delete",
            EventKind::ServerRoleUpdate => "on_server_role_update",
            EventKind::ServerEmojisUpdate => "on_server_emojis_update",
            EventKind::ServerAvailable => "on_server_available",
            EventKind::ServerUnavailable => "on_server_unavailable",
            EventKind::VoiceStateUpdate => "on_voice_state_update",
            EventKind::MemberBan => "on_member_ban",
            EventKind::MemberUnban => "on_member_unban",
            EventKind::Typing => "on_typing",
            EventKind::GroupJoin => "on_group_join",
            EventKind::GroupRemove => "on_group_remove",
        }
    }

    /// Map a Discord gateway dispatch name to an event.
    ///
    /// `GUILD_CREATE` always maps to `ServerJoin` here; the gateway client
    /// rewrites it to `ServerAvailable` for guilds it already knows about.
    pub fn from_dispatch(name: &str, payload: &Value) -> Option<EventKind> {
        let kind = match name {
            "READY" => EventKind::Ready,
            "RESUMED" => EventKind::Resume,
            "MESSAGE_CREATE" => EventKind::Message,
            "MESSAGE_DELETE" => EventKind::MessageDelete,
            "MESSAGE_UPDATE" => EventKind::MessageEdit,
            "MESSAGE_REACTION_ADD" => EventKind::ReactionAdd,
            "MESSAGE_REACTION_REMOVE" => EventKind::ReactionRemove,
            "MESSAGE_REACTION_REMOVE_ALL" => EventKind::ReactionClear,
            "CHANNEL_DELETE" => EventKind::ChannelDelete,
            "CHANNEL_CREATE" => EventKind::ChannelCreate,
            "CHANNEL_UPDATE" => EventKind::ChannelUpdate,
            "GUILD_MEMBER_ADD" => EventKind::MemberJoin,
            "GUILD_MEMBER_REMOVE" => EventKind::MemberRemove,
            "GUILD_MEMBER_UPDATE" => EventKind::MemberUpdate,
            "GUILD_CREATE" => EventKind::ServerJoin,
            "GUILD_DELETE" => {
                if payload.get("unavailable").and_then(Value::as_bool) == Some(true) {
                    EventKind::ServerUnavailable
                } else {
                    EventKind::ServerRemove
                }
            }
            "GUILD_UPDATE" => EventKind::ServerUpdate,
            "GUILD_ROLE_CREATE" => EventKind::ServerRoleCreate,
            "GUILD_ROLE_DELETE" => EventKind::ServerRoleDelete,
            "GUILD_ROLE_UPDATE" => EventKind::ServerRoleUpdate,
            "GUILD_EMOJIS_UPDATE" => EventKind::ServerEmojisUpdate,
            "VOICE_STATE_UPDATE" => EventKind::VoiceStateUpdate,
            "GUILD_BAN_ADD" => EventKind::MemberBan,
            "GUILD_BAN_REMOVE" => EventKind::MemberUnban,
            "TYPING_START" => EventKind::Typing,
            "CHANNEL_RECIPIENT_ADD" => EventKind::GroupJoin,
            "CHANNEL_RECIPIENT_REMOVE" => EventKind::GroupRemove,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = crate::application::errors::ModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| crate::application::errors::ModuleError::UnknownEvent(s.to_string()))
    }
}

/// An event delivered by the messaging client
#[derive(Debug, Clone)]
pub struct Event {
    pub id: String,
    pub kind: EventKind,
    pub payload: Value,
    pub received_at: DateTime<Utc>,
}

impl Event {
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            received_at: Utc::now(),
        }
    }

    /// Look up a string field by walking nested object keys
    pub fn str_field(&self, path: &[&str]) -> Option<&str> {
        let mut value = &self.payload;
        for key in path {
            value = value.get(key)?;
        }
        value.as_str()
    }

    /// Look up a bool field by walking nested object keys
    pub fn bool_field(&self, path: &[&str]) -> Option<bool> {
        let mut value = &self.payload;
        for key in path {
            value = value.get(key)?;
        }
        value.as_bool()
    }
}
