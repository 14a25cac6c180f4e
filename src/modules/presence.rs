//! `presence` module - logs session and server membership changes

use async_trait::async_trait;
use std::sync::Arc;
use crate::application::messaging::{Context, EventHandler, HandlerResult};
use crate::domain::entities::{Event, EventKind};
use crate::infrastructure::modules::HandlerSettings;

pub const NAME: &str = "presence";

pub struct PresenceHandler;

#[async_trait]
impl EventHandler for PresenceHandler {
    async fn handle(&self, ctx: &Context, event: &Event) -> HandlerResult {
        match event.kind {
            EventKind::Ready => {
                let username = event.str_field(&["user", "username"]).unwrap_or("unknown");
                let servers = event
                    .payload
                    .get("guilds")
                    .and_then(|g| g.as_array())
                    .map(Vec::len)
                    .unwrap_or(0);
                tracing::info!("Ready as {} in {} servers", username, servers);
                ctx.store
                    .set(NAME, "last_ready", &event.received_at.to_rfc3339())
                    .await?;
            }
            EventKind::Resume => tracing::info!("Session resumed"),
            EventKind::ServerJoin | EventKind::ServerAvailable => {
                tracing::info!("Server available: {}", server_name(event));
            }
            EventKind::ServerRemove | EventKind::ServerUnavailable => {
                tracing::info!("Server gone: {}", server_name(event));
            }
            _ => {}
        }
        Ok(())
    }
}

fn server_name(event: &Event) -> &str {
    event
        .str_field(&["name"])
        .or_else(|| event.str_field(&["id"]))
        .unwrap_or("unknown")
}

pub fn factory(kind: EventKind, _settings: &HandlerSettings) -> Option<Arc<dyn EventHandler>> {
    match kind {
        EventKind::Ready
        | EventKind::Resume
        | EventKind::ServerJoin
        | EventKind::ServerAvailable
        | EventKind::ServerRemove
        | EventKind::ServerUnavailable => Some(Arc::new(PresenceHandler)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::tests::test_context;
    use serde_json::json;

    #[tokio::test]
    async fn test_ready_records_timestamp() {
        let ctx = test_context();
        let event = Event::new(
            EventKind::Ready,
            json!({"user": {"username": "modis"}, "guilds": [{"id": "1"}]}),
        );

        PresenceHandler.handle(&ctx, &event).await.unwrap();

        let stored = ctx.store.get(NAME, "last_ready").await.unwrap();
        assert_eq!(stored, Some(event.received_at.to_rfc3339()));
    }

    #[test]
    fn test_factory_events() {
        let settings = HandlerSettings::default();
        assert!(factory(EventKind::ServerUnavailable, &settings).is_some());
        assert!(factory(EventKind::Message, &settings).is_none());
    }
}
