//! Event dispatcher - Routes client events to fan-out handlers

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use serde_json::json;
use tokio::task::JoinSet;
use crate::domain::entities::{Event, EventKind};
use crate::application::errors::BotError;
use super::fanout::{FanOutHandler, HandlerTable};
use super::handler::{Context, HandlerResult};

/// Event dispatcher - one fan-out handler per subscribed event
pub struct EventDispatcher {
    handlers: HashMap<EventKind, Arc<FanOutHandler>>,
    pending: Mutex<JoinSet<()>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Build fan-out handlers for every event that has at least one handler
    pub fn from_table(table: &HandlerTable) -> Self {
        let mut dispatcher = Self::new();
        for kind in table.events() {
            dispatcher.register(FanOutHandler::new(kind, table.handlers(kind).to_vec()));
        }
        dispatcher
    }

    /// Register a fan-out handler, replacing any previous one for the event
    pub fn register(&mut self, fan_out: FanOutHandler) {
        if fan_out.is_empty() {
            return;
        }
        let kind = fan_out.kind();
        tracing::debug!("Registering {} ({})", kind, fan_out.modules().join(", "));
        if self.handlers.insert(kind, Arc::new(fan_out)).is_some() {
            tracing::warn!("Replaced existing handler for {}", kind);
        }
    }

    pub fn is_registered(&self, kind: EventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Run the fan-out handler for an event.
    ///
    /// A failure is logged and forwarded to `on_error` handlers, unless the
    /// failing event is `on_error` itself.
    pub async fn dispatch(&self, ctx: &Context, event: &Event) -> HandlerResult {
        let Some(fan_out) = self.handlers.get(&event.kind) else {
            return Ok(());
        };

        let result = fan_out.call(ctx, event).await;
        if let Err(e) = &result {
            tracing::error!("Error in {} (event {}): {}", event.kind, event.id, e);
            if event.kind != EventKind::Error {
                self.report_error(ctx, event, e).await;
            }
        }
        result
    }

    async fn report_error(&self, ctx: &Context, event: &Event, error: &BotError) {
        let Some(on_error) = self.handlers.get(&EventKind::Error) else {
            return;
        };

        let module = match error {
            BotError::Handler { module, .. } => Some(module.clone()),
            _ => None,
        };
        let error_event = Event::new(
            EventKind::Error,
            json!({
                "event": event.kind.as_str(),
                "event_id": event.id,
                "module": module,
                "error": error.to_string(),
                "payload": event.payload,
            }),
        );
        if let Err(e) = on_error.call(ctx, &error_event).await {
            tracing::error!("on_error handler failed: {}", e);
        }
    }

    /// Dispatch on a background task tracked for cancellation
    pub fn spawn(self: &Arc<Self>, ctx: Context, event: Event) {
        if !self.is_registered(event.kind) {
            return;
        }
        let dispatcher = Arc::clone(self);
        let Ok(mut pending) = self.pending.lock() else {
            tracing::warn!("Pending task set poisoned, dropping {}", event.kind);
            return;
        };
        // Reap finished tasks so the set does not grow unbounded
        while pending.try_join_next().is_some() {}
        pending.spawn(async move {
            let _ = dispatcher.dispatch(&ctx, &event).await;
        });
    }

    /// Wait for every spawned handler task to finish
    pub async fn drain(&self) {
        let mut tasks = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        while tasks.join_next().await.is_some() {}
    }

    /// Abort outstanding handler tasks, returning how many were running
    pub async fn cancel_pending(&self) -> usize {
        let mut tasks = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return 0,
        };
        let count = tasks.len();
        tasks.abort_all();
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if !e.is_cancelled() {
                    tracing::debug!("Handler task ended with error during shutdown: {}", e);
                }
            }
        }
        count
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::messaging::fanout::RegisteredHandler;
    use crate::application::messaging::tests::handler_fn;
    use crate::application::messaging::tests::{recording_handler, test_context};
    use std::time::Duration;

    #[test]
    fn test_events_without_handlers_are_not_registered() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut table = HandlerTable::new();
        table.push(EventKind::Message, "ping", recording_handler("ping", &calls));

        let dispatcher = EventDispatcher::from_table(&table);

        for kind in EventKind::ALL {
            assert_eq!(dispatcher.is_registered(kind), kind == EventKind::Message);
        }
    }

    #[test]
    fn test_empty_fan_out_is_ignored() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(FanOutHandler::new(EventKind::Typing, vec![]));
        assert!(!dispatcher.is_registered(EventKind::Typing));
    }

    #[tokio::test]
    async fn test_dispatch_unregistered_event_is_noop() {
        let dispatcher = EventDispatcher::new();
        let event = Event::new(EventKind::MemberBan, json!({}));
        assert!(dispatcher.dispatch(&test_context(), &event).await.is_ok());
    }

    #[tokio::test]
    async fn test_every_event_fans_out_to_all_modules() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut table = HandlerTable::new();
        for kind in EventKind::ALL {
            table.push(kind, "one", recording_handler("one", &calls));
            table.push(kind, "two", recording_handler("two", &calls));
        }
        let dispatcher = EventDispatcher::from_table(&table);
        let ctx = test_context();

        for kind in EventKind::ALL {
            calls.lock().unwrap().clear();
            dispatcher.dispatch(&ctx, &Event::new(kind, json!({}))).await.unwrap();
            assert_eq!(*calls.lock().unwrap(), vec!["one", "two"], "event {}", kind);
        }
    }

    #[tokio::test]
    async fn test_failure_is_forwarded_to_on_error() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_handler = Arc::clone(&seen);

        let mut table = HandlerTable::new();
        table.push(
            EventKind::Message,
            "broken",
            handler_fn(|_ctx, _event| Box::pin(async { Err(BotError::Internal("bad input".into())) })),
        );
        table.push(EventKind::Message, "after", recording_handler("after", &calls));
        table.push(
            EventKind::Error,
            "reporter",
            handler_fn(move |_ctx, event| {
                let seen = Arc::clone(&seen_by_handler);
                Box::pin(async move {
                    seen.lock().unwrap().push(event.payload.clone());
                    Ok(())
                })
            }),
        );
        let dispatcher = EventDispatcher::from_table(&table);

        let event = Event::new(EventKind::Message, json!({"content": "x"}));
        let result = dispatcher.dispatch(&test_context(), &event).await;

        assert!(result.is_err());
        assert!(calls.lock().unwrap().is_empty());
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["event"], "on_message");
        assert_eq!(seen[0]["module"], "broken");
        assert_eq!(seen[0]["event_id"], event.id.as_str());
    }

    #[tokio::test]
    async fn test_failing_on_error_does_not_recurse() {
        let mut table = HandlerTable::new();
        table.push(
            EventKind::Error,
            "reporter",
            handler_fn(|_ctx, _event| Box::pin(async { Err(BotError::Internal("nested".into())) })),
        );
        let dispatcher = EventDispatcher::from_table(&table);

        let result = dispatcher
            .dispatch(&test_context(), &Event::new(EventKind::Error, json!({})))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_spawned_dispatch_completes_on_drain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let mut table = HandlerTable::new();
        table.push(EventKind::Ready, "presence", recording_handler("presence", &calls));
        let dispatcher = Arc::new(EventDispatcher::from_table(&table));

        dispatcher.spawn(test_context(), Event::new(EventKind::Ready, json!({})));
        dispatcher.spawn(test_context(), Event::new(EventKind::Typing, json!({})));
        dispatcher.drain().await;

        assert_eq!(*calls.lock().unwrap(), vec!["presence"]);
        assert_eq!(dispatcher.cancel_pending().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_pending_aborts_running_handlers() {
        let mut dispatcher = EventDispatcher::new();
        dispatcher.register(FanOutHandler::new(
            EventKind::Typing,
            vec![RegisteredHandler {
                module: "slow".into(),
                handler: handler_fn(|_ctx, _event| {
                    Box::pin(async {
                        tokio::time::sleep(Duration::from_secs(3600)).await;
                        Ok(())
                    })
                }),
            }],
        ));
        let dispatcher = Arc::new(dispatcher);

        dispatcher.spawn(test_context(), Event::new(EventKind::Typing, json!({})));
        dispatcher.spawn(test_context(), Event::new(EventKind::Typing, json!({})));

        let cancelled = tokio::time::timeout(Duration::from_secs(5), dispatcher.cancel_pending())
            .await
            .expect("cancellation should not hang");
        assert_eq!(cancelled, 2);
        assert_eq!(dispatcher.cancel_pending().await, 0);
    }
}
