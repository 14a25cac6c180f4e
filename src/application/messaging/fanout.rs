//! Fan-out handlers - one combined handler per event

use std::collections::BTreeMap;
use std::sync::Arc;
use crate::domain::entities::{Event, EventKind};
use crate::application::errors::BotError;
use super::handler::{Context, EventHandler, HandlerResult};

/// A module's handler for one event
#[derive(Clone)]
pub struct RegisteredHandler {
    pub module: String,
    pub handler: Arc<dyn EventHandler>,
}

/// Event name -> handlers in registration order
#[derive(Clone, Default)]
pub struct HandlerTable {
    entries: BTreeMap<EventKind, Vec<RegisteredHandler>>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module's handler for an event
    pub fn push(&mut self, kind: EventKind, module: impl Into<String>, handler: Arc<dyn EventHandler>) {
        self.entries.entry(kind).or_default().push(RegisteredHandler {
            module: module.into(),
            handler,
        });
    }

    pub fn handlers(&self, kind: EventKind) -> &[RegisteredHandler] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Events with at least one handler, in fixed event order
    pub fn events(&self) -> Vec<EventKind> {
        EventKind::ALL
            .iter()
            .copied()
            .filter(|kind| !self.handlers(*kind).is_empty())
            .collect()
    }

    /// Total number of registered handlers
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Module names per event, for display
    pub fn summary(&self) -> Vec<(EventKind, Vec<String>)> {
        self.events()
            .into_iter()
            .map(|kind| {
                let modules = self.handlers(kind).iter().map(|h| h.module.clone()).collect();
                (kind, modules)
            })
            .collect()
    }
}

/// Calls every registered handler for one event, in order
pub struct FanOutHandler {
    kind: EventKind,
    handlers: Vec<RegisteredHandler>,
}

impl FanOutHandler {
    pub fn new(kind: EventKind, handlers: Vec<RegisteredHandler>) -> Self {
        Self { kind, handlers }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn modules(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.module.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Await each handler in turn; the first failure stops the chain
    pub async fn call(&self, ctx: &Context, event: &Event) -> HandlerResult {
        for registered in &self.handlers {
            tracing::trace!("{} -> {}", self.kind, registered.module);
            registered.handler.handle(ctx, event).await.map_err(|e| match e {
                BotError::Handler { .. } => e,
                other => BotError::handler(&registered.module, self.kind.as_str(), other.to_string()),
            })?;
        }
        Ok(())
    }
}
