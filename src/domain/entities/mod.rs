//! Domain entities

pub mod event;

pub use event::{Event, EventKind};
