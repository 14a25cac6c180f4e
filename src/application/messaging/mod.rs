//! Event handling - Fan-out dispatch of client events to module handlers

pub mod dispatcher;
pub mod fanout;
pub mod handler;


pub use dispatcher::EventDispatcher;
pub use fanout::HandlerTable;
pub use handler::{Context, EventHandler, HandlerResult};
