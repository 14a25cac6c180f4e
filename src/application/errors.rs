//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Handler '{module}' failed on {event}: {message}")]
    Handler {
        module: String,
        event: String,
        message: String,
    },

    #[error("Gateway closed: {0}")]
    GatewayClosed(String),

    #[error("Not connected")]
    NotConnected,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Build a handler failure for a module's own code
    pub fn handler(module: impl Into<String>, event: impl Into<String>, message: impl Into<String>) -> Self {
        BotError::Handler {
            module: module.into(),
            event: event.into(),
            message: message.into(),
        }
    }
}

/// Module discovery and binding errors
#[derive(Error, Debug)]
pub enum ModuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid handler settings in {path}: {message}")]
    Settings { path: String, message: String },

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Serialization(e.to_string())
    }
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
