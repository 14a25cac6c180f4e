//! Module system for modis-bot
//!
//! A module is a subdirectory of the modules directory. Files in it named after
//! a recognized event (`on_message.yaml`, `on_ready`, ...) subscribe the module
//! to that event. The code behind each module comes from the `ModuleCatalog`.

pub mod catalog;
pub mod loader;
pub mod settings;

pub use catalog::ModuleCatalog;
pub use loader::ModuleLoader;
pub use settings::HandlerSettings;
