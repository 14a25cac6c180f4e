//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Storage: Data persistence
//! - Modules: Module discovery and the module catalog
//! - Adapters: Platform integrations (Discord, console)

pub mod config;
pub mod storage;
pub mod modules;
pub mod adapters;
