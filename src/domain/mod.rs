//! Domain layer - Core types with no knowledge of a particular chat platform
//! 
//! This layer contains:
//! - Entities: Events and the fixed set of event names
//! - Traits: Abstractions for infrastructure (MessagingClient, Store)

pub mod entities;
pub mod traits;
