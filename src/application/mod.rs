//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Startup and the run loop
//! - Errors: Domain-specific errors
//! - Messaging: Event handlers, fan-out, dispatching

pub mod errors;
pub mod services;
pub mod messaging;
