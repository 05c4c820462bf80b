//! Chatwire Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other Chatwire crates:
//! - Application configuration (server address, session nickname, timing knobs)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform directory utilities
//! - Common constants and type aliases

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;

// Re-export commonly used items at the crate root
pub use config::AppConfig;
pub use error::{ChatError, ChatResult};
pub use logging::init_logging;
pub use platform::Platform;
