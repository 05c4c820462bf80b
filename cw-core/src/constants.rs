//! Application-wide constants.
//!
//! The timing values here mirror the wire protocol's expectations and feed
//! the serde defaults in [`crate::config`]; runtime behaviour always goes
//! through configuration rather than reading these directly.

/// Application name.
pub const APP_NAME: &str = "Chatwire";

/// Application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat server host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default chat server port.
pub const DEFAULT_PORT: u16 = 9000;

/// Interval between heartbeat pings, in seconds.
pub const PING_INTERVAL_SECS: u64 = 10;

/// Seconds without a pong before the connection is declared dead.
pub const PONG_TIMEOUT_SECS: u64 = 30;

/// Maximum connection attempts per reconnect cycle.
pub const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Fixed delay between connection attempts, in seconds.
pub const RETRY_DELAY_SECS: u64 = 3;

/// Capacity of the broadcast channel that fans out chat events.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
