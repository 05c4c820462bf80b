//! Chatwire Client - persistent connection engine for the chat protocol.
//!
//! This crate provides the stateful protocol client that:
//! - Maintains one long-lived TCP connection per client
//! - Announces the session with a login packet on every successful connect
//! - Monitors liveness with ping/pong heartbeats
//! - Reconnects with a bounded, fixed-delay retry policy
//! - Demultiplexes the inbound packet stream into typed chat events
//! - Exposes the outbound API (text, files, history, receipts, typing)

pub mod client;
pub mod connection;
pub mod dispatcher;
pub mod events;
pub mod heartbeat;

// Re-export key types
pub use client::{ChatClient, ClientConfig, MessageRef, ReconnectConfig};
pub use connection::Connection;
pub use dispatcher::PacketRouter;
pub use events::{ChatEvent, ConnectionState, EventDispatcher, RosterEntry};
pub use heartbeat::HeartbeatConfig;
