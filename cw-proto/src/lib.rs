//! Chatwire Proto - wire model and line codec for the chat protocol.
//!
//! This crate defines everything that touches the wire format:
//! - The [`Packet`] unit and its open [`PacketType`] enumeration
//! - Newline-delimited JSON framing with transparent content encryption
//! - AES-256-CBC transforms for message text and file payloads

pub mod codec;
pub mod crypto;
pub mod packet;

// Re-export key types
pub use codec::Codec;
pub use crypto::AesCipher;
pub use packet::{Packet, PacketType};
