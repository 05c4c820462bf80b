//! Global error types for the Chatwire client.
//!
//! All error categories across the workspace are unified into a single
//! `ChatError` enum with conversions from underlying library errors.

use thiserror::Error;

/// Convenience type alias for Results using ChatError.
pub type ChatResult<T> = Result<T, ChatError>;

/// Unified error type covering all error categories in Chatwire.
#[derive(Error, Debug)]
pub enum ChatError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(String),

    // -- Transport errors --
    /// Establishing the TCP connection failed after all retries.
    #[error("could not connect to {addr}: {attempts} attempt(s) exhausted")]
    ConnectFailed {
        /// Target address that was unreachable.
        addr: String,
        /// Number of attempts made before giving up.
        attempts: u32,
    },

    /// An operation required a live connection but the client is not connected.
    #[error("not connected")]
    NotConnected,

    /// The peer closed the stream or a read/write faulted mid-session.
    #[error("transport error: {0}")]
    Transport(String),

    // -- Protocol errors --
    /// A received line was not a valid packet.
    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Crypto errors --
    /// AES encryption/decryption error. On the send path this means the
    /// packet was suppressed and never reached the wire.
    #[error("crypto error: {0}")]
    Crypto(String),

    // -- File/IO errors --
    /// File system or socket I/O failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for ChatError {
    fn from(e: toml::de::Error) -> Self {
        ChatError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failed_display() {
        let err = ChatError::ConnectFailed {
            addr: "127.0.0.1:9000".into(),
            attempts: 5,
        };
        assert_eq!(
            err.to_string(),
            "could not connect to 127.0.0.1:9000: 5 attempt(s) exhausted"
        );
    }

    #[test]
    fn test_not_connected_display() {
        assert_eq!(ChatError::NotConnected.to_string(), "not connected");
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let err: ChatError = io.into();
        assert!(matches!(err, ChatError::Io(_)));
    }

    #[test]
    fn test_serde_json_conversion() {
        let parse = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: ChatError = parse.into();
        assert!(matches!(err, ChatError::Serialization(_)));
    }
}
