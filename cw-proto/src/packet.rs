//! The protocol packet and its type vocabulary.
//!
//! One [`Packet`] is one line on the wire: a single JSON object with the
//! keys used by the server (`type`, `sender`, `receiver`, `content`,
//! `fileName`, `timestamp`, `id`, `isRead`, `isDeleted`). Decoders ignore
//! unknown extra fields for forward compatibility.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All packet type tags exchanged with the chat server.
///
/// The enumeration is open: tags this client does not know about map to
/// `Unknown` and are still delivered (as message arrivals) rather than
/// rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PacketType {
    /// Session announcement, first packet after a successful connect.
    Login,
    /// A plain chat text message (`content` is encrypted on the wire).
    Message,
    /// A file transfer (`content` is Base64 of the encrypted bytes).
    File,
    /// Keep-alive probe sent by the client.
    Ping,
    /// Keep-alive reply sent by the server; never leaves the transport layer.
    Pong,
    /// Typing indicator (`content` is `start` or `stop`).
    Typing,
    /// Request to mark all messages with a user as read.
    MarkRead,
    /// Request to download a file stored on the server.
    Download,
    /// Server reply carrying a downloaded file payload.
    DownloadResult,
    /// Request for the message history with a user.
    GetHistory,
    /// Server reply carrying a batch of history packets.
    History,
    /// Online-presence list (comma-separated names).
    UserList,
    /// Full roster with unread counts (`name` or `name(count)` entries).
    AllUsers,
    /// Notification that a peer read our messages.
    ReadNotify,
    /// Notification that a message was deleted.
    DeleteNotify,
    /// Request to delete a message.
    Delete,
    /// Unknown/unhandled packet type.
    Unknown(String),
}

impl PacketType {
    /// Parse a type tag string from the server.
    pub fn from_str(s: &str) -> Self {
        match s {
            "login" => Self::Login,
            "message" => Self::Message,
            "file" => Self::File,
            "ping" => Self::Ping,
            "pong" => Self::Pong,
            "typing" => Self::Typing,
            "mark_read" => Self::MarkRead,
            "download" => Self::Download,
            "download_result" => Self::DownloadResult,
            "get_history" => Self::GetHistory,
            "history" => Self::History,
            "userlist" => Self::UserList,
            "allusers" => Self::AllUsers,
            "read_notify" => Self::ReadNotify,
            "delete_notify" => Self::DeleteNotify,
            "delete" => Self::Delete,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Convert to the wire tag string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Login => "login",
            Self::Message => "message",
            Self::File => "file",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Typing => "typing",
            Self::MarkRead => "mark_read",
            Self::Download => "download",
            Self::DownloadResult => "download_result",
            Self::GetHistory => "get_history",
            Self::History => "history",
            Self::UserList => "userlist",
            Self::AllUsers => "allusers",
            Self::ReadNotify => "read_notify",
            Self::DeleteNotify => "delete_notify",
            Self::Delete => "delete",
            Self::Unknown(s) => s.as_str(),
        }
    }

    /// Whether content of this type is confidential and must be encrypted
    /// before it reaches the wire.
    pub fn is_confidential(&self) -> bool {
        matches!(self, Self::Message)
    }
}

impl From<String> for PacketType {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}

impl From<PacketType> for String {
    fn from(t: PacketType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for PacketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The wire unit: one protocol message, JSON-encoded, newline-framed.
///
/// `content` is always plaintext on this side of the codec; ciphertext
/// exists only between [`crate::Codec::encode`] and
/// [`crate::Codec::decode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    /// Type tag; never empty.
    #[serde(rename = "type")]
    pub packet_type: PacketType,

    /// Nickname of the originating user.
    #[serde(default)]
    pub sender: String,

    /// Target user, when the packet is addressed to one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,

    /// Text content or Base64 file payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Original filename for file transfers.
    #[serde(rename = "fileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Creation time (ISO-8601 on the wire).
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Server-assigned row id; 0 for client-originated packets that have
    /// not been acknowledged yet.
    #[serde(default)]
    pub id: i64,

    /// Whether the receiver has read this message.
    #[serde(rename = "isRead", default)]
    pub is_read: bool,

    /// Whether this message was deleted (meaningful in history replay).
    #[serde(rename = "isDeleted", default)]
    pub is_deleted: bool,
}

impl Packet {
    /// Create a packet with the given type and sender; remaining fields
    /// take their client-side defaults.
    pub fn new(packet_type: PacketType, sender: impl Into<String>) -> Self {
        Self {
            packet_type,
            sender: sender.into(),
            receiver: None,
            content: None,
            file_name: None,
            timestamp: Utc::now(),
            id: 0,
            is_read: false,
            is_deleted: false,
        }
    }

    /// Set the target user.
    pub fn with_receiver(mut self, receiver: impl Into<String>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }

    /// Set the content field.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Set the filename field.
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    /// Content as a `&str`, empty when absent.
    pub fn content_str(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}
