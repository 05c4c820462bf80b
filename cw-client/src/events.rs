//! Chat events and the broadcast-based event dispatcher.
//!
//! Inbound packets are translated into one [`ChatEvent`] variant per
//! consumer-facing callback and fanned out over a tokio broadcast channel,
//! so multiple consumers can independently receive events without blocking
//! each other. All events are published from the single receive-loop task;
//! consumers re-marshal onto their own threads as needed.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use cw_proto::Packet;

/// One entry of the full user roster: a user and their unread count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// The user's nickname.
    pub user: String,
    /// Number of unread messages from that user.
    pub unread: u32,
}

/// Events delivered to consumers of the chat client.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    /// Online-presence list changed (the local user is excluded).
    Presence {
        /// Currently online nicknames.
        users: Vec<String>,
    },

    /// Full roster with per-user unread counts.
    Roster {
        /// All known users.
        entries: Vec<RosterEntry>,
    },

    /// A batch of history packets for one conversation.
    History {
        /// Replayed packets, in server order.
        packets: Vec<Packet>,
    },

    /// A new message or file arrived (also the fallback for unknown types).
    Message(Packet),

    /// A requested file download is ready to save.
    FileReady {
        /// Base64 payload (still encrypted; decrypt at save/display time).
        content: String,
        /// Original filename.
        file_name: String,
    },

    /// A peer read our messages.
    ReadReceipt {
        /// Who read them.
        from: String,
        /// Whose messages were read.
        to: String,
    },

    /// A message was deleted.
    DeleteNotice {
        /// Originating user.
        sender: String,
        /// Target user.
        receiver: Option<String>,
        /// Timestamp of the deleted message.
        timestamp: DateTime<Utc>,
        /// Server id of the deleted message.
        id: i64,
    },

    /// A peer started or stopped typing.
    Typing {
        /// The typing user.
        user: String,
        /// True while typing is in progress.
        active: bool,
    },
}

impl ChatEvent {
    /// Short tag for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Presence { .. } => "presence",
            Self::Roster { .. } => "roster",
            Self::History { .. } => "history",
            Self::Message(_) => "message",
            Self::FileReady { .. } => "file_ready",
            Self::ReadReceipt { .. } => "read_receipt",
            Self::DeleteNotice { .. } => "delete_notice",
            Self::Typing { .. } => "typing",
        }
    }
}

/// Broadcast-based event dispatcher for decoupled event handling.
#[derive(Clone)]
pub struct EventDispatcher {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventDispatcher {
    /// Create a new EventDispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to receive chat events.
    ///
    /// Returns a broadcast receiver. Slow consumers that fall behind
    /// will receive a RecvError::Lagged and may miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    /// Dispatch an event to all active subscribers.
    pub fn dispatch(&self, event: ChatEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(count) => {
                debug!("dispatched {kind} to {count} subscriber(s)");
            }
            Err(_) => {
                // No active receivers -- this is fine during startup/shutdown
                debug!("no subscribers for event {kind}");
            }
        }
    }

    /// Get the current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(cw_core::constants::EVENT_CHANNEL_CAPACITY)
    }
}

/// Connection lifecycle state of the chat client.
///
/// Owned exclusively by the client/reconnector pair; consumers observe
/// transitions through a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Not connected and not trying to connect.
    Disconnected,
    /// Attempting to establish the initial connection.
    Connecting,
    /// Connected, logged in, and receiving packets.
    Connected,
    /// Connection lost, the bounded reconnect cycle is running.
    Reconnecting,
}

impl ConnectionState {
    /// Whether packets can be sent in this state.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
        }
    }
}
