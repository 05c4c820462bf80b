//! Packet routing: one decoded packet in, one typed chat event out.
//!
//! Pure routing with no I/O. Every inbound packet (pong excepted, which the
//! receive loop consumes) is mapped to exactly one [`ChatEvent`] by its type
//! tag; unknown tags fall through to a message arrival so new server types
//! degrade gracefully instead of being dropped.

use tracing::warn;

use cw_proto::{Packet, PacketType};

use crate::events::{ChatEvent, EventDispatcher, RosterEntry};

/// Routes decoded packets to their type-specific chat event.
pub struct PacketRouter {
    nickname: String,
    dispatcher: EventDispatcher,
}

impl PacketRouter {
    /// Create a router for a session with the given local nickname.
    pub fn new(nickname: impl Into<String>, dispatcher: EventDispatcher) -> Self {
        Self {
            nickname: nickname.into(),
            dispatcher,
        }
    }

    /// Route one packet to its event.
    pub fn route(&self, packet: Packet) {
        let event = self.classify(packet);
        if let Some(event) = event {
            self.dispatcher.dispatch(event);
        }
    }

    /// Map a packet to its chat event, or `None` when the payload is
    /// unusable (logged, never fatal).
    fn classify(&self, packet: Packet) -> Option<ChatEvent> {
        match packet.packet_type {
            PacketType::UserList => Some(ChatEvent::Presence {
                users: parse_presence(packet.content_str(), &self.nickname),
            }),

            PacketType::AllUsers => Some(ChatEvent::Roster {
                entries: parse_roster(packet.content_str()),
            }),

            PacketType::History => match serde_json::from_str::<Vec<Packet>>(packet.content_str())
            {
                Ok(packets) => Some(ChatEvent::History { packets }),
                Err(e) => {
                    warn!("unusable history payload: {e}");
                    None
                }
            },

            PacketType::DownloadResult => Some(ChatEvent::FileReady {
                content: packet.content.unwrap_or_default(),
                file_name: packet.file_name.unwrap_or_default(),
            }),

            PacketType::ReadNotify => Some(ChatEvent::ReadReceipt {
                from: packet.sender,
                to: packet.receiver.unwrap_or_default(),
            }),

            PacketType::DeleteNotify => Some(ChatEvent::DeleteNotice {
                sender: packet.sender,
                receiver: packet.receiver,
                timestamp: packet.timestamp,
                id: packet.id,
            }),

            PacketType::Typing => Some(ChatEvent::Typing {
                active: packet.content_str() == "start",
                user: packet.sender,
            }),

            // message, file, and anything unrecognized arrive as messages
            _ => Some(ChatEvent::Message(packet)),
        }
    }
}

/// Parse a `userlist` payload: comma-separated names, minus ourselves.
fn parse_presence(content: &str, self_name: &str) -> Vec<String> {
    content
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty() && *name != self_name)
        .map(str::to_string)
        .collect()
}

/// Parse an `allusers` payload: entries are `name` or `name(count)`.
///
/// An absent or unparsable count defaults to 0, never an error.
fn parse_roster(content: &str) -> Vec<RosterEntry> {
    content
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once('(') {
            Some((name, rest)) => RosterEntry {
                user: name.trim().to_string(),
                unread: rest
                    .trim_end_matches(')')
                    .trim()
                    .parse()
                    .unwrap_or(0),
            },
            None => RosterEntry {
                user: entry.to_string(),
                unread: 0,
            },
        })
        .collect()
}
