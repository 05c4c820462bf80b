//! CLI command implementations.

pub mod connect;
pub mod history;
pub mod send;

use console::style;

use cw_client::{ChatClient, ChatEvent, ClientConfig};
use cw_core::config::ConfigHandle;
use cw_core::error::{ChatError, ChatResult};
use cw_proto::Packet;

/// Build a disconnected client from the current configuration.
pub async fn build_client(config: &ConfigHandle) -> ChatClient {
    let app = config.read().await;
    ChatClient::new(ClientConfig::from_app_config(&app))
}

/// Resolve the session nickname: CLI argument wins over config.
pub async fn resolve_nickname(
    config: &ConfigHandle,
    override_arg: Option<String>,
) -> ChatResult<String> {
    if let Some(nickname) = override_arg {
        return Ok(nickname);
    }
    let nickname = config.read().await.session.nickname.clone();
    if nickname.is_empty() {
        return Err(ChatError::MissingConfig(
            "nickname (use --nickname or set it in config)".into(),
        ));
    }
    Ok(nickname)
}

/// Render one inbound event to the terminal.
pub fn render_event(event: &ChatEvent) {
    match event {
        ChatEvent::Message(packet) => {
            println!(
                "  {} {}: {}",
                style(format!("[{}]", packet.timestamp.format("%H:%M:%S"))).dim(),
                style(&packet.sender).cyan().bold(),
                packet.content_str()
            );
        }
        ChatEvent::Presence { users } => {
            println!("  {} online: {}", style("*").green(), users.join(", "));
        }
        ChatEvent::Roster { entries } => {
            for entry in entries {
                if entry.unread > 0 {
                    println!(
                        "  {} {} ({} unread)",
                        style("*").yellow(),
                        entry.user,
                        entry.unread
                    );
                } else {
                    println!("  {} {}", style("*").dim(), entry.user);
                }
            }
        }
        ChatEvent::History { packets } => {
            for packet in packets {
                print_history_line(packet);
            }
        }
        ChatEvent::FileReady { file_name, .. } => {
            println!("  {} file ready: {file_name}", style("*").green());
        }
        ChatEvent::ReadReceipt { from, to } => {
            println!("  {} {from} read your messages to {to}", style("*").dim());
        }
        ChatEvent::DeleteNotice { sender, id, .. } => {
            println!(
                "  {} {sender} deleted a message (id {id})",
                style("*").dim()
            );
        }
        ChatEvent::Typing { user, active } => {
            if *active {
                println!("  {} {user} is typing...", style("*").dim());
            }
        }
    }
}

/// Render one history packet, marking deleted and unread entries.
pub fn print_history_line(packet: &Packet) {
    let when = packet.timestamp.format("%Y-%m-%d %H:%M:%S");
    if packet.is_deleted {
        println!(
            "  {} {} {}",
            style(format!("[{when}]")).dim(),
            style(&packet.sender).cyan(),
            style("(deleted)").dim().italic()
        );
        return;
    }
    let marker = if packet.is_read { " " } else { "*" };
    println!(
        "  {} {}{} {}: {}",
        style(format!("[{when}]")).dim(),
        style(marker).yellow(),
        style(format!("#{}", packet.id)).dim(),
        style(&packet.sender).cyan(),
        packet.content_str()
    );
}
