//! History command - fetch one conversation's history and exit.

use std::time::Duration;

use console::style;
use tokio::time::timeout;

use cw_client::ChatEvent;
use cw_core::config::ConfigHandle;
use cw_core::error::{ChatError, ChatResult};

const HISTORY_WAIT: Duration = Duration::from_secs(10);

/// Run the history command.
pub async fn run(
    config: ConfigHandle,
    with: String,
    nickname: Option<String>,
) -> ChatResult<()> {
    let nickname = super::resolve_nickname(&config, nickname).await?;
    let client = super::build_client(&config).await;
    let mut events = client.subscribe();

    client.connect(&nickname).await?;
    client.request_history(&nickname, &with).await?;

    // Skip unrelated events (presence, roster) until the history arrives.
    let packets = loop {
        let event = timeout(HISTORY_WAIT, events.recv())
            .await
            .map_err(|_| ChatError::Transport("timed out waiting for history".into()))?
            .map_err(|e| ChatError::Transport(e.to_string()))?;
        if let ChatEvent::History { packets } = event {
            break packets;
        }
    };

    client.disconnect().await;

    if packets.is_empty() {
        println!("  no messages with {}", style(&with).cyan());
        return Ok(());
    }

    println!(
        "  {} messages with {}:",
        packets.len(),
        style(&with).cyan()
    );
    for packet in &packets {
        super::print_history_line(packet);
    }
    Ok(())
}
