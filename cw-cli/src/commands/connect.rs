//! Connect command - interactive chat session.

use std::path::PathBuf;

use console::style;
use dialoguer::Input;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use cw_client::{ChatClient, ConnectionState};
use cw_core::config::ConfigHandle;
use cw_core::error::{ChatError, ChatResult};
use cw_core::platform::Platform;

/// Run the connect command.
pub async fn run(
    config: ConfigHandle,
    host: Option<String>,
    port: Option<u16>,
    nickname: Option<String>,
    save_config: bool,
) -> ChatResult<()> {
    // Apply overrides: args > config > interactive prompt for the nickname.
    {
        let mut cfg = config.write().await;
        if let Some(h) = host {
            cfg.server.host = h;
        }
        if let Some(p) = port {
            cfg.server.port = p;
        }
        if let Some(n) = nickname {
            cfg.session.nickname = n;
        }
    }

    let nickname = {
        let current = config.read().await.session.nickname.clone();
        if current.is_empty() {
            let entered: String = Input::new()
                .with_prompt("Nickname")
                .interact_text()
                .map_err(|e| ChatError::Internal(e.to_string()))?;
            config.write().await.session.nickname = entered.clone();
            entered
        } else {
            current
        }
    };

    let client = super::build_client(&config).await;
    let mut events = client.subscribe();
    let mut states = client.state_receiver();

    println!(
        "{} Connecting to {} as {}...",
        style("[1/2]").bold().dim(),
        client.server_addr(),
        style(&nickname).cyan()
    );

    if let Err(e) = client.connect(&nickname).await {
        println!("  {} {e}", style("FAIL").red().bold());
        return Err(e);
    }
    println!("  {} Connected.", style("OK").green().bold());

    if save_config {
        let cfg = config.read().await;
        let path = Platform::config_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join("config.toml");
        cfg.save_to_file(&path)?;
        println!("  {} Config saved to {}", style("OK").green(), path.display());
    }

    println!(
        "{} Session open. Type a message, or /to <user>, /file <path>, \
         /history, /read, /quit.",
        style("[2/2]").bold().dim()
    );
    println!();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut peer: Option<String> = None;

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(ev) => super::render_event(&ev),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        println!(
                            "  {} Missed {n} events (slow consumer)",
                            style("WARN").yellow()
                        );
                    }
                    Err(_) => break,
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                match state {
                    ConnectionState::Reconnecting => {
                        println!("  {} Connection lost, reconnecting...", style("WARN").yellow());
                    }
                    ConnectionState::Disconnected => {
                        println!("  {} Disconnected.", style("WARN").yellow());
                    }
                    _ => {}
                }
            }
            line = stdin.next_line() => {
                let Ok(Some(line)) = line else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "/quit" {
                    break;
                }
                if let Err(e) = handle_input(&client, line, &mut peer).await {
                    error!("command failed: {e}");
                    println!("  {} {e}", style("FAIL").red());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    println!("\n  Disconnecting...");
    client.disconnect().await;
    Ok(())
}

/// Interpret one line of interactive input.
async fn handle_input(
    client: &ChatClient,
    line: &str,
    peer: &mut Option<String>,
) -> ChatResult<()> {
    if let Some(target) = line.strip_prefix("/to ") {
        let target = target.trim().to_string();
        println!("  {} now talking to {}", style("*").dim(), style(&target).cyan());
        *peer = Some(target);
        return Ok(());
    }

    // /history and /read accept an explicit user, defaulting to the
    // current conversation partner.
    let target = |arg: &str| -> ChatResult<String> {
        let arg = arg.trim();
        if !arg.is_empty() {
            return Ok(arg.to_string());
        }
        peer.clone()
            .ok_or_else(|| ChatError::MissingConfig("recipient (use /to <user> first)".into()))
    };

    if let Some(path) = line.strip_prefix("/file ") {
        let current = target("")?;
        client.send_file(std::path::Path::new(path.trim()), &current).await?;
        println!("  {} file sent", style("OK").green());
    } else if let Some(arg) = line.strip_prefix("/history").filter(|r| r.is_empty() || r.starts_with(' ')) {
        // The history arrives as an event and is rendered by the loop.
        let nickname = client.nickname().await;
        client.request_history(&nickname, &target(arg)?).await?;
    } else if let Some(arg) = line.strip_prefix("/read").filter(|r| r.is_empty() || r.starts_with(' ')) {
        client.mark_read(&target(arg)?).await?;
        println!("  {} marked read", style("OK").green());
    } else if line.starts_with('/') {
        println!("  {} unknown command: {line}", style("WARN").yellow());
    } else {
        client.send_text(line, &target("")?).await?;
    }
    Ok(())
}
