//! Send command - deliver one message and exit.

use console::style;

use cw_core::config::ConfigHandle;
use cw_core::error::ChatResult;

/// Run the send command.
pub async fn run(
    config: ConfigHandle,
    to: String,
    text: String,
    nickname: Option<String>,
) -> ChatResult<()> {
    let nickname = super::resolve_nickname(&config, nickname).await?;
    let client = super::build_client(&config).await;

    client.connect(&nickname).await?;
    client.send_text(&text, &to).await?;
    println!(
        "  {} message sent to {}",
        style("OK").green().bold(),
        style(&to).cyan()
    );

    client.disconnect().await;
    Ok(())
}
