//! Chatwire CLI - terminal client for the line-delimited JSON chat protocol.
//!
//! Offers an interactive session (`connect`) plus one-shot commands for
//! scripting: send a single message or pull a conversation history without
//! keeping a session open.

mod commands;

use clap::{Parser, Subcommand};
use tracing::info;

use cw_core::config::{AppConfig, ConfigHandle};
use cw_core::error::ChatResult;
use cw_core::logging;
use cw_core::platform::Platform;

/// Chatwire - encrypted TCP chat client.
#[derive(Parser)]
#[command(
    name = "chatwire",
    version,
    about = "Chatwire chat client CLI",
    long_about = "A terminal client for the Chatwire chat protocol.\n\
                   Connect to a chat server to exchange encrypted messages and files."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the chat server and start an interactive session.
    Connect {
        /// Server host (overrides config).
        #[arg(long)]
        host: Option<String>,
        /// Server port (overrides config).
        #[arg(long)]
        port: Option<u16>,
        /// Nickname to announce (overrides config).
        #[arg(short, long)]
        nickname: Option<String>,
        /// Save connection settings to the config file after a successful connect.
        #[arg(long)]
        save: bool,
    },
    /// Send a single message and exit.
    Send {
        /// Recipient nickname.
        #[arg(short, long)]
        to: String,
        /// Message text.
        text: String,
        /// Nickname to announce (overrides config).
        #[arg(short, long)]
        nickname: Option<String>,
    },
    /// Fetch the message history with one user and exit.
    History {
        /// The conversation partner.
        #[arg(short, long)]
        with: String,
        /// Nickname to announce (overrides config).
        #[arg(short, long)]
        nickname: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ChatResult<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    let log_dir = Platform::default_log_dir()
        .unwrap_or_else(|_| std::path::PathBuf::from("logs"));
    let _guard = logging::init_logging(log_level, &log_dir, false)?;

    let config_path = cli.config.as_deref().map(std::path::Path::new);
    let config = if let Some(path) = config_path {
        AppConfig::load_from_file(path)?
    } else {
        let default_path = Platform::config_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join("config.toml");
        if default_path.exists() {
            AppConfig::load_from_file(&default_path)?
        } else {
            AppConfig::default()
        }
    };

    let config_handle = ConfigHandle::new(config);

    info!("Chatwire CLI v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Connect {
            host,
            port,
            nickname,
            save,
        } => commands::connect::run(config_handle, host, port, nickname, save).await,
        Commands::Send { to, text, nickname } => {
            commands::send::run(config_handle, to, text, nickname).await
        }
        Commands::History { with, nickname } => {
            commands::history::run(config_handle, with, nickname).await
        }
    }
}
