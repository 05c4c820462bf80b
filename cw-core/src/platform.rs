//! Platform detection and OS-specific directory utilities.

use std::path::PathBuf;

use crate::error::{ChatError, ChatResult};

/// Detected operating system platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    MacOs,
    Linux,
}

impl Platform {
    /// Detect the current platform at compile time.
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Linux
        }
    }

    /// Get the platform-specific application data directory.
    ///
    /// - Windows: `%APPDATA%/Chatwire`
    /// - macOS: `~/Library/Application Support/Chatwire`
    /// - Linux: `~/.local/share/Chatwire`
    pub fn data_dir() -> ChatResult<PathBuf> {
        let base = dirs::data_dir()
            .ok_or_else(|| ChatError::Config("could not determine data directory".into()))?;
        Ok(base.join("Chatwire"))
    }

    /// Get the platform-specific configuration directory.
    pub fn config_dir() -> ChatResult<PathBuf> {
        let base = dirs::config_dir()
            .ok_or_else(|| ChatError::Config("could not determine config directory".into()))?;
        Ok(base.join("Chatwire"))
    }

    /// Where log files go when no directory is configured.
    pub fn default_log_dir() -> ChatResult<PathBuf> {
        Ok(Self::data_dir()?.join("logs"))
    }

    /// Get a human-readable platform name.
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Windows => "Windows",
            Platform::MacOs => "macOS",
            Platform::Linux => "Linux",
        }
    }
}
