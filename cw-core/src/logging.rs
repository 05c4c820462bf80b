//! Structured logging setup using the `tracing` ecosystem.
//!
//! One compact console layer for interactive use plus one daily-rotated
//! file layer, which can be switched to JSON for log shippers.

use std::path::Path;

use tracing_appender::rolling;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

use crate::error::ChatResult;

/// Guard that keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Initialize the global tracing subscriber.
///
/// `level` is an `EnvFilter` directive ("debug", "info",
/// "chatwire=trace,info", ...); an unparsable one falls back to "info".
/// Log files rotate daily under `log_dir` as `chatwire.log.*`; pass
/// `json_output` to write them as JSON lines instead of plain text.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> ChatResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, "chatwire.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = {
        let base = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);
        if json_output {
            base.json().with_thread_ids(true).boxed()
        } else {
            base.boxed()
        }
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).compact())
        .with(file_layer)
        .init();

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Console-only logger for tests and simple CLI paths. Repeat calls are
/// no-ops.
pub fn init_console_logging(level: &str) {
    let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).compact())
        .try_init();
}
