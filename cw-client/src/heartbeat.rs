//! Connection liveness monitoring with ping/pong heartbeats.
//!
//! While connected, a background task sends a `ping` packet on a fixed
//! interval and watches the timestamp of the most recent `pong` (which the
//! receive loop records). Missing the pong window means the connection is
//! dead: state leaves `Connected` exactly once and the bounded reconnect
//! cycle is started with the last known address and nickname.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use cw_proto::{Packet, PacketType};

use crate::client::{self, ClientInner};
use crate::events::ConnectionState;

/// Heartbeat timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatConfig {
    /// Interval between keep-alive pings.
    pub ping_interval: Duration,
    /// How long the client tolerates silence before declaring the
    /// connection dead.
    pub pong_timeout: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(cw_core::constants::PING_INTERVAL_SECS),
            pong_timeout: Duration::from_secs(cw_core::constants::PONG_TIMEOUT_SECS),
        }
    }
}

impl From<&cw_core::config::HeartbeatConfig> for HeartbeatConfig {
    fn from(config: &cw_core::config::HeartbeatConfig) -> Self {
        Self {
            ping_interval: Duration::from_secs(config.ping_interval_secs),
            pong_timeout: Duration::from_secs(config.pong_timeout_secs),
        }
    }
}

/// Heartbeat monitor task, one per successful connect.
///
/// Runs until it declares the connection dead (and hands off to the
/// reconnector) or is aborted by teardown.
pub(crate) async fn monitor(inner: Arc<ClientInner>) {
    let HeartbeatConfig {
        ping_interval,
        pong_timeout,
    } = inner.heartbeat;

    loop {
        sleep(ping_interval).await;

        // Ping only while connected; a send fault downgrades immediately
        // without waiting for the pong window.
        if inner.state().is_connected() {
            let nickname = inner.nickname.lock().await.clone();
            let ping = Packet::new(PacketType::Ping, nickname);
            if let Err(e) = client::send_on_connection(&inner, &ping).await {
                warn!("ping send failed: {e}");
                inner.set_state(ConnectionState::Disconnected);
            } else {
                debug!("ping sent");
            }
        }

        let silence = inner.last_pong.lock().await.elapsed();
        if silence > pong_timeout {
            warn!(
                "no pong for {:.0}s, declaring connection dead",
                silence.as_secs_f64()
            );
            client::begin_reconnect(inner.clone());
            break;
        }
    }
}
