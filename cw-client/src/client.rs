//! The chat client: connection lifecycle, bounded reconnection, the
//! receive loop, and the outbound API.
//!
//! One `ChatClient` owns at most one live connection. Two background tasks
//! run against it: the receive loop (sole reader of the stream) and the
//! heartbeat monitor. Outbound calls are made ad hoc by the consuming
//! application and serialize on the connection's writer lock. Connection
//! state is published through a watch channel so consumers observe every
//! transition, including the persistent-disconnect that follows an
//! exhausted retry budget.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

use cw_core::config::AppConfig;
use cw_core::error::{ChatError, ChatResult};
use cw_proto::{AesCipher, Codec, Packet, PacketType};

use crate::connection::{Connection, LineReader};
use crate::dispatcher::PacketRouter;
use crate::events::{ChatEvent, ConnectionState, EventDispatcher};
use crate::heartbeat::{self, HeartbeatConfig};

/// Bounded reconnection policy.
///
/// Deliberately not exponential: the protocol expects a small fixed budget
/// of attempts with a fixed delay, after which the client stays down until
/// the next explicit connect or heartbeat-triggered cycle.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectConfig {
    /// Maximum connection attempts per cycle.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay: Duration,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_attempts: cw_core::constants::MAX_CONNECT_ATTEMPTS,
            retry_delay: Duration::from_secs(cw_core::constants::RETRY_DELAY_SECS),
        }
    }
}

impl From<&cw_core::config::ReconnectConfig> for ReconnectConfig {
    fn from(config: &cw_core::config::ReconnectConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// Connection parameters for a [`ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server hostname or IP address.
    pub host: String,
    /// Server TCP port.
    pub port: u16,
    /// Heartbeat timing.
    pub heartbeat: HeartbeatConfig,
    /// Reconnection policy.
    pub reconnect: ReconnectConfig,
    /// Passphrase for message/file encryption; `None` sends plaintext.
    pub passphrase: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: cw_core::constants::DEFAULT_HOST.to_string(),
            port: cw_core::constants::DEFAULT_PORT,
            heartbeat: HeartbeatConfig::default(),
            reconnect: ReconnectConfig::default(),
            passphrase: None,
        }
    }
}

impl ClientConfig {
    /// Build client parameters from the application configuration.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            host: config.server.host.clone(),
            port: config.server.port,
            heartbeat: HeartbeatConfig::from(&config.heartbeat),
            reconnect: ReconnectConfig::from(&config.reconnect),
            passphrase: config.encryption.passphrase.clone(),
        }
    }

    /// The `host:port` form used for connecting.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Reference identifying one message for deletion.
#[derive(Debug, Clone)]
pub struct MessageRef {
    /// The conversation partner the message was sent to.
    pub receiver: String,
    /// Timestamp of the message.
    pub timestamp: DateTime<Utc>,
    /// Server-assigned id (0 for unacknowledged messages).
    pub id: i64,
}

/// Shared state behind one chat client, accessed by the receive loop, the
/// heartbeat monitor, and outbound callers.
pub(crate) struct ClientInner {
    pub(crate) codec: Codec,
    pub(crate) server_addr: String,
    pub(crate) passphrase: Option<String>,
    pub(crate) heartbeat: HeartbeatConfig,
    pub(crate) reconnect: ReconnectConfig,
    pub(crate) nickname: Mutex<String>,
    pub(crate) events: EventDispatcher,
    pub(crate) state_tx: watch::Sender<ConnectionState>,
    pub(crate) connection: Mutex<Option<Arc<Connection>>>,
    /// When the last pong was observed; written by the receive loop, read
    /// by the heartbeat monitor.
    pub(crate) last_pong: Mutex<Instant>,
    pub(crate) recv_task: Mutex<Option<JoinHandle<()>>>,
    pub(crate) ping_task: Mutex<Option<JoinHandle<()>>>,
    /// The running reconnect cycle, when one exists. Held in a sync mutex
    /// so `begin_reconnect` can store it without awaiting; never locked
    /// across an await point.
    pub(crate) reconnect_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ClientInner {
    /// Current connection state.
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Transition the connection state, deduplicating repeats.
    ///
    /// Returns true when the state actually changed, so callers can act
    /// exactly once per transition.
    pub(crate) fn set_state(&self, new_state: ConnectionState) -> bool {
        self.state_tx.send_if_modified(|state| {
            if *state != new_state {
                info!("connection state: {state} -> {new_state}");
                *state = new_state;
                true
            } else {
                false
            }
        })
    }
}

/// Persistent, stateful client for the line-delimited JSON chat protocol.
///
/// Cheap to clone via internal Arc sharing is deliberately not offered;
/// consumers share the client behind their own Arc and subscribe to
/// [`ChatEvent`]s for everything inbound.
pub struct ChatClient {
    inner: Arc<ClientInner>,
}

impl ChatClient {
    /// Create a disconnected client with the given parameters.
    pub fn new(config: ClientConfig) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let inner = ClientInner {
            codec: Codec::new(config.passphrase.clone()),
            server_addr: config.address(),
            passphrase: config.passphrase,
            heartbeat: config.heartbeat,
            reconnect: config.reconnect,
            nickname: Mutex::new(String::new()),
            events: EventDispatcher::default(),
            state_tx,
            connection: Mutex::new(None),
            last_pong: Mutex::new(Instant::now()),
            recv_task: Mutex::new(None),
            ping_task: Mutex::new(None),
            reconnect_task: std::sync::Mutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The event dispatcher (for subscribing to inbound events).
    pub fn events(&self) -> &EventDispatcher {
        &self.inner.events
    }

    /// Subscribe to inbound chat events.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    /// Subscribe to connection state changes.
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state_tx.subscribe()
    }

    /// The `host:port` this client targets.
    pub fn server_addr(&self) -> &str {
        &self.inner.server_addr
    }

    /// The nickname of the current session (empty before the first connect).
    pub async fn nickname(&self) -> String {
        self.inner.nickname.lock().await.clone()
    }

    /// Connect and announce the session under `nickname`.
    ///
    /// Runs the bounded retry cycle; on success the login packet has been
    /// sent and the receive loop and heartbeat monitor are running. On
    /// exhaustion the client is left `Disconnected` and no further attempt
    /// is scheduled.
    ///
    /// A call while a session is already open, or while a connect/reconnect
    /// cycle is in flight, changes nothing and returns `Ok` immediately;
    /// it is not a claim that the cycle will succeed. Observe the outcome
    /// through [`ChatClient::state_receiver`].
    pub async fn connect(&self, nickname: &str) -> ChatResult<()> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(ChatError::MissingConfig("nickname".into()));
        }

        let current = self.inner.state();
        if current != ConnectionState::Disconnected {
            debug!("connect skipped: state is {current}");
            return Ok(());
        }

        *self.inner.nickname.lock().await = nickname.to_string();
        self.inner.set_state(ConnectionState::Connecting);
        safe_connect(self.inner.clone()).await
    }

    /// Tear down the connection and stop background tasks, including a
    /// reconnect cycle that is still retrying. Idempotent.
    pub async fn disconnect(&self) {
        if let Ok(mut slot) = self.inner.reconnect_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
        teardown(&self.inner).await;
        self.inner.set_state(ConnectionState::Disconnected);
        info!("disconnected");
    }

    /// Send a chat text message to `receiver`.
    pub async fn send_text(&self, text: &str, receiver: &str) -> ChatResult<()> {
        let nickname = self.inner.nickname.lock().await.clone();
        let packet = Packet::new(PacketType::Message, nickname)
            .with_receiver(receiver)
            .with_content(text);
        self.send_packet(packet).await
    }

    /// Read a file from disk, encrypt it, and send it to `receiver`.
    pub async fn send_file(&self, path: &Path, receiver: &str) -> ChatResult<()> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ChatError::Internal(format!("no filename in {}", path.display())))?
            .to_string();

        let bytes = tokio::fs::read(path).await?;
        let payload = match &self.inner.passphrase {
            Some(passphrase) => AesCipher::encrypt_bytes(passphrase, &bytes)?,
            None => bytes,
        };
        let content = base64::engine::general_purpose::STANDARD.encode(payload);

        let nickname = self.inner.nickname.lock().await.clone();
        let packet = Packet::new(PacketType::File, nickname)
            .with_receiver(receiver)
            .with_file_name(file_name)
            .with_content(content);
        self.send_packet(packet).await
    }

    /// Ask the server to send back a stored file.
    pub async fn request_download(&self, server_path: &str, file_name: &str) -> ChatResult<()> {
        let nickname = self.inner.nickname.lock().await.clone();
        let packet = Packet::new(PacketType::Download, nickname)
            .with_content(server_path)
            .with_file_name(file_name);
        self.send_packet(packet).await
    }

    /// Request the message history between `from` and `to`.
    pub async fn request_history(&self, from: &str, to: &str) -> ChatResult<()> {
        let packet = Packet::new(PacketType::GetHistory, from).with_receiver(to);
        self.send_packet(packet).await
    }

    /// Mark all messages exchanged with `with_user` as read.
    pub async fn mark_read(&self, with_user: &str) -> ChatResult<()> {
        let nickname = self.inner.nickname.lock().await.clone();
        let packet = Packet::new(PacketType::MarkRead, nickname).with_receiver(with_user);
        self.send_packet(packet).await
    }

    /// Tell `receiver` whether we are typing.
    pub async fn set_typing(&self, receiver: &str, typing: bool) -> ChatResult<()> {
        let nickname = self.inner.nickname.lock().await.clone();
        let packet = Packet::new(PacketType::Typing, nickname)
            .with_receiver(receiver)
            .with_content(if typing { "start" } else { "stop" });
        self.send_packet(packet).await
    }

    /// Request deletion of one message.
    pub async fn delete_message(&self, reference: &MessageRef) -> ChatResult<()> {
        let nickname = self.inner.nickname.lock().await.clone();
        let mut packet =
            Packet::new(PacketType::Delete, nickname).with_receiver(&reference.receiver);
        packet.timestamp = reference.timestamp;
        packet.id = reference.id;
        self.send_packet(packet).await
    }

    /// Encode and send an arbitrary packet.
    ///
    /// Returns [`ChatError::NotConnected`] when there is no live
    /// connection; this contract is uniform across the outbound API.
    pub async fn send_packet(&self, packet: Packet) -> ChatResult<()> {
        if !self.inner.state().is_connected() {
            return Err(ChatError::NotConnected);
        }
        send_on_connection(&self.inner, &packet).await
    }
}

/// Trigger the reconnect cycle exactly once.
///
/// Deduplicates against a cycle that is already running (the state
/// transition to `Reconnecting` acts as the latch).
pub(crate) fn begin_reconnect(inner: Arc<ClientInner>) {
    if !inner.set_state(ConnectionState::Reconnecting) {
        debug!("already reconnecting, skipping trigger");
        return;
    }
    let task = tokio::spawn({
        let inner = inner.clone();
        async move {
            if let Err(e) = safe_connect(inner).await {
                error!("reconnect failed: {e}");
            }
        }
    });
    // Keep the handle so an explicit disconnect can abort the cycle.
    if let Ok(mut slot) = inner.reconnect_task.lock() {
        *slot = Some(task);
    }
}

/// Tear down any prior connection, then attempt to connect with the
/// bounded retry policy.
///
/// Exactly one login announcement is made per successful connect (inside
/// `try_connect`). Exhausting the budget leaves the client `Disconnected`
/// with no further attempt scheduled; only the heartbeat timeout path or
/// an explicit connect call re-enters this routine.
pub(crate) async fn safe_connect(inner: Arc<ClientInner>) -> ChatResult<()> {
    teardown(&inner).await;

    let max_attempts = inner.reconnect.max_attempts.max(1);
    for attempt in 1..=max_attempts {
        // An explicit disconnect cancels the cycle between attempts.
        if inner.state() == ConnectionState::Disconnected {
            debug!("connect cycle cancelled");
            return Err(ChatError::NotConnected);
        }
        match try_connect(&inner).await {
            Ok(()) => {
                info!(
                    "connected to {} (attempt {attempt}/{max_attempts})",
                    inner.server_addr
                );
                return Ok(());
            }
            Err(e) => {
                warn!("connect attempt {attempt}/{max_attempts} failed: {e}");
                sleep(inner.reconnect.retry_delay).await;
            }
        }
    }

    inner.set_state(ConnectionState::Disconnected);
    error!(
        "could not connect to {}; waiting for a manual reconnect",
        inner.server_addr
    );
    Err(ChatError::ConnectFailed {
        addr: inner.server_addr.clone(),
        attempts: max_attempts,
    })
}

/// One connection attempt: open the stream, announce the session, start
/// the background tasks.
async fn try_connect(inner: &Arc<ClientInner>) -> ChatResult<()> {
    let (connection, reader) = Connection::open(&inner.server_addr).await?;
    let connection = Arc::new(connection);

    // The login packet is the very first outbound line of the session.
    let nickname = inner.nickname.lock().await.clone();
    let login = Packet::new(PacketType::Login, nickname.clone())
        .with_content(format!("{nickname} joined"));
    connection.send_line(&inner.codec.encode(&login)?).await?;

    *inner.connection.lock().await = Some(connection);
    *inner.last_pong.lock().await = Instant::now();
    inner.set_state(ConnectionState::Connected);

    let recv = tokio::spawn(receive_loop(inner.clone(), reader));
    *inner.recv_task.lock().await = Some(recv);
    let ping = tokio::spawn(heartbeat::monitor(inner.clone()));
    *inner.ping_task.lock().await = Some(ping);

    Ok(())
}

/// Best-effort teardown of the current connection and its tasks.
/// Errors are swallowed; aborting the tasks unblocks any in-flight I/O.
async fn teardown(inner: &ClientInner) {
    if let Some(handle) = inner.recv_task.lock().await.take() {
        handle.abort();
    }
    if let Some(handle) = inner.ping_task.lock().await.take() {
        handle.abort();
    }
    if let Some(connection) = inner.connection.lock().await.take() {
        connection.shutdown().await;
    }
}

/// Encode a packet and write it to the live connection.
///
/// A write fault downgrades the connection state before surfacing the
/// error; the heartbeat/reconnect pair takes it from there.
pub(crate) async fn send_on_connection(
    inner: &ClientInner,
    packet: &Packet,
) -> ChatResult<()> {
    let connection = inner
        .connection
        .lock()
        .await
        .clone()
        .ok_or(ChatError::NotConnected)?;

    let line = inner.codec.encode(packet)?;
    if let Err(e) = connection.send_line(&line).await {
        warn!("send failed: {e}");
        inner.set_state(ConnectionState::Disconnected);
        return Err(e);
    }
    Ok(())
}

/// The receive loop: sole reader of the stream for the lifetime of one
/// connection instance.
///
/// Pulls framed lines, decodes them, and forwards packets to the router in
/// wire order. Pong packets are transport-internal: they refresh the
/// heartbeat and re-confirm `Connected` without reaching the router.
/// Terminates on end-of-stream, an empty line, or a read/decode error, and
/// then flips state to `Disconnected` as a safety net for peers that close
/// gracefully before the heartbeat notices.
async fn receive_loop(inner: Arc<ClientInner>, mut reader: LineReader) {
    let nickname = inner.nickname.lock().await.clone();
    let router = PacketRouter::new(nickname, inner.events.clone());

    loop {
        match reader.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    debug!("peer signalled close with a blank line");
                    break;
                }
                match inner.codec.decode(&line) {
                    Ok(packet) => {
                        if packet.packet_type == PacketType::Pong {
                            *inner.last_pong.lock().await = Instant::now();
                            inner.set_state(ConnectionState::Connected);
                            continue;
                        }
                        router.route(packet);
                    }
                    Err(e) => {
                        warn!("stream corrupted, terminating receive loop: {e}");
                        break;
                    }
                }
            }
            Ok(None) => {
                debug!("end of stream");
                break;
            }
            Err(e) => {
                warn!("read error, terminating receive loop: {e}");
                break;
            }
        }
    }

    inner.set_state(ConnectionState::Disconnected);
    debug!("receive loop terminated");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_client_is_disconnected() {
        let client = ChatClient::new(ClientConfig::default());
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.server_addr(), "127.0.0.1:9000");
    }

    #[tokio::test]
    async fn test_sends_while_disconnected_report_not_connected() {
        let client = ChatClient::new(ClientConfig::default());

        let text = client.send_text("hi", "bob").await;
        assert!(matches!(text, Err(ChatError::NotConnected)));

        let typing = client.set_typing("bob", true).await;
        assert!(matches!(typing, Err(ChatError::NotConnected)));

        let history = client.request_history("me", "bob").await;
        assert!(matches!(history, Err(ChatError::NotConnected)));

        let read = client.mark_read("bob").await;
        assert!(matches!(read, Err(ChatError::NotConnected)));

        let delete = client
            .delete_message(&MessageRef {
                receiver: "bob".into(),
                timestamp: Utc::now(),
                id: 3,
            })
            .await;
        assert!(matches!(delete, Err(ChatError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_nickname() {
        let client = ChatClient::new(ClientConfig::default());
        let result = client.connect("   ").await;
        assert!(matches!(result, Err(ChatError::MissingConfig(_))));
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_client_config_from_app_config() {
        let mut app = AppConfig::default();
        app.server.host = "10.1.1.1".into();
        app.server.port = 9999;
        app.reconnect.max_attempts = 2;
        app.encryption.passphrase = Some("k".into());

        let config = ClientConfig::from_app_config(&app);
        assert_eq!(config.address(), "10.1.1.1:9999");
        assert_eq!(config.reconnect.max_attempts, 2);
        assert_eq!(config.passphrase.as_deref(), Some("k"));
    }
}
