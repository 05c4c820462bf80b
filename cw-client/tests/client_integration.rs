//! End-to-end client tests against a scripted in-process TCP server.
//!
//! Timing-sensitive tests run with the tokio clock paused so the retry and
//! heartbeat schedules execute instantly and deterministically; loopback
//! I/O still flows for real.

use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use cw_client::{ChatClient, ChatEvent, ClientConfig, ConnectionState, ReconnectConfig};
use cw_client::HeartbeatConfig;
use cw_core::error::ChatError;
use cw_proto::AesCipher;

/// Client config pointing at a local listener, with short timers so paused
/// clock tests converge fast.
fn local_config(port: u16) -> ClientConfig {
    ClientConfig {
        host: "127.0.0.1".into(),
        port,
        heartbeat: HeartbeatConfig {
            ping_interval: Duration::from_secs(1),
            pong_timeout: Duration::from_secs(5),
        },
        reconnect: ReconnectConfig {
            max_attempts: 5,
            retry_delay: Duration::from_secs(3),
        },
        passphrase: None,
    }
}

async fn bind_local() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn read_json_line(reader: &mut BufReader<TcpStream>) -> Value {
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    serde_json::from_str(line.trim_end()).unwrap()
}

async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, want: ConnectionState) {
    loop {
        if *rx.borrow_and_update() == want {
            return;
        }
        rx.changed().await.unwrap();
    }
}

#[tokio::test]
async fn test_login_is_first_line_of_session() {
    let (listener, port) = bind_local().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        read_json_line(&mut reader).await
    });

    let client = ChatClient::new(local_config(port));
    client.connect("alice").await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let login = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    assert_eq!(login["type"], "login");
    assert_eq!(login["sender"], "alice");
    assert_eq!(login["content"], "alice joined");

    client.disconnect().await;
}

#[tokio::test]
async fn test_outbound_lines_keep_submission_order() {
    let (listener, port) = bind_local().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        let first = read_json_line(&mut reader).await;
        let second = read_json_line(&mut reader).await;
        (first, second)
    });

    let client = ChatClient::new(local_config(port));
    client.connect("alice").await.unwrap();
    client.send_text("first", "bob").await.unwrap();
    client.send_text("second", "bob").await.unwrap();

    let (first, second) = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first["content"], "first");
    assert_eq!(second["content"], "second");
    assert_eq!(first["receiver"], "bob");

    client.disconnect().await;
}

#[tokio::test]
async fn test_message_content_is_encrypted_on_the_wire() {
    let (listener, port) = bind_local().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        read_json_line(&mut reader).await
    });

    let mut config = local_config(port);
    config.passphrase = Some("hunter2".into());
    let client = ChatClient::new(config);
    client.connect("alice").await.unwrap();
    client.send_text("attack at dawn", "bob").await.unwrap();

    let message = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    let wire_content = message["content"].as_str().unwrap();
    assert_ne!(wire_content, "attack at dawn");
    let decrypted = AesCipher::decrypt("hunter2", wire_content).unwrap();
    assert_eq!(decrypted, "attack at dawn");

    client.disconnect().await;
}

#[tokio::test]
async fn test_send_file_ships_encrypted_base64_payload() {
    let (listener, port) = bind_local().await;

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        read_json_line(&mut reader).await
    });

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    tokio::fs::write(&path, b"meeting at noon").await.unwrap();

    let mut config = local_config(port);
    config.passphrase = Some("hunter2".into());
    let client = ChatClient::new(config);
    client.connect("alice").await.unwrap();
    client.send_file(&path, "bob").await.unwrap();

    let packet = timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(packet["type"], "file");
    assert_eq!(packet["fileName"], "notes.txt");

    use base64::Engine;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(packet["content"].as_str().unwrap())
        .unwrap();
    assert_eq!(&raw[..8], b"Salted__");
    let decrypted = AesCipher::decrypt_bytes("hunter2", &raw).unwrap();
    assert_eq!(decrypted, b"meeting at noon");

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_retries_then_gives_up() {
    // Bind and immediately drop so the port refuses connections.
    let (listener, port) = bind_local().await;
    drop(listener);

    let client = ChatClient::new(local_config(port));
    let started = tokio::time::Instant::now();
    let result = client.connect("alice").await;

    match result {
        Err(ChatError::ConnectFailed { attempts, .. }) => assert_eq!(attempts, 5),
        other => panic!("expected ConnectFailed, got {other:?}"),
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // 5 attempts with a 3s delay after each.
    let elapsed = started.elapsed();
    assert!(
        elapsed >= Duration::from_secs(15) && elapsed <= Duration::from_secs(18),
        "retry cycle took {elapsed:?}"
    );

    // No cycle keeps running after the budget is spent.
    let send = client.send_text("hi", "bob").await;
    assert!(matches!(send, Err(ChatError::NotConnected)));
}

#[tokio::test(start_paused = true)]
async fn test_silent_peer_triggers_one_reconnect_cycle() {
    let (listener, port) = bind_local().await;

    // First session: read the login, never answer a ping. Second session:
    // read the fresh login, then keep the socket alive.
    let (logins_tx, mut logins_rx) = mpsc::channel::<Value>(4);
    tokio::spawn(async move {
        let mut sockets = Vec::new();
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = BufReader::new(socket);
            let login = read_json_line(&mut reader).await;
            if logins_tx.send(login).await.is_err() {
                return;
            }
            // Keep the connection open, consuming pings silently.
            sockets.push(tokio::spawn(async move {
                let mut line = String::new();
                while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
                    line.clear();
                }
            }));
        }
    });

    let client = ChatClient::new(local_config(port));
    let mut states = client.state_receiver();
    client.connect("alice").await.unwrap();

    let first = timeout(Duration::from_secs(60), logins_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first["sender"], "alice");

    // The pong window lapses, the client declares the peer dead and runs
    // the reconnect cycle, announcing itself again.
    let second = timeout(Duration::from_secs(60), logins_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second["type"], "login");
    assert_eq!(second["sender"], "alice");

    wait_for_state(&mut states, ConnectionState::Connected).await;
    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_pongs_keep_the_connection_alive() {
    let (listener, port) = bind_local().await;

    let (pings_tx, mut pings_rx) = mpsc::channel::<()>(16);
    let (accepts_tx, mut accepts_rx) = mpsc::channel::<()>(4);
    tokio::spawn(async move {
        loop {
            let (socket, _) = listener.accept().await.unwrap();
            let _ = accepts_tx.send(()).await;
            let pings_tx = pings_tx.clone();
            tokio::spawn(async move {
                let (read_half, mut write_half) = socket.into_split();
                let mut lines = BufReader::new(read_half).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    let value: Value = serde_json::from_str(&line).unwrap();
                    if value["type"] == "ping" {
                        let pong = json!({ "type": "pong", "sender": "server" });
                        let mut framed = pong.to_string();
                        framed.push('\n');
                        write_half.write_all(framed.as_bytes()).await.unwrap();
                        let _ = pings_tx.send(()).await;
                    }
                }
            });
        }
    });

    let client = ChatClient::new(local_config(port));
    client.connect("alice").await.unwrap();
    accepts_rx.recv().await.unwrap();

    // Ride out well past the pong timeout; each ping is answered, so the
    // connection must never be declared dead.
    for _ in 0..8 {
        timeout(Duration::from_secs(60), pings_rx.recv())
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(client.state(), ConnectionState::Connected);

    // Still the original session, no second accept happened.
    assert!(accepts_rx.try_recv().is_err());

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_halts_reconnect_cycle() {
    let (listener, port) = bind_local().await;

    // One silent session, then the port goes dark.
    let first_session = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        let mut line = String::new();
        while reader.read_line(&mut line).await.unwrap_or(0) > 0 {
            line.clear();
        }
    });

    let client = ChatClient::new(local_config(port));
    let mut states = client.state_receiver();
    client.connect("alice").await.unwrap();

    // Pong window lapses, the reconnect cycle starts retrying against the
    // dark port. Closing mid-cycle must stop it for good.
    wait_for_state(&mut states, ConnectionState::Reconnecting).await;
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Re-open the port; a lingering cycle would connect and log in again.
    let reopened = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let accepted = timeout(Duration::from_secs(60), reopened.accept()).await;
    assert!(
        accepted.is_err(),
        "a connection attempt arrived after disconnect"
    );
    assert_eq!(client.state(), ConnectionState::Disconnected);

    first_session.await.unwrap();
}

#[tokio::test]
async fn test_malformed_line_ends_the_session() {
    let (listener, port) = bind_local().await;

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        reader.get_mut().write_all(b"{not json\n").await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut config = local_config(port);
    config.heartbeat = HeartbeatConfig::default();
    let client = ChatClient::new(config);
    let mut states = client.state_receiver();
    client.connect("alice").await.unwrap();

    timeout(
        Duration::from_secs(5),
        wait_for_state(&mut states, ConnectionState::Disconnected),
    )
    .await
    .unwrap();

    client.disconnect().await;
}

#[tokio::test(start_paused = true)]
async fn test_connect_is_noop_while_session_open() {
    let (listener, port) = bind_local().await;

    let mut config = local_config(port);
    config.heartbeat = HeartbeatConfig::default();
    let client = ChatClient::new(config);
    client.connect("alice").await.unwrap();

    let (_socket, _) = timeout(Duration::from_secs(5), listener.accept())
        .await
        .unwrap()
        .unwrap();

    // Second call must not open a second session or announce again.
    client.connect("alice").await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let second = timeout(Duration::from_secs(5), listener.accept()).await;
    assert!(second.is_err(), "a second session was opened");

    client.disconnect().await;
}

#[tokio::test]
async fn test_peer_close_flips_state_to_disconnected() {
    let (listener, port) = bind_local().await;

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        // Dropping the socket ends the stream.
    });

    let mut config = local_config(port);
    // Long timers: only the end-of-stream path may flip the state here.
    config.heartbeat = HeartbeatConfig::default();
    let client = ChatClient::new(config);
    let mut states = client.state_receiver();
    client.connect("alice").await.unwrap();

    timeout(
        Duration::from_secs(5),
        wait_for_state(&mut states, ConnectionState::Disconnected),
    )
    .await
    .unwrap();

    client.disconnect().await;
}

#[tokio::test]
async fn test_blank_line_is_treated_as_close() {
    let (listener, port) = bind_local().await;

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        reader.get_mut().write_all(b"\n").await.unwrap();
        // Hold the socket open; the blank line alone must end the session.
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let mut config = local_config(port);
    config.heartbeat = HeartbeatConfig::default();
    let client = ChatClient::new(config);
    let mut states = client.state_receiver();
    client.connect("alice").await.unwrap();

    timeout(
        Duration::from_secs(5),
        wait_for_state(&mut states, ConnectionState::Disconnected),
    )
    .await
    .unwrap();

    client.disconnect().await;
}

#[tokio::test]
async fn test_userlist_becomes_presence_event_without_self() {
    let (listener, port) = bind_local().await;

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut reader = BufReader::new(socket);
        let _login = read_json_line(&mut reader).await;
        let userlist = json!({
            "type": "userlist",
            "sender": "server",
            "content": "alice,bob,carol",
        });
        let mut framed = userlist.to_string();
        framed.push('\n');
        reader.get_mut().write_all(framed.as_bytes()).await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });

    let client = ChatClient::new(local_config(port));
    let mut events = client.subscribe();
    client.connect("alice").await.unwrap();

    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    match event {
        ChatEvent::Presence { users } => assert_eq!(users, vec!["bob", "carol"]),
        other => panic!("expected presence event, got {other:?}"),
    }

    client.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let client = ChatClient::new(local_config(1));
    client.disconnect().await;
    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
