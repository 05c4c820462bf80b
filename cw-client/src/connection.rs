//! Raw TCP line transport.
//!
//! A [`Connection`] owns the write half of one TCP stream behind a mutex,
//! so concurrent outbound callers (application sends plus heartbeat pings)
//! can never interleave partial lines. The read half is handed out once as
//! a [`LineReader`]: the receive loop is the single reader, so the read
//! path needs no locking.

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::debug;

use cw_core::error::ChatResult;

/// Write side of one established chat connection.
pub struct Connection {
    writer: Mutex<BufWriter<OwnedWriteHalf>>,
    peer: String,
}

impl Connection {
    /// Open a TCP stream to `addr` and split it into a connection and its
    /// single line reader.
    pub async fn open(addr: &str) -> ChatResult<(Connection, LineReader)> {
        let stream = TcpStream::connect(addr).await?;
        debug!("tcp stream established to {addr}");

        let (read_half, write_half) = stream.into_split();
        let connection = Connection {
            writer: Mutex::new(BufWriter::new(write_half)),
            peer: addr.to_string(),
        };
        Ok((connection, LineReader::new(read_half)))
    }

    /// Write one already-framed line to the stream.
    ///
    /// Callers racing for the writer are serialized by the internal lock;
    /// lines sent by one caller reach the peer in completion order.
    pub async fn send_line(&self, line: &str) -> ChatResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Shut down the write half, signalling EOF to the peer. Idempotent;
    /// shutdown errors on an already-dead stream are ignored.
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            debug!("shutdown on {}: {e}", self.peer);
        }
    }

    /// The `host:port` this connection was opened against.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

/// Read side of one established chat connection; exactly one exists per
/// connection and it belongs to the receive loop.
pub struct LineReader {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl LineReader {
    fn new(read_half: OwnedReadHalf) -> Self {
        Self {
            lines: BufReader::new(read_half).lines(),
        }
    }

    /// Read the next newline-delimited line.
    ///
    /// `Ok(None)` is end-of-stream. The returned line has its terminator
    /// stripped; an empty/whitespace-only line is the peer's close signal
    /// and is interpreted by the receive loop.
    pub async fn next_line(&mut self) -> ChatResult<Option<String>> {
        Ok(self.lines.next_line().await?)
    }
}
