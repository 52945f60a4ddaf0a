//! TCP connection to a chat or lobby relay

use crate::codec::JsonFrameCodec;
use crate::error::RelayError;
use crate::router::{FrameRouter, FrameWaiter};
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// One relay socket plus the task that reads it
///
/// The reader does not start until [`RelayConnection::listen`] so waiters
/// registered right after connecting cannot miss the first frame. Cancelling
/// the token the connection was opened with (or dropping the connection)
/// ends the reader and fails every pending waiter with
/// [`RelayError::Closed`].
pub struct RelayConnection {
    peer: String,
    writer: OwnedWriteHalf,
    frames: Option<FramedRead<OwnedReadHalf, JsonFrameCodec>>,
    reader: Option<JoinHandle<()>>,
    router: Arc<FrameRouter>,
    shutdown: CancellationToken,
}

impl RelayConnection {
    /// Open a connection; `teardown` is usually a session-wide token
    pub async fn connect(
        host: &str,
        port: u16,
        teardown: &CancellationToken,
    ) -> Result<Self, RelayError> {
        let peer = format!("{}:{}", host, port);
        let shutdown = teardown.child_token();

        let stream = tokio::select! {
            _ = shutdown.cancelled() => return Err(RelayError::Closed),
            stream = TcpStream::connect((host, port)) => stream.map_err(|e| RelayError::Connect {
                peer: peer.clone(),
                message: e.to_string(),
            })?,
        };
        let _ = stream.set_nodelay(true);
        debug!(peer = %peer, "Relay connected");

        let (read_half, writer) = stream.into_split();
        Ok(Self {
            peer,
            writer,
            frames: Some(FramedRead::new(read_half, JsonFrameCodec::new())),
            reader: None,
            router: FrameRouter::new(),
            shutdown,
        })
    }

    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Register a waiter for the next frame accepted by `predicate`
    pub fn expect<F>(&self, predicate: F) -> FrameWaiter
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.router.register(predicate)
    }

    /// Start routing inbound frames; calling it again has no effect
    pub fn listen(&mut self) {
        let Some(frames) = self.frames.take() else {
            return;
        };
        let router = self.router.clone();
        let shutdown = self.shutdown.clone();
        let peer = self.peer.clone();
        self.reader = Some(tokio::spawn(read_frames(frames, router, shutdown, peer)));
    }

    /// Write `frame` followed by a newline
    pub async fn send_line(&mut self, frame: &Value) -> Result<(), RelayError> {
        let mut bytes = frame.to_string().into_bytes();
        bytes.push(b'\n');
        self.write(&bytes).await
    }

    /// Write `frame` with no terminator
    pub async fn send_raw(&mut self, frame: &Value) -> Result<(), RelayError> {
        let bytes = frame.to_string().into_bytes();
        self.write(&bytes).await
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled() || self.router.is_closed()
    }

    /// Half-close the socket and stop the reader
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
        self.shutdown.cancel();
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), RelayError> {
        if self.shutdown.is_cancelled() {
            return Err(RelayError::Closed);
        }
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| RelayError::Io(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| RelayError::Io(e.to_string()))
    }
}

impl Drop for RelayConnection {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if self.reader.is_none() {
            self.router.close(RelayError::Closed);
        }
    }
}

async fn read_frames(
    mut frames: FramedRead<OwnedReadHalf, JsonFrameCodec>,
    router: Arc<FrameRouter>,
    shutdown: CancellationToken,
    peer: String,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                router.close(RelayError::Closed);
                break;
            }
            next = frames.next() => match next {
                Some(Ok(frame)) => {
                    router.dispatch(&frame);
                }
                Some(Err(e)) => {
                    warn!(peer = %peer, error = %e, "Relay read failed");
                    router.close(RelayError::Io(e.to_string()));
                    break;
                }
                None => {
                    debug!(peer = %peer, "Relay closed by peer");
                    router.close(RelayError::Closed);
                    break;
                }
            }
        }
    }
}
