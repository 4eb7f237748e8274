//! Line-delimited JSON transports
//!
//! Every message is one JSON value on its own line. The transport is split
//! into a sending and a receiving half so the connection can write
//! notifications while it waits for the next inbound message.

use std::io;
use std::process::Stdio;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::process::{Child, Command};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tracing::{debug, trace};

/// Upper bound for a single message line
pub const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024;

/// Buffer size of each direction of an in-memory transport
const MEMORY_BUFFER: usize = 64 * 1024;

#[async_trait]
pub trait TransportSender: Send {
    async fn send(&mut self, message: Value) -> io::Result<()>;
    async fn close(&mut self) -> io::Result<()>;
}

#[async_trait]
pub trait TransportReceiver: Send {
    /// `Ok(None)` once the peer has closed its end
    async fn receive(&mut self) -> io::Result<Option<Value>>;
}

/// Both halves of a transport
pub struct TransportParts {
    pub sender: Box<dyn TransportSender>,
    pub receiver: Box<dyn TransportReceiver>,
}

pub struct LineSender<W> {
    inner: FramedWrite<W, LinesCodec>,
}

impl<W: AsyncWrite + Unpin + Send> LineSender<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> TransportSender for LineSender<W> {
    async fn send(&mut self, message: Value) -> io::Result<()> {
        let line = serde_json::to_string(&message)?;
        trace!(%line, "Sending message");
        SinkExt::<String>::send(&mut self.inner, line)
            .await
            .map_err(codec_error)
    }

    async fn close(&mut self) -> io::Result<()> {
        SinkExt::<String>::close(&mut self.inner)
            .await
            .map_err(codec_error)
    }
}

pub struct LineReceiver<R> {
    inner: FramedRead<R, LinesCodec>,
}

impl<R: AsyncRead + Unpin + Send> LineReceiver<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH)),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> TransportReceiver for LineReceiver<R> {
    async fn receive(&mut self) -> io::Result<Option<Value>> {
        loop {
            match self.inner.next().await {
                None => return Ok(None),
                Some(Err(e)) => return Err(codec_error(e)),
                Some(Ok(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    trace!(%line, "Received message");
                    let value = serde_json::from_str(&line)?;
                    return Ok(Some(value));
                }
            }
        }
    }
}

fn codec_error(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

/// Transport over any reader/writer pair
pub fn line_transport<R, W>(reader: R, writer: W) -> TransportParts
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    TransportParts {
        sender: Box::new(LineSender::new(writer)),
        receiver: Box::new(LineReceiver::new(reader)),
    }
}

/// Stdio transport for a spawned requester process
pub struct StdioTransport;

impl StdioTransport {
    /// Spawn `command` and speak JSON-RPC over its stdin/stdout.
    ///
    /// The child's stderr is inherited so its own diagnostics stay visible.
    pub fn spawn(command: &str, args: &[String]) -> io::Result<(TransportParts, Child)> {
        let mut child = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("Failed to capture stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("Failed to capture stdout"))?;

        debug!(command, ?args, pid = ?child.id(), "Spawned requester process");
        Ok((line_transport(stdout, stdin), child))
    }
}

/// Two connected in-memory transports
pub fn memory_pair() -> (TransportParts, TransportParts) {
    let (left, right) = tokio::io::duplex(MEMORY_BUFFER);
    let (left_read, left_write) = tokio::io::split(left);
    let (right_read, right_write) = tokio::io::split(right);
    (
        line_transport(left_read, left_write),
        line_transport(right_read, right_write),
    )
}
