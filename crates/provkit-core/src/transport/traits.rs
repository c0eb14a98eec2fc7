//! Transport layer abstraction.
//!
//! Defines the `Transport` trait for a byte-oriented duplex link and the
//! `Connector` that opens one per provisioning cycle, allowing different
//! implementations (serial port, mock, other debug probes).

use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::protocol::FRAME_HEAD;
use crate::protocol::frame::expected_frame_len;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {port}: {message}")]
    OpenFailed { port: String, message: String },

    #[error("Transport is not open")]
    NotOpen,

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("No reply after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Unsupported setting: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bounded polling used while waiting for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPolicy {
    pub polls: u32,
    pub interval: Duration,
}

impl ReadPolicy {
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.polls)
    }
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            polls: 20,
            interval: Duration::from_millis(100),
        }
    }
}

/// Byte-oriented duplex link to one device.
pub trait Transport: Send {
    /// Write exactly `data`.
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError>;

    /// Return whatever is buffered right now. Empty means "not yet", not EOF.
    fn read_available(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Release the link. Safe to call repeatedly.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Collect one reply frame.
    ///
    /// Polls `read_available` until the length announced by the frame
    /// header has arrived. Bytes that cannot start a frame are handed back
    /// as-is for the codec to reject. Fails with `Timeout` only when nothing
    /// arrived at all.
    fn read_reply(
        &mut self,
        policy: &ReadPolicy,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, TransportError> {
        let mut buf = Vec::new();
        for _ in 0..policy.polls.max(1) {
            buf.extend(self.read_available()?);

            if let Some(total) = expected_frame_len(&buf)
                && buf.len() >= total
            {
                if buf.len() > total {
                    debug!(extra = buf.len() - total, "Discarding bytes after frame");
                    buf.truncate(total);
                }
                return Ok(buf);
            }
            if buf.first().is_some_and(|&b| b != FRAME_HEAD) {
                return Ok(buf);
            }
            if cancel.is_cancelled() {
                break;
            }
            thread::sleep(policy.interval);
        }

        if buf.is_empty() {
            Err(TransportError::Timeout {
                timeout_ms: policy.budget().as_millis() as u64,
            })
        } else {
            Ok(buf)
        }
    }
}

/// Opens a fresh transport for each provisioning cycle.
pub trait Connector: Send {
    type Transport: Transport;

    fn connect(&mut self) -> Result<Self::Transport, TransportError>;

    /// Human-readable endpoint name for events and logs.
    fn endpoint(&self) -> String;
}
