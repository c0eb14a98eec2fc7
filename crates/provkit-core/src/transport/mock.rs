//! Mock serial link for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::traits::{Connector, Transport, TransportError};
use crate::protocol::Frame;
use crate::protocol::frame::encode_unchecked;

/// Computes the device's answer to one written request.
pub type Responder = Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>;

#[derive(Default)]
struct MockState {
    /// Replies released one per write, used when no responder is set.
    replies: VecDeque<Vec<u8>>,
    responder: Option<Responder>,
    /// Bytes the device has "sent" but the host has not read yet.
    pending: VecDeque<u8>,
    /// Largest slice handed out by one `read_available`; 0 means unlimited.
    chunk: usize,
    write_log: Vec<Vec<u8>>,
    failing_opens: u32,
    failing_writes: bool,
    open_count: u32,
}

/// Hands out `MockTransport`s that share one scripted device.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the session owns another.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every write through `responder` instead of the reply queue.
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static,
    {
        let connector = Self::new();
        connector.lock().responder = Some(Box::new(responder));
        connector
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue raw bytes to be released after the next write.
    pub fn queue_reply(&self, bytes: &[u8]) {
        self.lock().replies.push_back(bytes.to_vec());
    }

    pub fn queue_frame(&self, frame: &Frame) {
        self.lock()
            .replies
            .push_back(encode_unchecked(frame.command, frame.component_id, &frame.data));
    }

    /// Deliver pending bytes at most `chunk` at a time.
    pub fn split_replies(&self, chunk: usize) {
        self.lock().chunk = chunk;
    }

    /// Make the next `count` connects fail.
    pub fn fail_next_opens(&self, count: u32) {
        self.lock().failing_opens = count;
    }

    pub fn fail_writes(&self, failing: bool) {
        self.lock().failing_writes = failing;
    }

    pub fn open_count(&self) -> u32 {
        self.lock().open_count
    }

    /// All writes seen so far, across every opened transport.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.lock().write_log.clone()
    }

    pub fn clear_writes(&self) {
        self.lock().write_log.clear();
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(&mut self) -> Result<MockTransport, TransportError> {
        let mut state = self.lock();
        state.open_count += 1;
        if state.failing_opens > 0 {
            state.failing_opens -= 1;
            return Err(TransportError::OpenFailed {
                port: "mock".into(),
                message: "simulated open failure".into(),
            });
        }
        state.pending.clear();
        drop(state);

        Ok(MockTransport {
            state: Arc::clone(&self.state),
            open: true,
        })
    }

    fn endpoint(&self) -> String {
        "mock".into()
    }
}

/// Mock transport for unit testing cycle logic.
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
    open: bool,
}

impl MockTransport {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<usize, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.failing_writes {
            return Err(TransportError::WriteFailed("simulated write failure".into()));
        }
        state.write_log.push(data.to_vec());

        let reply = match state.responder.as_mut() {
            Some(responder) => responder(data),
            None => state.replies.pop_front(),
        };
        if let Some(reply) = reply {
            state.pending.extend(reply);
        }
        Ok(data.len())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let mut state = self.lock();
        let take = match state.chunk {
            0 => state.pending.len(),
            chunk => chunk.min(state.pending.len()),
        };
        Ok(state.pending.drain(..take).collect())
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.close();
    }
}
