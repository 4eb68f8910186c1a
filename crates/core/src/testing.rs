//! Test doubles shared by unit tests.

use std::io;

use async_trait::async_trait;
use parking_lot::Mutex;
use rosc::OscMessage;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::transport::MessageSink;

#[derive(Default)]
struct SinkState {
    sent: Vec<(Instant, OscMessage)>,
    attempts: usize,
    fail_after: Option<usize>,
    disconnected: bool,
}

/// Records everything sent to it and can be told to fail.
#[derive(Default)]
pub struct RecordingSink {
    state: Mutex<SinkState>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let the next `n` sends through, fail every one after that.
    pub fn fail_after(&self, n: usize) {
        let mut state = self.state.lock();
        state.fail_after = Some(state.attempts + n);
    }

    /// Fail every send from now on with `SendFailed`.
    pub fn fail_all(&self) {
        self.fail_after(0);
    }

    /// Stop failing.
    pub fn recover(&self) {
        let mut state = self.state.lock();
        state.fail_after = None;
        state.disconnected = false;
    }

    /// Fail every send from now on with `NotConnected`.
    pub fn disconnect(&self) {
        self.state.lock().disconnected = true;
    }

    pub fn sent(&self) -> Vec<OscMessage> {
        self.state.lock().sent.iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn sent_with_times(&self) -> Vec<(Instant, OscMessage)> {
        self.state.lock().sent.clone()
    }

    pub fn addresses(&self) -> Vec<String> {
        self.state.lock().sent.iter().map(|(_, m)| m.addr.clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.state.lock().sent.len()
    }

    pub fn clear(&self) {
        self.state.lock().sent.clear();
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send(&self, message: OscMessage) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.disconnected {
            return Err(TransportError::NotConnected);
        }
        state.attempts += 1;
        if let Some(limit) = state.fail_after {
            if state.attempts > limit {
                return Err(TransportError::SendFailed(io::Error::new(
                    io::ErrorKind::Other,
                    "simulated send failure",
                )));
            }
        }
        state.sent.push((Instant::now(), message));
        Ok(())
    }
}
