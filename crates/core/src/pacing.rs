//! Paced message sequences.
//!
//! The console drops configuration writes that arrive back to back, so
//! multi-message updates go out as an ordered list of steps with a fixed gap
//! between consecutive steps.

use std::time::Duration;

use rosc::{OscMessage, OscType};

use crate::error::TransportError;
use crate::transport::{codec, MessageSink};

/// Gap between consecutive configuration writes.
pub const DEFAULT_PACING: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct PacedSequence {
    steps: Vec<OscMessage>,
    delay: Duration,
}

impl PacedSequence {
    pub fn new(delay: Duration) -> Self {
        Self {
            steps: Vec::new(),
            delay,
        }
    }

    /// Append a step.
    pub fn step(mut self, address: impl Into<String>, args: Vec<OscType>) -> Self {
        self.steps.push(codec::message(address, args));
        self
    }

    /// Append a step only when `address` is present.
    pub fn step_if(self, address: Option<String>, args: Vec<OscType>) -> Self {
        match address {
            Some(address) => self.step(address, args),
            None => self,
        }
    }

    pub fn steps(&self) -> &[OscMessage] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Send every step in order, sleeping `delay` between steps.
    ///
    /// Stops at the first failed send. Dropping the returned future cancels
    /// the remaining steps.
    pub async fn run(&self, sink: &dyn MessageSink) -> Result<(), TransportError> {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 && !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            sink.send(step.clone()).await.map_err(|e| {
                log::warn!(
                    "Paced sequence aborted at step {}/{} ({}): {}",
                    i + 1,
                    self.steps.len(),
                    step.addr,
                    e
                );
                e
            })?;
        }
        Ok(())
    }
}
