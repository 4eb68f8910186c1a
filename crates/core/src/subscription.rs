//! Console push subscription.
//!
//! The console only streams control-surface state to a port that asked for
//! it, and forgets the request after a few seconds. The manager sends the
//! subscribe message once when established and again on every renewal tick
//! until stopped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::error::{MixerError, TransportError};
use crate::transport::{codec, MessageSink};

/// How often the subscription is renewed.
pub const RENEWAL_INTERVAL: Duration = Duration::from_secs(8);

/// Subscribe address asking the console to stream everything to `local_port`.
pub fn subscribe_address(local_port: u16) -> String {
    format!("/%{}/*S~", local_port)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPhase {
    Idle,
    Establishing,
    Active,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct SubscriptionState {
    pub phase: SubscriptionPhase,
    pub last_sent: Option<Instant>,
    pub interval: Duration,
    pub renewals_sent: u64,
    pub failed_ticks: u64,
}

impl SubscriptionState {
    pub fn is_active(&self) -> bool {
        self.phase == SubscriptionPhase::Active
    }
}

pub struct SubscriptionManager {
    sink: Arc<dyn MessageSink>,
    local_port: u16,
    state: Arc<Mutex<SubscriptionState>>,
    renewal_task: Option<JoinHandle<()>>,
}

impl SubscriptionManager {
    pub fn new(sink: Arc<dyn MessageSink>, local_port: u16, interval: Duration) -> Self {
        Self {
            sink,
            local_port,
            state: Arc::new(Mutex::new(SubscriptionState {
                phase: SubscriptionPhase::Idle,
                last_sent: None,
                interval,
                renewals_sent: 0,
                failed_ticks: 0,
            })),
            renewal_task: None,
        }
    }

    pub fn state(&self) -> SubscriptionState {
        self.state.lock().clone()
    }

    /// Subscribe now and keep renewing until [`stop`](Self::stop).
    ///
    /// A failed first send is logged and left to the next tick, except when
    /// the transport is closed, which is reported to the caller.
    pub async fn establish(&mut self) -> Result<(), MixerError> {
        if self.renewal_task.is_some() {
            return Ok(());
        }

        self.state.lock().phase = SubscriptionPhase::Establishing;
        let address = subscribe_address(self.local_port);
        log::info!("Subscribing to console state on port {}", self.local_port);

        match send_subscribe(&*self.sink, &address, &self.state).await {
            Err(TransportError::NotConnected) => {
                self.state.lock().phase = SubscriptionPhase::Stopped;
                return Err(TransportError::NotConnected.into());
            }
            Err(e) => log::warn!("Initial subscribe failed, retrying on next renewal: {}", e),
            Ok(()) => {}
        }

        let interval = {
            let mut state = self.state.lock();
            state.phase = SubscriptionPhase::Active;
            state.interval
        };
        self.renewal_task = Some(tokio::spawn(renewal_loop(
            Arc::clone(&self.sink),
            address,
            Arc::clone(&self.state),
            interval,
        )));
        Ok(())
    }

    /// Cancel renewals. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(task) = self.renewal_task.take() {
            task.abort();
            log::info!("Console subscription on port {} stopped", self.local_port);
        }
        self.state.lock().phase = SubscriptionPhase::Stopped;
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        if let Some(task) = self.renewal_task.take() {
            task.abort();
        }
    }
}

async fn send_subscribe(
    sink: &dyn MessageSink,
    address: &str,
    state: &Mutex<SubscriptionState>,
) -> Result<(), TransportError> {
    match sink.send(codec::message(address, Vec::new())).await {
        Ok(()) => {
            let mut state = state.lock();
            state.last_sent = Some(Instant::now());
            state.renewals_sent += 1;
            Ok(())
        }
        Err(e) => {
            state.lock().failed_ticks += 1;
            Err(e)
        }
    }
}

async fn renewal_loop(
    sink: Arc<dyn MessageSink>,
    address: String,
    state: Arc<Mutex<SubscriptionState>>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match send_subscribe(&*sink, &address, &state).await {
            Ok(()) => {}
            Err(TransportError::NotConnected) => {
                log::warn!("Transport closed, console subscription torn down");
                state.lock().phase = SubscriptionPhase::Stopped;
                break;
            }
            Err(e) => log::warn!("Subscription renewal failed, retrying next tick: {}", e),
        }
    }
}
