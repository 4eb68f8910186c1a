//! Button configuration sequences.
//!
//! Every configuration call is turned into a paced sequence and handed to a
//! single worker task, so sequences never interleave on the wire. The queue in
//! front of the worker is bounded; a full queue rejects new work with `Busy`.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rosc::OscType;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::appearance::{truncate_label, ButtonAppearance, ButtonColor, LED_OFF, LED_ON};
use crate::error::{MixerError, Result};
use crate::mapping::{to_physical, HardwareVariant, LogicalButtonId, PhysicalAddress};
use crate::pacing::{PacedSequence, DEFAULT_PACING};
use crate::pool::CcPool;
use crate::transport::MessageSink;

/// Mode token that turns a button into a MIDI CC push trigger.
pub const MODE_MIDI_CC_PUSH: &str = "MIDICCP";
/// Mode token for an unassigned button.
pub const MODE_OFF: &str = "OFF";

/// Pending requests allowed in front of the worker.
pub const DEFAULT_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy)]
pub struct ConfiguratorOptions {
    pub pacing: Duration,
    pub queue_depth: usize,
}

impl Default for ConfiguratorOptions {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

enum ConfigRequest {
    Trigger {
        id: LogicalButtonId,
        address: PhysicalAddress,
        label: String,
        color: ButtonColor,
        prior_cc: Option<u8>,
        reply: oneshot::Sender<Result<u8>>,
    },
    Clear {
        id: LogicalButtonId,
        address: PhysicalAddress,
        bound_cc: Option<u8>,
        reply: oneshot::Sender<Result<()>>,
    },
    Appearance {
        address: PhysicalAddress,
        appearance: ButtonAppearance,
        reply: oneshot::Sender<Result<()>>,
    },
    Led {
        address: PhysicalAddress,
        on: bool,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Trigger sequence: mode, CC binding, label, colour.
pub fn trigger_sequence(
    address: &PhysicalAddress,
    cc: u8,
    label: &str,
    color: ButtonColor,
    pacing: Duration,
) -> PacedSequence {
    PacedSequence::new(pacing)
        .step(
            address.mode_path(),
            vec![OscType::String(MODE_MIDI_CC_PUSH.to_string())],
        )
        .step(address.cc_path(), vec![OscType::Int(i32::from(cc))])
        .step(
            address.name_path(),
            vec![OscType::String(truncate_label(
                label,
                address.variant.label_limit(),
            ))],
        )
        .step(address.color_path(), vec![OscType::Int(color.wire_index())])
}

/// Clear sequence: mode off, blank label, default colour, LED off where present.
pub fn clear_sequence(address: &PhysicalAddress, pacing: Duration) -> PacedSequence {
    PacedSequence::new(pacing)
        .step(
            address.mode_path(),
            vec![OscType::String(MODE_OFF.to_string())],
        )
        .step(address.name_path(), vec![OscType::String(String::new())])
        .step(
            address.color_path(),
            vec![OscType::Int(ButtonColor::default().wire_index())],
        )
        .step_if(address.led_path(), vec![OscType::Int(LED_OFF)])
}

/// Appearance sequence: label, colour and LED where the button has one.
pub fn appearance_sequence(
    address: &PhysicalAddress,
    appearance: &ButtonAppearance,
    pacing: Duration,
) -> PacedSequence {
    PacedSequence::new(pacing)
        .step(
            address.name_path(),
            vec![OscType::String(truncate_label(
                &appearance.label,
                address.variant.label_limit(),
            ))],
        )
        .step(
            address.color_path(),
            vec![OscType::Int(appearance.color.wire_index())],
        )
        .step_if(
            address.led_path(),
            vec![OscType::Int(appearance.led_value())],
        )
}

struct Worker {
    sink: Arc<dyn MessageSink>,
    pool: Arc<Mutex<CcPool>>,
    pacing: Duration,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<ConfigRequest>) {
        while let Some(request) = rx.recv().await {
            match request {
                ConfigRequest::Trigger {
                    id,
                    address,
                    label,
                    color,
                    prior_cc,
                    reply,
                } => {
                    let result = self
                        .configure_trigger(id, &address, &label, color, prior_cc)
                        .await;
                    let _ = reply.send(result);
                }
                ConfigRequest::Clear {
                    id,
                    address,
                    bound_cc,
                    reply,
                } => {
                    let result = self.clear(id, &address, bound_cc).await;
                    let _ = reply.send(result);
                }
                ConfigRequest::Appearance {
                    address,
                    appearance,
                    reply,
                } => {
                    let result = appearance_sequence(&address, &appearance, self.pacing)
                        .run(&*self.sink)
                        .await
                        .map_err(MixerError::from);
                    let _ = reply.send(result);
                }
                ConfigRequest::Led { address, on, reply } => {
                    let value = if on { LED_ON } else { LED_OFF };
                    let result = PacedSequence::new(self.pacing)
                        .step_if(address.led_path(), vec![OscType::Int(value)])
                        .run(&*self.sink)
                        .await
                        .map_err(MixerError::from);
                    let _ = reply.send(result);
                }
            }
        }
    }

    /// Pick the CC for a trigger. The flag says whether this call claimed it.
    ///
    /// A CC the pool already records for `id` wins over `prior_cc`, so a
    /// button never holds two CCs even when an earlier caller gave up before
    /// learning its CC.
    fn reserve_cc(&self, id: LogicalButtonId, prior_cc: Option<u8>) -> Result<(u8, bool)> {
        let mut pool = self.pool.lock();
        if let Some(cc) = pool.cc_owned_by(id) {
            if prior_cc.is_some_and(|prior| prior != cc) {
                log::warn!("Button {} already owns CC {}, keeping it", id, cc);
            }
            return Ok((cc, false));
        }
        if let Some(cc) = prior_cc {
            match pool.owner_of(cc) {
                Some(owner) if owner == id => return Ok((cc, false)),
                None if pool.claim(cc, id) => return Ok((cc, true)),
                _ => log::warn!("CC {} is not available to {}, allocating a new one", cc, id),
            }
        }
        Ok((pool.allocate(id)?, true))
    }

    async fn configure_trigger(
        &self,
        id: LogicalButtonId,
        address: &PhysicalAddress,
        label: &str,
        color: ButtonColor,
        prior_cc: Option<u8>,
    ) -> Result<u8> {
        let (cc, claimed) = self.reserve_cc(id, prior_cc)?;

        let sequence = trigger_sequence(address, cc, label, color, self.pacing);
        if let Err(e) = sequence.run(&*self.sink).await {
            if claimed {
                self.pool.lock().release(cc);
            }
            return Err(e.into());
        }

        log::info!("Button {} configured as trigger on CC {}", id, cc);
        Ok(cc)
    }

    async fn clear(
        &self,
        id: LogicalButtonId,
        address: &PhysicalAddress,
        bound_cc: Option<u8>,
    ) -> Result<()> {
        clear_sequence(address, self.pacing)
            .run(&*self.sink)
            .await?;
        let mut pool = self.pool.lock();
        if let Some(cc) = bound_cc {
            pool.release(cc);
        }
        pool.release_owner(id);
        log::info!("Button {} cleared", address.base_path());
        Ok(())
    }
}

/// Front end to the configuration worker of one console link.
pub struct ButtonConfigurator {
    variant: HardwareVariant,
    requests: mpsc::Sender<ConfigRequest>,
    worker: JoinHandle<()>,
}

impl ButtonConfigurator {
    pub fn spawn(
        variant: HardwareVariant,
        sink: Arc<dyn MessageSink>,
        pool: Arc<Mutex<CcPool>>,
        options: ConfiguratorOptions,
    ) -> Self {
        let (requests, rx) = mpsc::channel(options.queue_depth.max(1));
        let worker = Worker {
            sink,
            pool,
            pacing: options.pacing,
        };
        Self {
            variant,
            requests,
            worker: tokio::spawn(worker.run(rx)),
        }
    }

    fn submit(&self, request: ConfigRequest) -> Result<()> {
        self.requests.try_send(request).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => MixerError::Busy,
            mpsc::error::TrySendError::Closed(_) => MixerError::NotRunning,
        })
    }

    /// Turn a button into a MIDI CC trigger and return its CC number.
    ///
    /// With `prior_cc` the button keeps the CC it already had instead of
    /// taking a new slot. A CC claimed by this call is released again if the
    /// sequence fails.
    pub async fn configure_as_trigger(
        &self,
        id: LogicalButtonId,
        label: &str,
        color: ButtonColor,
        prior_cc: Option<u8>,
    ) -> Result<u8> {
        let address = to_physical(self.variant, id)?;
        let (reply, rx) = oneshot::channel();
        self.submit(ConfigRequest::Trigger {
            id,
            address,
            label: label.to_string(),
            color,
            prior_cc,
            reply,
        })?;
        rx.await.map_err(|_| MixerError::Cancelled)?
    }

    /// Reset a button to unassigned and give its CC back to the pool.
    ///
    /// Releases `bound_cc` and anything else the pool records for the button,
    /// once the console accepted the whole sequence.
    pub async fn clear(&self, id: LogicalButtonId, bound_cc: Option<u8>) -> Result<()> {
        let address = to_physical(self.variant, id)?;
        let (reply, rx) = oneshot::channel();
        self.submit(ConfigRequest::Clear {
            id,
            address,
            bound_cc,
            reply,
        })?;
        rx.await.map_err(|_| MixerError::Cancelled)?
    }

    /// Re-skin a button without touching its mode or CC.
    pub async fn apply_appearance(
        &self,
        id: LogicalButtonId,
        appearance: &ButtonAppearance,
    ) -> Result<()> {
        let address = to_physical(self.variant, id)?;
        if address.led_path().is_none() && appearance.led_on {
            log::debug!("Button {} has no LED, ignoring LED state", id);
        }
        let (reply, rx) = oneshot::channel();
        self.submit(ConfigRequest::Appearance {
            address,
            appearance: appearance.clone(),
            reply,
        })?;
        rx.await.map_err(|_| MixerError::Cancelled)?
    }

    /// Switch a button's LED. Buttons without an LED are left untouched.
    pub async fn set_led(&self, id: LogicalButtonId, on: bool) -> Result<()> {
        let address = to_physical(self.variant, id)?;
        if address.led_path().is_none() {
            return Ok(());
        }
        let (reply, rx) = oneshot::channel();
        self.submit(ConfigRequest::Led { address, on, reply })?;
        rx.await.map_err(|_| MixerError::Cancelled)?
    }

    /// Abort the worker, cancelling any sequence in flight.
    pub fn shutdown(&self) {
        self.worker.abort();
    }
}

impl Drop for ButtonConfigurator {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
