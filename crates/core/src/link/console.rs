use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{ButtonBinding, CueBindRequest, LinkState, LinkTiming, MixerLink};
use crate::appearance::{ButtonAppearance, ButtonColor};
use crate::config::LinkConfig;
use crate::configurator::{ButtonConfigurator, ConfiguratorOptions};
use crate::error::{MixerError, Result};
use crate::mapping::{HardwareVariant, LogicalButtonId};
use crate::pool::CcPool;
use crate::router::{PressCallbackSlot, PressRouter};
use crate::subscription::SubscriptionManager;
use crate::transport::{MessageSink, OscTransport};

/// Link to a console over OSC/UDP.
///
/// Variant differences (addressing, press detection, label limits, LED
/// support) come from the configured [`HardwareVariant`].
pub struct ConsoleLink {
    config: LinkConfig,
    timing: LinkTiming,
    press_callback: PressCallbackSlot,
    transport: Arc<OscTransport>,
    pool: Arc<Mutex<CcPool>>,
    configurator: Option<ButtonConfigurator>,
    subscription: Option<SubscriptionManager>,
    bindings: HashMap<LogicalButtonId, ButtonBinding>,
    presses: Arc<AtomicU64>,
    state: LinkState,
}

impl ConsoleLink {
    pub fn new(config: LinkConfig, press_callback: PressCallbackSlot, timing: LinkTiming) -> Self {
        Self {
            transport: Arc::new(OscTransport::new(config.target)),
            config,
            timing,
            press_callback,
            pool: Arc::new(Mutex::new(CcPool::new())),
            configurator: None,
            subscription: None,
            bindings: HashMap::new(),
            presses: Arc::new(AtomicU64::new(0)),
            state: LinkState::Stopped,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Listen port actually bound while running.
    pub fn local_port(&self) -> Option<u16> {
        self.transport.local_port()
    }

    fn configurator(&self) -> Result<&ButtonConfigurator> {
        self.configurator.as_ref().ok_or(MixerError::NotRunning)
    }

    async fn wire_up(&mut self, local_port: u16) -> Result<()> {
        let variant = self.config.variant;

        let router = PressRouter::new(variant, Arc::clone(&self.press_callback));
        let presses = Arc::clone(&self.presses);
        self.transport.on_message(move |inbound| {
            if router.handle(&inbound.message).is_some() {
                presses.fetch_add(1, Ordering::Relaxed);
            }
        })?;

        let sink: Arc<dyn MessageSink> = self.transport.clone();
        self.configurator = Some(ButtonConfigurator::spawn(
            variant,
            Arc::clone(&sink),
            Arc::clone(&self.pool),
            ConfiguratorOptions {
                pacing: self.timing.pacing,
                queue_depth: self.timing.queue_depth,
            },
        ));

        let mut subscription =
            SubscriptionManager::new(sink, local_port, self.timing.renewal_interval);
        subscription.establish().await?;
        self.subscription = Some(subscription);
        Ok(())
    }
}

#[async_trait]
impl MixerLink for ConsoleLink {
    fn variant(&self) -> HardwareVariant {
        self.config.variant
    }

    async fn start(&mut self) -> Result<()> {
        if self.state == LinkState::Running {
            return Ok(());
        }

        log::info!(
            "Starting {} mixer link to {}",
            self.config.variant,
            self.config.target
        );
        let local_port = self.transport.open(self.config.listen_port).await?;
        if let Err(e) = self.wire_up(local_port).await {
            self.stop().await;
            return Err(e);
        }

        self.state = LinkState::Running;
        log::info!(
            "{} mixer link running, listening on port {}",
            self.config.variant,
            local_port
        );
        Ok(())
    }

    async fn stop(&mut self) {
        if let Some(configurator) = self.configurator.take() {
            configurator.shutdown();
        }
        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }
        self.transport.close().await;
        self.pool.lock().reset();
        self.bindings.clear();

        if self.state == LinkState::Running {
            log::info!("{} mixer link stopped", self.config.variant);
        }
        self.state = LinkState::Stopped;
    }

    async fn bind_cue(&mut self, request: CueBindRequest) -> Result<u8> {
        let configurator = self.configurator()?;
        let button = request.button;
        let prior_cc = self.bindings.get(&button).map(|b| b.cc);
        let color = ButtonColor::resolve(&request.color, request.active);

        let cc = configurator
            .configure_as_trigger(button, &request.label, color, prior_cc)
            .await?;
        if let Err(e) = configurator.set_led(button, request.active).await {
            log::warn!("Failed to set LED of button {}: {}", button, e);
        }

        log::info!("Cue {} bound to button {} on CC {}", request.cue_id, button, cc);
        self.bindings.insert(
            button,
            ButtonBinding {
                cue_id: request.cue_id,
                cc,
            },
        );
        Ok(cc)
    }

    async fn unbind(&mut self, button: LogicalButtonId) -> Result<()> {
        let configurator = self.configurator()?;
        let bound_cc = self.bindings.get(&button).map(|b| b.cc);
        configurator.clear(button, bound_cc).await?;
        if let Some(binding) = self.bindings.remove(&button) {
            log::info!("Cue {} unbound from button {}", binding.cue_id, button);
        }
        Ok(())
    }

    async fn refresh_appearance(
        &self,
        button: LogicalButtonId,
        appearance: &ButtonAppearance,
    ) -> Result<()> {
        self.configurator()?
            .apply_appearance(button, appearance)
            .await
    }

    fn binding(&self, button: LogicalButtonId) -> Option<ButtonBinding> {
        self.bindings.get(&button).cloned()
    }

    fn status(&self) -> HashMap<String, String> {
        let mut status = HashMap::new();
        status.insert("variant".to_string(), self.config.variant.to_string());
        status.insert("state".to_string(), self.state.as_str().to_string());
        status.insert("target".to_string(), self.config.target.to_string());
        status.insert(
            "listen_port".to_string(),
            self.transport
                .local_port()
                .map(|port| port.to_string())
                .unwrap_or_else(|| "none".to_string()),
        );
        status.insert(
            "cc_in_use".to_string(),
            self.pool.lock().live_count().to_string(),
        );
        status.insert("bindings".to_string(), self.bindings.len().to_string());
        status.insert(
            "presses".to_string(),
            self.presses.load(Ordering::Relaxed).to_string(),
        );
        if let Some(subscription) = &self.subscription {
            let state = subscription.state();
            status.insert(
                "subscription".to_string(),
                format!("{:?}", state.phase).to_lowercase(),
            );
            status.insert(
                "renewals_sent".to_string(),
                state.renewals_sent.to_string(),
            );
        }
        status
    }
}
