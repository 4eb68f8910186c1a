//! Integration manager.
//!
//! Owns the single active console link and moves it through
//! `Disabled → Starting → Running → Stopping → Disabled` whenever settings
//! change. A new link is only started once the previous one is fully torn
//! down, so two links never hold the same listen port.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::appearance::{ButtonAppearance, ButtonColor};
use crate::config::{LinkConfig, MixerSettings};
use crate::error::Result;
use crate::link::{console_link_factory, CueBindRequest, LinkFactory, LinkTiming, MixerLink};
use crate::mapping::{HardwareVariant, LogicalButtonId};
use crate::router::{PressCallback, PressCallbackSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationState {
    Disabled,
    Starting,
    Running,
    Stopping,
}

impl IntegrationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationState::Disabled => "disabled",
            IntegrationState::Starting => "starting",
            IntegrationState::Running => "running",
            IntegrationState::Stopping => "stopping",
        }
    }
}

pub struct IntegrationManager {
    state: IntegrationState,
    link: Option<Box<dyn MixerLink>>,
    active_config: Option<LinkConfig>,
    press_callback: PressCallbackSlot,
    factory: LinkFactory,
    timing: LinkTiming,
}

impl IntegrationManager {
    pub fn new() -> Self {
        Self::with_factory(console_link_factory(), LinkTiming::default())
    }

    pub fn with_timing(timing: LinkTiming) -> Self {
        Self::with_factory(console_link_factory(), timing)
    }

    /// Build a manager that creates its links through `factory`.
    pub fn with_factory(factory: LinkFactory, timing: LinkTiming) -> Self {
        Self {
            state: IntegrationState::Disabled,
            link: None,
            active_config: None,
            press_callback: Arc::new(RwLock::new(None)),
            factory,
            timing,
        }
    }

    pub fn state(&self) -> IntegrationState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == IntegrationState::Running
    }

    pub fn active_variant(&self) -> Option<HardwareVariant> {
        self.link.as_ref().map(|link| link.variant())
    }

    pub fn active_config(&self) -> Option<LinkConfig> {
        self.active_config
    }

    /// Register the handler for console presses.
    ///
    /// Survives reconfiguration; a later registration replaces it.
    pub fn on_button_pressed<F>(&self, callback: F)
    where
        F: Fn(LogicalButtonId, &'static str) + Send + Sync + 'static,
    {
        let callback: PressCallback = Arc::new(callback);
        *self.press_callback.write() = Some(callback);
    }

    /// Apply new settings.
    ///
    /// The running link, if any, is always stopped first. Disabled settings
    /// or a missing target leave the manager `Disabled` without error. Any
    /// configuration or startup error is returned and also leaves it
    /// `Disabled`.
    pub async fn update_settings(&mut self, settings: &MixerSettings) -> Result<()> {
        self.stop_link().await;

        let config = match settings.resolve() {
            Ok(Some(config)) => config,
            Ok(None) => {
                log::info!("Mixer integration disabled");
                return Ok(());
            }
            Err(e) => {
                log::error!("Invalid mixer settings: {}", e);
                return Err(e);
            }
        };

        self.state = IntegrationState::Starting;
        let mut link = (self.factory)(config, Arc::clone(&self.press_callback), self.timing);
        match link.start().await {
            Ok(()) => {
                self.link = Some(link);
                self.active_config = Some(config);
                self.state = IntegrationState::Running;
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to start {} mixer link: {}", config.variant, e);
                link.stop().await;
                self.state = IntegrationState::Disabled;
                Err(e)
            }
        }
    }

    async fn stop_link(&mut self) {
        if let Some(mut link) = self.link.take() {
            self.state = IntegrationState::Stopping;
            link.stop().await;
        }
        self.active_config = None;
        self.state = IntegrationState::Disabled;
    }

    /// Stop the active link, if any.
    pub async fn shutdown(&mut self) {
        self.stop_link().await;
    }

    /// Make `button` trigger `cue_id`. Returns the CC used, or `None` when
    /// the integration is disabled.
    pub async fn bind_cue_to_button(
        &mut self,
        cue_id: &str,
        button: LogicalButtonId,
        label: &str,
        color: &str,
        active: bool,
    ) -> Result<Option<u8>> {
        let Some(link) = self.link.as_mut() else {
            log::debug!("Mixer integration disabled, not binding {}", button);
            return Ok(None);
        };
        let cc = link
            .bind_cue(CueBindRequest {
                cue_id: cue_id.to_string(),
                button,
                label: label.to_string(),
                color: color.to_string(),
                active,
            })
            .await?;
        Ok(Some(cc))
    }

    /// Clear `button` and release its CC. Does nothing while disabled.
    pub async fn unbind_button(&mut self, button: LogicalButtonId) -> Result<()> {
        match self.link.as_mut() {
            Some(link) => link.unbind(button).await,
            None => Ok(()),
        }
    }

    /// Re-skin `button` to reflect cue state without rebinding it.
    pub async fn refresh_button_appearance(
        &self,
        button: LogicalButtonId,
        label: &str,
        color: &str,
        active: bool,
    ) -> Result<()> {
        let Some(link) = self.link.as_ref() else {
            return Ok(());
        };
        let appearance = ButtonAppearance::new(label, ButtonColor::resolve(color, active), active);
        link.refresh_appearance(button, &appearance).await
    }

    /// Manager state plus the active link's status.
    pub fn status(&self) -> HashMap<String, String> {
        let mut status = self
            .link
            .as_ref()
            .map(|link| link.status())
            .unwrap_or_default();
        status.insert(
            "integration".to_string(),
            self.state.as_str().to_string(),
        );
        status
    }
}

impl Default for IntegrationManager {
    fn default() -> Self {
        Self::new()
    }
}
