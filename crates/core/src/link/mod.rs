//! Console link seam.
//!
//! A link is one running connection to one console: its transport,
//! subscription, configuration worker, CC pool and binding table. The
//! integration manager owns at most one link at a time and only talks to it
//! through [`MixerLink`].

mod console;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::appearance::ButtonAppearance;
use crate::config::LinkConfig;
use crate::configurator::DEFAULT_QUEUE_DEPTH;
use crate::error::Result;
use crate::mapping::{HardwareVariant, LogicalButtonId};
use crate::pacing::DEFAULT_PACING;
use crate::router::PressCallbackSlot;
use crate::subscription::RENEWAL_INTERVAL;

pub use console::ConsoleLink;

/// Timing knobs for a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTiming {
    /// Delay between consecutive configuration messages.
    pub pacing: Duration,
    /// Subscription renewal period.
    pub renewal_interval: Duration,
    /// Configuration requests allowed to wait for the worker.
    pub queue_depth: usize,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            renewal_interval: RENEWAL_INTERVAL,
            queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

/// A cue bound to a console button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonBinding {
    pub cue_id: String,
    pub cc: u8,
}

/// Request to turn a button into the trigger for a cue.
#[derive(Debug, Clone)]
pub struct CueBindRequest {
    pub cue_id: String,
    pub button: LogicalButtonId,
    pub label: String,
    /// Colour name as the host stores it; unknown names fall back by `active`.
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Stopped,
    Running,
}

impl LinkState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Stopped => "stopped",
            LinkState::Running => "running",
        }
    }
}

/// One running connection to a console.
#[async_trait]
pub trait MixerLink: Send + Sync {
    fn variant(&self) -> HardwareVariant;

    /// Open the transport, wire inbound presses and subscribe.
    ///
    /// On error nothing is left running.
    async fn start(&mut self) -> Result<()>;

    /// Tear everything down: worker, subscription, sockets, CC pool and
    /// bindings. Safe to call on a link that never started.
    async fn stop(&mut self);

    /// Configure a button as the trigger for a cue. Returns the CC used.
    async fn bind_cue(&mut self, request: CueBindRequest) -> Result<u8>;

    /// Reset a button to unassigned and forget its binding.
    async fn unbind(&mut self, button: LogicalButtonId) -> Result<()>;

    /// Update label, colour and LED of a button without rebinding it.
    async fn refresh_appearance(
        &self,
        button: LogicalButtonId,
        appearance: &ButtonAppearance,
    ) -> Result<()>;

    fn binding(&self, button: LogicalButtonId) -> Option<ButtonBinding>;

    fn status(&self) -> HashMap<String, String>;
}

/// Builds a link for a resolved configuration.
pub type LinkFactory =
    Arc<dyn Fn(LinkConfig, PressCallbackSlot, LinkTiming) -> Box<dyn MixerLink> + Send + Sync>;

/// Factory producing real console links.
pub fn console_link_factory() -> LinkFactory {
    Arc::new(
        |config: LinkConfig, callback: PressCallbackSlot, timing: LinkTiming| {
            Box::new(ConsoleLink::new(config, callback, timing)) as Box<dyn MixerLink>
        },
    )
}
