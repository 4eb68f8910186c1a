pub use appearance::{truncate_label, ButtonAppearance, ButtonColor};
pub use config::{
    ConfigError, ConfigOption, LinkConfig, MixerSettings, SettingsSchema, SettingsStore,
    DEFAULT_CONSOLE_PORT,
};
pub use configurator::{ButtonConfigurator, ConfiguratorOptions};
pub use error::{AddressError, MixerError, TransportError};
pub use link::{
    console_link_factory, ButtonBinding, ConsoleLink, CueBindRequest, LinkFactory, LinkState,
    LinkTiming, MixerLink,
};
pub use manager::{IntegrationManager, IntegrationState};
pub use mapping::{
    all_buttons, to_logical, to_physical, ButtonRow, HardwareVariant, LogicalButtonId,
    PhysicalAddress,
};
pub use pacing::PacedSequence;
pub use pool::CcPool;
pub use router::{PressCallback, PressRouter, MIXER_SOURCE};
pub use subscription::{SubscriptionManager, SubscriptionPhase, SubscriptionState};
pub use transport::{InboundMessage, MessageSink, OscTransport};

mod appearance;
mod config;
mod configurator;
mod error;
mod link;
mod manager;
pub mod mapping;
mod pacing;
mod pool;
mod router;
mod subscription;
pub mod transport;

#[cfg(test)]
mod testing;
