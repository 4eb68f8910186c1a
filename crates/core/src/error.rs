//! Error taxonomy for the mixer integration.
//!
//! Nothing in here is fatal to the hosting process: every failure either
//! aborts a single in-flight operation or leaves the integration disabled
//! until the next settings change.

use thiserror::Error;

use crate::mapping::{HardwareVariant, LogicalButtonId};

/// Errors raised by the UDP transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to bind UDP listener on port {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("transport is already open")]
    AlreadyOpen,

    #[error("transport is not connected")]
    NotConnected,

    #[error("failed to encode message for {address}: {reason}")]
    EncodeFailed { address: String, reason: String },

    #[error("UDP send failed: {0}")]
    SendFailed(#[from] std::io::Error),
}

/// Errors raised when translating between logical ids and wire coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("{id} is outside the {variant} button range")]
    OutOfRange {
        variant: HardwareVariant,
        id: LogicalButtonId,
    },

    #[error("unparseable {variant} coordinates: {detail}")]
    Unparseable {
        variant: HardwareVariant,
        detail: String,
    },
}

/// Errors surfaced to callers of the integration.
#[derive(Debug, Error)]
pub enum MixerError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Addressing(#[from] AddressError),

    #[error("no free MIDI CC slots available")]
    PoolExhausted,

    #[error("button configuration queue is busy, retry later")]
    Busy,

    #[error("operation cancelled because the mixer link stopped")]
    Cancelled,

    #[error("mixer link is not running")]
    NotRunning,
}

pub type Result<T, E = MixerError> = std::result::Result<T, E>;
