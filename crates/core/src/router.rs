//! Inbound press routing.
//!
//! The console streams every control-surface change to the subscribed port.
//! Only `val` updates of user buttons that signal a press are turned into
//! trigger callbacks; everything else is dropped.

use std::sync::Arc;

use parking_lot::RwLock;
use rosc::{OscMessage, OscType};

use crate::mapping::{props, split_button_path, to_logical, HardwareVariant, LogicalButtonId};
use crate::transport::codec::numeric_value;

/// Source tag passed with every console-originated press.
pub const MIXER_SOURCE: &str = "mixer";

/// Value the Full console sends for a pressed button.
const FULL_PRESSED_VALUE: f64 = 127.0;

/// Called with the pressed button and [`MIXER_SOURCE`].
pub type PressCallback = Arc<dyn Fn(LogicalButtonId, &'static str) + Send + Sync>;

/// Shared slot holding the currently registered press callback.
pub type PressCallbackSlot = Arc<RwLock<Option<PressCallback>>>;

/// Whether a `val` update means "pressed" on this variant.
///
/// The Full console reports exactly 127 on press; the Compact console reports
/// any nonzero value. NaN is never a press.
pub fn is_pressed(variant: HardwareVariant, args: &[OscType]) -> bool {
    let Some(value) = args.first().and_then(numeric_value) else {
        return false;
    };
    match variant {
        HardwareVariant::Full => value == FULL_PRESSED_VALUE,
        HardwareVariant::Compact => value != 0.0 && !value.is_nan(),
    }
}

pub struct PressRouter {
    variant: HardwareVariant,
    callback: PressCallbackSlot,
}

impl PressRouter {
    pub fn new(variant: HardwareVariant, callback: PressCallbackSlot) -> Self {
        Self { variant, callback }
    }

    /// Route one inbound message. Returns the button when a press was accepted.
    pub fn handle(&self, message: &OscMessage) -> Option<LogicalButtonId> {
        let path = split_button_path(self.variant, &message.addr)?;
        if path.property != props::VALUE || !is_pressed(self.variant, &message.args) {
            return None;
        }

        let id = match to_logical(self.variant, path.layer, path.index, path.row) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Dropping press on {}: {}", message.addr, e);
                return None;
            }
        };

        let callback = self.callback.read().clone();
        match callback {
            Some(callback) => {
                log::debug!("Console press on button {}", id);
                callback(id, MIXER_SOURCE);
            }
            None => log::debug!("Console press on button {} with no handler registered", id),
        }
        Some(id)
    }
}
