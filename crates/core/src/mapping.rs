//! Console button addressing.
//!
//! Translates the application's logical button ids into the console's wire
//! coordinates and back. Two hardware variants exist:
//!
//! ```text
//! Compact:  4 layers x 4 buttons, single implicit row
//!           /$ctl/user/<layer 0-3>/<index 0-3>/<property>
//!
//! Full:    16 layers x 4 buttons, upper (bu) and lower (bd) row
//!           /$ctl/user/<layer 1-16>/<index 0-3>/<bu|bd>/<property>
//! ```
//!
//! The Full console numbers its user layers from 1 on the wire, so its layer
//! segment is the 0-based physical layer plus one. Every other coordinate on
//! the wire is 0-based.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AddressError;

/// Prefix shared by every user-control address.
pub const USER_PREFIX: &str = "/$ctl/user";

/// Button property names under a button's base path.
pub mod props {
    pub const MODE: &str = "mode";
    pub const CC: &str = "cc";
    pub const NAME: &str = "name";
    pub const COLOR: &str = "col";
    pub const LED: &str = "bl";
    pub const VALUE: &str = "val";
}

/// Supported console addressing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareVariant {
    Compact,
    Full,
}

impl HardwareVariant {
    pub const fn layer_count(self) -> u8 {
        match self {
            HardwareVariant::Compact => 4,
            HardwareVariant::Full => 16,
        }
    }

    pub const fn buttons_per_layer(self) -> u8 {
        4
    }

    /// Whether button ids on this variant carry an upper/lower row.
    pub const fn uses_rows(self) -> bool {
        matches!(self, HardwareVariant::Full)
    }

    /// Local UDP port the console streams state to unless overridden.
    pub const fn default_listen_port(self) -> u16 {
        match self {
            HardwareVariant::Compact => 23457,
            HardwareVariant::Full => 23456,
        }
    }

    /// Maximum label length the console scribble strip displays.
    pub const fn label_limit(self) -> usize {
        match self {
            HardwareVariant::Compact => 11,
            HardwareVariant::Full => 16,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            HardwareVariant::Compact => "compact",
            HardwareVariant::Full => "full",
        }
    }

    /// Offset added to the 0-based physical layer when rendering the wire path.
    const fn wire_layer_offset(self) -> u8 {
        match self {
            HardwareVariant::Compact => 0,
            HardwareVariant::Full => 1,
        }
    }
}

impl fmt::Display for HardwareVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HardwareVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(HardwareVariant::Compact),
            "full" => Ok(HardwareVariant::Full),
            other => Err(format!("unknown mixer type '{}'", other)),
        }
    }
}

/// Upper or lower button of a Full console user control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonRow {
    Upper,
    Lower,
}

impl ButtonRow {
    pub const fn wire_token(self) -> &'static str {
        match self {
            ButtonRow::Upper => "bu",
            ButtonRow::Lower => "bd",
        }
    }

    pub fn from_wire_token(token: &str) -> Option<Self> {
        match token {
            "bu" => Some(ButtonRow::Upper),
            "bd" => Some(ButtonRow::Lower),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ButtonRow::Upper => "upper",
            ButtonRow::Lower => "lower",
        }
    }
}

/// Application-level identifier of a console button.
///
/// `layer` and `button` are 1-based. Compact ids never carry a row, Full ids
/// always do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalButtonId {
    pub layer: u8,
    pub button: u8,
    pub row: Option<ButtonRow>,
}

impl LogicalButtonId {
    pub const fn compact(layer: u8, button: u8) -> Self {
        Self {
            layer,
            button,
            row: None,
        }
    }

    pub const fn full(layer: u8, button: u8, row: ButtonRow) -> Self {
        Self {
            layer,
            button,
            row: Some(row),
        }
    }
}

impl fmt::Display for LogicalButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            None => write!(f, "{}:{}", self.layer, self.button),
            Some(ButtonRow::Upper) => write!(f, "{}:{}:u", self.layer, self.button),
            Some(ButtonRow::Lower) => write!(f, "{}:{}:l", self.layer, self.button),
        }
    }
}

impl FromStr for LogicalButtonId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.trim().split(':');
        let layer = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid layer in button token '{}'", s))?;
        let button = parts
            .next()
            .and_then(|p| p.parse::<u8>().ok())
            .ok_or_else(|| format!("invalid button in button token '{}'", s))?;
        let row = match parts.next() {
            None => None,
            Some("u") | Some("upper") => Some(ButtonRow::Upper),
            Some("l") | Some("lower") => Some(ButtonRow::Lower),
            Some(other) => return Err(format!("invalid row '{}' in button token '{}'", other, s)),
        };
        if parts.next().is_some() {
            return Err(format!("trailing data in button token '{}'", s));
        }
        Ok(Self { layer, button, row })
    }
}

impl Serialize for LogicalButtonId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LogicalButtonId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}

/// Wire coordinates of a button plus the property paths derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalAddress {
    pub variant: HardwareVariant,
    /// 0-based layer.
    pub layer: u8,
    /// 0-based button index within the layer.
    pub index: u8,
    /// Fixed to `Upper` on the Compact variant.
    pub row: ButtonRow,
    base: String,
}

impl PhysicalAddress {
    fn new(variant: HardwareVariant, layer: u8, index: u8, row: ButtonRow) -> Self {
        let wire_layer = u16::from(layer) + u16::from(variant.wire_layer_offset());
        let base = if variant.uses_rows() {
            format!("{}/{}/{}/{}", USER_PREFIX, wire_layer, index, row.wire_token())
        } else {
            format!("{}/{}/{}", USER_PREFIX, wire_layer, index)
        };
        Self {
            variant,
            layer,
            index,
            row,
            base,
        }
    }

    /// Base path shared by all properties of this button.
    pub fn base_path(&self) -> &str {
        &self.base
    }

    pub fn property_path(&self, property: &str) -> String {
        format!("{}/{}", self.base, property)
    }

    pub fn mode_path(&self) -> String {
        self.property_path(props::MODE)
    }

    pub fn cc_path(&self) -> String {
        self.property_path(props::CC)
    }

    pub fn name_path(&self) -> String {
        self.property_path(props::NAME)
    }

    pub fn color_path(&self) -> String {
        self.property_path(props::COLOR)
    }

    /// LED brightness path. Only the Full console's upper buttons have one.
    pub fn led_path(&self) -> Option<String> {
        (self.variant == HardwareVariant::Full && self.row == ButtonRow::Upper)
            .then(|| self.property_path(props::LED))
    }

    pub fn value_path(&self) -> String {
        self.property_path(props::VALUE)
    }
}

/// Raw path segments of an inbound user-control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPath<'a> {
    pub layer: &'a str,
    pub index: &'a str,
    pub row: Option<&'a str>,
    pub property: &'a str,
}

/// Split an address under [`USER_PREFIX`] into its coordinate segments.
///
/// Returns `None` for anything that doesn't have the variant's segment count.
pub fn split_button_path(variant: HardwareVariant, address: &str) -> Option<ButtonPath<'_>> {
    let rest = address.strip_prefix(USER_PREFIX)?.strip_prefix('/')?;
    let segments: Vec<&str> = rest.split('/').collect();
    match (variant.uses_rows(), segments.as_slice()) {
        (true, &[layer, index, row, property]) => Some(ButtonPath {
            layer,
            index,
            row: Some(row),
            property,
        }),
        (false, &[layer, index, property]) => Some(ButtonPath {
            layer,
            index,
            row: None,
            property,
        }),
        _ => None,
    }
}

/// Resolve a logical id to its physical address.
pub fn to_physical(
    variant: HardwareVariant,
    id: LogicalButtonId,
) -> Result<PhysicalAddress, AddressError> {
    let out_of_range = || AddressError::OutOfRange { variant, id };

    if !(1..=variant.layer_count()).contains(&id.layer)
        || !(1..=variant.buttons_per_layer()).contains(&id.button)
    {
        return Err(out_of_range());
    }

    let row = match (variant.uses_rows(), id.row) {
        (true, Some(row)) => row,
        (false, None) => ButtonRow::Upper,
        _ => return Err(out_of_range()),
    };

    Ok(PhysicalAddress::new(variant, id.layer - 1, id.button - 1, row))
}

/// Parse a coordinate segment written the way the console writes it: plain
/// ASCII digits, no sign, no leading zeros.
fn parse_wire_number(raw: &str) -> Option<u32> {
    let canonical = !raw.is_empty()
        && raw.bytes().all(|b| b.is_ascii_digit())
        && (raw == "0" || !raw.starts_with('0'));
    if canonical {
        raw.parse().ok()
    } else {
        None
    }
}

/// Decode raw wire coordinates back into a logical id.
///
/// `raw_layer` and `raw_index` are the path segments as received. On the Full
/// variant `raw_row` must be exactly `bu` or `bd`; on the Compact variant it
/// must be absent.
pub fn to_logical(
    variant: HardwareVariant,
    raw_layer: &str,
    raw_index: &str,
    raw_row: Option<&str>,
) -> Result<LogicalButtonId, AddressError> {
    let unparseable = |detail: String| AddressError::Unparseable { variant, detail };

    let wire_layer = parse_wire_number(raw_layer)
        .ok_or_else(|| unparseable(format!("layer '{}'", raw_layer)))?;
    let index = parse_wire_number(raw_index)
        .ok_or_else(|| unparseable(format!("index '{}'", raw_index)))?;

    let layer = wire_layer
        .checked_add(1)
        .and_then(|l| l.checked_sub(u32::from(variant.wire_layer_offset())))
        .filter(|l| (1..=u32::from(variant.layer_count())).contains(l))
        .ok_or_else(|| unparseable(format!("layer '{}' out of range", raw_layer)))?;
    let button = index
        .checked_add(1)
        .filter(|b| (1..=u32::from(variant.buttons_per_layer())).contains(b))
        .ok_or_else(|| unparseable(format!("index '{}' out of range", raw_index)))?;

    let row = match (variant.uses_rows(), raw_row) {
        (true, Some(token)) => Some(
            ButtonRow::from_wire_token(token)
                .ok_or_else(|| unparseable(format!("row '{}'", token)))?,
        ),
        (true, None) => return Err(unparseable("missing row".to_string())),
        (false, None) => None,
        (false, Some(token)) => return Err(unparseable(format!("unexpected row '{}'", token))),
    };

    // Both values were range checked against u8 limits above.
    Ok(LogicalButtonId {
        layer: layer as u8,
        button: button as u8,
        row,
    })
}

/// Every valid logical id of a variant, in layer/button/row order.
pub fn all_buttons(variant: HardwareVariant) -> Vec<LogicalButtonId> {
    let mut ids = Vec::new();
    for layer in 1..=variant.layer_count() {
        for button in 1..=variant.buttons_per_layer() {
            if variant.uses_rows() {
                ids.push(LogicalButtonId::full(layer, button, ButtonRow::Upper));
                ids.push(LogicalButtonId::full(layer, button, ButtonRow::Lower));
            } else {
                ids.push(LogicalButtonId::compact(layer, button));
            }
        }
    }
    ids
}
