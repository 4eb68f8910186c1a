//! Button appearance: label, colour and LED state.
//!
//! The console colours its user buttons from a fixed palette addressed by
//! index. Appearances are supplied per call and never retained.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// LED brightness sent for a lit button.
pub const LED_ON: i32 = 100;
/// LED brightness sent for a dark button.
pub const LED_OFF: i32 = 0;

/// Console button colour palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonColor {
    #[default]
    Off,
    Gray,
    Red,
    Orange,
    Yellow,
    Green,
    Cyan,
    Blue,
    Purple,
    Pink,
    White,
}

impl ButtonColor {
    pub const ALL: [ButtonColor; 11] = [
        ButtonColor::Off,
        ButtonColor::Gray,
        ButtonColor::Red,
        ButtonColor::Orange,
        ButtonColor::Yellow,
        ButtonColor::Green,
        ButtonColor::Cyan,
        ButtonColor::Blue,
        ButtonColor::Purple,
        ButtonColor::Pink,
        ButtonColor::White,
    ];

    /// Palette index sent on the `col` property.
    pub const fn wire_index(self) -> i32 {
        self as i32
    }

    pub const fn name(self) -> &'static str {
        match self {
            ButtonColor::Off => "off",
            ButtonColor::Gray => "gray",
            ButtonColor::Red => "red",
            ButtonColor::Orange => "orange",
            ButtonColor::Yellow => "yellow",
            ButtonColor::Green => "green",
            ButtonColor::Cyan => "cyan",
            ButtonColor::Blue => "blue",
            ButtonColor::Purple => "purple",
            ButtonColor::Pink => "pink",
            ButtonColor::White => "white",
        }
    }

    /// Resolve a colour name coming from cue metadata.
    ///
    /// Unknown names fall back to green for an active cue and off otherwise.
    pub fn resolve(name: &str, active: bool) -> Self {
        match name.parse() {
            Ok(color) => color,
            Err(_) => {
                let fallback = if active {
                    ButtonColor::Green
                } else {
                    ButtonColor::Off
                };
                log::debug!(
                    "Unknown button colour '{}', using {}",
                    name,
                    fallback.name()
                );
                fallback
            }
        }
    }
}

impl fmt::Display for ButtonColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ButtonColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = match wanted.as_str() {
            "grey" => "gray",
            "magenta" => "pink",
            "violet" => "purple",
            other => other,
        };
        ButtonColor::ALL
            .iter()
            .copied()
            .find(|c| c.name() == wanted)
            .ok_or_else(|| format!("unknown colour '{}'", s))
    }
}

/// Transient look of a console button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonAppearance {
    pub label: String,
    pub color: ButtonColor,
    pub led_on: bool,
}

impl ButtonAppearance {
    pub fn new(label: impl Into<String>, color: ButtonColor, led_on: bool) -> Self {
        Self {
            label: label.into(),
            color,
            led_on,
        }
    }

    pub fn led_value(&self) -> i32 {
        if self.led_on {
            LED_ON
        } else {
            LED_OFF
        }
    }
}

/// Cut a label down to `limit` characters.
pub fn truncate_label(label: &str, limit: usize) -> String {
    label.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_indices_are_stable() {
        assert_eq!(ButtonColor::Off.wire_index(), 0);
        assert_eq!(ButtonColor::Green.wire_index(), 5);
        assert_eq!(ButtonColor::White.wire_index(), 10);
        for (i, color) in ButtonColor::ALL.iter().enumerate() {
            assert_eq!(color.wire_index(), i as i32);
        }
    }

    #[test]
    fn test_color_parsing() {
        assert_eq!("Green".parse::<ButtonColor>(), Ok(ButtonColor::Green));
        assert_eq!(" grey ".parse::<ButtonColor>(), Ok(ButtonColor::Gray));
        assert!("chartreuse".parse::<ButtonColor>().is_err());
    }

    #[test]
    fn test_unknown_color_fallback() {
        assert_eq!(ButtonColor::resolve("chartreuse", true), ButtonColor::Green);
        assert_eq!(ButtonColor::resolve("chartreuse", false), ButtonColor::Off);
        assert_eq!(ButtonColor::resolve("red", false), ButtonColor::Red);
    }

    #[test]
    fn test_truncate_label() {
        assert_eq!(truncate_label("Intro", 11), "Intro");
        assert_eq!(truncate_label("Walk-in music loop", 11), "Walk-in mus");
        // Multi-byte characters count once
        assert_eq!(truncate_label("Ünïcødé ßöüñd", 4), "Ünïc");
    }
}
