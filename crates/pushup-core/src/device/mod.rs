//! Device collaborators of the game core
//!
//! The core reaches hardware and network only through three narrow traits:
//! - [`MotionSampler`] reads one accelerometer sample
//! - [`Actuator`] drives the RGB indicator LED
//! - [`NotificationSink`] publishes the current count to observers
//!
//! Board support code provides the real implementations; [`sim`] has
//! software stand-ins for the binary and the tests.

pub mod sim;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// One raw reading from the accelerometer's vertical axis
pub type Sample = i32;

/// Errors reported by a motion sensor read
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SensorError {
    #[error("Motion sensor read failed: {0}")]
    ReadFailed(String),
}

/// Indicator color, also used as the player's team color
///
/// The numeric codes match the referee's color numbering
/// (0 = off, 1 = red, 2 = green, 3 = blue).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    #[default]
    Off,
    Red,
    Green,
    Blue,
}

/// Error returned when a color payload cannot be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid color: {0:?}")]
pub struct ParseColorError(pub String);

impl Color {
    /// All colors in code order
    pub const ALL: [Color; 4] = [Color::Off, Color::Red, Color::Green, Color::Blue];

    /// Numeric code used on the wire
    pub fn code(self) -> u8 {
        match self {
            Color::Off => 0,
            Color::Red => 1,
            Color::Green => 2,
            Color::Blue => 3,
        }
    }

    /// Look up a color by its numeric code
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Color::Off => "off",
            Color::Red => "red",
            Color::Green => "green",
            Color::Blue => "blue",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts a decimal code (`"0"`..=`"3"`) or a color name, ignoring
    /// surrounding whitespace, trailing NULs and case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches(|c: char| c.is_whitespace() || c == '\0');

        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return trimmed
                .parse::<u8>()
                .ok()
                .and_then(Color::from_code)
                .ok_or_else(|| ParseColorError(s.to_string()));
        }

        Color::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| ParseColorError(s.to_string()))
    }
}

/// Source of accelerometer samples
pub trait MotionSampler: Send + Sync {
    /// Read one sample; must not block beyond normal I/O latency
    fn read(&self) -> Result<Sample, SensorError>;
}

/// Indicator LED driver
///
/// Fire-and-forget: implementations log their own write failures.
pub trait Actuator: Send + Sync {
    fn set(&self, color: Color);
}

/// Publishes count changes to subscribed observers
///
/// Best-effort; having no subscribers is not an error.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, count: u32);
}

/// The collaborators a player node is wired with
#[derive(Clone)]
pub struct Devices {
    pub sampler: Arc<dyn MotionSampler>,
    pub actuator: Arc<dyn Actuator>,
    pub notifier: Arc<dyn NotificationSink>,
}

impl Devices {
    pub fn new(
        sampler: Arc<dyn MotionSampler>,
        actuator: Arc<dyn Actuator>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            sampler,
            actuator,
            notifier,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_codes_round_trip() {
        for color in Color::ALL {
            assert_eq!(Color::from_code(color.code()), Some(color));
        }
        assert_eq!(Color::from_code(4), None);
    }

    #[test]
    fn test_parse_digit_payloads() {
        assert_eq!("0".parse::<Color>(), Ok(Color::Off));
        assert_eq!("1".parse::<Color>(), Ok(Color::Red));
        assert_eq!(" 2\n".parse::<Color>(), Ok(Color::Green));
        assert_eq!("3\0\0".parse::<Color>(), Ok(Color::Blue));
    }

    #[test]
    fn test_parse_names() {
        assert_eq!("red".parse::<Color>(), Ok(Color::Red));
        assert_eq!("GREEN".parse::<Color>(), Ok(Color::Green));
        assert_eq!("Blue".parse::<Color>(), Ok(Color::Blue));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("4".parse::<Color>().is_err());
        assert!("256".parse::<Color>().is_err());
        assert!("-1".parse::<Color>().is_err());
        assert!("".parse::<Color>().is_err());
        assert!("purple".parse::<Color>().is_err());
    }

    #[test]
    fn test_color_serializes_lowercase() {
        let json = serde_json::to_string(&Color::Green).unwrap();
        assert_eq!(json, "\"green\"");
    }
}
