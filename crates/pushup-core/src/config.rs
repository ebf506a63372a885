//! Game tuning configuration
//!
//! Every magic number of the player lives here with a documented default.
//! Missing fields fall back to their defaults when deserializing, and
//! [`GameConfig::validated`] clamps values that would stall or break the loops.

use crate::device::Color;
use crate::game::detector::DetectorSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn default_sample_period_ms() -> u64 {
    crate::DEFAULT_SAMPLE_PERIOD_MS
}

fn default_threshold() -> u32 {
    crate::DEFAULT_THRESHOLD
}

fn default_recenter_window() -> u32 {
    crate::DEFAULT_RECENTER_WINDOW
}

fn default_max_consecutive_failures() -> u32 {
    crate::DEFAULT_MAX_SENSOR_FAILURES
}

fn default_blink_period_ms() -> u64 {
    crate::DEFAULT_BLINK_PERIOD_MS
}

fn default_fake_pushup_pause_ms() -> u64 {
    crate::DEFAULT_FAKE_PUSHUP_PAUSE_MS
}

fn default_event_color() -> Color {
    Color::Blue
}

/// Tunables of the detector, the blink loop and the fake pushup command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Accelerometer sampling period in milliseconds
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,
    /// Accumulator magnitude that counts as a crossing (raw sensor units)
    #[serde(default = "default_threshold")]
    pub threshold: u32,
    /// Samples after which the indicator is re-armed to the team color
    #[serde(default = "default_recenter_window")]
    pub recenter_window: u32,
    /// Consecutive failed sensor reads before a detector run goes idle
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    /// Half-period of the winner blink in milliseconds
    #[serde(default = "default_blink_period_ms")]
    pub blink_period_ms: u64,
    /// Pause between "off" and the event color on a fake pushup
    #[serde(default = "default_fake_pushup_pause_ms")]
    pub fake_pushup_pause_ms: u64,
    /// Indicator color shown after a fake pushup
    #[serde(default = "default_event_color")]
    pub event_color: Color,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period_ms(),
            threshold: default_threshold(),
            recenter_window: default_recenter_window(),
            max_consecutive_failures: default_max_consecutive_failures(),
            blink_period_ms: default_blink_period_ms(),
            fake_pushup_pause_ms: default_fake_pushup_pause_ms(),
            event_color: default_event_color(),
        }
    }
}

impl GameConfig {
    /// Clamp values that would make a loop spin or never trigger
    pub fn validated(mut self) -> Self {
        self.sample_period_ms = self.sample_period_ms.max(1);
        self.threshold = self.threshold.max(1);
        self.recenter_window = self.recenter_window.max(1);
        self.max_consecutive_failures = self.max_consecutive_failures.max(1);
        self.blink_period_ms = self.blink_period_ms.max(1);
        self
    }

    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms)
    }

    pub fn fake_pushup_pause(&self) -> Duration {
        Duration::from_millis(self.fake_pushup_pause_ms)
    }

    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings::new(self.threshold, self.recenter_window)
    }
}
