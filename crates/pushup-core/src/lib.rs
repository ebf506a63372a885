//! Pushup Core - Game session, repetition detection and control surface
//!
//! This library holds the decision logic of a pushup contest player node:
//! the shared game session, the threshold-crossing repetition detector that
//! runs on the accelerometer, and the command dispatch the network transport
//! calls into. Sensors, the indicator LED and count observers are reached
//! through the traits in [`device`].

pub mod config;
pub mod device;
pub mod game;
pub mod stats;

pub use config::GameConfig;
pub use device::{Actuator, Color, Devices, MotionSampler, NotificationSink, Sample, SensorError};
pub use game::control::{Command, CommandError, ControlStatus, ControlSurface, Response};
pub use game::detector::RepetitionDetector;
pub use game::session::{GameSession, SessionSnapshot};
pub use stats::store::ScoreHistory;

use std::sync::Arc;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default accelerometer sampling period in milliseconds
pub const DEFAULT_SAMPLE_PERIOD_MS: u64 = 200;

/// Default accumulator magnitude that counts as a threshold crossing (raw sensor units)
pub const DEFAULT_THRESHOLD: u32 = 250;

/// Default number of samples after which the indicator is re-armed
pub const DEFAULT_RECENTER_WINDOW: u32 = 4;

/// Consecutive failed sensor reads before a detector run goes idle
pub const DEFAULT_MAX_SENSOR_FAILURES: u32 = 3;

/// Default half-period of the winner blink in milliseconds
pub const DEFAULT_BLINK_PERIOD_MS: u64 = 200;

/// Default pause between "off" and the event color on a fake pushup
pub const DEFAULT_FAKE_PUSHUP_PAUSE_MS: u64 = 1000;

/// Wire a set of device collaborators into a fresh session and control surface.
///
/// This is the single initialization entry point of a player node.
pub fn init_player(devices: Devices, config: GameConfig) -> ControlSurface {
    let session = Arc::new(GameSession::new());
    tracing::info!(
        threshold = config.threshold,
        window = config.recenter_window,
        period_ms = config.sample_period_ms,
        "Pushup player initialized"
    );
    ControlSurface::new(session, devices, config)
}
