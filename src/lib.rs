//! Pushup Player - motion-sensing pushup counter node
//!
//! This library re-exports the game core from `pushup-core` and holds the
//! binary's persistent configuration. The network transport lives in
//! `pushup-server`.

pub mod config;

pub use pushup_core::{device, game, stats};

pub use pushup_core::{
    init_player, Color, Command, ControlSurface, Devices, GameConfig, GameSession,
    RepetitionDetector, Response,
};
pub use pushup_core::{DEFAULT_RECENTER_WINDOW, DEFAULT_SAMPLE_PERIOD_MS, DEFAULT_THRESHOLD, VERSION};
