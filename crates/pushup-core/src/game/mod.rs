//! Game module
//!
//! This module contains the player's decision logic:
//! - Threshold-crossing repetition detection ([`detector`])
//! - The shared game session ([`session`])
//! - Background detector and blink loops ([`runner`])
//! - Command decoding and dispatch ([`control`])

pub mod control;
pub mod detector;
pub mod runner;
pub mod session;
