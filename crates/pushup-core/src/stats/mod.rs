//! Score history module
//!
//! Provides the bounded, in-memory record of score events and rounds
//! kept alongside the game session.

pub mod store;
