//! Shared game session
//!
//! The one piece of state touched concurrently by the command path and the
//! detector thread. Every field sits behind a single mutex; callers only see
//! whole transitions, never a half-applied one.

use crate::device::Color;
use crate::stats::store::{RoundId, ScoreHistory, ScoreSource};
use serde::Serialize;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// End-of-game indication requested by the referee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Indication {
    #[default]
    None,
    Winner,
    Looser,
}

/// Consistent copy of the session fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub color: Color,
    pub repetition_count: u32,
    pub round_active: bool,
    /// Most recently started round (0 before the first start)
    pub round_id: RoundId,
    pub indication: Indication,
}

#[derive(Debug)]
struct SessionState {
    color: Color,
    repetition_count: u32,
    round_active: bool,
    round_id: RoundId,
    indication: Indication,
    history: ScoreHistory,
}

impl SessionState {
    fn active_round(&self) -> Option<RoundId> {
        self.round_active.then_some(self.round_id)
    }
}

/// Game session of a player node
#[derive(Debug)]
pub struct GameSession {
    state: Mutex<SessionState>,
}

impl GameSession {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SessionState {
                color: Color::Off,
                repetition_count: 0,
                round_active: false,
                round_id: 0,
                indication: Indication::None,
                history: ScoreHistory::new(),
            }),
        }
    }

    /// Every critical section leaves the state consistent, so a panic in
    /// another holder does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the team color; no count or round side effects
    pub fn assign_color(&self, color: Color) {
        self.lock().color = color;
    }

    pub fn color(&self) -> Color {
        self.lock().color
    }

    /// Begin a new round and return its id
    ///
    /// Any previous round is closed first: a detector still bound to it can
    /// no longer record repetitions.
    pub fn start_round(&self) -> RoundId {
        let mut state = self.lock();
        if let Some(previous) = state.active_round() {
            let count = state.repetition_count;
            state.history.record_round_end(previous, count);
        }

        state.round_id += 1;
        state.round_active = true;
        state.indication = Indication::None;

        let (round_id, count) = (state.round_id, state.repetition_count);
        state.history.record_round_start(round_id, count);
        round_id
    }

    /// End the current round and zero the count
    ///
    /// Returns the round that was active, if any.
    pub fn end_round(&self) -> Option<RoundId> {
        let mut state = self.lock();
        let ended = state.active_round();
        if let Some(round_id) = ended {
            let count = state.repetition_count;
            state.history.record_round_end(round_id, count);
        }

        state.round_active = false;
        state.repetition_count = 0;
        state.indication = Indication::None;
        ended
    }

    /// Whether `round_id` is the round currently being played
    pub fn is_round_current(&self, round_id: RoundId) -> bool {
        self.lock().active_round() == Some(round_id)
    }

    pub fn is_round_active(&self) -> bool {
        self.lock().round_active
    }

    /// Count one detected repetition for `round_id`
    ///
    /// Returns the new count, or `None` when that round is no longer active.
    pub fn record_repetition(&self, round_id: RoundId) -> Option<u32> {
        let mut state = self.lock();
        if state.active_round() != Some(round_id) {
            return None;
        }

        state.repetition_count = state.repetition_count.saturating_add(1);
        let count = state.repetition_count;
        state
            .history
            .record_score(Some(round_id), count, ScoreSource::Detected);
        Some(count)
    }

    /// Increment the count regardless of round state and return it
    pub fn force_increment(&self) -> u32 {
        let mut state = self.lock();
        state.repetition_count = state.repetition_count.saturating_add(1);
        let (round, count) = (state.active_round(), state.repetition_count);
        state.history.record_score(round, count, ScoreSource::Fake);
        count
    }

    pub fn set_winner_indication(&self) {
        self.lock().indication = Indication::Winner;
    }

    pub fn set_looser_indication(&self) {
        self.lock().indication = Indication::Looser;
    }

    pub fn indication(&self) -> Indication {
        self.lock().indication
    }

    pub fn snapshot_count(&self) -> u32 {
        self.lock().repetition_count
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            color: state.color,
            repetition_count: state.repetition_count,
            round_active: state.round_active,
            round_id: state.round_id,
            indication: state.indication,
        }
    }

    /// Copy of the score history
    pub fn history(&self) -> ScoreHistory {
        self.lock().history.clone()
    }
}

impl Default for GameSession {
    fn default() -> Self {
        Self::new()
    }
}
