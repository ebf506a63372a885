//! In-memory score history
//!
//! Keeps the most recent score events and round summaries for the status
//! surface. Nothing here survives a power cycle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;

/// Maximum number of score events kept
const MAX_EVENTS: usize = 512;

/// Maximum number of round summaries kept
const MAX_ROUNDS: usize = 64;

/// Identifier of one round, increasing for the life of the process
pub type RoundId = u64;

/// What produced a score change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    /// Counted by the repetition detector
    Detected,
    /// Injected by the fake pushup command
    Fake,
}

/// A single count increment
#[derive(Debug, Clone, Serialize)]
pub struct ScoreEvent {
    /// When the increment was committed
    pub timestamp: DateTime<Utc>,
    /// Round that was active at the time, if any
    pub round_id: Option<RoundId>,
    /// Count after the increment
    pub count: u32,
    pub source: ScoreSource,
}

/// Summary of one round
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round_id: RoundId,
    pub started_at: DateTime<Utc>,
    /// None while the round is still running
    pub ended_at: Option<DateTime<Utc>>,
    /// Repetitions counted by the detector during the round
    pub detected: u32,
    /// Count when the round ended (or the current count while running)
    pub final_count: u32,
}

/// Bounded history of score events and rounds
#[derive(Debug, Clone, Serialize)]
pub struct ScoreHistory {
    events: VecDeque<ScoreEvent>,
    rounds: VecDeque<RoundSummary>,
    #[serde(skip)]
    max_events: usize,
    #[serde(skip)]
    max_rounds: usize,
    total_detected: u64,
    total_fake: u64,
}

impl ScoreHistory {
    pub fn new() -> Self {
        Self::with_capacity(MAX_EVENTS, MAX_ROUNDS)
    }

    /// Create a history keeping at most `max_events` events and `max_rounds` rounds
    pub fn with_capacity(max_events: usize, max_rounds: usize) -> Self {
        let max_events = max_events.max(1);
        let max_rounds = max_rounds.max(1);
        Self {
            events: VecDeque::with_capacity(max_events),
            rounds: VecDeque::with_capacity(max_rounds),
            max_events,
            max_rounds,
            total_detected: 0,
            total_fake: 0,
        }
    }

    /// Open a summary for a new round
    pub fn record_round_start(&mut self, round_id: RoundId, count: u32) {
        if self.rounds.len() >= self.max_rounds {
            self.rounds.pop_front();
        }
        self.rounds.push_back(RoundSummary {
            round_id,
            started_at: Utc::now(),
            ended_at: None,
            detected: 0,
            final_count: count,
        });
    }

    /// Close the summary of `round_id`
    pub fn record_round_end(&mut self, round_id: RoundId, final_count: u32) {
        if let Some(round) = self.round_mut(round_id) {
            if round.ended_at.is_none() {
                round.ended_at = Some(Utc::now());
                round.final_count = final_count;
            }
        }
    }

    /// Record a committed count increment
    pub fn record_score(&mut self, round_id: Option<RoundId>, count: u32, source: ScoreSource) {
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(ScoreEvent {
            timestamp: Utc::now(),
            round_id,
            count,
            source,
        });

        match source {
            ScoreSource::Detected => self.total_detected += 1,
            ScoreSource::Fake => self.total_fake += 1,
        }

        if let Some(round) = round_id.and_then(|id| self.round_mut(id)) {
            if round.ended_at.is_none() {
                if source == ScoreSource::Detected {
                    round.detected += 1;
                }
                round.final_count = count;
            }
        }
    }

    fn round_mut(&mut self, round_id: RoundId) -> Option<&mut RoundSummary> {
        self.rounds.iter_mut().rev().find(|r| r.round_id == round_id)
    }

    pub fn events(&self) -> &VecDeque<ScoreEvent> {
        &self.events
    }

    pub fn rounds(&self) -> &VecDeque<RoundSummary> {
        &self.rounds
    }

    /// The most recent round that has not ended
    pub fn current_round(&self) -> Option<&RoundSummary> {
        self.rounds.back().filter(|r| r.ended_at.is_none())
    }

    pub fn total_detected(&self) -> u64 {
        self.total_detected
    }

    pub fn total_fake(&self) -> u64 {
        self.total_fake
    }

    pub fn clear(&mut self) {
        self.events.clear();
        self.rounds.clear();
        self.total_detected = 0;
        self.total_fake = 0;
    }
}

impl Default for ScoreHistory {
    fn default() -> Self {
        Self::new()
    }
}
