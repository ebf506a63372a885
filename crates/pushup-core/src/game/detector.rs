//! Threshold-crossing repetition detector
//!
//! Integrates the deviation of each accelerometer sample from the round's
//! baseline. When the integral falls through `-threshold` the body is on its
//! way down; a later rise through `+threshold` completes one repetition.
//! The integral is zeroed on every crossing and at the end of each
//! re-centering window, so slow drift never adds up to a false crossing.

use crate::device::Sample;

/// Detection phase within one repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No down crossing since the last up crossing
    Neutral,
    /// A down crossing was seen; the next up crossing completes a repetition
    DownPhaseSeen,
}

/// Direction of a threshold crossing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Down,
    Up,
}

/// What happened while processing one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Threshold crossing detected at this sample, if any
    pub crossing: Option<Crossing>,
    /// A down-then-up pair was completed at this sample
    pub repetition: bool,
    /// The re-centering window elapsed; the indicator should be re-armed
    pub rearm: bool,
}

/// Tunables of the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorSettings {
    /// Accumulator magnitude that counts as a crossing (always at least 1)
    pub threshold: u32,
    /// Samples per re-centering window (always at least 1)
    pub window: u32,
}

impl DetectorSettings {
    pub fn new(threshold: u32, window: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            window: window.max(1),
        }
    }
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self::new(crate::DEFAULT_THRESHOLD, crate::DEFAULT_RECENTER_WINDOW)
    }
}

/// Per-round detector state
///
/// # Example
/// ```
/// use pushup_core::game::detector::{DetectorSettings, RepetitionDetector};
///
/// let mut detector = RepetitionDetector::new(1000, DetectorSettings::new(250, 4));
///
/// // Down past the threshold, then back up past it
/// assert!(!detector.process(740).repetition);
/// assert!(detector.process(1260).repetition);
/// assert_eq!(detector.repetitions(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RepetitionDetector {
    settings: DetectorSettings,
    baseline: Sample,
    accumulator: i64,
    phase: Phase,
    samples_since_recenter: u32,
    repetitions: u32,
}

impl RepetitionDetector {
    /// Start a run using `baseline` as the zero reference
    pub fn new(baseline: Sample, settings: DetectorSettings) -> Self {
        Self {
            settings,
            baseline,
            accumulator: 0,
            phase: Phase::Neutral,
            samples_since_recenter: 0,
            repetitions: 0,
        }
    }

    /// Process one sample
    pub fn process(&mut self, sample: Sample) -> TickOutcome {
        let threshold = i64::from(self.settings.threshold);
        let delta = i64::from(sample) - i64::from(self.baseline);
        self.accumulator = self.accumulator.saturating_add(delta);

        let mut outcome = TickOutcome::default();

        if self.accumulator <= -threshold {
            self.phase = Phase::DownPhaseSeen;
            self.accumulator = 0;
            outcome.crossing = Some(Crossing::Down);
        } else if self.accumulator >= threshold {
            self.accumulator = 0;
            outcome.crossing = Some(Crossing::Up);

            if self.phase == Phase::DownPhaseSeen {
                self.phase = Phase::Neutral;
                self.samples_since_recenter = 0;
                self.repetitions = self.repetitions.saturating_add(1);
                outcome.repetition = true;
            }
        }

        self.samples_since_recenter += 1;
        if self.samples_since_recenter >= self.settings.window {
            self.samples_since_recenter = 0;
            self.accumulator = 0;
            outcome.rearm = true;
        }

        outcome
    }

    /// Process a slice of samples, returning how many repetitions it completed
    pub fn process_all(&mut self, samples: &[Sample]) -> u32 {
        samples.iter().fold(0u32, |completed, &sample| {
            if self.process(sample).repetition {
                completed.saturating_add(1)
            } else {
                completed
            }
        })
    }

    pub fn baseline(&self) -> Sample {
        self.baseline
    }

    pub fn accumulator(&self) -> i64 {
        self.accumulator
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn samples_since_recenter(&self) -> u32 {
        self.samples_since_recenter
    }

    /// Repetitions completed during this run
    pub fn repetitions(&self) -> u32 {
        self.repetitions
    }

    pub fn settings(&self) -> DetectorSettings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(threshold: u32, window: u32) -> RepetitionDetector {
        RepetitionDetector::new(0, DetectorSettings::new(threshold, window))
    }

    #[test]
    fn test_single_repetition_on_sixth_sample() {
        let mut det = detector(250, 4);
        let samples = [0, 0, -260, 0, 0, 260, 0];

        let mut completed_at = Vec::new();
        for (i, &s) in samples.iter().enumerate() {
            if det.process(s).repetition {
                completed_at.push(i + 1);
            }
        }

        assert_eq!(completed_at, vec![6], "Exactly one repetition, on the 6th sample");
        assert_eq!(det.repetitions(), 1);
        assert_eq!(det.phase(), Phase::Neutral);
    }

    #[test]
    fn test_window_rearms_once_without_crossing() {
        let mut det = detector(250, 4);
        let outcomes: Vec<TickOutcome> = [10, -10, 20, -20].iter().map(|&s| det.process(s)).collect();

        assert_eq!(outcomes.iter().filter(|o| o.rearm).count(), 1);
        assert!(outcomes[3].rearm, "Re-arm happens on the window's last sample");
        assert!(outcomes.iter().all(|o| o.crossing.is_none() && !o.repetition));
        assert_eq!(det.accumulator(), 0);
    }

    #[test]
    fn test_exact_threshold_triggers() {
        let mut det = detector(250, 100);
        assert_eq!(det.process(-250).crossing, Some(Crossing::Down));
        let outcome = det.process(250);
        assert_eq!(outcome.crossing, Some(Crossing::Up));
        assert!(outcome.repetition);
    }

    #[test]
    fn test_just_below_threshold_does_not_trigger() {
        let mut det = detector(250, 100);
        assert_eq!(det.process(-249).crossing, None);
        assert_eq!(det.accumulator(), -249);
    }

    #[test]
    fn test_up_without_down_is_not_a_repetition() {
        let mut det = detector(250, 100);
        let outcome = det.process(300);
        assert_eq!(outcome.crossing, Some(Crossing::Up));
        assert!(!outcome.repetition);
        assert_eq!(det.repetitions(), 0);
    }

    #[test]
    fn test_repeated_downs_count_once() {
        let mut det = detector(250, 100);
        let reps = det.process_all(&[-300, -300, -300, 300, 300]);
        assert_eq!(reps, 1, "Several downs followed by ups complete a single repetition");
    }

    #[test]
    fn test_accumulates_across_samples() {
        let mut det = detector(250, 100);
        assert_eq!(det.process(-100).crossing, None);
        assert_eq!(det.process(-100).crossing, None);
        assert_eq!(det.process(-100).crossing, Some(Crossing::Down));
        assert_eq!(det.accumulator(), 0, "Crossing zeroes the accumulator");
        assert_eq!(det.phase(), Phase::DownPhaseSeen);
    }

    #[test]
    fn test_recenter_discards_partial_motion() {
        let mut det = detector(250, 2);
        // Two samples of -200 would cross, but the window zeroes in between
        det.process(-100);
        let outcome = det.process(-100);
        assert!(outcome.rearm);
        assert_eq!(det.process(-200).crossing, None);
        assert_eq!(det.accumulator(), -200);
    }

    #[test]
    fn test_repetition_restarts_window() {
        let mut det = detector(250, 4);
        det.process(-260);
        det.process(0);
        let outcome = det.process(260);
        assert!(outcome.repetition);
        assert!(!outcome.rearm);
        assert_eq!(det.samples_since_recenter(), 1);
    }

    #[test]
    fn test_baseline_offsets_samples() {
        let mut det = RepetitionDetector::new(1000, DetectorSettings::new(250, 4));
        assert_eq!(det.process(1000).crossing, None);
        assert_eq!(det.process(740).crossing, Some(Crossing::Down));
        assert!(det.process(1260).repetition);
        assert_eq!(det.baseline(), 1000);
    }

    #[test]
    fn test_extreme_samples_do_not_overflow() {
        let mut det = RepetitionDetector::new(i32::MIN, DetectorSettings::new(u32::MAX, 1000));
        for _ in 0..10 {
            det.process(i32::MAX);
        }
        assert_eq!(det.phase(), Phase::Neutral);
    }

    #[test]
    fn test_settings_clamp_to_one() {
        let settings = DetectorSettings::new(0, 0);
        assert_eq!(settings.threshold, 1);
        assert_eq!(settings.window, 1);
    }

    #[test]
    fn test_many_cycles_count_exactly() {
        let mut det = detector(250, 4);
        let cycle = [0, -260, 260, 0];
        let samples: Vec<Sample> = cycle.iter().copied().cycle().take(cycle.len() * 20).collect();

        assert_eq!(det.process_all(&samples), 20);
    }
}
