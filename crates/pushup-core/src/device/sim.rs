//! Software stand-ins for the device collaborators
//!
//! Used by the `pushup-player` binary when no accelerometer is attached and
//! by the test suites, which need scripted readings and observable side effects.

use super::{Actuator, Color, MotionSampler, NotificationSink, Sample, SensorError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Synthetic pushup waveform
///
/// Each cycle holds the rest level for `rest_samples`, then dips by
/// `amplitude` for `half_cycle` samples and rises by `amplitude` for another
/// `half_cycle` samples. The first reading is always the rest level, so it
/// makes a clean baseline.
#[derive(Debug)]
pub struct SimulatedSampler {
    rest_level: Sample,
    amplitude: Sample,
    half_cycle: usize,
    rest_samples: usize,
    position: AtomicUsize,
}

impl SimulatedSampler {
    /// Create a sampler producing one repetition every `2 * half_cycle + rest_samples` reads
    pub fn new(rest_level: Sample, amplitude: Sample, half_cycle: usize, rest_samples: usize) -> Self {
        Self {
            rest_level,
            amplitude,
            half_cycle: half_cycle.max(1),
            rest_samples,
            position: AtomicUsize::new(0),
        }
    }

    /// Number of reads per simulated repetition
    pub fn cycle_len(&self) -> usize {
        self.rest_samples + 2 * self.half_cycle
    }

    /// Total reads served so far
    pub fn reads(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }

    fn sample_at(&self, position: usize) -> Sample {
        let phase = position % self.cycle_len();
        if phase < self.rest_samples {
            self.rest_level
        } else if phase < self.rest_samples + self.half_cycle {
            self.rest_level.saturating_sub(self.amplitude)
        } else {
            self.rest_level.saturating_add(self.amplitude)
        }
    }
}

impl Default for SimulatedSampler {
    /// Earth-gravity rest level on a ±2g 12-bit part; every dip and rise
    /// sample crosses the default threshold on its own, one repetition per
    /// two seconds at the default sampling period
    fn default() -> Self {
        Self::new(1024, 260, 2, 6)
    }
}

impl MotionSampler for SimulatedSampler {
    fn read(&self) -> Result<Sample, SensorError> {
        let position = self.position.fetch_add(1, Ordering::Relaxed);
        Ok(self.sample_at(position))
    }
}

/// Replays a fixed script of readings
///
/// Once the script is exhausted every read returns `idle`. Counts reads
/// and remembers which threads performed them.
#[derive(Debug)]
pub struct ScriptedSampler {
    script: Mutex<VecDeque<Result<Sample, SensorError>>>,
    idle: Sample,
    reads: AtomicUsize,
    readers: Mutex<Vec<std::thread::ThreadId>>,
}

impl ScriptedSampler {
    pub fn new<I>(script: I, idle: Sample) -> Self
    where
        I: IntoIterator<Item = Result<Sample, SensorError>>,
    {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            idle,
            reads: AtomicUsize::new(0),
            readers: Mutex::new(Vec::new()),
        }
    }

    /// Baseline reading followed by `samples` given relative to it
    pub fn with_baseline(baseline: Sample, samples: &[Sample]) -> Self {
        let script = std::iter::once(baseline)
            .chain(samples.iter().map(|s| baseline + s))
            .map(Ok);
        Self::new(script, baseline)
    }

    /// A sampler that returns `value` forever
    pub fn constant(value: Sample) -> Self {
        Self::new(std::iter::empty(), value)
    }

    /// Total reads served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Distinct threads that have read since the last [`clear_readers`](Self::clear_readers)
    pub fn reader_threads(&self) -> usize {
        lock(&self.readers).len()
    }

    pub fn clear_readers(&self) {
        lock(&self.readers).clear();
    }
}

impl MotionSampler for ScriptedSampler {
    fn read(&self) -> Result<Sample, SensorError> {
        self.reads.fetch_add(1, Ordering::SeqCst);

        let id = std::thread::current().id();
        {
            let mut readers = lock(&self.readers);
            if !readers.contains(&id) {
                readers.push(id);
            }
        }

        lock(&self.script).pop_front().unwrap_or(Ok(self.idle))
    }
}

/// Actuator that logs every change and remembers the current color
#[derive(Debug, Default)]
pub struct LogActuator {
    current: Mutex<Color>,
}

impl LogActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Color {
        *lock(&self.current)
    }
}

impl Actuator for LogActuator {
    fn set(&self, color: Color) {
        let mut current = lock(&self.current);
        if *current != color {
            tracing::debug!(from = %*current, to = %color, "Indicator changed");
        }
        *current = color;
    }
}

/// Actuator that records every requested color in order
#[derive(Debug, Default)]
pub struct RecordingActuator {
    changes: Mutex<Vec<Color>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<Color> {
        lock(&self.changes).clone()
    }

    pub fn last(&self) -> Option<Color> {
        lock(&self.changes).last().copied()
    }

    /// How many times `color` was requested
    pub fn count_of(&self, color: Color) -> usize {
        lock(&self.changes).iter().filter(|c| **c == color).count()
    }

    pub fn clear(&self) {
        lock(&self.changes).clear();
    }
}

impl Actuator for RecordingActuator {
    fn set(&self, color: Color) {
        lock(&self.changes).push(color);
    }
}

/// Notifier that drops every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, count: u32) {
        tracing::trace!(count, "No observers attached, notification dropped");
    }
}

/// Notifier that records every published count in order
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    counts: Mutex<Vec<u32>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> Vec<u32> {
        lock(&self.counts).clone()
    }

    pub fn last(&self) -> Option<u32> {
        lock(&self.counts).last().copied()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, count: u32) {
        lock(&self.counts).push(count);
    }
}
