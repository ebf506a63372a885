//! Background loops of a player node
//!
//! The detector and the winner blink each run on their own OS thread. A
//! [`Worker`] owns the thread together with its stop channel: dropping the
//! sending half disconnects the channel, which the loop observes at its next
//! wait. Waits are `recv_timeout(period)`, so a stop request is honored
//! within one period and joining a worker is bounded by it.

use super::detector::{DetectorSettings, RepetitionDetector, TickOutcome};
use super::session::{GameSession, Indication};
use crate::device::{Actuator, Color, Devices, Sample};
use crate::stats::store::RoundId;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receiving side of a worker's stop channel
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: Receiver<()>,
}

impl StopSignal {
    /// Whether a stop was requested, without blocking
    pub fn is_set(&self) -> bool {
        !matches!(self.rx.try_recv(), Err(TryRecvError::Empty))
    }

    /// Wait up to `period`; returns true as soon as a stop is requested
    pub fn wait(&self, period: Duration) -> bool {
        !matches!(self.rx.recv_timeout(period), Err(RecvTimeoutError::Timeout))
    }
}

/// Create a connected stop sender and signal
///
/// Nothing is ever sent: dropping the sender is the stop request.
pub fn stop_channel() -> (Sender<()>, StopSignal) {
    let (tx, rx) = crossbeam_channel::bounded::<()>(0);
    (tx, StopSignal { rx })
}

/// A supervised background thread
///
/// Stopping (explicitly or by drop) cancels the loop and joins the thread.
#[derive(Debug)]
pub struct Worker {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Spawn `body` on a named thread, handing it the stop signal
    pub fn spawn<F>(name: &str, body: F) -> io::Result<Self>
    where
        F: FnOnce(StopSignal) + Send + 'static,
    {
        let (stop_tx, stop) = stop_channel();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(stop))?;

        tracing::debug!(worker = name, "Worker started");
        Ok(Self {
            name: name.to_string(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Whether the loop has returned on its own (or was never running)
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the loop and wait for the thread to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop_tx.take());

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!(worker = %self.name, "Worker thread panicked");
            } else {
                tracing::debug!(worker = %self.name, "Worker joined");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Result of one detector tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    /// The baseline was read; detection starts with the next tick
    Baseline(Sample),
    /// A sample was fed to the detector
    Sampled(TickOutcome),
    /// The sensor read failed and the tick was skipped
    SensorFault,
    /// Too many consecutive failures; the run no longer reads the sensor
    Degraded,
    /// The round this run belongs to has ended
    RoundOver,
}

/// One detector run, bound to the round it was started for
pub struct DetectorRun {
    session: Arc<GameSession>,
    round: RoundId,
    devices: Devices,
    settings: DetectorSettings,
    max_failures: u32,
    detector: Option<RepetitionDetector>,
    consecutive_failures: u32,
    degraded: bool,
}

impl DetectorRun {
    pub fn new(
        session: Arc<GameSession>,
        round: RoundId,
        devices: Devices,
        settings: DetectorSettings,
        max_failures: u32,
    ) -> Self {
        Self {
            session,
            round,
            devices,
            settings,
            max_failures: max_failures.max(1),
            detector: None,
            consecutive_failures: 0,
            degraded: false,
        }
    }

    pub fn round(&self) -> RoundId {
        self.round
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The detector state, once the baseline has been read
    pub fn detector(&self) -> Option<&RepetitionDetector> {
        self.detector.as_ref()
    }

    /// Read one sample and apply it
    ///
    /// The session lock is only taken for the round check and the count
    /// update, never across the sensor read or a device call.
    pub fn tick(&mut self) -> TickStatus {
        if !self.session.is_round_current(self.round) {
            return TickStatus::RoundOver;
        }
        if self.degraded {
            return TickStatus::Degraded;
        }

        let sample = match self.devices.sampler.read() {
            Ok(sample) => sample,
            Err(e) => return self.record_failure(e),
        };
        self.consecutive_failures = 0;

        let Some(detector) = self.detector.as_mut() else {
            self.detector = Some(RepetitionDetector::new(sample, self.settings));
            self.devices.actuator.set(self.session.color());
            tracing::debug!(round = self.round, baseline = sample, "Baseline captured");
            return TickStatus::Baseline(sample);
        };

        let outcome = detector.process(sample);
        if let Some(crossing) = outcome.crossing {
            tracing::debug!(
                round = self.round,
                ?crossing,
                delta = i64::from(sample) - i64::from(detector.baseline()),
                "Threshold crossed"
            );
        }

        if outcome.repetition {
            match self.session.record_repetition(self.round) {
                Some(count) => {
                    self.devices.actuator.set(Color::Off);
                    self.devices.notifier.notify(count);
                    tracing::info!(round = self.round, count, "Repetition counted");
                }
                None => return TickStatus::RoundOver,
            }
        }

        if outcome.rearm {
            self.devices.actuator.set(self.session.color());
        }

        TickStatus::Sampled(outcome)
    }

    fn record_failure(&mut self, error: crate::device::SensorError) -> TickStatus {
        self.consecutive_failures += 1;
        tracing::warn!(
            round = self.round,
            failures = self.consecutive_failures,
            "Skipping tick: {}",
            error
        );

        if self.consecutive_failures >= self.max_failures {
            self.degraded = true;
            tracing::warn!(
                round = self.round,
                "Motion sensor keeps failing, detector idle until the round ends"
            );
            return TickStatus::Degraded;
        }
        TickStatus::SensorFault
    }

    /// Tick every `period` until stopped or the round ends
    pub fn run(mut self, stop: &StopSignal, period: Duration) {
        tracing::info!(round = self.round, "Detector started");

        while !stop.is_set() {
            if self.tick() == TickStatus::RoundOver {
                break;
            }
            if stop.wait(period) {
                break;
            }
        }

        let repetitions = self.detector.as_ref().map_or(0, RepetitionDetector::repetitions);
        tracing::info!(round = self.round, repetitions, "Detector stopped");
    }
}

/// Blink the team color while the session shows the winner indication
///
/// Alternates between off and the assigned color, one `period` each.
pub fn run_blink(
    session: &GameSession,
    actuator: &dyn Actuator,
    period: Duration,
    stop: &StopSignal,
) {
    tracing::info!("Winner blink started");

    loop {
        if session.indication() != Indication::Winner {
            break;
        }
        actuator.set(Color::Off);
        if stop.wait(period) {
            break;
        }

        if session.indication() != Indication::Winner {
            break;
        }
        actuator.set(session.color());
        if stop.wait(period) {
            break;
        }
    }

    tracing::info!("Winner blink stopped");
}
