//! Command dispatch
//!
//! Maps inbound commands onto session transitions and indicator changes.
//! Every command produces exactly one response. Anything long-running (the
//! detector, the winner blink) is spawned as a supervised [`Worker`]; the
//! command path only ever blocks to join one of them, which is bounded by
//! its period.

use super::runner::{run_blink, DetectorRun, Worker};
use super::session::{GameSession, SessionSnapshot};
use crate::config::GameConfig;
use crate::device::{Color, Devices};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Errors raised while decoding a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Unknown resource: {0}")]
    UnknownResource(String),

    #[error("Invalid command payload: {0}")]
    InvalidPayload(String),
}

/// A decoded control command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AssignColor(Color),
    Start,
    QueryCount,
    SetWinner,
    SetLooser,
    FakePushup,
    Reset,
}

impl Command {
    /// Decode a request for `resource` carrying `payload`
    ///
    /// Resource names may carry a leading slash. Only `assign_color` reads
    /// its payload; every other command ignores it.
    pub fn decode(resource: &str, payload: &[u8]) -> Result<Self, CommandError> {
        match resource.trim_start_matches('/') {
            "assign_color" => {
                let text = std::str::from_utf8(payload)
                    .map_err(|_| CommandError::InvalidPayload("color is not valid UTF-8".into()))?;
                text.parse::<Color>()
                    .map(Command::AssignColor)
                    .map_err(|e| CommandError::InvalidPayload(e.to_string()))
            }
            "start" => Ok(Command::Start),
            "count" => Ok(Command::QueryCount),
            "set_to_winner" => Ok(Command::SetWinner),
            "set_to_looser" => Ok(Command::SetLooser),
            "fake_pushup" => Ok(Command::FakePushup),
            "reset" => Ok(Command::Reset),
            other => Err(CommandError::UnknownResource(other.to_string())),
        }
    }

    /// Resource name this command is reached under
    pub fn resource(&self) -> &'static str {
        match self {
            Command::AssignColor(_) => "assign_color",
            Command::Start => "start",
            Command::QueryCount => "count",
            Command::SetWinner => "set_to_winner",
            Command::SetLooser => "set_to_looser",
            Command::FakePushup => "fake_pushup",
            Command::Reset => "reset",
        }
    }
}

/// Acknowledgment of a handled command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Ack,
    Count(u32),
}

/// Session snapshot plus the liveness of the background loops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControlStatus {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub detector_running: bool,
    pub blinking: bool,
}

#[derive(Debug, Default)]
struct Workers {
    detector: Option<Worker>,
    blink: Option<Worker>,
}

fn is_live(worker: &Option<Worker>) -> bool {
    worker.as_ref().is_some_and(|w| !w.is_finished())
}

/// Entry point for all commands of a player node
///
/// Dropping the surface stops and joins its background loops.
pub struct ControlSurface {
    session: Arc<GameSession>,
    devices: Devices,
    config: GameConfig,
    workers: Mutex<Workers>,
}

impl ControlSurface {
    pub fn new(session: Arc<GameSession>, devices: Devices, config: GameConfig) -> Self {
        Self {
            session,
            devices,
            config: config.validated(),
            workers: Mutex::new(Workers::default()),
        }
    }

    fn workers(&self) -> MutexGuard<'_, Workers> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> &Arc<GameSession> {
        &self.session
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Decode and handle a raw request
    ///
    /// Rejected requests leave the session untouched.
    pub fn dispatch(&self, resource: &str, payload: &[u8]) -> Result<Response, CommandError> {
        match Command::decode(resource, payload) {
            Ok(command) => Ok(self.handle(command)),
            Err(e) => {
                tracing::warn!(resource, "Rejected command: {}", e);
                Err(e)
            }
        }
    }

    /// Apply one command
    pub fn handle(&self, command: Command) -> Response {
        tracing::debug!(command = command.resource(), "Handling command");

        match command {
            Command::AssignColor(color) => {
                self.session.assign_color(color);
                self.devices.actuator.set(color);
                tracing::info!(%color, "Color assigned");
            }
            Command::Start => self.start(),
            Command::QueryCount => return Response::Count(self.session.snapshot_count()),
            Command::SetWinner => self.set_winner(),
            Command::SetLooser => self.set_looser(),
            Command::FakePushup => self.fake_pushup(),
            Command::Reset => self.reset(),
        }
        Response::Ack
    }

    fn start(&self) {
        // Held throughout so concurrent starts cannot orphan the new round
        let mut workers = self.workers();
        if let Some(old) = workers.detector.take() {
            old.stop();
        }
        if let Some(old) = workers.blink.take() {
            old.stop();
        }

        let round = self.session.start_round();
        tracing::info!(round, "Round started");

        let run = DetectorRun::new(
            Arc::clone(&self.session),
            round,
            self.devices.clone(),
            self.config.detector_settings(),
            self.config.max_consecutive_failures,
        );
        let period = self.config.sample_period();

        match Worker::spawn("pushup-detector", move |stop| run.run(&stop, period)) {
            Ok(worker) => workers.detector = Some(worker),
            Err(e) => tracing::error!(round, "Failed to spawn detector thread: {}", e),
        }
    }

    fn set_winner(&self) {
        let mut workers = self.workers();
        self.session.set_winner_indication();
        tracing::info!("Set to winner");

        if is_live(&workers.blink) {
            return;
        }

        let session = Arc::clone(&self.session);
        let actuator = Arc::clone(&self.devices.actuator);
        let period = self.config.blink_period();

        // A finished blink worker is replaced; dropping it only joins an exited thread
        workers.blink = match Worker::spawn("pushup-blink", move |stop| {
            run_blink(&session, actuator.as_ref(), period, &stop)
        }) {
            Ok(worker) => Some(worker),
            Err(e) => {
                tracing::error!("Failed to spawn blink thread: {}", e);
                None
            }
        };
    }

    fn set_looser(&self) {
        let mut workers = self.workers();
        self.session.set_looser_indication();
        if let Some(worker) = workers.blink.take() {
            worker.stop();
        }
        self.devices.actuator.set(Color::Off);
        tracing::info!("Set to looser");
    }

    fn fake_pushup(&self) {
        self.devices.actuator.set(Color::Off);
        std::thread::sleep(self.config.fake_pushup_pause());
        self.devices.actuator.set(self.config.event_color);

        let count = self.session.force_increment();
        self.devices.notifier.notify(count);
        tracing::info!(count, "Fake pushup");
    }

    fn reset(&self) {
        let ended = {
            let mut workers = self.workers();
            let ended = self.session.end_round();
            if let Some(worker) = workers.detector.take() {
                worker.stop();
            }
            if let Some(worker) = workers.blink.take() {
                worker.stop();
            }
            ended
        };

        self.devices.notifier.notify(self.session.snapshot_count());
        tracing::info!(round = ?ended, "Round reset");
    }

    /// Session snapshot and background loop liveness
    pub fn status(&self) -> ControlStatus {
        let workers = self.workers();
        ControlStatus {
            session: self.session.snapshot(),
            detector_running: is_live(&workers.detector),
            blinking: is_live(&workers.blink),
        }
    }
}
