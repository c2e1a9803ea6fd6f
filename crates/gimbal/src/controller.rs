use chrono::Local;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::{
    GimbalCommand, GimbalConfig, GimbalLimits, GimbalState, InterpretError, Interpretation,
    Interpreter, MotionStatus,
};

/// What the visualization side gets to see after every change.
#[derive(Clone, Debug, Serialize)]
pub struct GimbalSnapshot {
    pub sequence: u64,
    pub state: GimbalState,
    pub status: MotionStatus,
    pub last_command: Option<GimbalCommand>,

    #[serde(serialize_with = "gl_serde_util::serialize_time")]
    pub at: chrono::DateTime<Local>,
}

/// Applies `command` to `state`. Total: out-of-range results are clamped,
/// non-finite deltas are ignored.
pub fn transition(
    state: &GimbalState,
    status: MotionStatus,
    command: &GimbalCommand,
    limits: &GimbalLimits,
) -> (GimbalState, MotionStatus) {
    let mut next = *state;

    let status = match *command {
        GimbalCommand::Pan { .. } | GimbalCommand::Tilt { .. } => {
            if let Some((axis, delta)) = command.delta() {
                next.set_angle(axis, state.angle(axis) + delta, limits);
            }
            MotionStatus::Moving
        }
        GimbalCommand::Home => {
            next = GimbalState::with_speed(state.speed() as i64);
            MotionStatus::Idle
        }
        GimbalCommand::Stop => MotionStatus::Idle,
        GimbalCommand::SetSpeed { value } => {
            next.set_speed(value);
            status
        }
    };

    (next, status)
}

/// Sole writer of the gimbal state.
pub struct GimbalController {
    state: GimbalState,
    status: MotionStatus,
    limits: GimbalLimits,
    sequence: u64,
    feed: watch::Sender<GimbalSnapshot>,
}

impl GimbalController {
    pub fn new(config: &GimbalConfig) -> (Self, watch::Receiver<GimbalSnapshot>) {
        let state = GimbalState::with_speed(config.default_speed as i64);
        let status = MotionStatus::Idle;

        let (feed, feed_rx) = watch::channel(GimbalSnapshot {
            sequence: 0,
            state,
            status,
            last_command: None,
            at: Local::now(),
        });

        let controller = GimbalController {
            state,
            status,
            limits: config.limits,
            sequence: 0,
            feed,
        };

        (controller, feed_rx)
    }

    pub fn state(&self) -> &GimbalState {
        &self.state
    }

    pub fn status(&self) -> MotionStatus {
        self.status
    }

    pub fn limits(&self) -> &GimbalLimits {
        &self.limits
    }

    pub fn subscribe(&self) -> watch::Receiver<GimbalSnapshot> {
        self.feed.subscribe()
    }

    pub fn snapshot(&self) -> GimbalSnapshot {
        self.feed.borrow().clone()
    }

    /// Manual path: always succeeds.
    pub fn apply(&mut self, command: &GimbalCommand) -> GimbalSnapshot {
        let (state, status) = transition(&self.state, self.status, command, &self.limits);

        if status != self.status {
            info!("gimbal is now {}", status);
        }

        self.state = state;
        self.status = status;
        self.publish(Some(*command))
    }

    /// LLM path: rejects requests whose target lies outside the limits
    /// before touching anything, then applies the requested speed and the
    /// command.
    pub fn apply_interpretation(
        &mut self,
        interpreter: &Interpreter,
        interpretation: &Interpretation,
    ) -> Result<GimbalSnapshot, InterpretError> {
        interpreter.check_range(interpretation, &self.state)?;

        if let Some(speed) = interpretation.speed {
            self.state.set_speed(speed as i64);
        }

        Ok(self.apply(&interpretation.command))
    }

    fn publish(&mut self, last_command: Option<GimbalCommand>) -> GimbalSnapshot {
        self.sequence += 1;

        let snapshot = GimbalSnapshot {
            sequence: self.sequence,
            state: self.state,
            status: self.status,
            last_command,
            at: Local::now(),
        };

        debug!("state #{}: {}", snapshot.sequence, snapshot.state);

        // send_replace keeps the latest value even when nobody is watching
        self.feed.send_replace(snapshot.clone());

        snapshot
    }
}
