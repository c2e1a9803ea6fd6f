use std::time::Duration;

use gl_gimbal::{GimbalCommand, GimbalSnapshot};

/// Frame length the easing rate is defined against.
const FRAME: Duration = Duration::from_millis(16);

/// Distance below which the displayed pose snaps onto the target.
const SNAP_DEGREES: f64 = 0.1;

/// Where the gimbal is drawn, as opposed to where it was commanded to be.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayPose {
    pub pan: f64,
    pub tilt: f64,

    // set by a stop, cleared by the next motion command
    stopped: bool,
}

impl DisplayPose {
    pub fn new(pan: f64, tilt: f64) -> Self {
        DisplayPose {
            pan,
            tilt,
            stopped: false,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Eases toward the commanded pose. Each 16 ms frame covers `speed / 100`
    /// of what is left. A stop freezes the pose where it is until a pan, tilt
    /// or home command arrives. Returns whether the pose changed.
    pub fn advance(&mut self, target: &GimbalSnapshot, elapsed: Duration) -> bool {
        self.observe(target);

        if self.stopped {
            return false;
        }

        let goal_pan = target.state.pan_degrees();
        let goal_tilt = target.state.tilt_degrees();

        let pan_diff = goal_pan - self.pan;
        let tilt_diff = goal_tilt - self.tilt;

        if pan_diff == 0.0 && tilt_diff == 0.0 {
            return false;
        }

        if pan_diff.abs() < SNAP_DEGREES && tilt_diff.abs() < SNAP_DEGREES {
            self.pan = goal_pan;
            self.tilt = goal_tilt;
            return true;
        }

        let per_frame = target.state.speed() as f64 / 100.0;
        let frames = elapsed.as_secs_f64() / FRAME.as_secs_f64();
        let fraction = 1.0 - (1.0 - per_frame).powf(frames);

        if fraction == 0.0 {
            return false;
        }

        self.pan += pan_diff * fraction;
        self.tilt += tilt_diff * fraction;

        true
    }

    /// Notes a stop or a motion command in `snapshot`.
    pub fn observe(&mut self, snapshot: &GimbalSnapshot) {
        match snapshot.last_command {
            Some(GimbalCommand::Stop) => self.stopped = true,
            Some(GimbalCommand::Pan { .. } | GimbalCommand::Tilt { .. } | GimbalCommand::Home) => {
                self.stopped = false
            }
            Some(GimbalCommand::SetSpeed { .. }) | None => {}
        }
    }

    pub fn settled_on(&self, target: &GimbalSnapshot) -> bool {
        self.pan == target.state.pan_degrees() && self.tilt == target.state.tilt_degrees()
    }
}
