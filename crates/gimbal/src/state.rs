use std::fmt;

use serde::{Deserialize, Serialize};

/// Widest pan range the gimbal can ever be configured for, in degrees either
/// side of center.
pub const PAN_BOUND: f64 = 180.0;

/// Widest tilt range, in degrees above or below level.
pub const TILT_BOUND: f64 = 90.0;

pub const SPEED_MIN: u8 = 1;
pub const SPEED_MAX: u8 = 10;
pub const DEFAULT_SPEED: u8 = 5;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Pan,
    Tilt,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::Pan => f.write_str("pan"),
            Axis::Tilt => f.write_str("tilt"),
        }
    }
}

/// Symmetric per-axis angle limits. Limits are always inside the documented
/// bounds; wider values are narrowed on construction.
#[derive(Copy, Clone, PartialEq, Debug, Deserialize)]
#[serde(from = "RawLimits")]
pub struct GimbalLimits {
    pan: f64,
    tilt: f64,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawLimits {
    pan: f64,
    tilt: f64,
}

impl Default for RawLimits {
    fn default() -> Self {
        RawLimits {
            pan: PAN_BOUND,
            tilt: TILT_BOUND,
        }
    }
}

impl From<RawLimits> for GimbalLimits {
    fn from(raw: RawLimits) -> Self {
        GimbalLimits::new(raw.pan, raw.tilt)
    }
}

impl Default for GimbalLimits {
    fn default() -> Self {
        GimbalLimits {
            pan: PAN_BOUND,
            tilt: TILT_BOUND,
        }
    }
}

impl GimbalLimits {
    pub fn new(pan: f64, tilt: f64) -> Self {
        let narrow = |value: f64, bound: f64| {
            if value.is_finite() {
                value.abs().min(bound)
            } else {
                bound
            }
        };

        GimbalLimits {
            pan: narrow(pan, PAN_BOUND),
            tilt: narrow(tilt, TILT_BOUND),
        }
    }

    pub fn limit(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pan => self.pan,
            Axis::Tilt => self.tilt,
        }
    }

    pub fn clamp(&self, axis: Axis, angle: f64) -> f64 {
        let limit = self.limit(axis);
        angle.clamp(-limit, limit)
    }

    pub fn contains(&self, axis: Axis, angle: f64) -> bool {
        let limit = self.limit(axis);
        (-limit..=limit).contains(&angle)
    }
}

/// Clamps a requested speed into `[SPEED_MIN, SPEED_MAX]`.
pub fn clamp_speed(value: i64) -> u8 {
    value.clamp(SPEED_MIN as i64, SPEED_MAX as i64) as u8
}

#[derive(Copy, Clone, PartialEq, Debug, Serialize)]
pub struct GimbalState {
    /// Horizontal angle in degrees, positive to the right.
    #[serde(serialize_with = "gl_serde_util::serialize_degrees")]
    pan_degrees: f64,

    /// Vertical angle in degrees, positive upward.
    #[serde(serialize_with = "gl_serde_util::serialize_degrees")]
    tilt_degrees: f64,

    speed: u8,
}

impl Default for GimbalState {
    fn default() -> Self {
        GimbalState::with_speed(DEFAULT_SPEED as i64)
    }
}

impl GimbalState {
    /// Centered gimbal at the given (clamped) speed.
    pub fn with_speed(speed: i64) -> Self {
        GimbalState {
            pan_degrees: 0.0,
            tilt_degrees: 0.0,
            speed: clamp_speed(speed),
        }
    }

    pub fn pan_degrees(&self) -> f64 {
        self.pan_degrees
    }

    pub fn tilt_degrees(&self) -> f64 {
        self.tilt_degrees
    }

    pub fn speed(&self) -> u8 {
        self.speed
    }

    pub fn angle(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Pan => self.pan_degrees,
            Axis::Tilt => self.tilt_degrees,
        }
    }

    /// Stores `angle` for `axis`, clamped into `limits`. Non-finite angles
    /// are ignored.
    pub(crate) fn set_angle(&mut self, axis: Axis, angle: f64, limits: &GimbalLimits) {
        if !angle.is_finite() {
            return;
        }

        let angle = limits.clamp(axis, angle);

        match axis {
            Axis::Pan => self.pan_degrees = angle,
            Axis::Tilt => self.tilt_degrees = angle,
        }
    }

    pub(crate) fn set_speed(&mut self, speed: i64) {
        self.speed = clamp_speed(speed);
    }
}

impl fmt::Display for GimbalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pan {:.1}°, tilt {:.1}°, speed {}",
            self.pan_degrees, self.tilt_degrees, self.speed
        )
    }
}

/// Advisory motion status shown to the user; not a concurrency gate.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MotionStatus {
    Idle,
    Moving,
}

impl Default for MotionStatus {
    fn default() -> Self {
        MotionStatus::Idle
    }
}

impl fmt::Display for MotionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionStatus::Idle => f.write_str("idle"),
            MotionStatus::Moving => f.write_str("moving"),
        }
    }
}
