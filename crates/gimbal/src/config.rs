use serde::Deserialize;

use crate::{GimbalLimits, DEFAULT_SPEED};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GimbalConfig {
    pub limits: GimbalLimits,

    /// Speed the gimbal starts with, 1 to 10.
    pub default_speed: u8,

    /// Degrees moved by a manual pan or tilt without an explicit angle.
    pub manual_step: f64,
}

impl Default for GimbalConfig {
    fn default() -> Self {
        GimbalConfig {
            limits: GimbalLimits::default(),
            default_speed: DEFAULT_SPEED,
            manual_step: 10.0,
        }
    }
}
