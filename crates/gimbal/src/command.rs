use std::{fmt, str::FromStr};

use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

use crate::state::Axis;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    Left,
    Right,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TiltDirection {
    Up,
    Down,
}

impl PanDirection {
    pub fn sign(self) -> f64 {
        match self {
            PanDirection::Left => -1.0,
            PanDirection::Right => 1.0,
        }
    }

    pub fn from_sign(value: f64) -> Self {
        if value < 0.0 {
            PanDirection::Left
        } else {
            PanDirection::Right
        }
    }
}

impl TiltDirection {
    pub fn sign(self) -> f64 {
        match self {
            TiltDirection::Up => 1.0,
            TiltDirection::Down => -1.0,
        }
    }

    pub fn from_sign(value: f64) -> Self {
        if value < 0.0 {
            TiltDirection::Down
        } else {
            TiltDirection::Up
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid direction {0:?}")]
pub struct ParseDirectionError(String);

impl FromStr for PanDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(PanDirection::Left),
            "right" | "r" => Ok(PanDirection::Right),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

impl FromStr for TiltDirection {
    type Err = ParseDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "u" => Ok(TiltDirection::Up),
            "down" | "d" => Ok(TiltDirection::Down),
            _ => Err(ParseDirectionError(s.to_owned())),
        }
    }
}

impl fmt::Display for PanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PanDirection::Left => f.write_str("left"),
            PanDirection::Right => f.write_str("right"),
        }
    }
}

impl fmt::Display for TiltDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiltDirection::Up => f.write_str("up"),
            TiltDirection::Down => f.write_str("down"),
        }
    }
}

/// A single discrete gimbal action. Degrees are unsigned magnitudes; the
/// direction carries the sign.
#[derive(Clone, Copy, PartialEq, Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GimbalCommand {
    Pan {
        degrees: f64,
        direction: PanDirection,
    },
    Tilt {
        degrees: f64,
        direction: TiltDirection,
    },
    Home,
    Stop,
    SetSpeed {
        value: i64,
    },
}

impl GimbalCommand {
    /// The axis this command moves along with its signed delta, if it is a
    /// motion command.
    pub fn delta(&self) -> Option<(Axis, f64)> {
        match *self {
            GimbalCommand::Pan { degrees, direction } => Some((Axis::Pan, degrees * direction.sign())),
            GimbalCommand::Tilt { degrees, direction } => {
                Some((Axis::Tilt, degrees * direction.sign()))
            }
            _ => None,
        }
    }
}

impl fmt::Display for GimbalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GimbalCommand::Pan { degrees, direction } => write!(f, "pan {} {}°", direction, degrees),
            GimbalCommand::Tilt { degrees, direction } => {
                write!(f, "tilt {} {}°", direction, degrees)
            }
            GimbalCommand::Home => f.write_str("home"),
            GimbalCommand::Stop => f.write_str("stop"),
            GimbalCommand::SetSpeed { value } => write!(f, "speed {}", value),
        }
    }
}

/// Manual controls, typed directly by the operator. These bypass the
/// interpreter.
#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "kebab-case")]
pub enum ManualCommand {
    /// pan left or right, by the configured step unless degrees are given
    Pan {
        direction: PanDirection,
        degrees: Option<f64>,
    },

    /// tilt up or down, by the configured step unless degrees are given
    Tilt {
        direction: TiltDirection,
        degrees: Option<f64>,
    },

    /// return to center
    Home,

    /// stop moving
    Stop,

    /// set the speed, 1 (slowest) to 10 (fastest)
    Speed {
        #[clap(allow_hyphen_values = true)]
        value: i64,
    },
}

impl ManualCommand {
    pub fn into_command(self, step: f64) -> GimbalCommand {
        match self {
            ManualCommand::Pan { direction, degrees } => GimbalCommand::Pan {
                degrees: degrees.unwrap_or(step).abs(),
                direction,
            },
            ManualCommand::Tilt { direction, degrees } => GimbalCommand::Tilt {
                degrees: degrees.unwrap_or(step).abs(),
                direction,
            },
            ManualCommand::Home => GimbalCommand::Home,
            ManualCommand::Stop => GimbalCommand::Stop,
            ManualCommand::Speed { value } => GimbalCommand::SetSpeed { value },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_parse_case_insensitively() {
        assert_eq!("LEFT".parse::<PanDirection>(), Ok(PanDirection::Left));
        assert_eq!("r".parse::<PanDirection>(), Ok(PanDirection::Right));
        assert_eq!("Up".parse::<TiltDirection>(), Ok(TiltDirection::Up));
        assert!("up".parse::<PanDirection>().is_err());
    }

    #[test]
    fn delta_carries_direction_sign() {
        let left = GimbalCommand::Pan {
            degrees: 45.0,
            direction: PanDirection::Left,
        };
        let down = GimbalCommand::Tilt {
            degrees: 10.0,
            direction: TiltDirection::Down,
        };

        assert_eq!(left.delta(), Some((Axis::Pan, -45.0)));
        assert_eq!(down.delta(), Some((Axis::Tilt, -10.0)));
        assert_eq!(GimbalCommand::Home.delta(), None);
    }

    #[test]
    fn manual_command_uses_step_when_degrees_missing() {
        let cmd = ManualCommand::Pan {
            direction: PanDirection::Right,
            degrees: None,
        };

        assert_eq!(
            cmd.into_command(10.0),
            GimbalCommand::Pan {
                degrees: 10.0,
                direction: PanDirection::Right
            }
        );
    }

    #[test]
    fn command_serializes_with_action_tag() {
        let json = serde_json::to_value(GimbalCommand::Tilt {
            degrees: 5.0,
            direction: TiltDirection::Up,
        })
        .unwrap();

        assert_eq!(json["action"], "tilt");
        assert_eq!(json["direction"], "up");
    }
}
