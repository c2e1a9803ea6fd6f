//! Turns the text an LLM replied with into a typed [`GimbalCommand`].
//!
//! Two reply shapes are understood. The system prompt asks the model for a
//! flat JSON object such as `{"action":"pan","value":-45,"speed":5}`; when the
//! reply contains one it is used directly. Anything else is matched against a
//! small fixed keyword vocabulary. If the reply is not understood at all, the
//! operator's original utterance gets the same keyword treatment.

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::{
    clamp_speed, Axis, GimbalCommand, GimbalLimits, GimbalState, PanDirection, TiltDirection,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Degrees moved when a pan or tilt request carries no number.
    pub default_magnitude: f64,

    /// Speed used for "slowly".
    pub slow_speed: u8,

    /// Speed used for "quickly".
    pub fast_speed: u8,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            default_magnitude: 15.0,
            slow_speed: 2,
            fast_speed: 8,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpretError {
    #[error("command not understood: {0:?}")]
    Unrecognized(String),

    #[error("more than one angle requested ({})", format_magnitudes(.0))]
    AmbiguousMagnitude(Vec<f64>),

    #[error("{axis} to {target:.1}° is outside the allowed range of ±{limit}°")]
    OutOfRangeRequest { axis: Axis, target: f64, limit: f64 },
}

fn format_magnitudes(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{}°", v))
        .collect::<Vec<_>>()
        .join(", ")
}

/// A command extracted from text, with the speed the text asked for, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpretation {
    pub command: GimbalCommand,
    pub speed: Option<u8>,

    /// Confirmation text supplied by the model, if it sent one.
    pub message: Option<String>,
}

impl Interpretation {
    fn new(command: GimbalCommand) -> Self {
        Interpretation {
            command,
            speed: None,
            message: None,
        }
    }
}

pub type InterpretationResult = Result<Interpretation, InterpretError>;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
enum Keyword {
    Pan,
    Tilt,
    Left,
    Right,
    Up,
    Down,
    Stop,
    Home,
    Speed,
    Slow,
    Fast,
}

const VOCABULARY: &[(&str, Keyword)] = &[
    ("pan", Keyword::Pan),
    ("tilt", Keyword::Tilt),
    ("left", Keyword::Left),
    ("right", Keyword::Right),
    ("up", Keyword::Up),
    ("down", Keyword::Down),
    ("stop", Keyword::Stop),
    ("halt", Keyword::Stop),
    ("home", Keyword::Home),
    ("center", Keyword::Home),
    ("centre", Keyword::Home),
    ("speed", Keyword::Speed),
    ("slow", Keyword::Slow),
    ("slowly", Keyword::Slow),
    ("quick", Keyword::Fast),
    ("quickly", Keyword::Fast),
    ("fast", Keyword::Fast),
];

fn lookup(word: &str) -> Option<Keyword> {
    VOCABULARY
        .iter()
        .find(|(text, _)| *text == word)
        .map(|&(_, keyword)| keyword)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Word(Keyword),
    Number(f64),

    /// "to", "at", "of": may sit between `speed` and its value.
    Filler,

    /// Anything else.
    Other,
}

const FILLERS: &[&str] = &["to", "at", "of"];

const DEGREE_SUFFIXES: &[&str] = &[
    "-degrees", "-degree", "-degs", "-deg", "degrees", "degree", "degs", "deg", "°",
];

fn parse_number(word: &str) -> Option<f64> {
    let mut digits = word;
    for suffix in DEGREE_SUFFIXES {
        if let Some(stripped) = digits.strip_suffix(suffix) {
            digits = stripped;
            break;
        }
    }

    // reject things like "nan" and "inf" that f64's parser accepts
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '+' || c == '.') {
        return None;
    }

    digits.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn tokenize(text: &str) -> Vec<Token> {
    let lowered = text.to_lowercase();

    lowered
        .split(|c: char| {
            c.is_whitespace()
                || matches!(
                    c,
                    ',' | ';' | ':' | '!' | '?' | '"' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '='
                )
        })
        .map(|word| word.trim_matches(|c: char| matches!(c, '.' | '\'' | '`' | '*')))
        .filter(|word| !word.is_empty())
        .map(|word| {
            lookup(word)
                .map(Token::Word)
                .or_else(|| parse_number(word).map(Token::Number))
                .unwrap_or_else(|| {
                    if FILLERS.contains(&word) {
                        Token::Filler
                    } else {
                        Token::Other
                    }
                })
        })
        .collect()
}

/// Flat JSON object the system prompt asks the model to answer with.
#[derive(Debug, Deserialize)]
struct StructuredReply {
    action: String,
    value: Option<f64>,
    speed: Option<f64>,
    direction: Option<String>,
    message: Option<String>,
}

/// Finds the first `{ ... }` object in `text` that has no nested braces.
fn find_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let len = text[start..].find('}')?;
    Some(&text[start..=start + len])
}

pub struct Interpreter {
    config: InterpreterConfig,
    limits: GimbalLimits,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig, limits: GimbalLimits) -> Self {
        Interpreter { config, limits }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Interprets an LLM reply, falling back to the operator's utterance when
    /// the reply is not understood.
    pub fn interpret(&self, reply: &str, utterance: Option<&str>) -> InterpretationResult {
        let result = match find_object(reply).and_then(|obj| serde_json::from_str(obj).ok()) {
            Some(structured) => self.interpret_structured(structured),
            None => self.interpret_text(reply),
        };

        match (result, utterance) {
            (Err(InterpretError::Unrecognized(_)), Some(utterance)) => {
                debug!("reply {:?} not understood, trying utterance", reply);
                self.interpret_text(utterance)
            }
            (result, _) => result,
        }
    }

    /// Interprets and then checks the request against the current state.
    pub fn interpret_for(
        &self,
        state: &GimbalState,
        reply: &str,
        utterance: Option<&str>,
    ) -> InterpretationResult {
        let interpretation = self.interpret(reply, utterance)?;
        self.check_range(&interpretation, state)?;
        Ok(interpretation)
    }

    /// Fails if applying the interpretation to `state` would move an axis past
    /// its limit. Requests from the model are reported rather than clamped.
    pub fn check_range(
        &self,
        interpretation: &Interpretation,
        state: &GimbalState,
    ) -> Result<(), InterpretError> {
        if let Some((axis, delta)) = interpretation.command.delta() {
            let target = state.angle(axis) + delta;
            if !self.limits.contains(axis, target) {
                return Err(InterpretError::OutOfRangeRequest {
                    axis,
                    target,
                    limit: self.limits.limit(axis),
                });
            }
        }

        Ok(())
    }

    fn interpret_structured(&self, reply: StructuredReply) -> InterpretationResult {
        let value = reply.value.filter(|v| v.is_finite());

        let command = match reply.action.trim().to_lowercase().as_str() {
            "pan" => {
                let direction = match reply.direction.as_deref().map(str::parse::<PanDirection>) {
                    Some(Ok(direction)) => direction,
                    _ => PanDirection::from_sign(value.unwrap_or(0.0)),
                };
                GimbalCommand::Pan {
                    degrees: value.map_or(self.config.default_magnitude, f64::abs),
                    direction,
                }
            }
            "tilt" => {
                let direction = match reply.direction.as_deref().map(str::parse::<TiltDirection>) {
                    Some(Ok(direction)) => direction,
                    _ => TiltDirection::from_sign(value.unwrap_or(0.0)),
                };
                GimbalCommand::Tilt {
                    degrees: value.map_or(self.config.default_magnitude, f64::abs),
                    direction,
                }
            }
            "home" | "center" => GimbalCommand::Home,
            "stop" | "halt" => GimbalCommand::Stop,
            "speed" | "set_speed" => match value.or(reply.speed) {
                Some(value) => GimbalCommand::SetSpeed {
                    value: value.round() as i64,
                },
                None => return Err(InterpretError::Unrecognized(reply.action)),
            },
            _ => return Err(InterpretError::Unrecognized(reply.action)),
        };

        let speed = match command {
            GimbalCommand::SetSpeed { .. } => None,
            _ => reply
                .speed
                .filter(|v| v.is_finite())
                .map(|v| clamp_speed(v.round() as i64)),
        };

        Ok(Interpretation {
            command,
            speed,
            message: reply.message.filter(|m| !m.trim().is_empty()),
        })
    }

    /// Keyword matching over free text.
    pub fn interpret_text(&self, text: &str) -> InterpretationResult {
        let tokens = tokenize(text);

        let mut action = None;
        let mut axis = None;
        let mut direction = None;
        let mut qualifier = None;
        let mut speed_value = None;
        let mut magnitudes: Vec<f64> = Vec::new();
        let mut expect_speed = false;

        for token in tokens {
            // a speed value must follow `speed` directly, fillers aside
            let after_speed = expect_speed;
            expect_speed = false;

            match token {
                Token::Filler => expect_speed = after_speed,
                Token::Other => {}
                Token::Word(Keyword::Speed) => expect_speed = true,
                Token::Number(value) if after_speed && speed_value.is_none() => {
                    speed_value = Some(value);
                }
                Token::Number(value) => {
                    if !magnitudes.contains(&value) {
                        magnitudes.push(value);
                    }
                }
                Token::Word(keyword @ (Keyword::Slow | Keyword::Fast)) => {
                    qualifier.get_or_insert(keyword);
                }
                Token::Word(keyword) => {
                    action.get_or_insert(keyword);
                    match keyword {
                        Keyword::Pan => {
                            axis.get_or_insert(Axis::Pan);
                        }
                        Keyword::Tilt => {
                            axis.get_or_insert(Axis::Tilt);
                        }
                        Keyword::Left | Keyword::Right | Keyword::Up | Keyword::Down => {
                            direction.get_or_insert(keyword);
                        }
                        _ => {}
                    }
                }
            }
        }

        let speed = qualifier.map(|q| match q {
            Keyword::Slow => clamp_speed(self.config.slow_speed as i64),
            _ => clamp_speed(self.config.fast_speed as i64),
        });

        let action = match action {
            Some(action) => action,
            None => {
                // "speed 7" on its own
                return match speed_value {
                    Some(value) => Ok(Interpretation::new(GimbalCommand::SetSpeed {
                        value: value.round() as i64,
                    })),
                    None => Err(InterpretError::Unrecognized(text.trim().to_owned())),
                };
            }
        };

        let mut interpretation = match action {
            Keyword::Stop => Interpretation::new(GimbalCommand::Stop),
            Keyword::Home => Interpretation::new(GimbalCommand::Home),
            _ => {
                let axis = match (axis, direction) {
                    (Some(axis), _) => axis,
                    (None, Some(Keyword::Left | Keyword::Right)) => Axis::Pan,
                    (None, _) => Axis::Tilt,
                };

                let signed = match magnitudes.as_slice() {
                    [] => self.config.default_magnitude,
                    [value] => *value,
                    _ => {
                        let mut distinct: Vec<f64> = Vec::new();
                        for value in magnitudes.iter().map(|v| v.abs()) {
                            if !distinct.contains(&value) {
                                distinct.push(value);
                            }
                        }
                        if distinct.len() > 1 {
                            return Err(InterpretError::AmbiguousMagnitude(distinct));
                        }
                        distinct[0]
                    }
                };
                let degrees = signed.abs();

                let command = match axis {
                    Axis::Pan => {
                        let direction = match direction {
                            Some(Keyword::Left) => PanDirection::Left,
                            Some(Keyword::Right) => PanDirection::Right,
                            Some(_) => {
                                return Err(InterpretError::Unrecognized(text.trim().to_owned()))
                            }
                            None => PanDirection::from_sign(signed),
                        };
                        GimbalCommand::Pan { degrees, direction }
                    }
                    Axis::Tilt => {
                        let direction = match direction {
                            Some(Keyword::Up) => TiltDirection::Up,
                            Some(Keyword::Down) => TiltDirection::Down,
                            Some(_) => {
                                return Err(InterpretError::Unrecognized(text.trim().to_owned()))
                            }
                            None => TiltDirection::from_sign(signed),
                        };
                        GimbalCommand::Tilt { degrees, direction }
                    }
                };

                Interpretation::new(command)
            }
        };

        if matches!(interpretation.command, GimbalCommand::Pan { .. } | GimbalCommand::Tilt { .. })
        {
            interpretation.speed = match speed_value {
                Some(value) => Some(clamp_speed(value.round() as i64)),
                None => speed,
            };
        }

        Ok(interpretation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interpreter() -> Interpreter {
        Interpreter::new(InterpreterConfig::default(), GimbalLimits::default())
    }

    fn pan(degrees: f64, direction: PanDirection) -> GimbalCommand {
        GimbalCommand::Pan { degrees, direction }
    }

    fn tilt(degrees: f64, direction: TiltDirection) -> GimbalCommand {
        GimbalCommand::Tilt { degrees, direction }
    }

    #[test]
    fn pan_left_with_degrees() {
        let result = interpreter().interpret("pan left 45 degrees", None).unwrap();
        assert_eq!(result.command, pan(45.0, PanDirection::Left));
        assert_eq!(result.speed, None);
    }

    #[test]
    fn tilt_up_slowly_uses_default_magnitude_and_slow_preset() {
        let interpreter = interpreter();
        let result = interpreter.interpret("tilt up slowly", None).unwrap();

        assert_eq!(
            result.command,
            tilt(interpreter.config().default_magnitude, TiltDirection::Up)
        );
        assert_eq!(result.speed, Some(interpreter.config().slow_speed));
    }

    #[test]
    fn quickly_maps_to_fast_preset() {
        let result = interpreter().interpret("Pan RIGHT 20 quickly!", None).unwrap();
        assert_eq!(result.command, pan(20.0, PanDirection::Right));
        assert_eq!(result.speed, Some(8));
    }

    #[test]
    fn stop_and_home() {
        let interpreter = interpreter();
        assert_eq!(
            interpreter.interpret("stop", None).unwrap().command,
            GimbalCommand::Stop
        );
        assert_eq!(
            interpreter.interpret("go home", None).unwrap().command,
            GimbalCommand::Home
        );
        assert_eq!(
            interpreter.interpret("Center the camera.", None).unwrap().command,
            GimbalCommand::Home
        );
    }

    #[test]
    fn gibberish_is_unrecognized() {
        assert!(matches!(
            interpreter().interpret("asdkjf", None),
            Err(InterpretError::Unrecognized(_))
        ));
        assert!(matches!(
            interpreter().interpret("", None),
            Err(InterpretError::Unrecognized(_))
        ));
    }

    #[test]
    fn first_direction_wins() {
        let result = interpreter().interpret("left, no wait, right 10", None).unwrap();
        assert_eq!(result.command, pan(10.0, PanDirection::Left));
    }

    #[test]
    fn direction_alone_implies_axis() {
        let interpreter = interpreter();
        assert_eq!(
            interpreter.interpret("look down 30°", None).unwrap().command,
            tilt(30.0, TiltDirection::Down)
        );
        assert_eq!(
            interpreter.interpret("a bit to the right", None).unwrap().command,
            pan(15.0, PanDirection::Right)
        );
    }

    #[test]
    fn signed_magnitude_decides_missing_direction() {
        let result = interpreter().interpret("pan -30", None).unwrap();
        assert_eq!(result.command, pan(30.0, PanDirection::Left));
    }

    #[test]
    fn direction_from_other_axis_is_unrecognized() {
        assert!(matches!(
            interpreter().interpret("pan up 10", None),
            Err(InterpretError::Unrecognized(_))
        ));
    }

    #[test]
    fn two_different_angles_are_ambiguous() {
        assert_eq!(
            interpreter().interpret("pan left 30 or 40 degrees", None),
            Err(InterpretError::AmbiguousMagnitude(vec![30.0, 40.0]))
        );
    }

    #[test]
    fn repeated_angle_is_not_ambiguous() {
        let result = interpreter()
            .interpret("Panning left 45 degrees (45°)", None)
            .unwrap();
        assert_eq!(result.command, pan(45.0, PanDirection::Left));
    }

    #[test]
    fn number_after_speed_is_speed_not_angle() {
        let interpreter = interpreter();

        let result = interpreter.interpret("pan left 45 at speed 3", None).unwrap();
        assert_eq!(result.command, pan(45.0, PanDirection::Left));
        assert_eq!(result.speed, Some(3));

        let result = interpreter.interpret("set speed to 7", None).unwrap();
        assert_eq!(result.command, GimbalCommand::SetSpeed { value: 7 });
    }

    #[test]
    fn speed_value_must_follow_speed() {
        let result = interpreter()
            .interpret("at full speed, pan left 40 degrees", None)
            .unwrap();
        assert_eq!(result.command, pan(40.0, PanDirection::Left));
        assert_eq!(result.speed, None);

        let result = interpreter()
            .interpret("speed of 4, then tilt up 20", None)
            .unwrap();
        assert_eq!(result.command, tilt(20.0, TiltDirection::Up));
        assert_eq!(result.speed, Some(4));
    }

    #[test]
    fn hyphenated_degrees_are_magnitudes() {
        let result = interpreter().interpret("a 45-degree pan to the left", None).unwrap();
        assert_eq!(result.command, pan(45.0, PanDirection::Left));

        let result = interpreter().interpret("tilt down 10-deg", None).unwrap();
        assert_eq!(result.command, tilt(10.0, TiltDirection::Down));
    }

    #[test]
    fn nan_is_not_a_number() {
        let result = interpreter().interpret("pan left nan", None).unwrap();
        assert_eq!(result.command, pan(15.0, PanDirection::Left));
    }

    #[test]
    fn structured_reply_with_signed_value() {
        let reply = r#"Sure! {"action":"pan","value":-45,"speed":5,"message":"Panning left 45 degrees"}"#;
        let result = interpreter().interpret(reply, None).unwrap();

        assert_eq!(result.command, pan(45.0, PanDirection::Left));
        assert_eq!(result.speed, Some(5));
        assert_eq!(result.message.as_deref(), Some("Panning left 45 degrees"));
    }

    #[test]
    fn structured_reply_direction_field_wins_over_sign() {
        let reply = r#"{"action":"tilt","value":30,"direction":"down"}"#;
        let result = interpreter().interpret(reply, None).unwrap();
        assert_eq!(result.command, tilt(30.0, TiltDirection::Down));
    }

    #[test]
    fn structured_speed_is_clamped() {
        let reply = r#"{"action":"tilt","value":10,"speed":42}"#;
        let result = interpreter().interpret(reply, None).unwrap();
        assert_eq!(result.speed, Some(10));

        let reply = r#"{"action":"speed","value":3}"#;
        let result = interpreter().interpret(reply, None).unwrap();
        assert_eq!(result.command, GimbalCommand::SetSpeed { value: 3 });
        assert_eq!(result.speed, None);
    }

    #[test]
    fn malformed_json_falls_back_to_keywords() {
        let reply = r#"{"action": pan left} pan left 20"#;
        let result = interpreter().interpret(reply, None).unwrap();
        assert_eq!(result.command, pan(20.0, PanDirection::Left));
    }

    #[test]
    fn unknown_reply_falls_back_to_utterance() {
        let result = interpreter()
            .interpret("I'm not sure what you mean.", Some("tilt down 5"))
            .unwrap();
        assert_eq!(result.command, tilt(5.0, TiltDirection::Down));

        let result = interpreter().interpret(r#"{"action":"dance"}"#, Some("stop"));
        assert_eq!(result.unwrap().command, GimbalCommand::Stop);
    }

    #[test]
    fn ambiguity_in_reply_is_not_masked_by_utterance() {
        let result = interpreter().interpret("pan 10 20", Some("pan left 10"));
        assert!(matches!(result, Err(InterpretError::AmbiguousMagnitude(_))));
    }

    #[test]
    fn out_of_range_is_reported_not_clamped() {
        let interpreter = interpreter();
        let near_edge = {
            let mut state = GimbalState::default();
            state.set_angle(Axis::Pan, -170.0, &GimbalLimits::default());
            state
        };

        let result = interpreter.interpret_for(&near_edge, "pan left 45", None);
        assert_eq!(
            result,
            Err(InterpretError::OutOfRangeRequest {
                axis: Axis::Pan,
                target: -215.0,
                limit: 180.0,
            })
        );

        let centered = GimbalState::default();
        assert!(interpreter.interpret_for(&centered, "pan left 45", None).is_ok());
        assert!(interpreter.interpret_for(&centered, "tilt up 120", None).is_err());
        assert!(interpreter.interpret_for(&near_edge, "go home", None).is_ok());
    }

    #[test]
    fn range_check_respects_configured_limits() {
        let interpreter = Interpreter::new(InterpreterConfig::default(), GimbalLimits::new(90.0, 30.0));
        let state = GimbalState::default();

        assert!(interpreter.interpret_for(&state, "pan right 90", None).is_ok());
        assert!(interpreter.interpret_for(&state, "pan right 91", None).is_err());
        assert!(interpreter.interpret_for(&state, "tilt down 31", None).is_err());
    }
}
