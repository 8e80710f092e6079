use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Verb terminating every motor command line.
pub const SET_MOTOR_SPEED: &str = "set-motor-speed";

/// Magnitude sent for a fully engaged axis. Motors are either off or at this speed.
pub const FULL_SPEED: i16 = 255;

/// Identifier of a motor on the car's onboard controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MotorChannel(pub u8);

impl MotorChannel {
    pub const DRIVE: Self = Self(1);
    pub const STEERING: Self = Self(3);
}

impl fmt::Display for MotorChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One `<channel> <value> set-motor-speed` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotorSpeedCommand {
    pub channel: MotorChannel,
    pub value: i16,
}

impl MotorSpeedCommand {
    pub fn new(channel: MotorChannel, value: i16) -> Self {
        Self { channel, value }
    }

    /// The command as sent on the wire, newline included.
    pub fn to_line(&self) -> String {
        format!("{self}\n")
    }
}

impl fmt::Display for MotorSpeedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {SET_MOTOR_SPEED}",
            self.channel,
            format_value(self.value)
        )
    }
}

impl FromStr for MotorSpeedCommand {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_line(s)
    }
}

/// Encode a speed value the way the receiver's stack-based parser expects it.
///
/// The receiver has no negative literals, so `-n` is written as `0 n -`
/// (push 0, push n, subtract).
pub fn format_value(value: i16) -> String {
    if value < 0 {
        format!("0 {} -", value.unsigned_abs())
    } else {
        value.to_string()
    }
}

/// Concatenate commands into a single buffer, one line each, in order.
pub fn encode_lines<'a>(commands: impl IntoIterator<Item = &'a MotorSpeedCommand>) -> String {
    commands.into_iter().map(MotorSpeedCommand::to_line).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command `{0}`")]
    UnknownVerb(String),
    #[error("invalid motor channel `{0}`")]
    InvalidChannel(String),
    #[error("invalid speed value `{0}`")]
    InvalidValue(String),
    #[error("speed value {0} out of range")]
    OutOfRange(i64),
}

/// Parse a single command line, with or without its trailing newline.
pub fn parse_line(line: &str) -> Result<MotorSpeedCommand, ParseError> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let Some((verb, rest)) = tokens.split_last() else {
        return Err(ParseError::Empty);
    };
    if *verb != SET_MOTOR_SPEED {
        return Err(ParseError::UnknownVerb(verb.to_string()));
    }
    let Some((channel, value)) = rest.split_first() else {
        return Err(ParseError::InvalidValue(String::new()));
    };

    let channel = channel
        .parse::<u8>()
        .map(MotorChannel)
        .map_err(|_| ParseError::InvalidChannel(channel.to_string()))?;

    let value = match value {
        [plain] => parse_magnitude(plain)?,
        ["0", magnitude, "-"] => -parse_magnitude(magnitude)?,
        other => return Err(ParseError::InvalidValue(other.join(" "))),
    };
    let value = i16::try_from(value).map_err(|_| ParseError::OutOfRange(value))?;

    Ok(MotorSpeedCommand { channel, value })
}

fn parse_magnitude(token: &str) -> Result<i64, ParseError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidValue(token.to_string()));
    }
    token
        .parse::<i64>()
        .map_err(|_| ParseError::InvalidValue(token.to_string()))
}
