use rc_protocol::{FULL_SPEED, MotorChannel, MotorSpeedCommand, encode_lines};

use crate::keys::KeyState;

/// Drive and steering speeds derived from the held keys.
///
/// Each axis is either off or at [`FULL_SPEED`]; there is no proportional control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorCommand {
    /// Positive drives forward.
    pub speed: i16,
    /// Positive turns right.
    pub turn: i16,
}

impl MotorCommand {
    pub const STOP: Self = Self { speed: 0, turn: 0 };
}

impl From<KeyState> for MotorCommand {
    fn from(keys: KeyState) -> Self {
        encode(keys.up, keys.down, keys.left, keys.right)
    }
}

/// Map key states to motor speeds. Forward wins over backward and left over
/// right when both are held.
pub fn encode(up: bool, down: bool, left: bool, right: bool) -> MotorCommand {
    let speed = if up {
        FULL_SPEED
    } else if down {
        -FULL_SPEED
    } else {
        0
    };
    let turn = if left {
        -FULL_SPEED
    } else if right {
        FULL_SPEED
    } else {
        0
    };
    MotorCommand { speed, turn }
}

/// Result of one [`CommandEncoder::encode`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub command: MotorCommand,
    /// Lines for the axes that changed, drive first.
    pub changed: Vec<MotorSpeedCommand>,
}

impl Encoded {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// The changed lines as one buffer, ready for a single transport write.
    pub fn wire(&self) -> String {
        encode_lines(&self.changed)
    }
}

/// Tracks what was last sent per axis so unchanged axes stay off the wire.
#[derive(Debug, Clone)]
pub struct CommandEncoder {
    drive: MotorChannel,
    steering: MotorChannel,
    last: MotorCommand,
}

impl Default for CommandEncoder {
    fn default() -> Self {
        Self::new(MotorChannel::DRIVE, MotorChannel::STEERING)
    }
}

impl CommandEncoder {
    /// A fresh encoder assumes the car starts stopped.
    pub fn new(drive: MotorChannel, steering: MotorChannel) -> Self {
        Self {
            drive,
            steering,
            last: MotorCommand::STOP,
        }
    }

    pub fn last(&self) -> MotorCommand {
        self.last
    }

    pub fn encode(&mut self, keys: KeyState) -> Encoded {
        self.encode_command(MotorCommand::from(keys))
    }

    /// Diff `command` against the last one and remember it.
    pub fn encode_command(&mut self, command: MotorCommand) -> Encoded {
        let mut changed = Vec::with_capacity(2);
        if command.speed != self.last.speed {
            changed.push(MotorSpeedCommand::new(self.drive, command.speed));
        }
        if command.turn != self.last.turn {
            changed.push(MotorSpeedCommand::new(self.steering, command.turn));
        }
        self.last = command;
        Encoded { command, changed }
    }
}
