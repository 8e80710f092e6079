use rc_protocol::MotorSpeedCommand;
use tracing::{debug, error};

use crate::config::ChannelConfig;
use crate::direction::Direction;
use crate::error::ControlError;
use crate::keys::{HeldKeys, KeyEvent, KeyState};
use crate::motion::{CommandEncoder, Encoded, MotorCommand};
use crate::sink::DisplaySink;
use crate::transport::Transport;

/// What one input change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub keys: KeyState,
    pub direction: Direction,
    pub direction_changed: bool,
    pub command: MotorCommand,
    /// Lines written to the transport, empty when no axis changed.
    pub sent: Vec<MotorSpeedCommand>,
}

/// Owns the key state and turns every change into display updates and
/// motor commands.
pub struct Controller<D, T> {
    held: HeldKeys,
    direction: Direction,
    encoder: CommandEncoder,
    display: D,
    transport: T,
    writes: u64,
}

impl<D: DisplaySink, T: Transport> Controller<D, T> {
    pub fn new(display: D, transport: T) -> Self {
        Self::with_channels(display, transport, &ChannelConfig::default())
    }

    pub fn with_channels(display: D, transport: T, channels: &ChannelConfig) -> Self {
        Self {
            held: HeldKeys::default(),
            direction: Direction::Stopped,
            encoder: CommandEncoder::new(channels.drive, channels.steering),
            display,
            transport,
            writes: 0,
        }
    }

    /// Apply a key press or release.
    pub fn handle(&mut self, event: KeyEvent) -> Result<Transition, ControlError> {
        if !self.held.apply(event) {
            debug!(?event, "key event changed nothing");
        }
        self.update()
    }

    /// Drop every held key, e.g. when the terminal loses focus.
    pub fn release_all(&mut self) -> Result<Transition, ControlError> {
        self.held.clear();
        self.update()
    }

    /// Bring both motors to zero before shutting down. Only axes that are
    /// not already stopped are sent.
    pub fn stop(&mut self) -> Result<Transition, ControlError> {
        self.held.clear();
        let transition = self.update()?;
        debug!(sent = transition.sent.len(), "stopped");
        Ok(transition)
    }

    fn update(&mut self) -> Result<Transition, ControlError> {
        let keys = self.held.state();

        let direction = Direction::from(keys);
        let direction_changed = direction != self.direction;
        if direction_changed {
            self.direction = direction;
            self.display.show(direction);
        }

        let encoded = self.encoder.encode(keys);
        self.send(&encoded)?;

        debug!(
            ?keys,
            direction = direction.label(),
            speed = encoded.command.speed,
            turn = encoded.command.turn,
            sent = encoded.changed.len(),
            "transition"
        );

        Ok(Transition {
            keys,
            direction,
            direction_changed,
            command: encoded.command,
            sent: encoded.changed,
        })
    }

    fn send(&mut self, encoded: &Encoded) -> Result<(), ControlError> {
        if encoded.is_empty() {
            return Ok(());
        }
        // All changed axes go out in one write.
        if let Err(e) = self.transport.send(encoded.wire().as_bytes()) {
            error!(error = %e, "motor command write failed");
            return Err(ControlError::Write(e));
        }
        self.writes += 1;
        Ok(())
    }

    pub fn keys(&self) -> KeyState {
        self.held.state()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The last command handed to the encoder.
    pub fn command(&self) -> MotorCommand {
        self.encoder.last()
    }

    /// Number of successful transport writes.
    pub fn writes(&self) -> u64 {
        self.writes
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}
