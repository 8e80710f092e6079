pub mod config;
pub mod controller;
pub mod direction;
pub mod error;
pub mod keys;
pub mod motion;
pub mod sink;
pub mod transport;

pub use config::ControllerConfig;
pub use controller::{Controller, Transition};
pub use direction::{Direction, resolve};
pub use error::ControlError;
pub use keys::{ControlKey, KeyEvent, KeySource, KeyState};
pub use motion::{CommandEncoder, Encoded, MotorCommand, encode};
pub use sink::{DisplaySink, Indicator};
pub use transport::{LogTransport, Transport};
