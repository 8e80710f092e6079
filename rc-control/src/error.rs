use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("failed to open serial port {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },
    /// The car may be left in an unknown state; the session cannot continue.
    #[error("failed to send motor command: {0}")]
    Write(#[source] io::Error),
    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}
