use std::io::{self, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::info;

use crate::config::SerialConfig;
use crate::error::ControlError;

/// Ordered byte sink carrying command lines to the car.
pub trait Transport {
    /// Deliver `bytes` in full or fail.
    fn send(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<W: Write + ?Sized> Transport for W {
    fn send(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }
}

/// Transport for running without a car: logs each line and drops it.
#[derive(Debug, Default)]
pub struct LogTransport {
    sent: u64,
}

impl LogTransport {
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Write for LogTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for line in String::from_utf8_lossy(buf).lines() {
            info!(target: "rc_control::dry_run", "{line}");
        }
        self.sent += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Open the configured serial port with a bounded write timeout, so a stuck
/// port shows up as a write error instead of hanging the input loop.
pub fn open_serial(config: &SerialConfig) -> Result<Box<dyn SerialPort>, ControlError> {
    let port = serialport::new(&config.port, config.baud_rate)
        .timeout(Duration::from_millis(config.write_timeout_ms))
        .open()
        .map_err(|source| ControlError::Open {
            port: config.port.clone(),
            source,
        })?;
    info!(port = %config.port, baud = config.baud_rate, "serial port open");
    Ok(port)
}
