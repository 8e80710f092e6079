use std::io;
use std::path::PathBuf;

use clap::Parser;
use rc_control::ControllerConfig;
use rc_protocol::{MotorSpeedCommand, ParseError, parse_line};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_serial::SerialPortBuilderExt;
use tracing::{Level, debug, info, trace, warn};

/// Small chunks towards the car so typed commands go out promptly.
const UPLINK_BUFFER: usize = 32;
const DOWNLINK_BUFFER: usize = 1024;

/// Pipe stdin to the car's serial port and the port's output to stdout.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Config file, defaults to <config dir>/rc-car/controller.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rc_pipe=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ControllerConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }

    let serial = tokio_serial::new(&config.serial.port, config.serial.baud_rate)
        .open_native_async()
        .map_err(|e| format!("failed to open serial port {}: {e}", config.serial.port))?;
    info!(port = %config.serial.port, baud = config.serial.baud_rate, "piping");

    let (serial_rx, serial_tx) = tokio::io::split(serial);
    let annotate = tracing::enabled!(Level::DEBUG);
    let mut annotator = LineAnnotator::default();

    let uplink = pump(tokio::io::stdin(), serial_tx, UPLINK_BUFFER, |chunk| {
        if !annotate {
            return;
        }
        for annotation in annotator.feed(chunk) {
            match annotation {
                Annotation::Command(command) => debug!(%command, "sent"),
                Annotation::Other(e) => debug!(error = %e, "sent non-command line"),
                Annotation::Overlong(len) => debug!(len, "sent overlong line"),
            }
        }
    });
    let downlink = pump(serial_rx, tokio::io::stdout(), DOWNLINK_BUFFER, |chunk| {
        trace!(bytes = chunk.len(), "received");
    });

    tokio::select! {
        result = uplink => {
            let bytes = result.map_err(|e| format!("writing to serial port failed: {e}"))?;
            info!(bytes, "stdin closed");
        }
        result = downlink => {
            let bytes = result.map_err(|e| format!("reading from serial port failed: {e}"))?;
            warn!(bytes, "serial port closed");
        }
    }
    Ok(())
}

/// Copy until EOF, flushing after every chunk. Returns the bytes copied.
async fn pump<R, W>(
    mut reader: R,
    mut writer: W,
    buffer: usize,
    mut inspect: impl FnMut(&[u8]),
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; buffer];
    let mut total = 0;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        writer.flush().await?;
        inspect(&buf[..n]);
        total += n as u64;
    }
}

/// Longest line worth decoding; commands are far shorter.
const MAX_LINE: usize = 256;

#[derive(Debug, PartialEq)]
enum Annotation {
    Command(MotorSpeedCommand),
    Other(ParseError),
    /// A line longer than `MAX_LINE`, with its length. Not buffered.
    Overlong(usize),
}

/// Reassembles lines split across chunks and decodes them as motor commands.
#[derive(Debug, Default)]
struct LineAnnotator {
    pending: Vec<u8>,
    overlong: Option<usize>,
}

impl LineAnnotator {
    fn feed(&mut self, chunk: &[u8]) -> Vec<Annotation> {
        let mut annotations = Vec::new();
        for piece in chunk.split_inclusive(|&b| b == b'\n') {
            let (body, complete) = match piece.split_last() {
                Some((&b'\n', body)) => (body, true),
                _ => (piece, false),
            };

            if let Some(len) = &mut self.overlong {
                *len += body.len();
            } else if self.pending.len() + body.len() > MAX_LINE {
                self.overlong = Some(self.pending.len() + body.len());
                self.pending.clear();
            } else {
                self.pending.extend_from_slice(body);
            }

            if complete {
                if let Some(len) = self.overlong.take() {
                    annotations.push(Annotation::Overlong(len));
                } else {
                    let bytes = std::mem::take(&mut self.pending);
                    let line = String::from_utf8_lossy(&bytes);
                    let line = line.trim_end_matches('\r');
                    if !line.trim().is_empty() {
                        annotations.push(match parse_line(line) {
                            Ok(command) => Annotation::Command(command),
                            Err(e) => Annotation::Other(e),
                        });
                    }
                }
            }
        }
        annotations
    }
}

#[cfg(test)]
mod tests {
    use rc_protocol::MotorChannel;

    use super::*;

    #[test]
    fn annotator_joins_split_lines() {
        let mut annotator = LineAnnotator::default();
        assert!(annotator.feed(b"1 0 25").is_empty());
        assert_eq!(
            annotator.feed(b"5 - set-motor-speed\n3 255 set-motor-speed\n\n"),
            vec![
                Annotation::Command(MotorSpeedCommand::new(MotorChannel::DRIVE, -255)),
                Annotation::Command(MotorSpeedCommand::new(MotorChannel::STEERING, 255)),
            ]
        );
    }

    #[test]
    fn annotator_reports_other_lines() {
        let mut annotator = LineAnnotator::default();
        assert_eq!(
            annotator.feed(b"hello\r\n"),
            vec![Annotation::Other(ParseError::UnknownVerb("hello".into()))]
        );
    }

    #[test]
    fn annotator_does_not_buffer_lines_without_newline() {
        let mut annotator = LineAnnotator::default();
        let junk = [b'A'; 1024];
        for _ in 0..64 {
            assert!(annotator.feed(&junk).is_empty());
            assert!(annotator.pending.len() <= MAX_LINE);
        }

        assert_eq!(
            annotator.feed(b"A\n1 255 set-motor-speed\n"),
            vec![
                Annotation::Overlong(64 * 1024 + 1),
                Annotation::Command(MotorSpeedCommand::new(MotorChannel::DRIVE, 255)),
            ]
        );
        assert!(annotator.pending.is_empty());
    }

    #[test]
    fn annotator_accepts_a_line_at_the_limit() {
        let mut annotator = LineAnnotator::default();
        let mut line = vec![b' '; MAX_LINE - "3 0 set-motor-speed\r".len()];
        line.extend_from_slice(b"3 0 set-motor-speed\r");
        assert!(annotator.feed(&line).is_empty());
        assert_eq!(
            annotator.feed(b"\n"),
            vec![Annotation::Command(MotorSpeedCommand::new(MotorChannel::STEERING, 0))]
        );
    }

    #[tokio::test]
    async fn pump_copies_everything_in_small_chunks() {
        let input: &[u8] = b"1 255 set-motor-speed\n3 0 255 - set-motor-speed\n";
        let mut output = Vec::new();
        let mut chunks = Vec::new();

        let copied = pump(input, &mut output, 8, |chunk| chunks.push(chunk.len()))
            .await
            .unwrap();

        assert_eq!(copied, input.len() as u64);
        assert_eq!(output, input);
        assert!(chunks.iter().all(|&len| len <= 8));
        assert_eq!(chunks.iter().sum::<usize>(), input.len());
    }
}
