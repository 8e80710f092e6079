use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use color_eyre::eyre::Context;
use color_eyre::Result;
use rc_control::config::default_log_path;
use rc_control::transport::open_serial;
use rc_control::{Controller, ControllerConfig, Indicator, LogTransport};
use tracing::info;

mod input;
mod tui;

/// Drive an RC car from the keyboard over a serial link.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Cli {
    /// Serial port the car's receiver is attached to
    #[arg(long)]
    port: Option<String>,

    #[arg(long)]
    baud: Option<u32>,

    /// Config file, defaults to <config dir>/rc-car/controller.toml
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log motor commands instead of opening the serial port
    #[arg(long)]
    dry_run: bool,

    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ControllerConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.serial.port = port;
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }

    init_logging(cli.log_file.or(config.log_file.clone()).or_else(default_log_path))?;

    if cli.dry_run {
        info!("dry run, no serial port");
        let controller = Controller::with_channels(
            Indicator::default(),
            LogTransport::default(),
            &config.channels,
        );
        return tui::run(controller, "dry run".to_string(), &config.input);
    }

    let port = open_serial(&config.serial)?;
    let controller = Controller::with_channels(Indicator::default(), port, &config.channels);
    tui::run(controller, config.serial.port.clone(), &config.input)
}

/// The terminal belongs to the UI, so logs go to a file.
fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(&path)
        .wrap_err_with(|| format!("failed to open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rc_controller=info,rc_control=info".into()),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
