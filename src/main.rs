//! adcplink - Nortek PNOR acquisition daemon
//!
//! Reads telemetry sentences from a serial-connected ADCP, validates and
//! decodes them, and writes typed records as JSON lines.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tracing::{error, info, warn};

use adcplink_core::cli::{exit_code_description, exit_code_for, logging, to_exit_code};
use adcplink_core::config::AppConfig;
use adcplink_core::core::pipeline::{self, Pipeline, PipelineStats, Router};
use adcplink_core::core::protocol::ParserRegistry;
use adcplink_core::core::sink::{JsonLinesSink, RecordSink};
use adcplink_core::core::transport::{list_ports, ConnectionManager, SystemPortOpener};

const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// adcplink CLI
#[derive(Parser, Debug)]
#[command(
    name = "adcplink",
    version,
    about = "Acquire Nortek PNOR telemetry from a serial ADCP",
    long_about = None
)]
struct Cli {
    /// Configuration file (defaults to config.toml in the platform config dir)
    #[arg(short, long, global = true, env = "ADCPLINK_CONFIG")]
    config: Option<PathBuf>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read from the serial port until Ctrl-C
    Listen {
        /// Serial port name (e.g., COM3, /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// JSON lines output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Re-process a captured raw log
    Replay {
        /// Capture file
        file: PathBuf,

        /// JSON lines output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available serial ports
    ListPorts,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let code = exit_code_for(&err);
            error!(code, reason = exit_code_description(code), "{err:#}");
            eprintln!("adcplink: {err:#}");
            to_exit_code(&err)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::resolve(cli.config.as_deref()).context("failed to load configuration")?;
    match cli.verbose {
        0 => {}
        1 => config.logging.level = "debug".into(),
        _ => config.logging.level = "trace".into(),
    }
    let _guard = logging::init(&config.logging)?;
    info!("Starting adcplink v{}", adcplink_core::VERSION);

    match cli.command {
        Commands::Listen { port, baud, output } => {
            if let Some(port) = port {
                config.serial.port = port;
            }
            if let Some(baud) = baud {
                config.serial.baud_rate = baud;
            }
            if output.is_some() {
                config.output.path = output;
            }
            listen(&config)
        }
        Commands::Replay { file, output } => {
            if output.is_some() {
                config.output.path = output;
            }
            replay(&config, &file)
        }
        Commands::ListPorts => print_ports(),
    }
}

fn open_sink(config: &AppConfig) -> Result<Box<dyn RecordSink>> {
    match &config.output.path {
        Some(path) => {
            let sink = JsonLinesSink::append(path)
                .with_context(|| format!("failed to open output {}", path.display()))?
                .flush_every(config.output.flush_every);
            info!(path = %path.display(), "Writing records");
            Ok(Box::new(sink))
        }
        None => Ok(Box::new(JsonLinesSink::stdout())),
    }
}

fn listen(config: &AppConfig) -> Result<()> {
    config.serial.validate().context("invalid serial settings")?;
    config.validate()?;

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to install Ctrl-C handler")?;

    let manager = ConnectionManager::new(config.serial.clone(), Box::new(SystemPortOpener))
        .with_max_backoff(config.reconnect.max_backoff())
        .with_max_line_length(config.pipeline.max_line_length);
    let registry = Arc::new(ParserRegistry::with_defaults());
    let sink = open_sink(config)?;

    info!(serial = %config.serial, "Listening");
    let pipeline = Pipeline::start(manager, registry, sink, config.pipeline_options())?;

    let mut last_report = Instant::now();
    while running.load(Ordering::SeqCst) {
        if !pipeline.is_running() {
            warn!("A pipeline worker exited unexpectedly");
            break;
        }
        std::thread::sleep(Duration::from_millis(200));
        if last_report.elapsed() >= STATS_INTERVAL {
            let stats = pipeline.stats();
            info!(
                state = ?pipeline.connection().state(),
                records = stats.records,
                errors = stats.errors,
                queued = stats.in_flight(),
                "Progress"
            );
            last_report = Instant::now();
        }
    }

    info!("Shutting down");
    let stopped = pipeline.stop()?;
    info!(stats = ?stopped.stats, "Acquisition finished");
    Ok(())
}

fn replay(config: &AppConfig, file: &Path) -> Result<()> {
    let reader = BufReader::new(File::open(file).with_context(|| format!("failed to open {}", file.display()))?);
    let mut router = Router::new(
        Arc::new(ParserRegistry::with_defaults()),
        open_sink(config)?,
        Arc::new(PipelineStats::new()),
    );
    let stats = pipeline::replay(reader, &mut router, config.pipeline.binary_threshold)
        .with_context(|| format!("failed to read {}", file.display()))?;
    info!(file = %file.display(), ?stats, "Replay finished");
    Ok(())
}

fn print_ports() -> Result<()> {
    let ports = list_ports()?;
    let mut out = std::io::stdout().lock();
    if ports.is_empty() {
        writeln!(out, "No serial ports found.")?;
        return Ok(());
    }
    for port in &ports {
        writeln!(out, "{} [{:?}]", port.port_name, port.port_type)?;
    }
    Ok(())
}
