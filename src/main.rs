use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use grbllink::{init_logging, ControllerConfig, GrblController, GrblEvent};
use std::path::PathBuf;
use std::sync::Arc;

/// Talk to a GRBL controller over a serial port
#[derive(Debug, Parser)]
#[command(name = "grbllink", version, about)]
struct Cli {
    /// Serial port; auto-detected when omitted
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Baud rate; defaults to the configured rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// JSON controller configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List candidate serial ports
    Ports,
    /// Connect and print the firmware banner
    Info,
    /// Print a status snapshot as JSON
    Status,
    /// Print all firmware settings as JSON
    Settings,
    /// Write one firmware setting
    Set { id: u16, value: f64 },
    /// Send a raw command and print the response
    Send {
        command: String,
        /// Response wait in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },
    /// Run the homing cycle
    Home,
    /// Clear an alarm lock
    Unlock,
    /// Reboot the firmware
    Reset,
    /// Pause motion
    Hold,
    /// Resume motion
    Resume,
    /// Relative jog of one axis
    Jog {
        axis: char,
        #[arg(allow_hyphen_values = true)]
        distance: f64,
        #[arg(short, long, default_value_t = 1000.0)]
        feed: f64,
    },
    /// Cancel an active jog
    CancelJog,
    /// Absolute move; rapid unless a feed is given
    Move {
        #[arg(short, long, allow_hyphen_values = true)]
        x: Option<f64>,
        #[arg(short, long, allow_hyphen_values = true)]
        y: Option<f64>,
        #[arg(short, long, allow_hyphen_values = true)]
        z: Option<f64>,
        #[arg(short, long)]
        feed: Option<f64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs)?;

    tracing::debug!("grbllink {} (built {})", grbllink::VERSION, grbllink::BUILD_DATE);

    let config = match &cli.config {
        Some(path) => ControllerConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ControllerConfig::default(),
    };

    let controller = GrblController::with_system_serial(config);

    if let Command::Ports = cli.command {
        for port in controller.list_ports() {
            println!("{}", port);
        }
        return Ok(());
    }

    controller.set_observer(Arc::new(|event: &GrblEvent| {
        tracing::info!(kind = %event.kind, payload = %event.payload, "Controller event");
    }));

    if !controller.connect(cli.port.as_deref(), cli.baud) {
        match &cli.port {
            Some(port) => bail!("no GRBL controller answered on {}", port),
            None => bail!("no GRBL controller found"),
        }
    }

    let result = run(&controller, cli.command);
    controller.disconnect();
    result
}

fn run(controller: &GrblController, command: Command) -> anyhow::Result<()> {
    let ok = match command {
        Command::Ports => true,
        Command::Info => {
            println!("{} on {}", controller.version(), controller.port());
            true
        }
        Command::Status => {
            println!("{}", serde_json::to_string_pretty(&controller.get_status())?);
            true
        }
        Command::Settings => {
            println!("{}", serde_json::to_string_pretty(&controller.get_settings())?);
            true
        }
        Command::Set { id, value } => controller.set_setting(id, value),
        Command::Send { command, timeout } => {
            let timeout = timeout.unwrap_or(controller.config().command_timeout_ms);
            print!("{}", controller.send_command(&command, timeout));
            true
        }
        Command::Home => controller.home(),
        Command::Unlock => controller.unlock(),
        Command::Reset => controller.soft_reset(),
        Command::Hold => controller.feed_hold(),
        Command::Resume => controller.cycle_start(),
        Command::Jog {
            axis,
            distance,
            feed,
        } => controller.jog(axis, distance, feed),
        Command::CancelJog => controller.cancel_jog(),
        Command::Move { x, y, z, feed } => match feed {
            Some(feed) => controller.move_g1(x, y, z, feed),
            None => controller.move_g0(x, y, z),
        },
    };

    if !ok {
        bail!("controller did not acknowledge the command");
    }
    Ok(())
}
