//! # GrblLink
//!
//! A synchronous client for GRBL-class CNC motion controllers over a serial
//! link.
//!
//! ## Architecture
//!
//! GrblLink is organized as a workspace:
//!
//! 1. **grbllink-core** - Errors, session events, controller configuration
//! 2. **grbllink-communication** - Serial transport and the GRBL protocol client
//! 3. **grbllink** - This crate: re-exports, logging setup and the CLI binary
//!
//! ## Example
//!
//! ```no_run
//! use grbllink::{ControllerConfig, GrblController};
//!
//! let controller = GrblController::with_system_serial(ControllerConfig::default());
//! if controller.connect(None, None) {
//!     println!("{}", controller.get_state());
//!     controller.disconnect();
//! }
//! ```

pub use grbllink_communication::{communication, firmware};

pub use grbllink_core::{
    ConfigError, ConnectionError, ControllerConfig, ControllerError, Error, EventDispatcher,
    EventKind, EventObserver, GrblEvent, Result,
};

pub use grbllink_communication::{
    list_ports, GrblController, GrblSetting, GrblStatus, MotionMode, Position, RealtimeCommand,
    SerialTransport, SystemSerial, Transport, TransportProvider,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging
///
/// Log lines go to stderr, leaving stdout to command output. The filter
/// honours `RUST_LOG` and defaults to `info`. With `json` set, each event is
/// written as one JSON object per line.
pub fn init_logging(json: bool) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true);

    if json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
