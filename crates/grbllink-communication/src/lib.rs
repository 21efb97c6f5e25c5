//! # GrblLink Communication
//!
//! Serial transport and the GRBL protocol client.
//!
//! The [`communication`] module moves bytes; the [`firmware`] module knows
//! what they mean.

pub mod communication;
pub mod firmware;

pub use communication::{
    list_ports, SerialTransport, SystemSerial, Transport, TransportProvider, TransportResult,
};
pub use firmware::grbl::{
    GrblController, GrblSetting, GrblStatus, MotionMode, Position, RealtimeCommand,
};
