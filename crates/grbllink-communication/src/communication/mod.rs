//! Byte-level links to controllers

pub mod serial;

pub use serial::{
    filter_candidate_ports, list_ports, SerialTransport, SystemSerial, Transport,
    TransportProvider, TransportResult,
};
