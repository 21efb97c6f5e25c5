//! # GrblLink Core
//!
//! Core types for GrblLink: the error taxonomy, controller session events
//! and the controller configuration.

pub mod config;
pub mod error;
pub mod event;

pub use config::{ControllerConfig, DEFAULT_BAUD_RATE};
pub use error::{ConfigError, ConnectionError, ControllerError, Error, Result};
pub use event::{EventDispatcher, EventKind, EventObserver, GrblEvent};
