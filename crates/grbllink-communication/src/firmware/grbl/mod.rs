//! GRBL firmware support
//!
//! Command construction, response and status frame parsing, settings and the
//! protocol client that ties them to a transport.

pub mod commands;
pub mod controller;
pub mod error_decoder;
pub mod response_parser;
pub mod settings;
pub mod status_parser;

pub use commands::{MotionMode, RealtimeCommand};
pub use controller::{wait_for_response, GrblController, NOT_CONNECTED_REPLY};
pub use error_decoder::{decode_alarm, decode_error};
pub use response_parser::ResponseOutcome;
pub use settings::{describe_setting, parse_settings, GrblSetting};
pub use status_parser::{BufferState, GrblStatus, Overrides, Position, StatusParser};
