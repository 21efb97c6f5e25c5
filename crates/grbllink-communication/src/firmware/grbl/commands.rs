//! GRBL command construction
//!
//! Realtime control bytes and the text of queued commands. Coordinates, feeds
//! and setting values are written with three decimals.

use grbllink_core::ControllerError;

/// Axis letters accepted by jog commands
pub const JOG_AXES: [char; 6] = ['X', 'Y', 'Z', 'A', 'B', 'C'];

/// Single-byte commands acted on immediately by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtimeCommand {
    /// Request a status frame
    StatusQuery,
    /// Pause motion
    FeedHold,
    /// Resume motion
    CycleStart,
    /// Reboot the firmware (Ctrl-X)
    SoftReset,
    /// Cancel an active jog
    JogCancel,
}

impl RealtimeCommand {
    /// Get the byte representation
    pub fn as_byte(&self) -> u8 {
        match self {
            Self::StatusQuery => b'?',
            Self::FeedHold => b'!',
            Self::CycleStart => b'~',
            Self::SoftReset => 0x18,
            Self::JogCancel => 0x85,
        }
    }
}

impl std::fmt::Display for RealtimeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusQuery => write!(f, "status query"),
            Self::FeedHold => write!(f, "feed hold"),
            Self::CycleStart => write!(f, "cycle start"),
            Self::SoftReset => write!(f, "soft reset"),
            Self::JogCancel => write!(f, "jog cancel"),
        }
    }
}

/// Motion mode of a move command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionMode {
    /// G0 rapid positioning
    Rapid,
    /// G1 linear feed move
    Linear,
}

impl MotionMode {
    fn word(&self) -> &'static str {
        match self {
            Self::Rapid => "G0",
            Self::Linear => "G1",
        }
    }
}

/// Homing cycle
pub const HOME: &str = "$H";
/// Clear an alarm lock
pub const UNLOCK: &str = "$X";
/// List all settings
pub const LIST_SETTINGS: &str = "$$";

/// Build a G0/G1 line
///
/// Omitted axes are left out of the line so the firmware keeps their current
/// position. A feed value is only written when given.
pub fn motion_command(
    mode: MotionMode,
    x: Option<f64>,
    y: Option<f64>,
    z: Option<f64>,
    feed: Option<f64>,
) -> String {
    let mut cmd = String::from(mode.word());
    for (letter, value) in [('X', x), ('Y', y), ('Z', z), ('F', feed)] {
        if let Some(value) = value {
            cmd.push_str(&format!(" {}{:.3}", letter, value));
        }
    }
    cmd
}

/// Check and upper-case a jog axis letter
pub fn normalize_axis(axis: char) -> Option<char> {
    let axis = axis.to_ascii_uppercase();
    JOG_AXES.contains(&axis).then_some(axis)
}

/// Build a relative jog line: `$J=G91 <AXIS><distance> F<feed>`
pub fn jog_command(axis: char, distance: f64, feed: f64) -> Result<String, ControllerError> {
    let axis = normalize_axis(axis).ok_or(ControllerError::InvalidAxis { axis })?;
    Ok(format!("$J=G91 {}{:.3} F{:.3}", axis, distance, feed))
}

/// Build a setting write: `$<id>=<value>`
pub fn setting_command(id: u16, value: f64) -> String {
    format!("${}={:.3}", id, value)
}
