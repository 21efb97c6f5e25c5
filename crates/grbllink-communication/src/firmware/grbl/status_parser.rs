//! GRBL Status Report Parsing
//!
//! Decomposes a `<State|MPos:..|WPos:..|Bf:..|FS:..|Ov:..|Pn:..>` frame into a
//! [`GrblStatus`]. Each segment is optional; a missing or malformed segment
//! leaves its fields at their defaults instead of failing the whole frame.

use serde::{Deserialize, Serialize};

/// Labels the firmware reports as machine state
pub const MACHINE_STATES: [&str; 9] = [
    "Idle", "Run", "Hold", "Jog", "Alarm", "Door", "Check", "Home", "Sleep",
];

/// State reported when a frame could not be read
pub const STATE_UNKNOWN: &str = "Unknown";
/// State reported when there is no session
pub const STATE_DISCONNECTED: &str = "Disconnected";

/// Three-axis coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
    /// Z coordinate
    pub z: f64,
}

impl Position {
    /// Create a position
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Parse `x,y,z`; missing or malformed components stay zero
    pub fn parse(pos_str: &str) -> Self {
        let [x, y, z] = parse_fields::<f64, 3>(pos_str, 0.0);
        Self { x, y, z }
    }
}

/// Free space in the firmware buffers (`Bf:planner,rx`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferState {
    /// Free planner blocks
    pub planner: i32,
    /// Free serial receive bytes
    pub rx: i32,
}

impl BufferState {
    /// Parse buffer state (format: "planner,rx")
    pub fn parse(buf_str: &str) -> Self {
        let [planner, rx] = parse_fields::<i32, 2>(buf_str, 0);
        Self { planner, rx }
    }
}

/// Override percentages (`Ov:feed,rapid,spindle`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overrides {
    /// Feed override percentage
    pub feed: i32,
    /// Rapid override percentage
    pub rapid: i32,
    /// Spindle override percentage
    pub spindle: i32,
}

impl Default for Overrides {
    fn default() -> Self {
        Self {
            feed: 100,
            rapid: 100,
            spindle: 100,
        }
    }
}

impl Overrides {
    /// Parse override state (format: "feed,rapid,spindle")
    pub fn parse(ov_str: &str) -> Self {
        let [feed, rapid, spindle] = parse_fields::<i32, 3>(ov_str, 100);
        Self {
            feed,
            rapid,
            spindle,
        }
    }
}

/// A fresh snapshot of the machine, never cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrblStatus {
    /// Machine state label (Idle, Run, Hold:0, Alarm, ...)
    pub state: String,
    /// Machine position
    #[serde(rename = "machinePosition")]
    pub machine_pos: Position,
    /// Work position
    #[serde(rename = "workPosition")]
    pub work_pos: Position,
    /// Current feed rate
    #[serde(rename = "feed")]
    pub feed_rate: f64,
    /// Current spindle speed
    #[serde(rename = "spindle")]
    pub spindle_speed: f64,
    /// Override percentages
    #[serde(rename = "override")]
    pub overrides: Overrides,
    /// Active input pins, e.g. `XYZP`
    pub input_pins: String,
    /// Buffer availability
    pub buffer: BufferState,
}

impl Default for GrblStatus {
    fn default() -> Self {
        Self::with_state(STATE_UNKNOWN)
    }
}

impl GrblStatus {
    /// All-default snapshot carrying `state`
    pub fn with_state(state: &str) -> Self {
        Self {
            state: state.to_string(),
            machine_pos: Position::default(),
            work_pos: Position::default(),
            feed_rate: 0.0,
            spindle_speed: 0.0,
            overrides: Overrides::default(),
            input_pins: String::new(),
            buffer: BufferState::default(),
        }
    }

    /// Snapshot returned when no session exists
    pub fn disconnected() -> Self {
        Self::with_state(STATE_DISCONNECTED)
    }

    /// State label without its sub-state (`Hold:0` -> `Hold`)
    pub fn base_state(&self) -> &str {
        self.state.split(':').next().unwrap_or(&self.state)
    }

    /// Whether the label is one the firmware defines
    pub fn is_known_state(&self) -> bool {
        MACHINE_STATES.contains(&self.base_state())
    }

    /// Whether the machine is in a state that blocks motion
    pub fn is_error_state(&self) -> bool {
        matches!(self.base_state(), "Alarm" | "Door" | "Check")
    }
}

/// Status frame parser
pub struct StatusParser;

impl StatusParser {
    /// Parse a status frame
    ///
    /// Returns `None` when `line` does not begin with `<`.
    pub fn parse(line: &str) -> Option<GrblStatus> {
        let body = line.trim_end().strip_prefix('<')?;
        let body = body.strip_suffix('>').unwrap_or(body);

        let mut segments = body.split('|');
        let mut status = GrblStatus::with_state(segments.next().unwrap_or_default().trim());
        let mut saw_fs = false;

        for segment in segments {
            let segment = segment.trim();

            if let Some(pos_str) = segment.strip_prefix("MPos:") {
                status.machine_pos = Position::parse(pos_str);
            } else if let Some(pos_str) = segment.strip_prefix("WPos:") {
                status.work_pos = Position::parse(pos_str);
            } else if let Some(buf_str) = segment.strip_prefix("Bf:") {
                status.buffer = BufferState::parse(buf_str);
            } else if let Some(fs_str) = segment.strip_prefix("FS:") {
                let [feed, spindle] = parse_fields::<f64, 2>(fs_str, 0.0);
                status.feed_rate = feed;
                status.spindle_speed = spindle;
                saw_fs = true;
            } else if let Some(rate_str) = segment.strip_prefix("F:") {
                // Pre-1.1 firmware reports feed alone.
                if !saw_fs {
                    status.feed_rate = rate_str.trim().parse().unwrap_or(0.0);
                }
            } else if let Some(ov_str) = segment.strip_prefix("Ov:") {
                status.overrides = Overrides::parse(ov_str);
            } else if let Some(pins) = segment.strip_prefix("Pn:") {
                status.input_pins = pins.to_string();
            }
        }

        Some(status)
    }

    /// Parse a status line, falling back to an `Unknown` snapshot
    pub fn parse_or_unknown(line: &str) -> GrblStatus {
        Self::parse(line).unwrap_or_default()
    }
}

/// Parse comma-separated fields positionally, keeping `default` where a field
/// is missing or malformed
fn parse_fields<T, const N: usize>(text: &str, default: T) -> [T; N]
where
    T: std::str::FromStr + Copy,
{
    let mut values = [default; N];
    for (slot, field) in values.iter_mut().zip(text.split(',')) {
        if let Ok(value) = field.trim().parse() {
            *slot = value;
        }
    }
    values
}
