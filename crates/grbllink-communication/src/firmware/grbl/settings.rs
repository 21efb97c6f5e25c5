//! GRBL settings listing
//!
//! Parses the reply to `$$` (`$<id>=<value>` lines) and resolves each id to a
//! description from a fixed table.

use serde::{Deserialize, Serialize};

/// Description used for ids missing from the table
pub const UNKNOWN_SETTING: &str = "Unknown setting";

/// Descriptions of the GRBL 1.1 settings, sorted by id
const SETTING_DESCRIPTIONS: &[(u16, &str)] = &[
    (0, "Step pulse time (microseconds)"),
    (1, "Step idle delay (milliseconds)"),
    (2, "Step pulse invert mask"),
    (3, "Step direction invert mask"),
    (4, "Invert step enable pin"),
    (5, "Invert limit pins"),
    (6, "Invert probe pin"),
    (10, "Status report options"),
    (11, "Junction deviation (mm)"),
    (12, "Arc tolerance (mm)"),
    (13, "Report in inches"),
    (20, "Soft limits enable"),
    (21, "Hard limits enable"),
    (22, "Homing cycle enable"),
    (23, "Homing direction invert mask"),
    (24, "Homing locate feed rate (mm/min)"),
    (25, "Homing search seek rate (mm/min)"),
    (26, "Homing switch debounce delay (ms)"),
    (27, "Homing switch pull-off distance (mm)"),
    (30, "Maximum spindle speed (RPM)"),
    (31, "Minimum spindle speed (RPM)"),
    (32, "Laser mode enable"),
    (100, "X-axis steps per millimeter"),
    (101, "Y-axis steps per millimeter"),
    (102, "Z-axis steps per millimeter"),
    (110, "X-axis maximum rate (mm/min)"),
    (111, "Y-axis maximum rate (mm/min)"),
    (112, "Z-axis maximum rate (mm/min)"),
    (120, "X-axis acceleration (mm/sec^2)"),
    (121, "Y-axis acceleration (mm/sec^2)"),
    (122, "Z-axis acceleration (mm/sec^2)"),
    (130, "X-axis maximum travel (mm)"),
    (131, "Y-axis maximum travel (mm)"),
    (132, "Z-axis maximum travel (mm)"),
];

/// One firmware setting as listed by `$$`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrblSetting {
    /// Setting number
    pub id: u16,
    /// Current value
    pub value: f64,
    /// Human-readable description
    pub description: String,
}

impl GrblSetting {
    /// Create a setting with its description resolved from the table
    pub fn new(id: u16, value: f64) -> Self {
        Self {
            id,
            value,
            description: describe_setting(id).to_string(),
        }
    }
}

/// Look up the description of setting `id`
pub fn describe_setting(id: u16) -> &'static str {
    SETTING_DESCRIPTIONS
        .binary_search_by_key(&id, |(key, _)| *key)
        .map(|index| SETTING_DESCRIPTIONS[index].1)
        .unwrap_or(UNKNOWN_SETTING)
}

/// Find the first `$<integer>=<number>` in `line`
///
/// The number is a run of digits and dots, so startup blocks (`$N0=...`) and
/// negative values are not matched.
pub fn parse_setting_line(line: &str) -> Option<(u16, f64)> {
    line.match_indices('$')
        .find_map(|(start, _)| parse_setting_at(&line[start + 1..]))
}

fn parse_setting_at(rest: &str) -> Option<(u16, f64)> {
    let id_len = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if id_len == 0 {
        return None;
    }
    let value_part = rest[id_len..].strip_prefix('=')?;

    let value_len = value_part
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value_part.len());
    if value_len == 0 {
        return None;
    }

    let id = rest[..id_len].parse().ok()?;
    let value = value_part[..value_len].parse().ok()?;
    Some((id, value))
}

/// Parse every setting line of a `$$` listing, in listing order
pub fn parse_settings(response: &str) -> Vec<GrblSetting> {
    response
        .lines()
        .filter_map(parse_setting_line)
        .map(|(id, value)| GrblSetting::new(id, value))
        .collect()
}
