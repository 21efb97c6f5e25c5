//! GRBL Error and Alarm Code Decoder
//! Converts numeric `error:<n>` and `ALARM:<n>` codes to readable text

/// Decode a GRBL 1.1 error code
pub fn decode_error(code: u8) -> &'static str {
    match code {
        1 => "Expected command letter",
        2 => "Bad number format",
        3 => "Invalid '$' statement",
        4 => "Negative value",
        5 => "Homing not enabled",
        6 => "Step pulse too short",
        7 => "EEPROM read failed, settings restored to defaults",
        8 => "'$' command requires Idle state",
        9 => "G-code locked out during alarm or jog",
        10 => "Soft limits require homing",
        11 => "Line overflow",
        12 => "Step rate exceeds maximum",
        13 => "Safety door open",
        14 => "Line exceeds EEPROM storage",
        15 => "Jog target exceeds machine travel",
        16 => "Invalid jog command",
        17 => "Laser mode requires PWM output",
        20 => "Unsupported G-code command",
        21 => "Modal group violation",
        22 => "Undefined feed rate",
        23 => "Command requires integer value",
        24 => "More than one command requires axis words",
        25 => "Repeated G-code word",
        26 => "Axis words required but missing",
        27 => "Line number out of range",
        28 => "Missing P or L value word",
        29 => "Unsupported work coordinate system",
        30 => "G53 requires G0 or G1",
        31 => "Unused axis words with G80",
        32 => "Arc has no axis words in plane",
        33 => "Invalid motion target",
        34 => "Arc radius error",
        35 => "Arc offset missing in plane",
        36 => "Unused G-code words",
        37 => "Tool length offset axis mismatch",
        38 => "Tool number exceeds maximum",
        _ => "Unknown error",
    }
}

/// Decode a GRBL 1.1 alarm code
pub fn decode_alarm(code: u8) -> &'static str {
    match code {
        1 => "Hard limit triggered, re-home",
        2 => "Soft limit: target exceeds machine travel",
        3 => "Reset while in motion, re-home",
        4 => "Probe fail: probe not in expected initial state",
        5 => "Probe fail: no contact within travel",
        6 => "Homing fail: reset during cycle",
        7 => "Homing fail: safety door opened",
        8 => "Homing fail: could not clear limit switch on pull-off",
        9 => "Homing fail: limit switch not found",
        _ => "Unknown alarm",
    }
}

/// Format error message with code and description
pub fn format_error(code: u8) -> String {
    format!("error:{} - {}", code, decode_error(code))
}

/// Format alarm message with code and description
pub fn format_alarm(code: u8) -> String {
    format!("ALARM:{} - {}", code, decode_alarm(code))
}
