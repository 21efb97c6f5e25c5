//! GRBL Response Parser
//!
//! Interprets the text accumulated while waiting on a queued command, and the
//! startup banner read during connection.
//!
//! Completion and success are substring heuristics: a line ends the wait when
//! it contains `ok`, `error` or `ALARM`, and a response counts as successful
//! when it contains `ok` anywhere.

use super::error_decoder::{decode_alarm, decode_error};
use grbllink_core::ControllerError;
use std::fmt;

/// Tokens that end a queued-command wait
pub const TERMINAL_TOKENS: [&str; 3] = ["ok", "error", "ALARM"];

/// Appended to the accumulated text when the wait deadline passes
pub const TIMEOUT_MARKER: &str = "timeout";

/// Token identifying the firmware in its startup banner
pub const BANNER_TOKEN: &str = "Grbl";

/// Whether `line` ends a queued-command wait
pub fn is_terminal_line(line: &str) -> bool {
    TERMINAL_TOKENS.iter().any(|token| line.contains(token))
}

/// Whether the accumulated response counts as success
pub fn is_success(response: &str) -> bool {
    response.contains("ok")
}

/// Whether the accumulated response ended on the deadline
pub fn is_timeout(response: &str) -> bool {
    response.ends_with(TIMEOUT_MARKER)
}

/// Code of the first `error:<n>` in `response`
pub fn error_code(response: &str) -> Option<u8> {
    code_after(response, "error:")
}

/// Code of the first `ALARM:<n>` in `response`
pub fn alarm_code(response: &str) -> Option<u8> {
    code_after(response, "ALARM:")
}

fn code_after(response: &str, prefix: &str) -> Option<u8> {
    let start = response.find(prefix)? + prefix.len();
    let digits: String = response[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// First banner line carrying the firmware token, e.g. `Grbl 1.1h ['$' for help]`
pub fn extract_version(text: &str) -> Option<String> {
    text.lines()
        .find(|line| line.contains(BANNER_TOKEN))
        .map(|line| line.trim().to_string())
}

/// Classification of an accumulated queued-command response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseOutcome {
    /// Contains `ok`
    Ok,
    /// Contains `error:<n>`
    Error(u8),
    /// Contains `ALARM:<n>`
    Alarm(u8),
    /// Ended on the deadline
    Timeout,
    /// None of the above
    Unrecognized,
}

impl ResponseOutcome {
    /// Classify a response; `ok` anywhere wins
    pub fn classify(response: &str) -> Self {
        if is_success(response) {
            Self::Ok
        } else if let Some(code) = error_code(response) {
            Self::Error(code)
        } else if let Some(code) = alarm_code(response) {
            Self::Alarm(code)
        } else if is_timeout(response) {
            Self::Timeout
        } else {
            Self::Unrecognized
        }
    }

    /// Convert into a `Result`, decoding firmware codes
    pub fn into_result(self, timeout_ms: u64) -> Result<(), ControllerError> {
        match self {
            Self::Ok => Ok(()),
            Self::Error(code) => Err(ControllerError::CommandRejected {
                code,
                message: decode_error(code).to_string(),
            }),
            Self::Alarm(code) => Err(ControllerError::Alarm {
                code,
                message: decode_alarm(code).to_string(),
            }),
            Self::Timeout | Self::Unrecognized => Err(ControllerError::Timeout { timeout_ms }),
        }
    }
}

impl fmt::Display for ResponseOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Error(code) => write!(f, "{}", super::error_decoder::format_error(*code)),
            Self::Alarm(code) => write!(f, "{}", super::error_decoder::format_alarm(*code)),
            Self::Timeout => write!(f, "{}", TIMEOUT_MARKER),
            Self::Unrecognized => write!(f, "unrecognized response"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_lines() {
        assert!(is_terminal_line("ok"));
        assert!(is_terminal_line("error:20"));
        assert!(is_terminal_line("ALARM:1"));
        assert!(!is_terminal_line("[MSG:Caution: Unlocked]"));
        assert!(!is_terminal_line("<Idle|MPos:0,0,0>"));
        assert!(!is_terminal_line(""));
    }

    #[test]
    fn test_success_is_substring_match() {
        assert!(is_success("ok\n"));
        assert!(is_success("[MSG:Caution: Unlocked]\nok\n"));
        // Heuristic: any "ok" counts, even inside other text.
        assert!(is_success("[MSG:Check Door]\nerror:9\n[broken]\n"));
        assert!(!is_success("error:9\n"));
        assert!(!is_success(TIMEOUT_MARKER));
    }

    #[test]
    fn test_codes() {
        assert_eq!(error_code("error:20\n"), Some(20));
        assert_eq!(error_code("error: not connected"), None);
        assert_eq!(alarm_code("ALARM:9\n"), Some(9));
        assert_eq!(alarm_code("ok\n"), None);
    }

    #[test]
    fn test_classify() {
        assert_eq!(ResponseOutcome::classify("ok\n"), ResponseOutcome::Ok);
        assert_eq!(ResponseOutcome::classify("error:22\n"), ResponseOutcome::Error(22));
        assert_eq!(ResponseOutcome::classify("ALARM:2\n"), ResponseOutcome::Alarm(2));
        assert_eq!(ResponseOutcome::classify("timeout"), ResponseOutcome::Timeout);
        assert_eq!(ResponseOutcome::classify(""), ResponseOutcome::Unrecognized);
    }

    #[test]
    fn test_into_result() {
        assert!(ResponseOutcome::Ok.into_result(100).is_ok());
        assert!(matches!(
            ResponseOutcome::Error(22).into_result(100),
            Err(ControllerError::CommandRejected { code: 22, .. })
        ));
        assert_eq!(
            ResponseOutcome::Timeout.into_result(250),
            Err(ControllerError::Timeout { timeout_ms: 250 })
        );
    }

    #[test]
    fn test_banner() {
        let banner = "\r\n\r\nGrbl 1.1h ['$' for help]\r\n[MSG:'$H'|'$X' to unlock]\r\n";
        assert_eq!(
            extract_version(banner).as_deref(),
            Some("Grbl 1.1h ['$' for help]")
        );

        assert_eq!(extract_version("Marlin 2.1\n"), None);
    }

    #[test]
    fn test_grblhal_banner() {
        assert_eq!(
            extract_version("GrblHAL 1.1f ['$' or '$HELP' for help]\n").as_deref(),
            Some("GrblHAL 1.1f ['$' or '$HELP' for help]")
        );
    }
}
