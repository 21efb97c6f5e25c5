//! Serial port communication implementation
//!
//! Provides the byte-level link to a single controller:
//! - Candidate port enumeration (`ttyUSB*` and `ttyACM*` devices)
//! - 8N1 raw configuration without flow control
//! - Newline-terminated writes and single-byte realtime writes
//! - Deadline-bounded line and bulk reads
//!
//! Every operation reports failure through its return value. Reads never fail:
//! when the deadline passes they hand back whatever was accumulated.

use grbllink_core::ConnectionError;
use std::collections::BTreeSet;
use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

/// Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, ConnectionError>;

/// Device-name prefixes that may host a controller
pub const CANDIDATE_PREFIXES: [&str; 2] = ["ttyUSB", "ttyACM"];

/// Baud rates the link accepts; anything else falls back to 115200
pub const SUPPORTED_BAUD_RATES: [u32; 6] = [9600, 19_200, 38_400, 57_600, 115_200, 230_400];

const FALLBACK_BAUD_RATE: u32 = 115_200;
const DEVICE_DIR: &str = "/dev";
const READ_CHUNK: usize = 256;

/// Byte channel to one physical controller
///
/// An instance represents exactly one connection. Methods take `&mut self`, so
/// operations on one instance never interleave.
pub trait Transport: Send {
    /// Open and configure `path`, closing any previous connection first
    fn open(&mut self, path: &str, baud_rate: u32) -> TransportResult<()>;

    /// Release the channel; a no-op when already closed
    fn close(&mut self);

    /// Whether the channel is open
    fn is_open(&self) -> bool;

    /// Write `text`, appending `\n` if missing, and wait for transmission
    fn write_line(&mut self, text: &str) -> TransportResult<()>;

    /// Write a single unterminated byte without waiting for transmission
    fn write_byte(&mut self, byte: u8) -> TransportResult<()>;

    /// Read until `\n` or the deadline, with a trailing `\r` stripped
    fn read_line(&mut self, timeout: Duration) -> String;

    /// Collect everything that arrives within the window
    fn read_all(&mut self, timeout: Duration) -> String;

    /// Discard unread input
    fn flush(&mut self) -> TransportResult<()>;

    /// Block until pending output has been transmitted
    fn drain(&mut self) -> TransportResult<()>;
}

/// Source of transports and of the ports they may be opened on
pub trait TransportProvider: Send + Sync {
    /// Candidate ports in probe order
    fn list_ports(&self) -> Vec<String>;

    /// A fresh, closed transport
    fn create(&self) -> Box<dyn Transport>;
}

/// Check if a port name matches a recognized controller device
///
/// Only the final path component is inspected, so both `/dev/ttyUSB0` and
/// `ttyUSB0` match.
pub fn is_candidate_port(port_name: &str) -> bool {
    let basename = port_name.rsplit('/').next().unwrap_or(port_name);
    CANDIDATE_PREFIXES
        .iter()
        .any(|prefix| basename.starts_with(prefix))
}

/// Keep recognized controller ports, deduplicated and sorted lexicographically
pub fn filter_candidate_ports<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|name| is_candidate_port(name.as_ref()))
        .map(|name| name.as_ref().to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// List candidate controller ports on this system
///
/// Merges the device directory scan with what the `serialport` crate reports,
/// so devices the USB enumeration misses are still found.
pub fn list_ports() -> Vec<String> {
    let mut names = Vec::new();

    match std::fs::read_dir(DEVICE_DIR) {
        Ok(entries) => {
            for entry in entries.flatten() {
                if let Some(fname) = entry.file_name().to_str() {
                    names.push(format!("{}/{}", DEVICE_DIR, fname));
                }
            }
        }
        Err(e) => tracing::debug!("Cannot scan {}: {}", DEVICE_DIR, e),
    }

    match serialport::available_ports() {
        Ok(ports) => names.extend(ports.into_iter().map(|p| p.port_name)),
        Err(e) => tracing::error!("Failed to enumerate serial ports: {}", e),
    }

    let ports = filter_candidate_ports(names);
    tracing::debug!("Found {} candidate port(s): {:?}", ports.len(), ports);
    ports
}

/// Map a requested baud rate onto one the link supports
pub fn normalize_baud_rate(baud_rate: u32) -> u32 {
    if SUPPORTED_BAUD_RATES.contains(&baud_rate) {
        baud_rate
    } else {
        tracing::warn!(
            "Unsupported baud rate {}, using {}",
            baud_rate,
            FALLBACK_BAUD_RATE
        );
        FALLBACK_BAUD_RATE
    }
}

/// Real serial port implementation using the serialport crate
pub struct SerialTransport {
    port: Option<Box<dyn serialport::SerialPort>>,
    device: String,
}

impl SerialTransport {
    /// Create a closed transport
    pub fn new() -> Self {
        Self {
            port: None,
            device: String::new(),
        }
    }

    /// The device path of the open connection, empty when closed
    pub fn device(&self) -> &str {
        &self.device
    }

    fn configure(
        path: &str,
        baud_rate: u32,
    ) -> serialport::Result<Box<dyn serialport::SerialPort>> {
        let port = serialport::new(path, normalize_baud_rate(baud_rate))
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(100))
            .open()?;

        port.clear(serialport::ClearBuffer::All)?;
        Ok(port)
    }

    /// Read one byte, waiting at most `timeout`
    fn read_byte(port: &mut dyn serialport::SerialPort, timeout: Duration) -> Option<u8> {
        if port.set_timeout(timeout).is_err() {
            return None;
        }

        let mut buf = [0u8; 1];
        match port.read(&mut buf) {
            Ok(1) => Some(buf[0]),
            Ok(_) => None,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => None,
            Err(e) => {
                tracing::warn!("Serial read failed: {}", e);
                None
            }
        }
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, path: &str, baud_rate: u32) -> TransportResult<()> {
        self.close();

        match Self::configure(path, baud_rate) {
            Ok(port) => {
                tracing::info!("Opened {} at {} baud", path, baud_rate);
                self.port = Some(port);
                self.device = path.to_string();
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Failed to open serial port {}: {}", path, e);
                Err(ConnectionError::FailedToOpen {
                    port: path.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Closed {}", self.device);
            self.device.clear();
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_line(&mut self, text: &str) -> TransportResult<()> {
        let port = self.port.as_mut().ok_or(ConnectionError::NotOpen)?;

        let mut payload = text.as_bytes().to_vec();
        if payload.last() != Some(&b'\n') {
            payload.push(b'\n');
        }

        tracing::debug!(">> {}", text.trim_end());
        port.write_all(&payload)?;
        port.flush()?;
        Ok(())
    }

    fn write_byte(&mut self, byte: u8) -> TransportResult<()> {
        let port = self.port.as_mut().ok_or(ConnectionError::NotOpen)?;

        tracing::debug!(">> 0x{:02X}", byte);
        let written = port.write(&[byte])?;
        if written != 1 {
            return Err(ConnectionError::ShortWrite {
                written,
                expected: 1,
            });
        }
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> String {
        let Some(port) = self.port.as_mut() else {
            return String::new();
        };

        let deadline = Instant::now() + timeout;
        let mut line = Vec::new();

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match Self::read_byte(&mut **port, remaining) {
                Some(b'\n') => {
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    break;
                }
                Some(byte) => line.push(byte),
                None => break,
            }
        }

        let line = String::from_utf8_lossy(&line).into_owned();
        if !line.is_empty() {
            tracing::debug!("<< {}", line);
        }
        line
    }

    fn read_all(&mut self, timeout: Duration) -> String {
        let Some(port) = self.port.as_mut() else {
            return String::new();
        };

        let deadline = Instant::now() + timeout;
        let mut collected = Vec::new();
        let mut buf = [0u8; READ_CHUNK];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || port.set_timeout(remaining).is_err() {
                break;
            }

            match port.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => collected.extend_from_slice(&buf[..n]),
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) => {
                    tracing::warn!("Serial read failed: {}", e);
                    break;
                }
            }
        }

        String::from_utf8_lossy(&collected).into_owned()
    }

    fn flush(&mut self) -> TransportResult<()> {
        if let Some(port) = self.port.as_mut() {
            port.clear(serialport::ClearBuffer::All)
                .map_err(|e| ConnectionError::IoError {
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    fn drain(&mut self) -> TransportResult<()> {
        if let Some(port) = self.port.as_mut() {
            port.flush()?;
        }
        Ok(())
    }
}

/// Transports backed by the system's serial devices
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSerial;

impl TransportProvider for SystemSerial {
    fn list_ports(&self) -> Vec<String> {
        list_ports()
    }

    fn create(&self) -> Box<dyn Transport> {
        Box::new(SerialTransport::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_port_names() {
        assert!(is_candidate_port("/dev/ttyUSB0"));
        assert!(is_candidate_port("/dev/ttyACM12"));
        assert!(is_candidate_port("ttyACM0"));
        assert!(!is_candidate_port("/dev/ttyS0"));
        assert!(!is_candidate_port("/dev/video0"));
        assert!(!is_candidate_port("COM3"));
        assert!(!is_candidate_port("/dev/usb/ttyS1"));
    }

    #[test]
    fn test_filter_sorts_and_dedups() {
        let ports = filter_candidate_ports([
            "/dev/ttyUSB1",
            "/dev/ttyS0",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/null",
            "/dev/ttyACM0",
            "/dev/ttyUSB1",
        ]);

        assert_eq!(
            ports,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
            ]
        );
    }

    #[test]
    fn test_list_ports_is_deterministic() {
        let first = list_ports();
        let second = list_ports();
        assert_eq!(first, second);
        assert!(first.iter().all(|p| is_candidate_port(p)));
    }

    #[test]
    fn test_normalize_baud_rate() {
        assert_eq!(normalize_baud_rate(9600), 9600);
        assert_eq!(normalize_baud_rate(230_400), 230_400);
        assert_eq!(normalize_baud_rate(250_000), 115_200);
    }

    #[test]
    fn test_closed_transport() {
        let mut transport = SerialTransport::new();
        assert!(!transport.is_open());
        assert_eq!(transport.device(), "");
        assert_eq!(transport.write_line("G0 X1"), Err(ConnectionError::NotOpen));
        assert_eq!(transport.write_byte(b'?'), Err(ConnectionError::NotOpen));
        assert_eq!(transport.read_line(Duration::from_millis(10)), "");
        assert_eq!(transport.read_all(Duration::from_millis(10)), "");
        assert!(transport.flush().is_ok());
        transport.close();
        transport.close();
    }

    #[test]
    fn test_open_missing_device_leaves_no_state() {
        let mut transport = SerialTransport::new();
        let result = transport.open("/dev/ttyUSB-does-not-exist", 115_200);
        assert!(matches!(result, Err(ConnectionError::FailedToOpen { .. })));
        assert!(!transport.is_open());
    }
}
