//! Scripted in-memory transports for exercising the controller without
//! hardware.

#![allow(dead_code)]

use grbllink_communication::{Transport, TransportProvider, TransportResult};
use grbllink_core::{ConnectionError, ControllerConfig};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

pub const BANNER: &str = "\r\nGrbl 1.1h ['$' for help]\r\n[MSG:'$H'|'$X' to unlock]\r\n";
pub const VERSION: &str = "Grbl 1.1h ['$' for help]";

/// One simulated device behind a port name
#[derive(Default)]
pub struct Device {
    /// Text emitted after a soft reset byte
    pub banner: String,
    /// Lines handed out by `read_line`, in order
    pub lines: VecDeque<String>,
    pub written_lines: Vec<String>,
    pub written_bytes: Vec<u8>,
    pub opened: usize,
    pub closed: usize,
    pub fail_open: bool,
    pub fail_writes: bool,
    /// `read_line` returns empty at once, like a link with a hard error
    pub fail_reads: bool,
    /// Sent every few milliseconds once `lines` runs dry
    pub repeat_line: Option<String>,
    /// Number of `read_line` calls
    pub reads: usize,
    pending_banner: String,
}

#[derive(Default)]
pub struct Bench {
    pub devices: BTreeMap<String, Device>,
    pub open_order: Vec<String>,
}

/// Provider handing out transports onto a shared bench of devices
#[derive(Clone, Default)]
pub struct MockProvider {
    bench: Arc<Mutex<Bench>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_device(&self, port: &str, banner: &str) {
        self.bench.lock().devices.insert(
            port.to_string(),
            Device {
                banner: banner.to_string(),
                ..Default::default()
            },
        );
    }

    pub fn push_lines(&self, port: &str, lines: &[&str]) {
        self.with_device(port, |device| {
            device
                .lines
                .extend(lines.iter().map(|line| line.to_string()))
        });
    }

    pub fn with_device<T>(&self, port: &str, f: impl FnOnce(&mut Device) -> T) -> T {
        let mut bench = self.bench.lock();
        let device = bench
            .devices
            .get_mut(port)
            .unwrap_or_else(|| panic!("no device at {}", port));
        f(device)
    }

    pub fn open_order(&self) -> Vec<String> {
        self.bench.lock().open_order.clone()
    }

    pub fn written_lines(&self, port: &str) -> Vec<String> {
        self.with_device(port, |device| device.written_lines.clone())
    }

    pub fn written_bytes(&self, port: &str) -> Vec<u8> {
        self.with_device(port, |device| device.written_bytes.clone())
    }
}

impl TransportProvider for MockProvider {
    fn list_ports(&self) -> Vec<String> {
        self.bench.lock().devices.keys().cloned().collect()
    }

    fn create(&self) -> Box<dyn Transport> {
        Box::new(MockTransport {
            bench: self.bench.clone(),
            port: None,
        })
    }
}

const REPEAT_INTERVAL: Duration = Duration::from_millis(2);

enum Read {
    Line(String),
    Repeat(String),
    Failed,
    Quiet,
}

pub struct MockTransport {
    bench: Arc<Mutex<Bench>>,
    port: Option<String>,
}

impl MockTransport {
    fn device<T>(&self, f: impl FnOnce(&mut Device) -> T) -> Option<T> {
        let port = self.port.as_ref()?;
        let mut bench = self.bench.lock();
        bench.devices.get_mut(port).map(f)
    }
}

impl Transport for MockTransport {
    fn open(&mut self, path: &str, _baud_rate: u32) -> TransportResult<()> {
        self.close();

        let mut bench = self.bench.lock();
        bench.open_order.push(path.to_string());
        match bench.devices.get_mut(path) {
            Some(device) if !device.fail_open => {
                device.opened += 1;
                self.port = Some(path.to_string());
                Ok(())
            }
            _ => Err(ConnectionError::FailedToOpen {
                port: path.to_string(),
                reason: "no such device".to_string(),
            }),
        }
    }

    fn close(&mut self) {
        if self.port.is_some() {
            self.device(|device| device.closed += 1);
            self.port = None;
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_line(&mut self, text: &str) -> TransportResult<()> {
        self.device(|device| {
            if device.fail_writes {
                return Err(ConnectionError::IoError {
                    reason: "write failed".to_string(),
                });
            }
            device.written_lines.push(text.to_string());
            Ok(())
        })
        .unwrap_or(Err(ConnectionError::NotOpen))
    }

    fn write_byte(&mut self, byte: u8) -> TransportResult<()> {
        self.device(|device| {
            if device.fail_writes {
                return Err(ConnectionError::IoError {
                    reason: "write failed".to_string(),
                });
            }
            device.written_bytes.push(byte);
            if byte == 0x18 {
                device.pending_banner = device.banner.clone();
            }
            Ok(())
        })
        .unwrap_or(Err(ConnectionError::NotOpen))
    }

    fn read_line(&mut self, timeout: Duration) -> String {
        let next = self
            .device(|device| {
                device.reads += 1;
                if device.fail_reads {
                    return Read::Failed;
                }
                match device.lines.pop_front() {
                    Some(line) => Read::Line(line),
                    None => match &device.repeat_line {
                        Some(line) => Read::Repeat(line.clone()),
                        None => Read::Quiet,
                    },
                }
            })
            .unwrap_or(Read::Quiet);

        match next {
            Read::Line(line) => line,
            Read::Repeat(line) => {
                std::thread::sleep(REPEAT_INTERVAL.min(timeout));
                line
            }
            Read::Failed => String::new(),
            Read::Quiet => {
                std::thread::sleep(timeout);
                String::new()
            }
        }
    }

    fn read_all(&mut self, _timeout: Duration) -> String {
        self.device(|device| std::mem::take(&mut device.pending_banner))
            .unwrap_or_default()
    }

    fn flush(&mut self) -> TransportResult<()> {
        Ok(())
    }

    fn drain(&mut self) -> TransportResult<()> {
        Ok(())
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Short timeouts and no settle window
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        settle_ms: 0,
        banner_read_ms: 20,
        reset_drain_ms: 10,
        command_timeout_ms: 200,
        homing_timeout_ms: 300,
        quick_timeout_ms: 200,
        status_timeout_ms: 50,
        settings_timeout_ms: 200,
        line_poll_ms: 20,
        ..Default::default()
    }
}
