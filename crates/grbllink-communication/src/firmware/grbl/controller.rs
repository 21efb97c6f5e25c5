//! GRBL Controller Implementation
//!
//! The single logical session to one controller. Owns connection handshake
//! and auto-detection, queued and realtime command dispatch, status and
//! settings queries, and event emission.
//!
//! Every public operation serializes on one session lock, realtime bytes
//! included. Events are published only after that lock is released, so an
//! observer may call back into the controller.
//!
//! Nothing here returns an error across the public surface: failures come
//! back as `false`, an empty or marker string, or a default snapshot, and are
//! logged.

use crate::communication::serial::{SystemSerial, Transport, TransportProvider};
use crate::firmware::grbl::commands::{self, MotionMode, RealtimeCommand};
use crate::firmware::grbl::error_decoder::{format_alarm, format_error};
use crate::firmware::grbl::response_parser::{
    alarm_code, error_code, extract_version, is_success, is_terminal_line, ResponseOutcome,
    TIMEOUT_MARKER,
};
use crate::firmware::grbl::settings::{parse_settings, GrblSetting};
use crate::firmware::grbl::status_parser::{GrblStatus, StatusParser};
use grbllink_core::{
    ControllerConfig, ControllerError, Error, EventDispatcher, EventKind, EventObserver,
    GrblEvent, Result,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

/// Reply to [`GrblController::send_command`] when there is no session
pub const NOT_CONNECTED_REPLY: &str = "error: not connected";

/// Session fields guarded by the session lock
#[derive(Default)]
struct Session {
    transport: Option<Box<dyn Transport>>,
    port: String,
    version: String,
}

/// GRBL protocol client
///
/// Constructed explicitly and shared by reference (typically in an `Arc`)
/// with whatever needs to drive the machine.
pub struct GrblController {
    provider: Arc<dyn TransportProvider>,
    config: ControllerConfig,
    session: Mutex<Session>,
    /// Mirrors `session.transport.is_some()` for lock-free reads
    connected: AtomicBool,
    events: EventDispatcher,
}

impl GrblController {
    /// Create a controller drawing transports from `provider`
    pub fn new(provider: Arc<dyn TransportProvider>, config: ControllerConfig) -> Self {
        let events = EventDispatcher::new(config.event_capacity);
        Self {
            provider,
            config,
            session: Mutex::new(Session::default()),
            connected: AtomicBool::new(false),
            events,
        }
    }

    /// Create a controller over the system's serial devices
    pub fn with_system_serial(config: ControllerConfig) -> Self {
        Self::new(Arc::new(SystemSerial), config)
    }

    /// The active configuration
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Candidate ports, in probe order
    pub fn list_ports(&self) -> Vec<String> {
        self.provider.list_ports()
    }

    /// Establish a session
    ///
    /// With `port`, only that port is probed. Without it every candidate is
    /// probed in order and the first one answering with a GRBL banner is
    /// kept. `baud_rate` defaults to the configured rate. Returns `true`
    /// straight away if a session already exists.
    pub fn connect(&self, port: Option<&str>, baud_rate: Option<u32>) -> bool {
        let baud_rate = baud_rate.unwrap_or(self.config.baud_rate);

        let event = {
            let mut session = self.session.lock();
            if session.transport.is_some() {
                tracing::debug!("Already connected to {}", session.port);
                return true;
            }

            let result = match port {
                Some(port) => self
                    .probe(port, baud_rate)
                    .map(|(transport, version)| (port.to_string(), transport, version)),
                None => self.auto_detect(baud_rate),
            };

            let (port, transport, version) = match result {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Connect failed: {}", e);
                    return false;
                }
            };

            tracing::info!("Connected to {} at {} baud: {}", port, baud_rate, version);
            session.transport = Some(transport);
            session.port = port;
            session.version = version;
            self.connected.store(true, Ordering::SeqCst);

            GrblEvent::connected(&session.port, &session.version)
        };

        self.events.publish(event);
        true
    }

    /// Close the session; a no-op without one
    pub fn disconnect(&self) {
        if !self.is_connected() {
            return;
        }

        let port = {
            let mut session = self.session.lock();
            let Some(mut transport) = session.transport.take() else {
                return;
            };
            transport.close();
            self.connected.store(false, Ordering::SeqCst);
            session.version.clear();
            std::mem::take(&mut session.port)
        };

        tracing::info!("Disconnected from {}", port);
        self.events.publish(GrblEvent::disconnected(&port));
    }

    /// Whether a session exists
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Port of the current session, empty without one
    pub fn port(&self) -> String {
        self.session.lock().port.clone()
    }

    /// Firmware banner line of the current session, empty without one
    pub fn version(&self) -> String {
        self.session.lock().version.clone()
    }

    /// Request and parse a fresh status frame
    pub fn get_status(&self) -> GrblStatus {
        let timeout = millis(self.config.status_timeout_ms);
        let result = self.with_transport(|transport| {
            transport.write_byte(RealtimeCommand::StatusQuery.as_byte())?;
            Ok(transport.read_line(timeout))
        });

        match result {
            Ok(line) => StatusParser::parse_or_unknown(&line),
            Err(Error::Controller(ControllerError::NotConnected)) => GrblStatus::disconnected(),
            Err(e) => {
                tracing::warn!("Status query failed: {}", e);
                GrblStatus::default()
            }
        }
    }

    /// State label of a fresh status frame
    pub fn get_state(&self) -> String {
        self.get_status().state
    }

    /// Run the homing cycle
    pub fn home(&self) -> bool {
        let homed = self.run_queued(commands::HOME, self.config.homing_timeout_ms);
        if homed {
            self.events.publish(GrblEvent::bare(EventKind::HomingComplete));
        }
        homed
    }

    /// Rapid move; omitted axes keep their position
    pub fn move_g0(&self, x: Option<f64>, y: Option<f64>, z: Option<f64>) -> bool {
        let cmd = commands::motion_command(MotionMode::Rapid, x, y, z, None);
        self.run_queued(&cmd, self.config.command_timeout_ms)
    }

    /// Linear move at `feed`; omitted axes keep their position
    pub fn move_g1(&self, x: Option<f64>, y: Option<f64>, z: Option<f64>, feed: f64) -> bool {
        let cmd = commands::motion_command(MotionMode::Linear, x, y, z, Some(feed));
        self.run_queued(&cmd, self.config.command_timeout_ms)
    }

    /// Relative jog of one axis
    pub fn jog(&self, axis: char, distance: f64, feed: f64) -> bool {
        match commands::jog_command(axis, distance, feed) {
            Ok(cmd) => self.run_queued(&cmd, self.config.command_timeout_ms),
            Err(e) => {
                tracing::warn!("Jog rejected: {}", e);
                false
            }
        }
    }

    /// Abort an active jog
    pub fn cancel_jog(&self) -> bool {
        self.send_realtime(RealtimeCommand::JogCancel)
    }

    /// Pause motion
    pub fn feed_hold(&self) -> bool {
        self.realtime_with_event(RealtimeCommand::FeedHold, EventKind::FeedHold)
    }

    /// Resume motion
    pub fn cycle_start(&self) -> bool {
        self.realtime_with_event(RealtimeCommand::CycleStart, EventKind::CycleStart)
    }

    /// Reboot the firmware and discard its startup banner
    pub fn soft_reset(&self) -> bool {
        let settle = self.config.settle();
        let drain = millis(self.config.reset_drain_ms);
        let result = self.with_transport(|transport| {
            transport.write_byte(RealtimeCommand::SoftReset.as_byte())?;
            pause(settle);
            let banner = transport.read_all(drain);
            tracing::debug!("Discarded {} byte(s) after reset", banner.len());
            Ok(())
        });

        match result {
            Ok(()) => {
                self.events.publish(GrblEvent::bare(EventKind::Reset));
                true
            }
            Err(e) => {
                tracing::warn!("Soft reset failed: {}", e);
                false
            }
        }
    }

    /// Clear an alarm lock
    pub fn unlock(&self) -> bool {
        let unlocked = self.run_queued(commands::UNLOCK, self.config.quick_timeout_ms);
        if unlocked {
            self.events.publish(GrblEvent::bare(EventKind::Unlocked));
        }
        unlocked
    }

    /// Read every firmware setting
    pub fn get_settings(&self) -> Vec<GrblSetting> {
        let timeout = millis(self.config.settings_timeout_ms);
        let poll = millis(self.config.line_poll_ms);
        let result = self.with_transport(|transport| {
            transport.write_line(commands::LIST_SETTINGS)?;
            Ok(collect_listing(transport, timeout, poll))
        });

        match result {
            Ok(listing) => parse_settings(&listing),
            Err(e) => {
                tracing::warn!("Settings query failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Write one firmware setting
    pub fn set_setting(&self, id: u16, value: f64) -> bool {
        let cmd = commands::setting_command(id, value);
        let written = self.run_queued(&cmd, self.config.quick_timeout_ms);
        if written {
            self.events.publish(GrblEvent::setting_changed(id, value));
        }
        written
    }

    /// Send a raw queued command and return everything read until a terminal
    /// token, or the text so far followed by `timeout`
    ///
    /// Returns [`NOT_CONNECTED_REPLY`] without a session and an empty string
    /// when the command could not be written.
    pub fn send_command(&self, command: &str, timeout_ms: u64) -> String {
        match self.exchange(command, timeout_ms) {
            Ok(response) => response,
            Err(Error::Controller(ControllerError::NotConnected)) => NOT_CONNECTED_REPLY.to_string(),
            Err(e) => {
                tracing::warn!("Command '{}' failed: {}", command, e);
                String::new()
            }
        }
    }

    /// Send a single realtime byte; `true` once the transport accepted it
    pub fn send_realtime(&self, command: RealtimeCommand) -> bool {
        let result = self.with_transport(|transport| {
            transport.write_byte(command.as_byte())?;
            Ok(())
        });

        if let Err(e) = &result {
            tracing::warn!("Realtime {} failed: {}", command, e);
        }
        result.is_ok()
    }

    /// Register the event observer, replacing any previous one
    pub fn set_observer(&self, observer: Arc<dyn EventObserver>) {
        self.events.set_observer(observer);
    }

    /// Remove the event observer
    pub fn clear_observer(&self) {
        self.events.clear_observer();
    }

    /// Receive every event from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GrblEvent> {
        self.events.subscribe()
    }

    fn realtime_with_event(&self, command: RealtimeCommand, kind: EventKind) -> bool {
        let sent = self.send_realtime(command);
        if sent {
            self.events.publish(GrblEvent::bare(kind));
        }
        sent
    }

    /// Queued exchange reduced to success or failure
    fn run_queued(&self, command: &str, timeout_ms: u64) -> bool {
        let result = self.exchange(command, timeout_ms).and_then(|response| {
            ResponseOutcome::classify(&response)
                .into_result(timeout_ms)
                .map_err(Error::from)
        });

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("'{}' failed: {}", command, e);
                false
            }
        }
    }

    /// Write a queued command and wait for its response
    fn exchange(&self, command: &str, timeout_ms: u64) -> Result<String> {
        let timeout = millis(timeout_ms);
        let poll = millis(self.config.line_poll_ms);
        let response = self.with_transport(|transport| {
            transport.write_line(command)?;
            Ok(wait_for_response(transport, timeout, poll))
        })?;

        if let Some(code) = error_code(&response) {
            tracing::warn!("'{}' -> {}", command, format_error(code));
        } else if let Some(code) = alarm_code(&response) {
            tracing::error!("'{}' -> {}", command, format_alarm(code));
        }
        Ok(response)
    }

    /// Run `f` against the session transport while holding the session lock
    fn with_transport<T>(&self, f: impl FnOnce(&mut dyn Transport) -> Result<T>) -> Result<T> {
        if !self.is_connected() {
            return Err(ControllerError::NotConnected.into());
        }

        let mut session = self.session.lock();
        let transport = session
            .transport
            .as_deref_mut()
            .ok_or(ControllerError::NotConnected)?;
        f(transport)
    }

    fn auto_detect(&self, baud_rate: u32) -> Result<(String, Box<dyn Transport>, String)> {
        let candidates = self.provider.list_ports();
        tracing::info!("Auto-detecting GRBL on {} candidate port(s)", candidates.len());

        for port in &candidates {
            match self.probe(port, baud_rate) {
                Ok((transport, version)) => return Ok((port.clone(), transport, version)),
                Err(e) => tracing::debug!("Probe of {} failed: {}", port, e),
            }
        }

        Err(ControllerError::NoDeviceFound {
            candidates: candidates.len(),
        }
        .into())
    }

    /// Open `port` and check for a GRBL banner after a soft reset
    ///
    /// The transport is closed again unless the handshake succeeds.
    fn probe(&self, port: &str, baud_rate: u32) -> Result<(Box<dyn Transport>, String)> {
        let mut transport = self.provider.create();
        transport.open(port, baud_rate)?;

        match self.handshake(&mut *transport, port) {
            Ok(version) => Ok((transport, version)),
            Err(e) => {
                transport.close();
                Err(e)
            }
        }
    }

    fn handshake(&self, transport: &mut dyn Transport, port: &str) -> Result<String> {
        transport.write_byte(RealtimeCommand::SoftReset.as_byte())?;
        pause(self.config.settle());

        let banner = transport.read_all(millis(self.config.banner_read_ms));
        extract_version(&banner).ok_or_else(|| {
            ControllerError::HandshakeFailed {
                port: port.to_string(),
            }
            .into()
        })
    }
}

impl Default for GrblController {
    fn default() -> Self {
        Self::with_system_serial(ControllerConfig::default())
    }
}

/// Accumulate response lines until one carries a terminal token
///
/// Each read waits at most `poll`. When `timeout` passes first, the text read
/// so far is returned with [`TIMEOUT_MARKER`] appended.
///
/// The wait lasts at least one `poll` slice, so a zero timeout still picks up
/// an immediate reply instead of leaving it for the next exchange.
pub fn wait_for_response(transport: &mut dyn Transport, timeout: Duration, poll: Duration) -> String {
    let deadline = Instant::now() + timeout.max(poll);
    let mut response = String::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            response.push_str(TIMEOUT_MARKER);
            break;
        }

        let slice = poll.min(remaining);
        let started = Instant::now();
        let line = transport.read_line(slice);
        if line.is_empty() {
            // A failing link returns at once; sit out the rest of the slice.
            pause(slice.saturating_sub(started.elapsed()));
            continue;
        }

        response.push_str(&line);
        response.push('\n');
        if is_terminal_line(&line) {
            break;
        }
    }

    response
}

/// Accumulate a `$$` listing until `ok`, a quiet read, or `timeout`
fn collect_listing(transport: &mut dyn Transport, timeout: Duration, poll: Duration) -> String {
    let deadline = Instant::now() + timeout;
    let mut listing = String::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }

        let line = transport.read_line(poll.min(remaining));
        if line.is_empty() {
            break;
        }

        listing.push_str(&line);
        listing.push('\n');
        if is_success(&line) {
            break;
        }
    }

    listing
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        std::thread::sleep(duration);
    }
}
