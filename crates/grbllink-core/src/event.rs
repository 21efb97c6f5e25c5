//! Event system for controller session lifecycle
//!
//! Provides:
//! - Event kinds with their wire tags
//! - Timestamped events carrying a JSON payload
//! - A single-slot observer registration
//! - A broadcast dispatcher for any number of draining subscribers

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;

/// State transitions reported by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A session was established
    #[serde(rename = "grbl_connected")]
    Connected,
    /// An existing session was closed
    #[serde(rename = "grbl_disconnected")]
    Disconnected,
    /// `$H` completed with `ok`
    #[serde(rename = "grbl_homing_complete")]
    HomingComplete,
    /// Feed hold byte accepted
    #[serde(rename = "grbl_feed_hold")]
    FeedHold,
    /// Cycle start byte accepted
    #[serde(rename = "grbl_cycle_start")]
    CycleStart,
    /// Soft reset byte accepted
    #[serde(rename = "grbl_reset")]
    Reset,
    /// `$X` completed with `ok`
    #[serde(rename = "grbl_unlocked")]
    Unlocked,
    /// A `$<id>=<value>` write completed with `ok`
    #[serde(rename = "grbl_setting_changed")]
    SettingChanged,
}

impl EventKind {
    /// Wire tag used by the notification layer
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "grbl_connected",
            Self::Disconnected => "grbl_disconnected",
            Self::HomingComplete => "grbl_homing_complete",
            Self::FeedHold => "grbl_feed_hold",
            Self::CycleStart => "grbl_cycle_start",
            Self::Reset => "grbl_reset",
            Self::Unlocked => "grbl_unlocked",
            Self::SettingChanged => "grbl_setting_changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single controller event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrblEvent {
    /// What happened
    pub kind: EventKind,
    /// Structured details, `{}` when the kind carries none
    pub payload: Value,
    /// When the event was raised
    pub timestamp: DateTime<Utc>,
}

impl GrblEvent {
    /// Create an event stamped with the current time
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            kind,
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Create an event with an empty payload
    pub fn bare(kind: EventKind) -> Self {
        Self::new(kind, json!({}))
    }

    /// Session established on `port` running `version`
    pub fn connected(port: &str, version: &str) -> Self {
        Self::new(
            EventKind::Connected,
            json!({ "port": port, "version": version }),
        )
    }

    /// Session on `port` closed
    pub fn disconnected(port: &str) -> Self {
        Self::new(EventKind::Disconnected, json!({ "port": port }))
    }

    /// Setting `id` now holds `value`
    pub fn setting_changed(id: u16, value: f64) -> Self {
        Self::new(
            EventKind::SettingChanged,
            json!({ "id": id, "value": value }),
        )
    }

    /// The wire tag of this event's kind
    pub fn type_tag(&self) -> &'static str {
        self.kind.as_str()
    }
}

impl std::fmt::Display for GrblEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.payload)
    }
}

/// Receiver of controller events
///
/// Invoked after the controller's session lock has been released, so an
/// implementation may call back into the controller.
pub trait EventObserver: Send + Sync {
    /// Called once per emitted event
    fn on_event(&self, event: &GrblEvent);
}

impl<F> EventObserver for F
where
    F: Fn(&GrblEvent) + Send + Sync,
{
    fn on_event(&self, event: &GrblEvent) {
        self(event)
    }
}

/// Event dispatcher for publishing events
///
/// Holds at most one observer (registering a new one replaces the old one)
/// and a broadcast channel that any number of subscribers can drain. Each
/// published event goes to the observer first, then to the channel.
#[derive(Clone)]
pub struct EventDispatcher {
    /// Broadcast sender channel for controller events.
    tx: broadcast::Sender<GrblEvent>,
    observer: Arc<RwLock<Option<Arc<dyn EventObserver>>>>,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    ///
    /// # Arguments
    /// * `buffer_size` - Capacity of the broadcast channel; slow subscribers
    ///   lose the oldest events once it fills
    pub fn new(buffer_size: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer_size.max(1));
        Self {
            tx,
            observer: Arc::new(RwLock::new(None)),
        }
    }

    /// Replace the registered observer
    pub fn set_observer(&self, observer: Arc<dyn EventObserver>) {
        *self.observer.write() = Some(observer);
    }

    /// Remove the registered observer, if any
    pub fn clear_observer(&self) {
        *self.observer.write() = None;
    }

    /// Whether an observer is registered
    pub fn has_observer(&self) -> bool {
        self.observer.read().is_some()
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<GrblEvent> {
        self.tx.subscribe()
    }

    /// Get number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Publish an event to the observer and all subscribers
    pub fn publish(&self, event: GrblEvent) {
        tracing::debug!(event = %event, "Publishing controller event");

        // Clone out of the slot so the observer runs without the slot lock held.
        let observer = self.observer.read().clone();
        if let Some(observer) = observer {
            observer.on_event(&event);
        }

        // No subscribers is not an error.
        let _ = self.tx.send(event);
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(64)
    }
}
