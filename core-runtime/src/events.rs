//! # Event Bus System
//!
//! Lifecycle notifications for the catalog core, published on a
//! `tokio::sync::broadcast` channel.
//!
//! [`CatalogState`] (in `core-sync`) is the source of truth for what the UI
//! shows. The event bus carries the *history*: which sync ran, what it
//! decided, how long it took. Hosts use it for diagnostics, analytics and
//! toasts.
//!
//! ```text
//! ┌──────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ CatalogSync      ├────────>│ EventBus  ├────────────>│ Subscriber │
//! │ Coordinator      │         │ (broadcast│             └────────────┘
//! └──────────────────┘         │  channel) ├────────────>┌────────────┐
//!                              └───────────┘             │ Subscriber │
//!                                                        └────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(32);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::UpToDate {
//!         job_id: "job-1".to_string(),
//!         version: 3,
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert_eq!(event.description(), "Catalog already up to date");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - `RecvError::Lagged(n)`: the subscriber fell behind and missed `n` events.
//! - `RecvError::Closed`: every sender was dropped; treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed; publishers ignore that with
//! `.ok()`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 64;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Sync job lifecycle
    Sync(SyncEvent),
    /// Local catalog contents changed or were read
    Catalog(CatalogEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Sync(SyncEvent::Failed {
                stale_served: false,
                ..
            }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed {
                stale_served: true,
                ..
            }) => EventSeverity::Warning,
            CoreEvent::Sync(SyncEvent::Completed { skipped, .. }) if *skipped > 0 => {
                EventSeverity::Warning
            }
            CoreEvent::Sync(SyncEvent::Completed { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::Replaced { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted by the catalog sync coordinator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A sync run began checking versions.
    Started {
        job_id: String,
        /// Version marker read from the local store.
        local_version: u64,
        /// Records in the local store before the run.
        local_count: u64,
    },
    /// Remote version checked; no resync was needed.
    UpToDate { job_id: String, version: u64 },
    /// The local catalog was replaced with the remote one.
    Completed {
        job_id: String,
        /// Version now recorded in the local marker.
        version: u64,
        /// Records written.
        records: u64,
        /// Remote entries that failed to decode.
        skipped: u64,
        duration_ms: u64,
    },
    /// The run failed; the local store is unchanged.
    Failed {
        job_id: String,
        message: String,
        /// A previously published catalog is still being served.
        stale_served: bool,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Catalog sync started",
            SyncEvent::UpToDate { .. } => "Catalog already up to date",
            SyncEvent::Completed { .. } => "Catalog sync completed",
            SyncEvent::Failed { .. } => "Catalog sync failed",
        }
    }

    /// Job ID carried by every sync event.
    pub fn job_id(&self) -> &str {
        match self {
            SyncEvent::Started { job_id, .. }
            | SyncEvent::UpToDate { job_id, .. }
            | SyncEvent::Completed { job_id, .. }
            | SyncEvent::Failed { job_id, .. } => job_id,
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events describing the local catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// Local records were read at startup.
    LocalLoaded { records: u64 },
    /// The local catalog was atomically replaced.
    Replaced { records: u64, version: u64 },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::LocalLoaded { .. } => "Local catalog loaded",
            CatalogEvent::Replaced { .. } => "Local catalog replaced",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts receiving `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error if there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(16);
/// let sync_only = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Sync(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned by `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |f| f(event))
    }

    /// Receives the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Returns `None` if no matching event is currently buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
