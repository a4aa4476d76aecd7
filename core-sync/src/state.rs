//! # Catalog State
//!
//! What the presentation layer sees, published on a `tokio::sync::watch`
//! channel.
//!
//! ```text
//! Idle ──> Loading ──> Ready(records) ──> Ready(newer records)
//!   │         │
//!   └─────────┴──> Failed(reason)
//! ```
//!
//! Once a `Ready` value has been published, `Loading` and `Failed` are
//! swallowed: a failed refresh keeps serving the catalog already on screen.

use core_catalog::{sort_natural, CatalogRecord};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Catalog as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CatalogState {
    #[default]
    Idle,
    Loading,
    /// Records in natural-key order
    Ready(Arc<Vec<CatalogRecord>>),
    Failed(String),
}

impl CatalogState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogState::Idle => "idle",
            CatalogState::Loading => "loading",
            CatalogState::Ready(_) => "ready",
            CatalogState::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, CatalogState::Ready(_))
    }

    pub fn records(&self) -> Option<&[CatalogRecord]> {
        match self {
            CatalogState::Ready(records) => Some(records.as_slice()),
            _ => None,
        }
    }

    /// Number of records served; `0` unless ready.
    pub fn len(&self) -> usize {
        self.records().map_or(0, |records| records.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find_by_number(&self, number: &str) -> Option<&CatalogRecord> {
        self.records()?.iter().find(|r| r.number == number)
    }

    /// Case-insensitive lookup ignoring surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Option<&CatalogRecord> {
        let wanted = CatalogRecord::normalize(name);
        self.records()?
            .iter()
            .find(|r| CatalogRecord::normalize(&r.name) == wanted)
    }
}

impl fmt::Display for CatalogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogState::Ready(records) => write!(f, "ready({} records)", records.len()),
            CatalogState::Failed(reason) => write!(f, "failed({})", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Single writer of [`CatalogState`].
///
/// Every `publish_*` method returns whether subscribers were notified.
#[derive(Debug)]
pub struct CatalogStatePublisher {
    sender: watch::Sender<CatalogState>,
}

impl CatalogStatePublisher {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(CatalogState::Idle);
        Self { sender }
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> CatalogState {
        self.sender.borrow().clone()
    }

    pub fn has_ready(&self) -> bool {
        self.sender.borrow().is_ready()
    }

    /// Local store was empty; a sync is about to fill it.
    pub fn publish_loading(&self) -> bool {
        self.sender.send_if_modified(|state| match state {
            CatalogState::Ready(_) | CatalogState::Loading => false,
            _ => {
                *state = CatalogState::Loading;
                true
            }
        })
    }

    /// Publish a record set. An identical set already on screen is not
    /// republished.
    pub fn publish_ready(&self, mut records: Vec<CatalogRecord>) -> bool {
        sort_natural(&mut records);
        let count = records.len();

        let notified = self.sender.send_if_modified(|state| match state {
            CatalogState::Ready(current) if **current == records => false,
            _ => {
                *state = CatalogState::Ready(Arc::new(records));
                true
            }
        });

        debug!(records = count, notified, "Published ready catalog");
        notified
    }

    /// Publish a failure unless a catalog is already being served.
    pub fn publish_failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        self.sender.send_if_modified(|state| match state {
            CatalogState::Ready(_) => false,
            _ => {
                *state = CatalogState::Failed(reason);
                true
            }
        })
    }
}

impl Default for CatalogStatePublisher {
    fn default() -> Self {
        Self::new()
    }
}
