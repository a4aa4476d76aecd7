//! # Catalog Sync Module
//!
//! Keeps the local card catalog in step with the remote authoritative copy.
//!
//! ## Overview
//!
//! Sync is version-gated and full-replace: the remote publishes an integer
//! version stamp, and whenever it is newer than the local marker (or the
//! local catalog was never synced, or is empty) the whole local catalog is
//! swapped for the remote one. There is no delta sync and no conflict
//! resolution.
//!
//! ## Components
//!
//! - **Remote Source** (`source`): `RemoteCatalogSource` trait and payload decoding helpers
//! - **Sync Job State Machine** (`job`): phases, the resync decision and run reports
//! - **Catalog State** (`state`): `CatalogState` published on a watch channel
//! - **Sync Coordinator** (`coordinator`): single-flight orchestration with timeout and cancellation

pub mod coordinator;
pub mod error;
pub mod job;
pub mod source;
pub mod state;

pub use coordinator::{CatalogSyncCoordinator, SyncConfig};
pub use error::{Result, SyncError};
pub use job::{
    needs_resync, ResyncReason, SyncDecision, SyncJob, SyncJobId, SyncOutcome, SyncPhase,
    SyncReport,
};
pub use source::{decode_version, RemoteCatalog, RemoteCatalogSource, UNSET_REMOTE_VERSION};
pub use state::{CatalogState, CatalogStatePublisher};
