//! # Firebase Catalog Provider
//!
//! Implements `RemoteCatalogSource` over the Firebase Realtime Database REST
//! API.
//!
//! ## Overview
//!
//! This module provides:
//! - Version stamp reads (`GET {database}/{version_path}.json`)
//! - Whole-catalog reads from a path or the database root
//! - Per-entry decoding that skips malformed cards
//! - Optional `auth` query credential (database secret or ID token)
//!
//! Requests are single-shot; the sync coordinator owns deadlines and retry
//! policy.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{FirebaseCatalogSource, FirebaseConfig};
pub use error::{FirebaseError, Result};
