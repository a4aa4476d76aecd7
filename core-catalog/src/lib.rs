//! # Local Catalog Module
//!
//! Owns the on-device copy of the card catalog.
//!
//! ## Overview
//!
//! This crate manages:
//! - The [`CatalogRecord`] model and its natural-key ordering
//! - SQLite pool configuration and embedded migrations
//! - [`LocalCatalogStore`], the persistence seam used by the sync engine
//! - [`VersionMarker`], the integer version of the catalog currently stored
//!
//! The store is the only writer of both records and version marker. A
//! resync replaces everything in one transaction and writes the marker last,
//! so a crash between the two leaves a stale marker and triggers another
//! resync on next launch.

pub mod db;
pub mod error;
pub mod models;
pub mod store;
pub mod version;

pub use error::{CatalogError, Result};
pub use models::{natural_key_cmp, sort_natural, CatalogRecord};
pub use store::{LocalCatalogStore, SqliteCatalogStore};
pub use version::VersionMarker;
