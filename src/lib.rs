//! Workspace umbrella crate.
//!
//! Re-exports the catalog core façade so host applications can depend on
//! `catalog-workspace` and pick features here instead of wiring each crate.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;
