//! # Core Runtime Module
//!
//! Foundational runtime infrastructure for the catalog core:
//! - Logging and tracing setup
//! - Configuration management
//! - Event bus for sync lifecycle notifications

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
