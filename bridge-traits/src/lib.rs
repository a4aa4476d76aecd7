//! # Host Bridge Traits
//!
//! Capabilities the catalog core needs from its host platform.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP for the remote catalog
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences (holds the version marker)
//! - [`LoggerSink`](logging::LoggerSink) - Forward structured logs to host logging
//! - [`Clock`](logging::Clock) - Time source for deterministic testing
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate |
//! |----------|---------------------|
//! | Desktop  | `bridge-desktop`    |
//! | iOS      | host-provided       |
//! | Android  | host-provided       |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with a descriptive error when a required capability is
//! missing instead of silently degrading:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client provided. Desktop: enable `desktop-shims`. \
//!                   Mobile: inject a platform-native adapter.".to_string(),
//!     })?;
//! ```
//!
//! ## Error Handling
//!
//! All bridge traits return [`BridgeError`](error::BridgeError). Implementations
//! convert platform errors into it and keep the message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! tokio tasks behind an `Arc`.

pub mod error;
pub mod http;
pub mod logging;
pub mod storage;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use logging::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
pub use storage::SettingsStore;
