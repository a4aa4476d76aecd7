//! Remote catalog source abstraction
//!
//! The remote side is a pure I/O boundary: a version stamp and the full
//! record set. Implementations perform one attempt per call; retry policy
//! belongs to whoever triggers the sync.

use crate::error::{Result, SyncError};
use async_trait::async_trait;
use core_catalog::CatalogRecord;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Version reported when the remote stamp is absent or null.
///
/// Any value above `0` forces a resync on a never-synced client, and a
/// client that already stored `1` will not resync again until the stamp is
/// set explicitly.
pub const UNSET_REMOTE_VERSION: u64 = 1;

/// Decoded remote catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteCatalog {
    /// Entries that decoded and validated, in payload order
    pub records: Vec<CatalogRecord>,
    /// Entries dropped as malformed, keyless or duplicated
    pub skipped: u64,
}

impl RemoteCatalog {
    /// Decode raw JSON entries one at a time.
    ///
    /// A bad entry is logged and counted, never fatal. `null` entries are
    /// holes (sparse arrays) and are not counted. The first occurrence of a
    /// `number` wins.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut catalog = RemoteCatalog::default();
        let mut seen = HashSet::new();

        for (index, entry) in entries.into_iter().enumerate() {
            if entry.is_null() {
                continue;
            }

            let record = match serde_json::from_value::<CatalogRecord>(entry) {
                Ok(record) => record,
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed catalog entry");
                    catalog.skipped += 1;
                    continue;
                }
            };

            if let Err(reason) = record.validate() {
                warn!(index, %reason, "Skipping invalid catalog entry");
                catalog.skipped += 1;
                continue;
            }

            if !seen.insert(record.number.clone()) {
                warn!(index, number = %record.number, "Skipping duplicate catalog entry");
                catalog.skipped += 1;
                continue;
            }

            catalog.records.push(record);
        }

        catalog
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Interpret a remote version stamp.
///
/// `null` maps to [`UNSET_REMOTE_VERSION`]. Non-negative integers and
/// numeric strings are accepted; anything else is a decoding failure.
pub fn decode_version(value: &Value) -> Result<u64> {
    match value {
        Value::Null => Ok(UNSET_REMOTE_VERSION),
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            SyncError::DecodingFailed(format!("version {} is not a non-negative integer", n))
        }),
        Value::String(s) => s.trim().parse::<u64>().map_err(|_| {
            SyncError::DecodingFailed(format!("version '{}' is not a non-negative integer", s))
        }),
        other => Err(SyncError::DecodingFailed(format!(
            "unexpected version payload: {}",
            other
        ))),
    }
}

/// Remote authoritative catalog.
///
/// Stateless and safe to call concurrently.
#[async_trait]
pub trait RemoteCatalogSource: Send + Sync {
    /// Current remote version stamp
    ///
    /// # Errors
    /// - `RemoteUnavailable` if the version endpoint cannot be reached
    /// - `DecodingFailed` if the stamp is not an integer
    async fn fetch_version(&self) -> Result<u64>;

    /// The complete remote catalog
    ///
    /// Per-entry decode failures are absorbed into [`RemoteCatalog::skipped`].
    ///
    /// # Errors
    /// - `RemoteUnavailable` on transport failure
    /// - `DecodingFailed` if the payload as a whole has the wrong shape
    async fn fetch_all_records(&self) -> Result<RemoteCatalog>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "remote"
    }
}
