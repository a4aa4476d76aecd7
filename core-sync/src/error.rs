use core_catalog::CatalogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failure or non-success status from the remote catalog,
    /// including the version endpoint.
    #[error("Remote catalog unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote payload could not be decoded: {0}")]
    DecodingFailed(String),

    #[error("Local catalog storage failed: {0}")]
    Storage(#[from] CatalogError),

    #[error("Sync timeout after {0} seconds")]
    Timeout(u64),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Invalid state transition from {from} to {to}: {reason}")]
    InvalidStateTransition {
        from: String,
        to: String,
        reason: String,
    },

    #[error("Sync task failed: {0}")]
    Internal(String),
}

impl SyncError {
    /// Whether the failure happened before the local store was touched.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SyncError::RemoteUnavailable(_)
                | SyncError::DecodingFailed(_)
                | SyncError::Timeout(_)
                | SyncError::Cancelled
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
