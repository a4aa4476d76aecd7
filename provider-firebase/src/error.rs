//! Error types for the Firebase provider

use bridge_traits::error::BridgeError;
use core_sync::SyncError;
use thiserror::Error;

/// Firebase provider errors
#[derive(Error, Debug)]
pub enum FirebaseError {
    /// Transport failure from the HTTP bridge
    #[error(transparent)]
    Http(#[from] BridgeError),

    /// Database answered with a non-success status
    #[error("Firebase API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Body is not JSON
    #[error("Failed to parse Firebase response: {0}")]
    ParseError(String),

    /// JSON of the wrong shape
    #[error("Unexpected Firebase payload: {0}")]
    InvalidPayload(String),
}

/// Result type for Firebase operations
pub type Result<T> = std::result::Result<T, FirebaseError>;

impl From<FirebaseError> for SyncError {
    fn from(error: FirebaseError) -> Self {
        match error {
            FirebaseError::Http(e) => SyncError::RemoteUnavailable(e.to_string()),
            e @ FirebaseError::ApiError { .. } => SyncError::RemoteUnavailable(e.to_string()),
            FirebaseError::ParseError(msg) | FirebaseError::InvalidPayload(msg) => {
                SyncError::DecodingFailed(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = FirebaseError::ApiError {
            status: 401,
            message: "Permission denied".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Firebase API error (status 401): Permission denied"
        );
    }

    #[test]
    fn test_error_conversion() {
        let unavailable: SyncError =
            FirebaseError::Http(BridgeError::OperationFailed("connection reset".to_string())).into();
        assert!(matches!(unavailable, SyncError::RemoteUnavailable(_)));

        let status: SyncError = FirebaseError::ApiError {
            status: 503,
            message: "Service Unavailable".to_string(),
        }
        .into();
        assert!(matches!(status, SyncError::RemoteUnavailable(_)));

        let decoding: SyncError = FirebaseError::ParseError("expected value".to_string()).into();
        assert!(matches!(decoding, SyncError::DecodingFailed(_)));
    }
}
