//! Local catalog version marker

use crate::error::{CatalogError, Result};
use bridge_traits::SettingsStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Integer version of the catalog currently in the local store.
///
/// Persisted under a single key of a [`SettingsStore`]. `0` means the
/// catalog has never been synced; an absent key reads as `0`.
#[derive(Clone)]
pub struct VersionMarker {
    settings: Arc<dyn SettingsStore>,
    key: String,
}

impl VersionMarker {
    pub fn new(settings: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self {
            settings,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the marker. Absent or negative values read as `0`.
    pub async fn get(&self) -> Result<u64> {
        match self.settings.get_i64(&self.key).await? {
            None => Ok(0),
            Some(v) if v < 0 => {
                warn!(key = %self.key, value = v, "Negative catalog version marker, treating as never synced");
                Ok(0)
            }
            Some(v) => Ok(v as u64),
        }
    }

    pub async fn set(&self, version: u64) -> Result<()> {
        let value = i64::try_from(version).map_err(|_| CatalogError::InvalidInput {
            field: "version".to_string(),
            message: format!("{} does not fit the settings store", version),
        })?;

        self.settings.set_i64(&self.key, value).await?;
        debug!(key = %self.key, version, "Catalog version marker written");
        Ok(())
    }
}

impl std::fmt::Debug for VersionMarker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionMarker")
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::BridgeError;
    use mockall::mock;
    use mockall::predicate::eq;

    mock! {
        Settings {}

        #[async_trait]
        impl SettingsStore for Settings {
            async fn set_string(&self, key: &str, value: &str) -> bridge_traits::error::Result<()>;
            async fn get_string(&self, key: &str) -> bridge_traits::error::Result<Option<String>>;
            async fn set_i64(&self, key: &str, value: i64) -> bridge_traits::error::Result<()>;
            async fn get_i64(&self, key: &str) -> bridge_traits::error::Result<Option<i64>>;
            async fn delete(&self, key: &str) -> bridge_traits::error::Result<()>;
            async fn has_key(&self, key: &str) -> bridge_traits::error::Result<bool>;
            async fn list_keys(&self) -> bridge_traits::error::Result<Vec<String>>;
            async fn clear_all(&self) -> bridge_traits::error::Result<()>;
        }
    }

    #[tokio::test]
    async fn test_absent_marker_reads_zero() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_i64()
            .with(eq("catalog.local_version"))
            .times(1)
            .returning(|_| Ok(None));

        let marker = VersionMarker::new(Arc::new(settings), "catalog.local_version");
        assert_eq!(marker.get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_negative_marker_reads_zero() {
        let mut settings = MockSettings::new();
        settings.expect_get_i64().returning(|_| Ok(Some(-4)));

        let marker = VersionMarker::new(Arc::new(settings), "v");
        assert_eq!(marker.get().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_set_writes_i64() {
        let mut settings = MockSettings::new();
        settings
            .expect_set_i64()
            .with(eq("v"), eq(3i64))
            .times(1)
            .returning(|_, _| Ok(()));

        let marker = VersionMarker::new(Arc::new(settings), "v");
        marker.set(3).await.unwrap();
    }

    #[tokio::test]
    async fn test_set_rejects_out_of_range_version() {
        let settings = MockSettings::new();
        let marker = VersionMarker::new(Arc::new(settings), "v");

        let err = marker.set(u64::MAX).await.unwrap_err();
        assert!(matches!(err, CatalogError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_settings_failure_propagates() {
        let mut settings = MockSettings::new();
        settings
            .expect_get_i64()
            .returning(|_| Err(BridgeError::DatabaseError("locked".to_string())));

        let marker = VersionMarker::new(Arc::new(settings), "v");
        assert!(matches!(
            marker.get().await,
            Err(CatalogError::Bridge(BridgeError::DatabaseError(_)))
        ));
    }
}
