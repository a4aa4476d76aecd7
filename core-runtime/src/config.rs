//! # Core Configuration Module
//!
//! Builder-based configuration for the catalog core.
//!
//! ## Required Settings
//!
//! - `database_path` - SQLite file holding the local catalog
//! - `remote_database_url` - Base URL of the remote catalog database
//!
//! ## Bridges (with platform defaults)
//!
//! - `HttpClient` - remote catalog reads (desktop default: reqwest)
//! - `SettingsStore` - version marker persistence (desktop default: SQLite
//!   `settings.db` next to the catalog database)
//!
//! With the `desktop-shims` feature, missing bridges are created on demand by
//! [`CoreConfig::http_client_or_default`] and
//! [`CoreConfig::settings_store_or_default`]. Without it, [`CoreConfigBuilder::build`]
//! fails fast with [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/catalog.db")
//!     .remote_database_url("https://my-catalog.firebaseio.com")
//!     .sync_timeout_secs(30)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, SettingsStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Remote path of the version stamp, relative to the database URL.
pub const DEFAULT_VERSION_PATH: &str = "metadata/version";

/// Settings key of the local version marker.
pub const DEFAULT_VERSION_KEY: &str = "catalog.local_version";

pub const DEFAULT_SYNC_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Core configuration for the catalog core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Path to the SQLite database file
    pub database_path: PathBuf,

    /// Base URL of the remote database, without trailing slash
    pub remote_database_url: String,

    /// Credential appended as the `auth` query parameter
    pub remote_auth_token: Option<String>,

    /// Remote path of the integer version stamp
    pub version_path: String,

    /// Remote path of the record collection; empty means the database root
    pub records_path: String,

    /// Settings key holding the local version marker
    pub version_key: String,

    /// Deadline for the network phase of one sync run
    pub sync_timeout_secs: u64,

    /// Per-request HTTP timeout
    pub request_timeout_secs: u64,

    /// Accept a remote catalog that decodes to zero records.
    ///
    /// Off by default: an empty remote catalog fails the sync and keeps the
    /// cached one. When on, it empties the local catalog like any resync.
    pub allow_empty_catalog: bool,

    pub http_client: Option<Arc<dyn HttpClient>>,

    pub settings_store: Option<Arc<dyn SettingsStore>>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_path", &self.database_path)
            .field("remote_database_url", &self.remote_database_url)
            .field(
                "remote_auth_token",
                &self.remote_auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("version_path", &self.version_path)
            .field("records_path", &self.records_path)
            .field("version_key", &self.version_key)
            .field("sync_timeout_secs", &self.sync_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("allow_empty_catalog", &self.allow_empty_catalog)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .finish()
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Database path is not empty
    /// - Remote URL is an http(s) URL
    /// - Version path is not empty and differs from the records path
    /// - Timeouts are within range
    pub fn validate(&self) -> Result<()> {
        if self.database_path.as_os_str().is_empty() {
            return Err(Error::Config("Database path cannot be empty".to_string()));
        }

        let url = self.remote_database_url.as_str();
        if !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::Config(format!(
                "Remote database URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.version_path.trim_matches('/').is_empty() {
            return Err(Error::Config("Version path cannot be empty".to_string()));
        }

        if self.version_path.trim_matches('/') == self.records_path.trim_matches('/') {
            return Err(Error::Config(
                "Version path and records path must point at different nodes".to_string(),
            ));
        }

        if self.version_key.is_empty() {
            return Err(Error::Config("Version key cannot be empty".to_string()));
        }

        if self.sync_timeout_secs == 0 || self.sync_timeout_secs > 3600 {
            return Err(Error::Config(
                "Sync timeout must be between 1 and 3600 seconds".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 || self.request_timeout_secs > self.sync_timeout_secs {
            return Err(Error::Config(
                "Request timeout must be at least 1 second and no longer than the sync timeout"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Directory that holds the catalog database and its sibling files.
    pub fn data_dir(&self) -> &Path {
        self.database_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
    }

    /// Injected HTTP client, or the desktop default.
    pub fn http_client_or_default(&self) -> Result<Arc<dyn HttpClient>> {
        match &self.http_client {
            Some(client) => Ok(Arc::clone(client)),
            None => provide_default_http_client(self.request_timeout_secs),
        }
    }

    /// Injected settings store, or the desktop default at `<data_dir>/settings.db`.
    pub async fn settings_store_or_default(&self) -> Result<Arc<dyn SettingsStore>> {
        match &self.settings_store {
            Some(store) => Ok(Arc::clone(store)),
            None => provide_default_settings_store(&self.data_dir().join("settings.db")).await,
        }
    }
}

fn http_client_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required to read the remote catalog. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject a platform-native HTTP adapter."
            .to_string(),
    }
}

fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for the catalog version marker. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(request_timeout_secs: u64) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(
        std::time::Duration::from_secs(request_timeout_secs),
    ));
    Ok(client)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_request_timeout_secs: u64) -> Result<Arc<dyn HttpClient>> {
    Err(http_client_missing_error())
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(path: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;

    let store = SqliteSettingsStore::new(path.to_path_buf())
        .await
        .map_err(|e| {
            Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
        })?;

    let store: Arc<dyn SettingsStore> = Arc::new(store);
    Ok(store)
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(_path: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_path: Option<PathBuf>,
    remote_database_url: Option<String>,
    remote_auth_token: Option<String>,
    version_path: Option<String>,
    records_path: Option<String>,
    version_key: Option<String>,
    sync_timeout_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
    allow_empty_catalog: bool,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
}

impl CoreConfigBuilder {
    /// Sets the database path.
    ///
    /// ```
    /// use core_runtime::config::CoreConfig;
    ///
    /// let builder = CoreConfig::builder().database_path("/data/catalog.db");
    /// ```
    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    /// Sets the remote database base URL. A trailing slash is stripped.
    pub fn remote_database_url(mut self, url: impl Into<String>) -> Self {
        self.remote_database_url = Some(url.into().trim_end_matches('/').to_string());
        self
    }

    /// Sets the credential sent as the `auth` query parameter.
    ///
    /// Never logged; `Debug` output shows `[REDACTED]`.
    pub fn remote_auth_token(mut self, token: impl Into<String>) -> Self {
        self.remote_auth_token = Some(token.into());
        self
    }

    /// Default: `metadata/version`
    pub fn version_path(mut self, path: impl Into<String>) -> Self {
        self.version_path = Some(path.into());
        self
    }

    /// Default: the database root
    pub fn records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = Some(path.into());
        self
    }

    /// Default: `catalog.local_version`
    pub fn version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = Some(key.into());
        self
    }

    /// Deadline for the network phase of a sync run.
    ///
    /// Default: 60 seconds
    pub fn sync_timeout_secs(mut self, secs: u64) -> Self {
        self.sync_timeout_secs = Some(secs);
        self
    }

    /// Default: 30 seconds
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Allow a sync to replace the local catalog with zero records.
    ///
    /// Default: false
    pub fn allow_empty_catalog(mut self, allow: bool) -> Self {
        self.allow_empty_catalog = allow;
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the settings store implementation.
    ///
    /// If not provided, the desktop default (SQLite-based) is used when the
    /// `desktop-shims` feature is enabled.
    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `database_path` or `remote_database_url` is missing
    /// - A bridge is missing and `desktop-shims` is disabled
    /// - Any value fails [`CoreConfig::validate`]
    pub fn build(self) -> Result<CoreConfig> {
        let database_path = self.database_path.ok_or_else(|| {
            Error::Config("Database path is required. Use .database_path() to set it.".to_string())
        })?;

        let remote_database_url = self.remote_database_url.ok_or_else(|| {
            Error::Config(
                "Remote database URL is required. Use .remote_database_url() to set it."
                    .to_string(),
            )
        })?;

        if !cfg!(feature = "desktop-shims") {
            if self.http_client.is_none() {
                return Err(http_client_missing_error());
            }
            if self.settings_store.is_none() {
                return Err(settings_store_missing_error());
            }
        }

        let sync_timeout_secs = self.sync_timeout_secs.unwrap_or(DEFAULT_SYNC_TIMEOUT_SECS);

        let config = CoreConfig {
            database_path,
            remote_database_url,
            remote_auth_token: self.remote_auth_token.filter(|t| !t.is_empty()),
            version_path: self
                .version_path
                .unwrap_or_else(|| DEFAULT_VERSION_PATH.to_string()),
            records_path: self.records_path.unwrap_or_default(),
            version_key: self
                .version_key
                .unwrap_or_else(|| DEFAULT_VERSION_KEY.to_string()),
            sync_timeout_secs,
            request_timeout_secs: self
                .request_timeout_secs
                .unwrap_or_else(|| DEFAULT_REQUEST_TIMEOUT_SECS.min(sync_timeout_secs)),
            allow_empty_catalog: self.allow_empty_catalog,
            http_client: self.http_client,
            settings_store: self.settings_store,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::{BridgeError, HttpRequest, HttpResponse};

    struct NoopHttpClient;

    #[async_trait]
    impl HttpClient for NoopHttpClient {
        async fn execute(
            &self,
            _request: HttpRequest,
        ) -> std::result::Result<HttpResponse, BridgeError> {
            Err(BridgeError::NotAvailable("offline".to_string()))
        }
    }

    struct NoopSettingsStore;

    #[async_trait]
    impl SettingsStore for NoopSettingsStore {
        async fn set_string(&self, _key: &str, _value: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn set_i64(&self, _key: &str, _value: i64) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn get_i64(&self, _key: &str) -> std::result::Result<Option<i64>, BridgeError> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn has_key(&self, _key: &str) -> std::result::Result<bool, BridgeError> {
            Ok(false)
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    fn with_bridges() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(NoopHttpClient))
            .settings_store(Arc::new(NoopSettingsStore))
    }

    #[test]
    fn test_build_applies_defaults() {
        let config = with_bridges()
            .database_path("/data/catalog.db")
            .remote_database_url("https://catalog.example.firebaseio.com/")
            .build()
            .unwrap();

        assert_eq!(
            config.remote_database_url,
            "https://catalog.example.firebaseio.com"
        );
        assert_eq!(config.version_path, DEFAULT_VERSION_PATH);
        assert_eq!(config.records_path, "");
        assert_eq!(config.version_key, DEFAULT_VERSION_KEY);
        assert_eq!(config.sync_timeout_secs, DEFAULT_SYNC_TIMEOUT_SECS);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert!(!config.allow_empty_catalog);
        assert_eq!(config.data_dir(), Path::new("/data"));
    }

    #[test]
    fn test_missing_database_path() {
        let err = with_bridges()
            .remote_database_url("https://x.firebaseio.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("database_path"));
    }

    #[test]
    fn test_missing_remote_url() {
        let err = with_bridges()
            .database_path("catalog.db")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("remote_database_url"));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let result = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("ftp://x")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_rejects_version_path_equal_to_records_path() {
        let result = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .version_path("/cards/")
            .records_path("cards")
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_request_timeout_clamped_to_sync_timeout() {
        let config = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .sync_timeout_secs(10)
            .build()
            .unwrap();
        assert_eq!(config.request_timeout_secs, 10);
        assert_eq!(config.data_dir(), Path::new("."));

        let result = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .sync_timeout_secs(10)
            .request_timeout_secs(20)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .remote_auth_token("very-secret")
            .build()
            .unwrap();

        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_injected_bridges_are_returned() {
        let config = with_bridges()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .build()
            .unwrap();

        let store = config.settings_store_or_default().await.unwrap();
        assert!(store.get_i64(DEFAULT_VERSION_KEY).await.unwrap().is_none());
        assert!(config.http_client_or_default().is_ok());
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_bridges_fail_fast() {
        let result = CoreConfig::builder()
            .database_path("catalog.db")
            .remote_database_url("https://x.firebaseio.com")
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[tokio::test]
    async fn test_desktop_defaults_create_settings_next_to_database() {
        let base = std::env::temp_dir().join(format!("core-runtime-test-{}", uuid::Uuid::new_v4()));
        let config = CoreConfig::builder()
            .database_path(base.join("catalog.db"))
            .remote_database_url("https://x.firebaseio.com")
            .build()
            .unwrap();

        let store = config.settings_store_or_default().await.unwrap();
        store.set_i64(DEFAULT_VERSION_KEY, 3).await.unwrap();
        assert!(base.join("settings.db").exists());
        assert!(config.http_client_or_default().is_ok());

        let _ = std::fs::remove_dir_all(&base);
    }
}
