//! Firebase Realtime Database connector
//!
//! Implements `RemoteCatalogSource` using the REST API.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use core_sync::{decode_version, RemoteCatalog, RemoteCatalogSource, SyncError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{FirebaseError, Result};
use crate::types::{catalog_entries, FirebaseErrorBody};

/// Default remote path of the version stamp
pub const DEFAULT_VERSION_PATH: &str = "metadata/version";

/// Connection settings for one Realtime Database
#[derive(Clone)]
pub struct FirebaseConfig {
    /// e.g. `https://my-catalog-default-rtdb.firebaseio.com`
    pub database_url: String,

    /// Sent as the `auth` query parameter
    pub auth_token: Option<String>,

    pub version_path: String,

    /// Path of the record collection; empty for the database root
    pub records_path: String,

    pub request_timeout: Duration,
}

impl FirebaseConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into().trim_end_matches('/').to_string(),
            auth_token: None,
            version_path: DEFAULT_VERSION_PATH.to_string(),
            records_path: String::new(),
            request_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_version_path(mut self, path: impl Into<String>) -> Self {
        self.version_path = path.into();
        self
    }

    pub fn with_records_path(mut self, path: impl Into<String>) -> Self {
        self.records_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("database_url", &self.database_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("version_path", &self.version_path)
            .field("records_path", &self.records_path)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Remote catalog stored in a Firebase Realtime Database.
///
/// # Example
///
/// ```ignore
/// use provider_firebase::{FirebaseCatalogSource, FirebaseConfig};
/// use core_sync::RemoteCatalogSource;
///
/// let config = FirebaseConfig::new("https://my-catalog.firebaseio.com");
/// let source = FirebaseCatalogSource::new(http_client, config);
/// let version = source.fetch_version().await?;
/// ```
pub struct FirebaseCatalogSource {
    http_client: Arc<dyn HttpClient>,
    config: FirebaseConfig,
}

impl FirebaseCatalogSource {
    pub fn new(http_client: Arc<dyn HttpClient>, config: FirebaseConfig) -> Self {
        Self {
            http_client,
            config,
        }
    }

    pub fn config(&self) -> &FirebaseConfig {
        &self.config
    }

    /// REST URL of a database path; the root is `{database}/.json`.
    fn url_for(&self, path: &str) -> String {
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("/");

        format!("{}/{}.json", self.config.database_url, segments)
    }

    fn build_request(&self, path: &str) -> HttpRequest {
        let request = HttpRequest::get(self.url_for(path))
            .header("Accept", "application/json")
            .timeout(self.config.request_timeout);

        match &self.config.auth_token {
            Some(token) => request.query_param("auth", token.as_str()),
            None => request,
        }
    }

    /// Top-level child to ignore when records live at the root.
    fn excluded_root_key(&self) -> Option<&str> {
        if self.config.records_path.trim_matches('/').is_empty() {
            self.config
                .version_path
                .split('/')
                .find(|s| !s.is_empty())
        } else {
            None
        }
    }

    #[instrument(skip(self))]
    async fn get_json(&self, path: &str) -> Result<Value> {
        let response = self.http_client.execute(self.build_request(path)).await?;

        if !response.is_success() {
            let message = FirebaseErrorBody::message_from(&response.body);
            warn!(status = response.status, %message, "Firebase request failed");
            return Err(FirebaseError::ApiError {
                status: response.status,
                message,
            });
        }

        serde_json::from_slice(&response.body)
            .map_err(|e| FirebaseError::ParseError(format!("{} at path '{}'", e, path)))
    }
}

#[async_trait]
impl RemoteCatalogSource for FirebaseCatalogSource {
    #[instrument(skip(self))]
    async fn fetch_version(&self) -> core_sync::Result<u64> {
        let value = self
            .get_json(&self.config.version_path)
            .await
            .map_err(|e| match SyncError::from(e) {
                SyncError::RemoteUnavailable(msg) => {
                    SyncError::RemoteUnavailable(format!("version endpoint: {}", msg))
                }
                other => other,
            })?;

        let version = decode_version(&value)?;
        debug!(version, "Fetched remote catalog version");
        Ok(version)
    }

    #[instrument(skip(self))]
    async fn fetch_all_records(&self) -> core_sync::Result<RemoteCatalog> {
        let payload = self.get_json(&self.config.records_path).await?;
        let entries = catalog_entries(payload, self.excluded_root_key())?;
        let catalog = RemoteCatalog::from_entries(entries);

        info!(
            records = catalog.len(),
            skipped = catalog.skipped,
            "Fetched remote catalog"
        );
        Ok(catalog)
    }

    fn name(&self) -> &str {
        "firebase"
    }
}
