//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridges (HTTP, settings) and the core
//! crates into one [`CatalogCore`] handle:
//!
//! ```text
//! CoreConfig ─┬─> SQLite pool ──> SqliteCatalogStore ──┐
//!             ├─> SettingsStore ─> VersionMarker ──────┤
//!             └─> HttpClient ───> FirebaseCatalogSource┴─> CatalogSyncCoordinator
//! ```
//!
//! Desktop apps enable the `desktop-shims` feature so missing bridges fall
//! back to `bridge-desktop`; mobile hosts inject their own adapters through
//! the [`CoreConfig`] builder.
//!
//! ```ignore
//! use core_service::{CatalogCore, CoreConfig};
//!
//! let config = CoreConfig::builder()
//!     .database_path("/data/catalog.db")
//!     .remote_database_url("https://my-catalog.firebaseio.com")
//!     .build()?;
//!
//! let core = CatalogCore::bootstrap(config).await?;
//! let mut state = core.subscribe();
//! core.load_catalog().await;
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use core_catalog::CatalogRecord;
pub use core_runtime::config::CoreConfig;
pub use core_sync::{CatalogState, SyncOutcome};

use core_catalog::db::{create_pool, DatabaseConfig};
use core_catalog::{LocalCatalogStore, SqliteCatalogStore, VersionMarker};
use core_runtime::events::{CoreEvent, EventBus, Receiver};
use core_sync::{CatalogSyncCoordinator, RemoteCatalogSource, SyncConfig};
use provider_firebase::{FirebaseCatalogSource, FirebaseConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CatalogCore {
    config: Arc<CoreConfig>,
    store: Arc<dyn LocalCatalogStore>,
    coordinator: Arc<CatalogSyncCoordinator>,
    event_bus: EventBus,
}

impl CatalogCore {
    /// Build the full stack against the Firebase database in `config`.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` if a bridge is absent and `desktop-shims` is off
    /// - `Catalog` if the database cannot be opened or migrated
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        let http_client = config.http_client_or_default()?;

        let mut firebase = FirebaseConfig::new(config.remote_database_url.clone())
            .with_version_path(config.version_path.clone())
            .with_records_path(config.records_path.clone())
            .with_request_timeout(Duration::from_secs(config.request_timeout_secs));
        if let Some(token) = &config.remote_auth_token {
            firebase = firebase.with_auth_token(token.clone());
        }

        let source = Arc::new(FirebaseCatalogSource::new(http_client, firebase));
        Self::bootstrap_with_source(config, source).await
    }

    /// Build the stack with a caller-supplied remote source.
    pub async fn bootstrap_with_source(
        config: CoreConfig,
        source: Arc<dyn RemoteCatalogSource>,
    ) -> Result<Self> {
        config.validate()?;

        tokio::fs::create_dir_all(config.data_dir())
            .await
            .map_err(|e| {
                CoreError::InitializationFailed(format!(
                    "Cannot create data directory {}: {}",
                    config.data_dir().display(),
                    e
                ))
            })?;

        let pool = create_pool(DatabaseConfig::new(&config.database_path)).await?;
        let settings = config.settings_store_or_default().await?;
        let marker = VersionMarker::new(settings, config.version_key.clone());
        let store: Arc<dyn LocalCatalogStore> = Arc::new(SqliteCatalogStore::new(pool, marker));

        let event_bus = EventBus::default();
        let sync_config = SyncConfig {
            sync_timeout_secs: config.sync_timeout_secs,
            allow_empty_catalog: config.allow_empty_catalog,
        };
        let coordinator = Arc::new(
            CatalogSyncCoordinator::new(Arc::clone(&store), source, sync_config)
                .with_event_bus(event_bus.clone()),
        );

        info!(
            database = %config.database_path.display(),
            remote = %config.remote_database_url,
            "Catalog core ready"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            coordinator,
            event_bus,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Publish the local catalog and refresh it in the background.
    pub async fn load_catalog(&self) -> JoinHandle<core_sync::Result<SyncOutcome>> {
        self.coordinator.load().await
    }

    /// Run a sync now and wait for it, e.g. when the app returns to the
    /// foreground.
    pub async fn sync_now(&self) -> Result<SyncOutcome> {
        Ok(self.coordinator.sync().await?)
    }

    /// Abandon the network phase of a running sync.
    pub async fn cancel_sync(&self) -> bool {
        self.coordinator.cancel().await
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.coordinator.subscribe()
    }

    pub fn state(&self) -> CatalogState {
        self.coordinator.state()
    }

    /// Sync lifecycle events
    pub fn events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    pub async fn find_card_by_number(&self, number: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.store.find_by_number(number).await?)
    }

    pub async fn find_card_by_name(&self, name: &str) -> Result<Option<CatalogRecord>> {
        Ok(self.store.find_by_name(name).await?)
    }

    /// Version of the catalog currently stored on the device
    pub async fn local_version(&self) -> Result<u64> {
        Ok(self.store.get_version().await?)
    }
}
