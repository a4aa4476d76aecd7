//! End-to-end tests for the catalog core
//!
//! Bootstraps the real stack (SQLite file, settings store, Firebase source)
//! with a mocked HTTP bridge standing in for the Realtime Database.

use async_trait::async_trait;
use bridge_desktop::SqliteSettingsStore;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use bridge_traits::SettingsStore;
use bytes::Bytes;
use core_service::{CatalogCore, CatalogState, CoreConfig, CoreError};
use core_runtime::events::{CoreEvent, SyncEvent};
use mockall::mock;
use serde_json::json;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

mock! {
    HttpClient {}

    #[async_trait]
    impl HttpClient for HttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
    }
}

fn catalog_body(count: u32) -> String {
    let cards: Vec<_> = (1..=count)
        .map(|n| {
            json!({
                "number": n.to_string(),
                "name": format!("Card {}", n),
                "keywords": "k",
                "generalMeanings": "g",
                "astrologicalInfluence": "a",
                "archetypeFigure": "f",
                "spiritualPlane": "s",
                "mentalPlane": "m",
                "emotionalPlane": "e",
                "materialPlane": "mat",
                "physicalPlane": "p",
                "positivePoints": "+",
                "negativePoints": "-",
                "yearPrediction": "y",
                "time": "t",
            })
        })
        .collect();
    serde_json::to_string(&cards).unwrap()
}

/// Realtime Database double: version stamp plus a root-level card array
fn firebase(version: u64, cards: u32) -> MockHttpClient {
    let mut mock_http = MockHttpClient::new();
    let catalog = catalog_body(cards);
    mock_http.expect_execute().returning(move |req| {
        let body = if req.url.ends_with("/metadata/version.json") {
            version.to_string()
        } else {
            catalog.clone()
        };
        Ok(HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(body),
        })
    });
    mock_http
}

fn unreachable() -> MockHttpClient {
    let mut mock_http = MockHttpClient::new();
    mock_http
        .expect_execute()
        .returning(|_| Err(BridgeError::OperationFailed("Connection failed".to_string())));
    mock_http
}

struct TestDir(PathBuf);

impl TestDir {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("catalog-core-{}", uuid::Uuid::new_v4())))
    }

    fn database(&self) -> PathBuf {
        self.0.join("catalog.db")
    }
}

impl Drop for TestDir {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn config(
    dir: &TestDir,
    http: MockHttpClient,
    settings: Arc<dyn SettingsStore>,
) -> CoreConfig {
    CoreConfig::builder()
        .database_path(dir.database())
        .remote_database_url("https://catalog.firebaseio.com")
        .http_client(Arc::new(http))
        .settings_store(settings)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_first_launch_downloads_catalog() {
    let dir = TestDir::new();
    let settings: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    let core = CatalogCore::bootstrap(config(&dir, firebase(3, 36), settings))
        .await
        .unwrap();
    let mut events = core.events();

    let outcome = core.load_catalog().await.await.unwrap().unwrap();

    assert!(outcome.decision.is_resync());
    assert_eq!(core.state().len(), 36);
    assert_eq!(core.local_version().await.unwrap(), 3);
    assert_eq!(
        core.find_card_by_name("card 7").await.unwrap().unwrap().number,
        "7"
    );
    assert!(core.find_card_by_number("37").await.unwrap().is_none());

    let mut completed = false;
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Sync(SyncEvent::Completed { records, version, .. }) = event {
            assert_eq!((records, version), (36, 3));
            completed = true;
        }
    }
    assert!(completed);
}

#[tokio::test]
async fn test_restart_serves_cache_and_skips_download() {
    let dir = TestDir::new();
    let settings: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());

    let first = CatalogCore::bootstrap(config(&dir, firebase(3, 36), settings.clone()))
        .await
        .unwrap();
    first.sync_now().await.unwrap();
    drop(first);

    // Same version remotely: the second run must not need the records endpoint.
    let mut http = MockHttpClient::new();
    http.expect_execute()
        .withf(|req| req.url.ends_with("/metadata/version.json"))
        .times(1)
        .returning(|_| {
            Ok(HttpResponse {
                status: 200,
                headers: HashMap::new(),
                body: Bytes::from("3"),
            })
        });

    let second = CatalogCore::bootstrap(config(&dir, http, settings))
        .await
        .unwrap();
    let handle = second.load_catalog().await;
    assert_eq!(second.state().len(), 36);

    let outcome = handle.await.unwrap().unwrap();
    assert!(!outcome.decision.is_resync());
}

#[tokio::test]
async fn test_offline_first_launch_reports_failure() {
    let dir = TestDir::new();
    let settings: Arc<dyn SettingsStore> = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    let core = CatalogCore::bootstrap(config(&dir, unreachable(), settings))
        .await
        .unwrap();

    let result = core.sync_now().await;

    assert!(matches!(result, Err(CoreError::Sync(_))));
    assert!(matches!(core.state(), CatalogState::Failed(_)));
    assert_eq!(core.local_version().await.unwrap(), 0);
}
