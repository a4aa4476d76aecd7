//! The default `replace_all` for stores without their own transaction
//! support: delete, then insert, then write the version marker.

use async_trait::async_trait;
use core_catalog::{CatalogError, CatalogRecord, LocalCatalogStore, Result};
use std::sync::Mutex;

#[derive(Default)]
struct JournalingStore {
    records: Mutex<Vec<CatalogRecord>>,
    version: Mutex<u64>,
    journal: Mutex<Vec<&'static str>>,
    fail_save: bool,
}

#[async_trait]
impl LocalCatalogStore for JournalingStore {
    async fn fetch_all(&self) -> Result<Vec<CatalogRecord>> {
        Ok(self.records.lock().unwrap().clone())
    }

    async fn save(&self, records: &[CatalogRecord]) -> Result<()> {
        self.journal.lock().unwrap().push("save");
        if self.fail_save {
            return Err(CatalogError::InvalidInput {
                field: "records".to_string(),
                message: "disk full".to_string(),
            });
        }
        self.records.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        self.journal.lock().unwrap().push("delete_all");
        let mut records = self.records.lock().unwrap();
        let removed = records.len() as u64;
        records.clear();
        Ok(removed)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn get_version(&self) -> Result<u64> {
        Ok(*self.version.lock().unwrap())
    }

    async fn set_version(&self, version: u64) -> Result<()> {
        self.journal.lock().unwrap().push("set_version");
        *self.version.lock().unwrap() = version;
        Ok(())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<CatalogRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.number == number)
            .cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>> {
        let wanted = CatalogRecord::normalize(name);
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| CatalogRecord::normalize(&r.name) == wanted)
            .cloned())
    }
}

#[tokio::test]
async fn default_replace_all_runs_delete_save_then_version() {
    let store = JournalingStore::default();
    store.save(&[CatalogRecord::new("1", "Old")]).await.unwrap();
    store.journal.lock().unwrap().clear();

    store
        .replace_all(
            &[CatalogRecord::new("1", "Cavaleiro"), CatalogRecord::new("2", "Trevo")],
            3,
        )
        .await
        .unwrap();

    assert_eq!(
        *store.journal.lock().unwrap(),
        vec!["delete_all", "save", "set_version"]
    );
    assert_eq!(store.count().await.unwrap(), 2);
    assert_eq!(store.get_version().await.unwrap(), 3);
    assert_eq!(
        store.find_by_name("trevo").await.unwrap().map(|r| r.number),
        Some("2".to_string())
    );
}

#[tokio::test]
async fn default_replace_all_skips_version_when_save_fails() {
    let store = JournalingStore {
        fail_save: true,
        ..Default::default()
    };
    *store.version.lock().unwrap() = 1;

    let result = store
        .replace_all(&[CatalogRecord::new("1", "Cavaleiro")], 2)
        .await;

    assert!(result.is_err());
    assert_eq!(*store.journal.lock().unwrap(), vec!["delete_all", "save"]);
    assert_eq!(store.get_version().await.unwrap(), 1);
}
