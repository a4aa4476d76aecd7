//! Local catalog store trait and SQLite implementation

use crate::error::{CatalogError, Result};
use crate::models::{sort_natural, CatalogRecord};
use crate::version::VersionMarker;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{query, query_as, query_scalar, SqliteConnection, SqlitePool};
use tracing::{debug, info, instrument};

const SELECT_RECORDS: &str = r#"
    SELECT number, name, keywords, general_meanings, astrological_influence,
           archetype_figure, spiritual_plane, mental_plane, emotional_plane,
           material_plane, physical_plane, positive_points, negative_points,
           year_prediction, time
    FROM catalog_records
"#;

/// Persistent, key-unique collection of catalog records plus the local
/// version marker.
#[async_trait]
pub trait LocalCatalogStore: Send + Sync {
    /// All stored records in natural-key order
    async fn fetch_all(&self) -> Result<Vec<CatalogRecord>>;

    /// Insert records, all or nothing
    ///
    /// # Errors
    /// Returns error if:
    /// - A record fails validation
    /// - A record's number already exists in the store
    /// - Database error occurs
    async fn save(&self, records: &[CatalogRecord]) -> Result<()>;

    /// Remove every record
    ///
    /// # Returns
    /// Number of records removed
    async fn delete_all(&self) -> Result<u64>;

    async fn count(&self) -> Result<u64>;

    /// Version of the stored catalog; `0` if never synced
    async fn get_version(&self) -> Result<u64>;

    async fn set_version(&self, version: u64) -> Result<()>;

    /// Replace the whole catalog and record its version.
    ///
    /// The version marker is written last, only after the records are in
    /// place. The default runs `delete_all`, `save`, `set_version` in that
    /// order; implementations backed by a transactional engine should make
    /// the delete and insert a single atomic step.
    async fn replace_all(&self, records: &[CatalogRecord], version: u64) -> Result<()> {
        self.delete_all().await?;
        self.save(records).await?;
        self.set_version(version).await
    }

    /// Find a record by its number
    ///
    /// # Returns
    /// - `Ok(Some(record))` if found
    /// - `Ok(None)` if not found
    async fn find_by_number(&self, number: &str) -> Result<Option<CatalogRecord>>;

    /// Find a record by name, ignoring case and surrounding whitespace
    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>>;
}

/// SQLite implementation of [`LocalCatalogStore`]
pub struct SqliteCatalogStore {
    pool: SqlitePool,
    marker: VersionMarker,
}

impl SqliteCatalogStore {
    /// Create a store over a migrated pool
    pub fn new(pool: SqlitePool, marker: VersionMarker) -> Self {
        Self { pool, marker }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn version_marker(&self) -> &VersionMarker {
        &self.marker
    }

    fn validate_all(records: &[CatalogRecord]) -> Result<()> {
        for record in records {
            record.validate().map_err(|e| CatalogError::InvalidInput {
                field: "CatalogRecord".to_string(),
                message: e,
            })?;
        }
        Ok(())
    }

    async fn insert_record(
        conn: &mut SqliteConnection,
        record: &CatalogRecord,
        synced_at: i64,
    ) -> Result<()> {
        query(
            r#"
            INSERT INTO catalog_records (
                number, name, normalized_name, keywords, general_meanings,
                astrological_influence, archetype_figure, spiritual_plane,
                mental_plane, emotional_plane, material_plane, physical_plane,
                positive_points, negative_points, year_prediction, time, synced_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.number)
        .bind(&record.name)
        .bind(CatalogRecord::normalize(&record.name))
        .bind(&record.keywords)
        .bind(&record.general_meanings)
        .bind(&record.astrological_influence)
        .bind(&record.archetype_figure)
        .bind(&record.spiritual_plane)
        .bind(&record.mental_plane)
        .bind(&record.emotional_plane)
        .bind(&record.material_plane)
        .bind(&record.physical_plane)
        .bind(&record.positive_points)
        .bind(&record.negative_points)
        .bind(&record.year_prediction)
        .bind(&record.time)
        .bind(synced_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl LocalCatalogStore for SqliteCatalogStore {
    async fn fetch_all(&self) -> Result<Vec<CatalogRecord>> {
        let mut records = query_as::<_, CatalogRecord>(SELECT_RECORDS)
            .fetch_all(&self.pool)
            .await?;

        sort_natural(&mut records);
        Ok(records)
    }

    async fn save(&self, records: &[CatalogRecord]) -> Result<()> {
        Self::validate_all(records)?;

        let synced_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        for record in records {
            Self::insert_record(&mut tx, record, synced_at).await?;
        }
        tx.commit().await?;

        debug!(records = records.len(), "Saved catalog records");
        Ok(())
    }

    async fn delete_all(&self) -> Result<u64> {
        let result = query("DELETE FROM catalog_records")
            .execute(&self.pool)
            .await?;

        debug!(removed = result.rows_affected(), "Deleted catalog records");
        Ok(result.rows_affected())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = query_scalar("SELECT COUNT(*) FROM catalog_records")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.max(0) as u64)
    }

    async fn get_version(&self) -> Result<u64> {
        self.marker.get().await
    }

    async fn set_version(&self, version: u64) -> Result<()> {
        self.marker.set(version).await
    }

    #[instrument(skip(self, records), fields(records = records.len()))]
    async fn replace_all(&self, records: &[CatalogRecord], version: u64) -> Result<()> {
        Self::validate_all(records)?;

        let synced_at = Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        let removed = query("DELETE FROM catalog_records")
            .execute(&mut *tx)
            .await?
            .rows_affected();

        for record in records {
            Self::insert_record(&mut tx, record, synced_at).await?;
        }

        tx.commit().await?;

        // Marker last: a failure here leaves the new records under the old
        // version, which only costs one extra resync.
        self.marker.set(version).await?;

        info!(
            removed,
            inserted = records.len(),
            version,
            "Local catalog replaced"
        );
        Ok(())
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<CatalogRecord>> {
        let sql = format!("{} WHERE number = ?", SELECT_RECORDS);
        let record = query_as::<_, CatalogRecord>(&sql)
            .bind(number.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CatalogRecord>> {
        let sql = format!(
            "{} WHERE normalized_name = ? ORDER BY number LIMIT 1",
            SELECT_RECORDS
        );
        let record = query_as::<_, CatalogRecord>(&sql)
            .bind(CatalogRecord::normalize(name))
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }
}
