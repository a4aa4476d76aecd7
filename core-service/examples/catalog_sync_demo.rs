//! Sync a Firebase-hosted catalog into a local SQLite cache.
//!
//! ```text
//! CATALOG_DATABASE_URL=https://my-catalog.firebaseio.com \
//! CATALOG_AUTH_TOKEN=... \
//! cargo run -p core-service --example catalog_sync_demo
//! ```

use anyhow::Context;
use core_runtime::logging::{init_logging, LogFormat, LoggingConfig};
use core_service::{CatalogCore, CatalogState, CoreConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;

    let database_url =
        std::env::var("CATALOG_DATABASE_URL").context("CATALOG_DATABASE_URL is not set")?;
    let database_path = std::env::var("CATALOG_DB_PATH")
        .unwrap_or_else(|_| "./catalog-data/catalog.db".to_string());

    let mut builder = CoreConfig::builder()
        .database_path(database_path)
        .remote_database_url(database_url);
    if let Ok(token) = std::env::var("CATALOG_AUTH_TOKEN") {
        builder = builder.remote_auth_token(token);
    }

    let core = CatalogCore::bootstrap(builder.build()?).await?;
    let mut state = core.subscribe();

    let handle = core.load_catalog().await;
    println!("local: {}", *state.borrow_and_update());

    tokio::select! {
        result = handle => {
            match result? {
                Ok(outcome) => println!(
                    "sync {:?}: v{} -> v{}, {} records, {} skipped, {} ms",
                    outcome.decision,
                    outcome.report.local_version,
                    outcome.report.remote_version,
                    outcome.report.records_written,
                    outcome.report.skipped,
                    outcome.report.duration_ms,
                ),
                Err(e) => println!("sync failed: {}", e),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            core.cancel_sync().await;
            println!("sync cancelled");
        }
    }

    if let CatalogState::Ready(records) = &*state.borrow() {
        for record in records.iter().take(5) {
            println!("{:>3}  {}", record.number, record.name);
        }
    }
    println!("now: {}", core.state());

    Ok(())
}
