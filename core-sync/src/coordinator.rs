//! # Catalog Sync Coordinator
//!
//! Decides whether the local catalog must be refreshed and, if so, replaces
//! it with the remote one.
//!
//! ## Workflow
//!
//! 1. Read the local version marker and record count
//! 2. Fetch the remote version stamp
//! 3. Resync iff `remote > local || local == 0 || count == 0`
//! 4. Up to date: stop, nothing is written
//! 5. Otherwise fetch every remote record and replace the local catalog
//!    (delete, insert, then version marker last)
//! 6. Publish the stored catalog, or a failure if nothing is on screen yet
//!
//! Steps 2 and 5's fetch are the only network calls. They share one deadline
//! ([`SyncConfig::sync_timeout_secs`]) and are abandoned on
//! [`CatalogSyncCoordinator::cancel`]. The replace itself runs in its own task
//! and always finishes, so the store is either untouched or fully replaced.
//!
//! Overlapping `sync()` calls are serialized; a queued call re-checks the
//! version after the first one finished and usually ends up a no-op.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{CatalogSyncCoordinator, SyncConfig};
//! use std::sync::Arc;
//!
//! let coordinator = Arc::new(CatalogSyncCoordinator::new(store, source, SyncConfig::default()));
//! let mut state = coordinator.subscribe();
//!
//! // Publishes the local catalog now, syncs in the background.
//! let handle = coordinator.load().await;
//!
//! state.changed().await?;
//! println!("{}", *state.borrow());
//!
//! let outcome = handle.await??;
//! println!("{:?}", outcome.decision);
//! ```

use crate::error::{Result, SyncError};
use crate::job::{SyncDecision, SyncJob, SyncJobId, SyncOutcome, SyncReport};
use crate::source::RemoteCatalogSource;
use crate::state::{CatalogState, CatalogStatePublisher};
use bridge_traits::{Clock, SystemClock};
use core_catalog::{CatalogRecord, LocalCatalogStore};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, SyncEvent};
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Sync coordinator configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Deadline for the network phase of one sync run (seconds)
    pub sync_timeout_secs: u64,

    /// Accept a remote catalog that decodes to zero records.
    ///
    /// When on, an empty remote catalog is a normal resync: the local
    /// records are deleted and the new version is stored. When off (the
    /// default), such a sync fails with `DecodingFailed` and the store and
    /// version marker are left as they were, so a broken remote cannot wipe
    /// a usable cache. Turn it on to get plain delete-then-insert semantics.
    pub allow_empty_catalog: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            sync_timeout_secs: 60,
            allow_empty_catalog: false,
        }
    }
}

/// Run currently holding the sync lock
struct ActiveSync {
    job_id: SyncJobId,
    cancellation_token: CancellationToken,
}

/// Clears the active slot when the run ends, including when the `sync()`
/// future is dropped mid-flight.
struct ActiveGuard<'a> {
    slot: &'a StdMutex<Option<ActiveSync>>,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

/// What the network phase produced
struct RemotePlan {
    remote_version: u64,
    decision: SyncDecision,
}

/// Orchestrates version-gated, full-replace syncs of the local catalog.
pub struct CatalogSyncCoordinator {
    config: SyncConfig,

    store: Arc<dyn LocalCatalogStore>,

    source: Arc<dyn RemoteCatalogSource>,

    state: CatalogStatePublisher,

    event_bus: EventBus,

    clock: Arc<dyn Clock>,

    /// Held for the whole of one `sync()` run
    sync_lock: Mutex<()>,

    active: StdMutex<Option<ActiveSync>>,
}

impl CatalogSyncCoordinator {
    pub fn new(
        store: Arc<dyn LocalCatalogStore>,
        source: Arc<dyn RemoteCatalogSource>,
        config: SyncConfig,
    ) -> Self {
        Self {
            config,
            store,
            source,
            state: CatalogStatePublisher::new(),
            event_bus: EventBus::default(),
            clock: Arc::new(SystemClock),
            sync_lock: Mutex::new(()),
            active: StdMutex::new(None),
        }
    }

    /// Publish lifecycle events on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<CatalogState> {
        self.state.subscribe()
    }

    /// Snapshot of the published catalog state
    pub fn state(&self) -> CatalogState {
        self.state.current()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Publish the local catalog and start a background sync.
    ///
    /// Only the local read is awaited. The returned handle resolves to the
    /// sync outcome; dropping it does not stop the sync.
    #[instrument(skip(self))]
    pub async fn load(self: &Arc<Self>) -> JoinHandle<Result<SyncOutcome>> {
        match self.store.fetch_all().await {
            Ok(records) if records.is_empty() => {
                debug!("Local catalog empty");
                self.state.publish_loading();
                self.emit(CoreEvent::Catalog(CatalogEvent::LocalLoaded { records: 0 }));
            }
            Ok(records) => {
                let count = records.len() as u64;
                info!(records = count, "Serving local catalog");
                self.state.publish_ready(records);
                self.emit(CoreEvent::Catalog(CatalogEvent::LocalLoaded { records: count }));
            }
            Err(e) => {
                warn!(error = %e, "Local catalog unreadable, waiting for sync");
                self.state.publish_loading();
            }
        }

        let coordinator = Arc::clone(self);
        tokio::spawn(async move { coordinator.sync().await })
    }

    /// Run one sync to completion.
    ///
    /// # Errors
    ///
    /// - `RemoteUnavailable` / `DecodingFailed` if the remote could not be read
    /// - `Timeout` / `Cancelled` if the network phase was abandoned
    /// - `Storage` if the local store failed
    ///
    /// In every error case the published state only turns `Failed` when no
    /// catalog was being served.
    #[instrument(skip(self), fields(job_id = tracing::field::Empty))]
    pub async fn sync(&self) -> Result<SyncOutcome> {
        let _guard = self.sync_lock.lock().await;

        let job = SyncJob::new(self.clock.now());
        let job_id = job.id;
        tracing::Span::current().record("job_id", tracing::field::display(job_id));

        let cancellation_token = CancellationToken::new();
        *self.active_slot() = Some(ActiveSync {
            job_id,
            cancellation_token: cancellation_token.clone(),
        });
        let _active = ActiveGuard { slot: &self.active };

        self.execute_sync(job, &cancellation_token).await
    }

    /// Abandon the network phase of the run in flight.
    ///
    /// Returns `false` if no sync is running. Queued runs are not affected.
    pub async fn cancel(&self) -> bool {
        match self.active_slot().as_ref() {
            Some(active) => {
                info!(job_id = %active.job_id, "Cancelling catalog sync");
                active.cancellation_token.cancel();
                true
            }
            None => false,
        }
    }

    pub async fn is_syncing(&self) -> bool {
        self.active_slot().is_some()
    }

    fn active_slot(&self) -> MutexGuard<'_, Option<ActiveSync>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn execute_sync(
        &self,
        job: SyncJob,
        cancellation_token: &CancellationToken,
    ) -> Result<SyncOutcome> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.timeout();

        // Step 1: local snapshot
        let (local_version, local_count) = match self.read_local().await {
            Ok(snapshot) => snapshot,
            Err(e) => return Err(self.fail(job, e)),
        };
        let job = job.begin_check(local_version, local_count)?;

        self.emit(CoreEvent::Sync(SyncEvent::Started {
            job_id: job.id.to_string(),
            local_version,
            local_count,
        }));

        // Steps 2-3: remote version and decision
        let plan = match self
            .remote_call(self.source.fetch_version(), deadline, cancellation_token)
            .await
        {
            Ok(remote_version) => RemotePlan {
                remote_version,
                decision: SyncDecision::evaluate(local_version, local_count, remote_version),
            },
            Err(e) => return Err(self.fail(job, e)),
        };

        let remote_version = plan.remote_version;
        debug!(
            local_version,
            local_count,
            remote_version,
            decision = ?plan.decision,
            "Compared catalog versions"
        );

        // Step 4: nothing to do
        if !plan.decision.is_resync() {
            if !self.state.has_ready() {
                match self.store.fetch_all().await {
                    Ok(records) => {
                        self.state.publish_ready(records);
                    }
                    Err(e) => return Err(self.fail(job, e.into())),
                }
            }

            let job = job.up_to_date(remote_version, self.clock.now())?;

            info!(local_version, remote_version, "Catalog up to date");
            self.emit(CoreEvent::Sync(SyncEvent::UpToDate {
                job_id: job.id.to_string(),
                version: remote_version,
            }));

            let report = self.report(&job, started);
            return Ok(SyncOutcome {
                job,
                decision: plan.decision,
                report,
            });
        }

        // Step 5: fetch and replace
        let job = job.begin_resync(remote_version)?;
        info!(
            source = self.source.name(),
            local_version,
            remote_version,
            reason = ?plan.decision,
            "Resyncing catalog"
        );

        let catalog = match self
            .remote_call(self.source.fetch_all_records(), deadline, cancellation_token)
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => return Err(self.fail(job, e)),
        };

        if catalog.is_empty() && !self.config.allow_empty_catalog {
            let e = SyncError::DecodingFailed(format!(
                "remote catalog decoded to zero records ({} skipped)",
                catalog.skipped
            ));
            return Err(self.fail(job, e));
        }

        if cancellation_token.is_cancelled() {
            return Err(self.fail(job, SyncError::Cancelled));
        }

        let skipped = catalog.skipped;
        if let Err(e) = self.replace(catalog.records, remote_version).await {
            return Err(self.fail(job, e));
        }

        // Step 6: publish what is now stored
        let records = match self.store.fetch_all().await {
            Ok(records) => records,
            Err(e) => return Err(self.fail(job, e.into())),
        };
        let written = records.len() as u64;

        let job = job.complete(written, skipped, self.clock.now())?;
        self.state.publish_ready(records);

        let report = self.report(&job, started);
        info!(
            version = remote_version,
            records = written,
            skipped,
            duration_ms = report.duration_ms,
            "Catalog sync completed"
        );

        self.emit(CoreEvent::Catalog(CatalogEvent::Replaced {
            records: written,
            version: remote_version,
        }));
        self.emit(CoreEvent::Sync(SyncEvent::Completed {
            job_id: job.id.to_string(),
            version: remote_version,
            records: written,
            skipped,
            duration_ms: report.duration_ms,
        }));

        Ok(SyncOutcome {
            job,
            decision: plan.decision,
            report,
        })
    }

    async fn read_local(&self) -> Result<(u64, u64)> {
        let version = self.store.get_version().await?;
        let count = self.store.count().await?;
        Ok((version, count))
    }

    /// Await a network call under the run's deadline and cancellation token.
    async fn remote_call<T>(
        &self,
        call: impl Future<Output = Result<T>>,
        deadline: tokio::time::Instant,
        cancellation_token: &CancellationToken,
    ) -> Result<T> {
        tokio::select! {
            biased;
            _ = cancellation_token.cancelled() => Err(SyncError::Cancelled),
            result = timeout_at(deadline, call) => match result {
                Ok(inner) => inner,
                Err(_) => Err(SyncError::Timeout(self.config.sync_timeout_secs)),
            },
        }
    }

    /// Replace the local catalog in a detached task.
    ///
    /// Dropping the caller's future does not abort the task, so a replace
    /// that has started always runs to the end.
    async fn replace(&self, records: Vec<CatalogRecord>, version: u64) -> Result<()> {
        let store = Arc::clone(&self.store);
        let handle = tokio::spawn(async move { store.replace_all(&records, version).await });

        match handle.await {
            Ok(result) => result.map_err(SyncError::from),
            Err(e) => Err(SyncError::Internal(e.to_string())),
        }
    }

    /// Move the job to its terminal failure phase, publish, and hand the
    /// error back.
    fn fail(&self, job: SyncJob, error: SyncError) -> SyncError {
        let job_id = job.id;
        let now = self.clock.now();
        let finished = match error {
            SyncError::Cancelled => job.cancel(now),
            _ => job.fail(error.to_string(), now),
        };
        if let Err(e) = finished {
            warn!(error = %e, "Could not record sync failure on job");
        }

        let stale_served = !self.state.publish_failed(error.to_string());
        if stale_served {
            warn!(error = %error, "Catalog sync failed, serving cached catalog");
        } else {
            error!(error = %error, "Catalog sync failed");
        }

        self.emit(CoreEvent::Sync(SyncEvent::Failed {
            job_id: job_id.to_string(),
            message: error.to_string(),
            stale_served,
        }));

        error
    }

    fn report(&self, job: &SyncJob, started: Instant) -> SyncReport {
        SyncReport {
            local_version: job.local_version,
            remote_version: job.remote_version.unwrap_or(job.local_version),
            records_written: job.records_written,
            skipped: job.skipped,
            duration_ms: started.elapsed().as_millis() as u64,
            completed_at: job.finished_at.unwrap_or_else(|| self.clock.now()),
        }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.sync_timeout_secs)
    }

    fn emit(&self, event: CoreEvent) {
        self.event_bus.emit(event).ok();
    }
}
