//! # Sync Job State Machine
//!
//! One [`SyncJob`] per `sync()` call, moving through validated phases.
//!
//! ## State Machine
//!
//! ```text
//! Idle → Checking → UpToDate
//!            ↓
//!        Resyncing → Completed
//!
//! Idle | Checking | Resyncing → Failed
//! Idle | Checking | Resyncing → Cancelled
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use core_sync::{SyncDecision, SyncJob, SyncPhase};
//!
//! let job = SyncJob::new(Utc::now());
//! let job = job.begin_check(0, 0).unwrap();
//!
//! let decision = SyncDecision::evaluate(0, 0, 3);
//! assert!(decision.is_resync());
//!
//! let job = job.begin_resync(3).unwrap();
//! let job = job.complete(36, 0, Utc::now()).unwrap();
//! assert_eq!(job.phase, SyncPhase::Completed);
//! ```

use crate::{Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Types
// ============================================================================

/// Unique identifier for a sync job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncJobId(Uuid);

impl SyncJobId {
    /// Create a new random sync job ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

}

impl Default for SyncJobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SyncJobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Phase Types
// ============================================================================

/// Where a sync job is in its run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Created, local store not read yet
    Idle,
    /// Local version read, waiting for the remote version
    Checking,
    /// No resync needed; nothing was written
    UpToDate,
    /// Fetching the remote catalog and replacing the local one
    Resyncing,
    /// Local catalog replaced and version marker written
    Completed,
    Failed,
    Cancelled,
}

impl SyncPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SyncPhase::UpToDate | SyncPhase::Completed | SyncPhase::Failed | SyncPhase::Cancelled
        )
    }

    /// Finished without error
    pub fn is_success(&self) -> bool {
        matches!(self, SyncPhase::UpToDate | SyncPhase::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Idle => "idle",
            SyncPhase::Checking => "checking",
            SyncPhase::UpToDate => "up_to_date",
            SyncPhase::Resyncing => "resyncing",
            SyncPhase::Completed => "completed",
            SyncPhase::Failed => "failed",
            SyncPhase::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Resync Decision
// ============================================================================

/// Why a resync was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResyncReason {
    /// Local version marker is `0`
    NeverSynced,
    /// Version marker is set but the store holds no records
    EmptyStore,
    /// Remote version is strictly greater than the local one
    RemoteNewer,
}

impl ResyncReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResyncReason::NeverSynced => "never_synced",
            ResyncReason::EmptyStore => "empty_store",
            ResyncReason::RemoteNewer => "remote_newer",
        }
    }
}

/// Outcome of the version comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDecision {
    UpToDate,
    Resync(ResyncReason),
}

impl SyncDecision {
    /// Resync iff `remote > local || local == 0 || count == 0`.
    ///
    /// Only a strictly newer remote counts: an older remote stamp never
    /// downgrades the local catalog.
    pub fn evaluate(local_version: u64, local_count: u64, remote_version: u64) -> Self {
        if local_version == 0 {
            SyncDecision::Resync(ResyncReason::NeverSynced)
        } else if local_count == 0 {
            SyncDecision::Resync(ResyncReason::EmptyStore)
        } else if remote_version > local_version {
            SyncDecision::Resync(ResyncReason::RemoteNewer)
        } else {
            SyncDecision::UpToDate
        }
    }

    pub fn is_resync(&self) -> bool {
        matches!(self, SyncDecision::Resync(_))
    }
}

/// Whether the local catalog must be replaced.
pub fn needs_resync(local_version: u64, local_count: u64, remote_version: u64) -> bool {
    SyncDecision::evaluate(local_version, local_count, remote_version).is_resync()
}

// ============================================================================
// Reports
// ============================================================================

/// Figures of a finished sync run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub local_version: u64,
    pub remote_version: u64,
    /// Records now in the local store (0 for an up-to-date run)
    pub records_written: u64,
    /// Remote entries skipped during decoding
    pub skipped: u64,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// Result of a successful `sync()` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub job: SyncJob,
    pub decision: SyncDecision,
    pub report: SyncReport,
}

// ============================================================================
// Sync Job Entity
// ============================================================================

/// A single sync run with validated phase transitions.
///
/// Transition methods consume the job and return it in the new phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncJob {
    pub id: SyncJobId,
    pub phase: SyncPhase,
    /// Version marker read at the start of the run
    pub local_version: u64,
    /// Records stored at the start of the run
    pub local_count: u64,
    pub remote_version: Option<u64>,
    pub records_written: u64,
    pub skipped: u64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl SyncJob {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            id: SyncJobId::new(),
            phase: SyncPhase::Idle,
            local_version: 0,
            local_count: 0,
            remote_version: None,
            records_written: 0,
            skipped: 0,
            error_message: None,
            started_at: now,
            finished_at: None,
        }
    }

    /// Record the local snapshot and start checking the remote version.
    pub fn begin_check(mut self, local_version: u64, local_count: u64) -> Result<Self> {
        self.validate_transition(SyncPhase::Checking)?;
        self.phase = SyncPhase::Checking;
        self.local_version = local_version;
        self.local_count = local_count;
        Ok(self)
    }

    /// Remote version checked, nothing to do.
    pub fn up_to_date(mut self, remote_version: u64, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncPhase::UpToDate)?;
        self.phase = SyncPhase::UpToDate;
        self.remote_version = Some(remote_version);
        self.finished_at = Some(now);
        Ok(self)
    }

    pub fn begin_resync(mut self, remote_version: u64) -> Result<Self> {
        self.validate_transition(SyncPhase::Resyncing)?;
        self.phase = SyncPhase::Resyncing;
        self.remote_version = Some(remote_version);
        Ok(self)
    }

    pub fn complete(
        mut self,
        records_written: u64,
        skipped: u64,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        self.validate_transition(SyncPhase::Completed)?;
        self.phase = SyncPhase::Completed;
        self.records_written = records_written;
        self.skipped = skipped;
        self.finished_at = Some(now);
        Ok(self)
    }

    pub fn fail(mut self, error_message: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncPhase::Failed)?;
        self.phase = SyncPhase::Failed;
        self.error_message = Some(error_message.into());
        self.finished_at = Some(now);
        Ok(self)
    }

    pub fn cancel(mut self, now: DateTime<Utc>) -> Result<Self> {
        self.validate_transition(SyncPhase::Cancelled)?;
        self.phase = SyncPhase::Cancelled;
        self.finished_at = Some(now);
        Ok(self)
    }

    /// Wall-clock duration, once the job has finished
    pub fn duration_ms(&self) -> Option<u64> {
        self.finished_at.map(|end| {
            (end - self.started_at)
                .num_milliseconds()
                .max(0) as u64
        })
    }

    fn validate_transition(&self, to: SyncPhase) -> Result<()> {
        let valid = match (self.phase, to) {
            (SyncPhase::Idle, SyncPhase::Checking) => true,

            (SyncPhase::Checking, SyncPhase::UpToDate) => true,
            (SyncPhase::Checking, SyncPhase::Resyncing) => true,

            (SyncPhase::Resyncing, SyncPhase::Completed) => true,

            (
                SyncPhase::Idle | SyncPhase::Checking | SyncPhase::Resyncing,
                SyncPhase::Failed | SyncPhase::Cancelled,
            ) => true,

            _ => false,
        };

        if !valid {
            return Err(SyncError::InvalidStateTransition {
                from: self.phase.as_str().to_string(),
                to: to.as_str().to_string(),
                reason: format!(
                    "Cannot transition from {} to {}",
                    self.phase.as_str(),
                    to.as_str()
                ),
            });
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_sync_job_ids_are_unique() {
        let a = SyncJobId::new();
        let b = SyncJobId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 36);
    }

    #[test]
    fn test_phase_display_matches_serde_name() {
        for phase in [
            SyncPhase::Idle,
            SyncPhase::Checking,
            SyncPhase::UpToDate,
            SyncPhase::Resyncing,
            SyncPhase::Completed,
            SyncPhase::Failed,
            SyncPhase::Cancelled,
        ] {
            let json = serde_json::to_value(phase).unwrap();
            assert_eq!(json, serde_json::Value::String(phase.to_string()));
        }
    }

    #[test]
    fn test_decision_truth_table() {
        // Never synced, even when both sides say 0.
        assert_eq!(
            SyncDecision::evaluate(0, 0, 0),
            SyncDecision::Resync(ResyncReason::NeverSynced)
        );
        assert_eq!(
            SyncDecision::evaluate(0, 36, 3),
            SyncDecision::Resync(ResyncReason::NeverSynced)
        );

        // Marker set but no rows.
        assert_eq!(
            SyncDecision::evaluate(4, 0, 1),
            SyncDecision::Resync(ResyncReason::EmptyStore)
        );

        assert_eq!(
            SyncDecision::evaluate(2, 36, 3),
            SyncDecision::Resync(ResyncReason::RemoteNewer)
        );
        assert_eq!(SyncDecision::evaluate(3, 36, 3), SyncDecision::UpToDate);

        // No downgrade.
        assert_eq!(SyncDecision::evaluate(7, 36, 5), SyncDecision::UpToDate);
        assert!(!needs_resync(7, 36, 5));
    }

    #[test]
    fn test_resync_lifecycle() {
        let start = Utc::now();
        let job = SyncJob::new(start)
            .begin_check(0, 0)
            .unwrap()
            .begin_resync(3)
            .unwrap()
            .complete(36, 1, start + Duration::milliseconds(250))
            .unwrap();

        assert_eq!(job.phase, SyncPhase::Completed);
        assert_eq!(job.remote_version, Some(3));
        assert_eq!(job.records_written, 36);
        assert_eq!(job.skipped, 1);
        assert_eq!(job.duration_ms(), Some(250));
        assert!(job.phase.is_terminal());
    }

    #[test]
    fn test_up_to_date_lifecycle() {
        let now = Utc::now();
        let job = SyncJob::new(now)
            .begin_check(3, 36)
            .unwrap()
            .up_to_date(3, now)
            .unwrap();

        assert_eq!(job.phase, SyncPhase::UpToDate);
        assert!(job.phase.is_success());
        assert_eq!(job.records_written, 0);
    }

    #[test]
    fn test_invalid_transitions() {
        let now = Utc::now();

        let result = SyncJob::new(now).complete(1, 0, now);
        assert!(matches!(
            result,
            Err(SyncError::InvalidStateTransition { .. })
        ));

        let checking = SyncJob::new(now).begin_check(1, 1).unwrap();
        assert!(checking.clone().complete(1, 0, now).is_err());

        let done = checking.up_to_date(1, now).unwrap();
        assert!(done.clone().fail("late failure", now).is_err());
        assert!(done.cancel(now).is_err());
    }

    #[test]
    fn test_fail_and_cancel_from_active_phases() {
        let now = Utc::now();

        let failed = SyncJob::new(now)
            .begin_check(0, 0)
            .unwrap()
            .fail("remote unavailable", now)
            .unwrap();
        assert_eq!(failed.phase, SyncPhase::Failed);
        assert_eq!(failed.error_message.as_deref(), Some("remote unavailable"));

        let cancelled = SyncJob::new(now)
            .begin_check(0, 0)
            .unwrap()
            .begin_resync(2)
            .unwrap()
            .cancel(now)
            .unwrap();
        assert_eq!(cancelled.phase, SyncPhase::Cancelled);
        assert!(!cancelled.phase.is_success());
    }
}
