//! The shared validator capability and fail-closed execution.

use crate::error::ValidationError;
use crate::store::AuditStatistics;
use chrono::{DateTime, Duration, Utc};
use std::panic::AssertUnwindSafe;
use tracing::warn;
use vox_audit_types::{AuditLogEntry, ComplianceResult, ReportPeriod};

/// Immutable working set for one validation run, fetched once from the store.
#[derive(Debug, Clone)]
pub struct AuditSnapshot {
    pub period: ReportPeriod,
    /// Reference "now" for every time-relative rule.
    pub captured_at: DateTime<Utc>,
    pub entries: Vec<AuditLogEntry>,
    pub statistics: AuditStatistics,
    /// Entries found in the retention sample window.
    pub retention_sample: Vec<AuditLogEntry>,
}

impl AuditSnapshot {
    /// Snapshot over `entries`, with statistics derived from them.
    pub fn new(period: ReportPeriod, captured_at: DateTime<Utc>, entries: Vec<AuditLogEntry>) -> Self {
        let statistics = AuditStatistics {
            total_entries: entries.len() as u64,
            entries_past_retention: 0,
            oldest_entry: entries.iter().map(|e| e.timestamp).min(),
            newest_entry: entries.iter().map(|e| e.timestamp).max(),
        };
        Self {
            period,
            captured_at,
            entries,
            statistics,
            retention_sample: Vec::new(),
        }
    }

    /// Replace the store statistics.
    pub fn with_statistics(mut self, statistics: AuditStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    /// Attach the retention sample.
    pub fn with_retention_sample(mut self, sample: Vec<AuditLogEntry>) -> Self {
        self.retention_sample = sample;
        self
    }
}

/// Which report slot a validator fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidatorKind {
    Integrity,
    Completeness,
    Retention,
}

impl ValidatorKind {
    /// Name used in summaries and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Integrity => "Integrity validation",
            Self::Completeness => "Completeness validation",
            Self::Retention => "Retention policy validation",
        }
    }
}

/// A stateless check over a snapshot. Implementations must be total: any
/// internal fault is reported inside the returned result.
pub trait ComplianceValidator: Send + Sync {
    /// Slot this validator fills.
    fn kind(&self) -> ValidatorKind;

    /// Validate the snapshot.
    fn validate(&self, snapshot: &AuditSnapshot) -> ComplianceResult;
}

/// Catch panics and convert to Result.
pub fn catch_panic<F, T>(f: F) -> Result<T, String>
where
    F: FnOnce() -> T,
{
    std::panic::catch_unwind(AssertUnwindSafe(f)).map_err(|e| {
        if let Some(s) = e.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = e.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        }
    })
}

/// `at` shifted by a signed number of days.
pub(crate) fn shift_days(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, ValidationError> {
    Duration::try_days(days)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| ValidationError::TimeArithmetic(format!("{} shifted by {} days", at, days)))
}

/// `at` moved back by `days`.
pub(crate) fn days_before(at: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>, ValidationError> {
    let back = days
        .checked_neg()
        .ok_or_else(|| ValidationError::TimeArithmetic(format!("cannot negate {} days", days)))?;
    shift_days(at, back)
}

/// `at` shifted by a signed number of seconds.
pub(crate) fn shift_secs(at: DateTime<Utc>, secs: i64) -> Result<DateTime<Utc>, ValidationError> {
    Duration::try_seconds(secs)
        .and_then(|delta| at.checked_add_signed(delta))
        .ok_or_else(|| ValidationError::TimeArithmetic(format!("{} shifted by {} seconds", at, secs)))
}

/// Run a fallible validation body, converting errors and panics into a
/// fail-closed result.
pub(crate) fn run_guarded<F>(
    kind: ValidatorKind,
    period: ReportPeriod,
    total_entries: usize,
    validated_at: DateTime<Utc>,
    body: F,
) -> ComplianceResult
where
    F: FnOnce() -> Result<ComplianceResult, ValidationError>,
{
    let error = match catch_panic(body) {
        Ok(Ok(result)) => return result,
        Ok(Err(e)) => e,
        Err(panic) => ValidationError::Panicked(panic),
    };

    warn!(validator = kind.name(), error = %error, "Validator failed; reporting non-compliant");
    ComplianceResult::internal_fault(kind.name(), period, total_entries, error, validated_at)
}
