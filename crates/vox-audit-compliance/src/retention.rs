//! Retention policy: stale entries past the horizon and long-term coverage.

use crate::config::RetentionConfig;
use crate::error::ValidationError;
use crate::store::AuditStatistics;
use crate::validator::{days_before, run_guarded, shift_days, AuditSnapshot, ComplianceValidator, ValidatorKind};
use chrono::{DateTime, Utc};
use tracing::debug;
use vox_audit_types::{
    AuditLogEntry, ComplianceResult, ComplianceViolation, ReportPeriod, Severity, ViolationType,
};

/// Checks store statistics against the retention horizon.
#[derive(Debug, Clone, Default)]
pub struct RetentionPolicyValidator {
    config: RetentionConfig,
}

impl RetentionPolicyValidator {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }

    /// The window just inside the retention horizon that must still hold
    /// entries: `[now - horizon, now - horizon + sample_window)`.
    pub fn sample_window(&self, now: DateTime<Utc>) -> Result<ReportPeriod, ValidationError> {
        let start = days_before(now, self.config.horizon_days)?;
        let end = shift_days(start, self.config.sample_window_days)?;
        Ok(ReportPeriod::between(start, end))
    }

    /// Validate statistics and the retention sample relative to the current time.
    pub fn validate_retention(&self, statistics: &AuditStatistics, sample: &[AuditLogEntry]) -> ComplianceResult {
        self.validate_retention_at(statistics, sample, ReportPeriod::default(), Utc::now())
    }

    pub fn validate_retention_at(
        &self,
        statistics: &AuditStatistics,
        sample: &[AuditLogEntry],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ComplianceResult {
        let kind = ValidatorKind::Retention;
        let total = usize::try_from(statistics.total_entries).unwrap_or(usize::MAX);

        run_guarded(kind, period, total, now, || {
            let mut violations = Vec::new();

            if statistics.entries_past_retention > 0 {
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::RetentionPolicyViolation,
                        Severity::Medium,
                        format!(
                            "{} entries are older than the {}-day retention horizon",
                            statistics.entries_past_retention, self.config.horizon_days
                        ),
                        "Archive or purge entries past the retention horizon",
                    )
                    .with_detail("entries_past_retention", statistics.entries_past_retention)
                    .with_detail("horizon_days", self.config.horizon_days)
                    .detected_at(now),
                );
            }

            let window = self.sample_window(now)?;
            let log_reaches_window = matches!(
                (statistics.oldest_entry, window.start),
                (Some(oldest), Some(start)) if oldest <= start
            );
            if log_reaches_window {
                let found = sample.iter().filter(|e| window.contains(e.timestamp)).count();
                if found < self.config.min_sample_entries {
                    violations.push(
                        ComplianceViolation::new(
                            ViolationType::RetentionPolicyViolation,
                            Severity::High,
                            format!(
                                "Only {} entries retained in the {}-day window at the retention horizon",
                                found, self.config.sample_window_days
                            ),
                            "Verify that long-term audit storage is retaining records for the full horizon",
                        )
                        .with_detail("sample_entries", found)
                        .with_detail("min_sample_entries", self.config.min_sample_entries)
                        .detected_at(now),
                    );
                }
            }

            debug!(
                total_entries = statistics.total_entries,
                past_retention = statistics.entries_past_retention,
                violations = violations.len(),
                "Retention validation complete"
            );

            // Affected entries are the stale ones, not the violation count.
            let stale = usize::try_from(statistics.entries_past_retention).unwrap_or(usize::MAX);
            Ok(ComplianceResult::from_violations(kind.name(), period, total, violations, now)
                .with_entries_with_violations(stale))
        })
    }
}

impl ComplianceValidator for RetentionPolicyValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Retention
    }

    fn validate(&self, snapshot: &AuditSnapshot) -> ComplianceResult {
        self.validate_retention_at(
            &snapshot.statistics,
            &snapshot.retention_sample,
            snapshot.period,
            snapshot.captured_at,
        )
    }
}
