//! Per-entry integrity checks: stored digest, timestamp plausibility and
//! security context.

use crate::config::IntegrityConfig;
use crate::error::ValidationError;
use crate::validator::{days_before, run_guarded, shift_secs, AuditSnapshot, ComplianceValidator, ValidatorKind};
use chrono::{DateTime, Utc};
use tracing::debug;
use vox_audit_immutability::{canonical_timestamp, compute_entry_hash, hash_matches};
use vox_audit_types::{
    AuditLogEntry, ComplianceResult, ComplianceViolation, ReportPeriod, Severity, ViolationType,
};

/// Validates each entry in isolation.
#[derive(Debug, Clone, Default)]
pub struct IntegrityValidator {
    config: IntegrityConfig,
}

impl IntegrityValidator {
    pub fn new(config: IntegrityConfig) -> Self {
        Self { config }
    }

    /// Validate the entries falling in `[start, end)`, relative to the current time.
    pub fn validate_integrity(
        &self,
        entries: &[AuditLogEntry],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ComplianceResult {
        self.validate_at(entries, ReportPeriod::new(start, end), Utc::now())
    }

    /// Validate the entries in `period`, treating `now` as the validation time.
    pub fn validate_at(
        &self,
        entries: &[AuditLogEntry],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ComplianceResult {
        let in_period: Vec<&AuditLogEntry> = entries.iter().filter(|e| period.contains(e.timestamp)).collect();
        let kind = ValidatorKind::Integrity;

        run_guarded(kind, period, in_period.len(), now, || {
            let violations = self.check(&in_period, now)?;
            debug!(
                entries = in_period.len(),
                violations = violations.len(),
                "Integrity validation complete"
            );
            Ok(ComplianceResult::from_violations(kind.name(), period, in_period.len(), violations, now))
        })
    }

    fn check(&self, entries: &[&AuditLogEntry], now: DateTime<Utc>) -> Result<Vec<ComplianceViolation>, ValidationError> {
        let latest = shift_secs(now, self.config.future_tolerance_secs)?;
        let earliest = days_before(now, self.config.max_age_days)?;
        let mut violations = Vec::new();

        for entry in entries {
            let expected = compute_entry_hash(entry);
            if !hash_matches(&expected, &entry.integrity_hash) {
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::HashMismatch,
                        Severity::Critical,
                        format!("Integrity hash mismatch for entry {}", entry.id),
                        "Investigate possible tampering and restore the entry from a trusted backup",
                    )
                    .with_entry(&entry.id)
                    .with_detail("expected_hash", &expected)
                    .with_detail("actual_hash", &entry.integrity_hash)
                    .detected_at(now),
                );
            }

            if entry.timestamp > latest || entry.timestamp < earliest {
                let direction = if entry.timestamp > latest { "in the future" } else { "too far in the past" };
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::InvalidTimestamp,
                        Severity::High,
                        format!("Entry {} has a timestamp {}", entry.id, direction),
                        "Check the recording host's clock and the entry's provenance",
                    )
                    .with_entry(&entry.id)
                    .with_detail("timestamp", canonical_timestamp(&entry.timestamp))
                    .detected_at(now),
                );
            }

            if entry.event_type.is_security_relevant() && !entry.has_metadata() {
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::MissingSecurityContext,
                        Severity::Medium,
                        format!("Security event {} ({}) has no security context", entry.id, entry.event_type),
                        "Record client and network context for security-relevant events",
                    )
                    .with_entry(&entry.id)
                    .with_detail("event_type", entry.event_type)
                    .detected_at(now),
                );
            }
        }

        Ok(violations)
    }
}

impl ComplianceValidator for IntegrityValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Integrity
    }

    fn validate(&self, snapshot: &AuditSnapshot) -> ComplianceResult {
        self.validate_at(&snapshot.entries, snapshot.period, snapshot.captured_at)
    }
}
