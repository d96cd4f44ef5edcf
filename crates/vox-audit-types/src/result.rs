//! Validation results.

use crate::{ComplianceLevel, ComplianceViolation, Severity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reporting period a result was computed for. Open bounds mean "unbounded".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ReportPeriod {
    /// Inclusive start.
    pub start: Option<DateTime<Utc>>,
    /// Exclusive end.
    pub end: Option<DateTime<Utc>>,
}

impl ReportPeriod {
    /// Create a period.
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Bounded period.
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(Some(start), Some(end))
    }

    /// Start inclusive, end exclusive.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |start| at >= start) && self.end.map_or(true, |end| at < end)
    }
}

/// Outcome of one validator over one snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceResult {
    /// Name of the validator that produced the result.
    pub validator: String,
    /// True when no violations were found.
    pub is_compliant: bool,
    /// Level derived from the violation severities.
    pub overall_level: ComplianceLevel,
    /// Violations in detection order.
    pub violations: Vec<ComplianceViolation>,
    /// Entries the validator examined.
    pub total_entries_checked: usize,
    /// Number of entries affected. Normally one per violation; retention
    /// reports the number of stale entries instead.
    pub entries_with_violations: usize,
    /// One-line outcome for display.
    pub summary: String,
    /// Reference instant of the validation.
    pub validated_at: DateTime<Utc>,
    /// Period the result covers.
    pub period: ReportPeriod,
}

impl ComplianceResult {
    /// Aggregate violations into a result.
    pub fn from_violations(
        validator: impl Into<String>,
        period: ReportPeriod,
        total_entries_checked: usize,
        violations: Vec<ComplianceViolation>,
        validated_at: DateTime<Utc>,
    ) -> Self {
        let validator = validator.into();
        let summary = format!(
            "{} found {} violation(s) across {} entries checked",
            validator,
            violations.len(),
            total_entries_checked
        );
        Self {
            is_compliant: violations.is_empty(),
            overall_level: ComplianceLevel::from_violations(&violations),
            entries_with_violations: violations.len(),
            validator,
            violations,
            total_entries_checked,
            summary,
            validated_at,
            period,
        }
    }

    /// Fail-closed result for an internal fault.
    pub fn internal_fault(
        validator: impl Into<String>,
        period: ReportPeriod,
        total_entries_checked: usize,
        error: impl std::fmt::Display,
        validated_at: DateTime<Utc>,
    ) -> Self {
        let validator = validator.into();
        let violation = ComplianceViolation::internal_fault(&validator, &error).detected_at(validated_at);
        Self {
            is_compliant: false,
            overall_level: ComplianceLevel::NonCompliant,
            entries_with_violations: 0,
            summary: format!("{} could not complete: {}", validator, error),
            validator,
            violations: vec![violation],
            total_entries_checked,
            validated_at,
            period,
        }
    }

    /// Override the affected-entry count.
    pub fn with_entries_with_violations(mut self, count: usize) -> Self {
        self.entries_with_violations = count;
        self
    }

    /// Count violations with exactly this severity.
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.violations.iter().filter(|v| v.severity == severity).count()
    }

    /// Whether any violation is critical.
    pub fn has_critical(&self) -> bool {
        self.violations.iter().any(|v| v.is_critical || v.severity == Severity::Critical)
    }
}

/// A point where recomputed hashes or chain links disagree with storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    /// Entry at which the chain breaks.
    pub entry_id: String,
    /// Position of the entry in chain order.
    pub position: usize,
    /// Recomputed digest or predecessor hash.
    pub expected_hash: String,
    /// Value found in storage.
    pub actual_hash: String,
    /// Critical for a mismatched digest or link, High for unreadable metadata.
    pub severity: Severity,
    /// Why the entry breaks the chain.
    pub reason: String,
}

/// Outcome of hash-chain verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashChainValidationResult {
    /// True when no breaks were found.
    pub is_valid: bool,
    /// Entries walked in chain order.
    pub entries_verified: usize,
    /// Breaks in chain order.
    pub breaks: Vec<ChainBreak>,
    /// Entry id of the first break in chain order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_break_at: Option<String>,
    /// Stored hash of the last entry in chain order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_head: Option<String>,
    /// Reference instant of the verification.
    pub verified_at: DateTime<Utc>,
}

impl HashChainValidationResult {
    /// Assemble a result from the breaks found.
    pub fn new(
        entries_verified: usize,
        breaks: Vec<ChainBreak>,
        chain_head: Option<String>,
        verified_at: DateTime<Utc>,
    ) -> Self {
        Self {
            is_valid: breaks.is_empty(),
            entries_verified,
            first_break_at: breaks.first().map(|b| b.entry_id.clone()),
            breaks,
            chain_head,
            verified_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ViolationType;
    use chrono::TimeZone;

    #[test]
    fn test_period_bounds() {
        let start = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap();
        let period = ReportPeriod::between(start, end);
        assert!(period.contains(start));
        assert!(!period.contains(end));
        assert!(ReportPeriod::default().contains(end));
    }

    #[test]
    fn test_empty_result_is_compliant() {
        let result = ComplianceResult::from_violations("Integrity", ReportPeriod::default(), 0, vec![], Utc::now());
        assert!(result.is_compliant);
        assert_eq!(result.overall_level, ComplianceLevel::FullyCompliant);
        assert_eq!(result.summary, "Integrity found 0 violation(s) across 0 entries checked");
    }

    #[test]
    fn test_internal_fault_fails_closed() {
        let result = ComplianceResult::internal_fault("Completeness", ReportPeriod::default(), 7, "bad", Utc::now());
        assert!(!result.is_compliant);
        assert_eq!(result.overall_level, ComplianceLevel::NonCompliant);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].violation_type, ViolationType::DataIntegrity);
        assert!(result.has_critical());
    }

    #[test]
    fn test_chain_result_records_first_break() {
        let brk = ChainBreak {
            entry_id: "e2".into(),
            position: 1,
            expected_hash: "a".into(),
            actual_hash: "b".into(),
            severity: Severity::Critical,
            reason: "hash mismatch".into(),
        };
        let result = HashChainValidationResult::new(3, vec![brk], Some("c".into()), Utc::now());
        assert!(!result.is_valid);
        assert_eq!(result.first_break_at.as_deref(), Some("e2"));
    }
}
