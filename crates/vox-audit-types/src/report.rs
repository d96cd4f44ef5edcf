//! Compliance report for one reporting period.

use crate::{
    AuditEventType, ComplianceLevel, ComplianceResult, ComplianceType, HashChainValidationResult,
    SuspiciousPattern, ViolationType,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Structured compliance report suitable for periodic governance review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Random UUID assigned per generation.
    pub id: String,
    /// Capture instant the report was computed against.
    pub generated_at: DateTime<Utc>,
    /// Inclusive period start; `None` is unbounded.
    pub period_start: Option<DateTime<Utc>>,
    /// Exclusive period end; `None` is unbounded.
    pub period_end: Option<DateTime<Utc>>,
    /// Entries in the period.
    pub total_entries: usize,
    /// Entry counts per event type.
    pub entries_by_event_type: BTreeMap<AuditEventType, usize>,
    /// Entry counts per compliance framework.
    pub entries_by_compliance_type: BTreeMap<ComplianceType, usize>,
    /// Per-entry digest, timestamp and context checks.
    pub integrity_validation: ComplianceResult,
    /// Timeline and required event type checks.
    pub completeness_validation: ComplianceResult,
    /// Retention horizon checks.
    pub retention_validation: ComplianceResult,
    /// Chain verification over the period's entries.
    pub hash_chain_validation: HashChainValidationResult,
    /// Detected patterns. These never affect the violation counts.
    pub suspicious_patterns: Vec<SuspiciousPattern>,
    /// Combined verdict.
    pub overall_compliance: ComplianceLevel,
    /// Critical violations across the three validators.
    pub critical_violations: usize,
    /// High violations across the three validators.
    pub high_violations: usize,
    /// Medium violations across the three validators.
    pub medium_violations: usize,
    /// Low violations across the three validators.
    pub low_violations: usize,
    /// One-line verdict for display.
    pub summary: String,
    /// Ordered follow-up actions.
    pub recommendations: Vec<String>,
}

impl ComplianceReport {
    /// The three validator results.
    pub fn validations(&self) -> [&ComplianceResult; 3] {
        [
            &self.integrity_validation,
            &self.completeness_validation,
            &self.retention_validation,
        ]
    }

    /// Whether a human must review this period: the verdict is non-compliant
    /// or the engine hit an internal fault while producing it.
    pub fn requires_review(&self) -> bool {
        self.overall_compliance == ComplianceLevel::NonCompliant
            || self
                .validations()
                .iter()
                .flat_map(|r| r.violations.iter())
                .any(|v| v.violation_type == ViolationType::DataIntegrity)
    }

    /// Serialize for persistence or display by the host.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
