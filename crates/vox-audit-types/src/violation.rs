//! Compliance violations produced per validation run.

use crate::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

/// Kind of deviation a validator detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ViolationType {
    HashMismatch,
    MissingEntry,
    TamperedEntry,
    InvalidTimestamp,
    RetentionPolicyViolation,
    MissingSecurityContext,
    IncompleteChain,
    SuspiciousPattern,
    /// Unexpected internal fault inside the engine.
    DataIntegrity,
    /// Reserved; no validator emits it yet.
    UnauthorizedAccess,
}

/// One detected deviation from an integrity, completeness, or retention rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// Random UUID assigned at detection.
    pub id: String,
    /// Kind of deviation.
    pub violation_type: ViolationType,
    /// How urgently the deviation needs review.
    pub severity: Severity,
    /// Human-readable explanation.
    pub description: String,
    /// Entry the violation is attributed to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affected_entry_id: Option<String>,
    /// Validation instant that produced the violation.
    pub detected_at: DateTime<Utc>,
    /// Suggested remediation.
    pub recommendation: String,
    /// Structured context such as expected and actual hashes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<String, String>,
    /// True exactly when `severity` is Critical.
    pub is_critical: bool,
}

impl ComplianceViolation {
    /// Create a violation. `is_critical` follows the severity.
    pub fn new(
        violation_type: ViolationType,
        severity: Severity,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            violation_type,
            severity,
            description: description.into(),
            affected_entry_id: None,
            detected_at: Utc::now(),
            recommendation: recommendation.into(),
            details: BTreeMap::new(),
            is_critical: severity == Severity::Critical,
        }
    }

    /// Synthetic violation standing in for an internal engine fault.
    pub fn internal_fault(context: &str, error: impl std::fmt::Display) -> Self {
        Self::new(
            ViolationType::DataIntegrity,
            Severity::Critical,
            format!("{} failed with an internal error: {}", context, error),
            "Investigate the engine failure and re-run the validation",
        )
        .with_detail("error", error.to_string())
    }

    /// Attach the affected entry id.
    pub fn with_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.affected_entry_id = Some(entry_id.into());
        self
    }

    /// Add a detail value.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.details.insert(key.into(), value.to_string());
        self
    }

    /// Set the detection time.
    pub fn detected_at(mut self, at: DateTime<Utc>) -> Self {
        self.detected_at = at;
        self
    }
}
