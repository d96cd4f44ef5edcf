//! Heuristically detected attack shapes.

use crate::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::Display;

/// Kind of suspicious pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PatternType {
    BruteForceAttempt,
    OffHoursActivity,
    RapidSuccessionEvents,
}

/// A cluster of events resembling a known attack shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspiciousPattern {
    /// Random UUID assigned at detection.
    pub id: String,
    /// Which detector matched.
    pub pattern_type: PatternType,
    /// Severity fixed per pattern type.
    pub severity: Severity,
    /// Human-readable summary of the cluster.
    pub description: String,
    /// Timestamp of the earliest matched entry.
    pub first_occurrence: DateTime<Utc>,
    /// Timestamp of the latest matched entry.
    pub last_occurrence: DateTime<Utc>,
    /// Number of matched entries.
    pub occurrence_count: usize,
    /// Ids of the matched entries in detection order.
    pub affected_entry_ids: Vec<String>,
    /// Detector-specific context such as the user or hour bucket.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub pattern_details: BTreeMap<String, String>,
    /// Suggested response.
    pub recommendation: String,
}

impl SuspiciousPattern {
    /// Create a pattern spanning the given occurrence window.
    pub fn new(
        pattern_type: PatternType,
        severity: Severity,
        description: impl Into<String>,
        window: (DateTime<Utc>, DateTime<Utc>),
        affected_entry_ids: Vec<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pattern_type,
            severity,
            description: description.into(),
            first_occurrence: window.0,
            last_occurrence: window.1,
            occurrence_count: affected_entry_ids.len(),
            affected_entry_ids,
            pattern_details: BTreeMap::new(),
            recommendation: recommendation.into(),
        }
    }

    /// Add a detail value.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pattern_details.insert(key.into(), value.to_string());
        self
    }
}
