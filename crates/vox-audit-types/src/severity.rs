//! Severity levels shared by violations, chain breaks, and patterns.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Severity of a detected issue.
/// Variants are declared from least to most severe; the derived ordering
/// depends on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Informational finding worth recording.
    Low,
    /// Finding that warrants review.
    Medium,
    /// Finding that requires prompt review.
    High,
    /// Integrity-threatening finding.
    Critical,
}
