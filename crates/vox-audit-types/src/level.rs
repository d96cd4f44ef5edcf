//! Compliance levels and the decision tables that produce them.

use crate::{ComplianceResult, ComplianceViolation, Severity};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Verdict for a validator or a whole reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceLevel {
    NonCompliant,
    PartiallyCompliant,
    MostlyCompliant,
    FullyCompliant,
}

/// High violations tolerated before a validator is non-compliant.
const MAX_HIGH_BEFORE_NON_COMPLIANT: usize = 5;
/// Medium violations tolerated before a validator is partially compliant.
const MAX_MEDIUM_BEFORE_PARTIAL: usize = 10;

impl ComplianceLevel {
    /// Level for a single validator's violations.
    pub fn from_violations(violations: &[ComplianceViolation]) -> Self {
        if violations.iter().any(|v| v.is_critical) {
            return Self::NonCompliant;
        }

        let count = |severity: Severity| violations.iter().filter(|v| v.severity == severity).count();
        let critical = count(Severity::Critical);
        let high = count(Severity::High);
        let medium = count(Severity::Medium);

        if critical > 0 || high > MAX_HIGH_BEFORE_NON_COMPLIANT {
            Self::NonCompliant
        } else if high > 0 || medium > MAX_MEDIUM_BEFORE_PARTIAL {
            Self::PartiallyCompliant
        } else if medium > 0 {
            Self::MostlyCompliant
        } else {
            Self::FullyCompliant
        }
    }

    /// Overall level across validator results.
    ///
    /// Any Critical violation makes the period non-compliant; otherwise the
    /// level drops one step per non-compliant validator.
    pub fn overall<'a>(results: impl IntoIterator<Item = &'a ComplianceResult>) -> Self {
        let mut failing = 0usize;
        for result in results {
            if result.violations.iter().any(|v| v.severity == Severity::Critical) {
                return Self::NonCompliant;
            }
            if !result.is_compliant {
                failing += 1;
            }
        }

        match failing {
            0 => Self::FullyCompliant,
            1 => Self::MostlyCompliant,
            2 => Self::PartiallyCompliant,
            _ => Self::NonCompliant,
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NonCompliant => "Non-Compliant",
            Self::PartiallyCompliant => "Partially Compliant",
            Self::MostlyCompliant => "Mostly Compliant",
            Self::FullyCompliant => "Fully Compliant",
        }
    }
}
