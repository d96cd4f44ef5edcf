//! Timeline completeness: day gaps, low-activity days and required event coverage.

use crate::config::CompletenessConfig;
use crate::validator::{run_guarded, AuditSnapshot, ComplianceValidator, ValidatorKind};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;
use vox_audit_types::{
    AuditEventType, AuditLogEntry, ComplianceResult, ComplianceViolation, ReportPeriod, Severity,
    ViolationType,
};

/// Checks that the trail has no silent stretches and covers the required events.
#[derive(Debug, Clone, Default)]
pub struct CompletenessValidator {
    config: CompletenessConfig,
}

impl CompletenessValidator {
    pub fn new(config: CompletenessConfig) -> Self {
        Self { config }
    }

    /// Validate the entries falling in `[start, end)`.
    pub fn validate_completeness(
        &self,
        entries: &[AuditLogEntry],
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ComplianceResult {
        self.validate_at(entries, ReportPeriod::new(start, end), Utc::now())
    }

    pub fn validate_at(
        &self,
        entries: &[AuditLogEntry],
        period: ReportPeriod,
        now: DateTime<Utc>,
    ) -> ComplianceResult {
        let in_period: Vec<&AuditLogEntry> = entries.iter().filter(|e| period.contains(e.timestamp)).collect();
        let kind = ValidatorKind::Completeness;

        run_guarded(kind, period, in_period.len(), now, || {
            let mut violations = self.check_timeline(&in_period, now);
            violations.extend(self.check_required_types(&in_period, now));
            debug!(
                entries = in_period.len(),
                violations = violations.len(),
                "Completeness validation complete"
            );
            Ok(ComplianceResult::from_violations(kind.name(), period, in_period.len(), violations, now))
        })
    }

    fn check_timeline(
        &self,
        entries: &[&AuditLogEntry],
        now: DateTime<Utc>,
    ) -> Vec<ComplianceViolation> {
        let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for entry in entries {
            *per_day.entry(entry.timestamp.date_naive()).or_default() += 1;
        }

        let days: Vec<(NaiveDate, usize)> = per_day.into_iter().collect();
        let mut violations = Vec::new();

        for pair in days.windows(2) {
            let (day, count) = pair[0];
            let (next_day, _) = pair[1];
            let gap = next_day.signed_duration_since(day).num_days();

            if gap > 1 {
                let missing = gap - 1;
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::MissingEntry,
                        Severity::High,
                        format!("No audit entries for {} day(s) between {} and {}", missing, day, next_day),
                        "Verify that audit logging was running and recover any lost records",
                    )
                    .with_detail("last_log_date", day)
                    .with_detail("next_log_date", next_day)
                    .with_detail("gap_days", missing)
                    .detected_at(now),
                );
            } else if gap == 1 && count < self.config.low_activity_threshold {
                violations.push(
                    ComplianceViolation::new(
                        ViolationType::SuspiciousPattern,
                        Severity::Medium,
                        format!("Unusually low activity on {}: {} entries", day, count),
                        "Confirm that audit logging was not interrupted on this day",
                    )
                    .with_detail("date", day)
                    .with_detail("entry_count", count)
                    .with_detail("threshold", self.config.low_activity_threshold)
                    .detected_at(now),
                );
            }
        }

        violations
    }

    fn check_required_types(&self, entries: &[&AuditLogEntry], now: DateTime<Utc>) -> Vec<ComplianceViolation> {
        // An empty period has nothing to cover.
        if entries.is_empty() {
            return Vec::new();
        }

        let present: HashSet<AuditEventType> = entries.iter().map(|e| e.event_type).collect();
        let mut reported = HashSet::new();

        self.config
            .required_event_types
            .iter()
            .copied()
            .filter(|t| !present.contains(t) && reported.insert(*t))
            .map(|missing| {
                ComplianceViolation::new(
                    ViolationType::MissingEntry,
                    Severity::Medium,
                    format!("No {} events recorded in the period", missing),
                    format!("Ensure {} events are being audited", missing),
                )
                .with_detail("event_type", missing)
                .detected_at(now)
            })
            .collect()
    }
}

impl ComplianceValidator for CompletenessValidator {
    fn kind(&self) -> ValidatorKind {
        ValidatorKind::Completeness
    }

    fn validate(&self, snapshot: &AuditSnapshot) -> ComplianceResult {
        self.validate_at(&snapshot.entries, snapshot.period, snapshot.captured_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use vox_audit_types::ComplianceLevel;
    use vox_test_utils::{day, fixed_now, EntryFactory};

    fn validate(entries: &[AuditLogEntry]) -> ComplianceResult {
        CompletenessValidator::default().validate_at(entries, ReportPeriod::default(), fixed_now())
    }

    fn kinds(result: &ComplianceResult, violation_type: ViolationType) -> Vec<&ComplianceViolation> {
        result.violations.iter().filter(|v| v.violation_type == violation_type).collect()
    }

    #[test]
    fn test_empty_period_is_compliant() {
        let result = validate(&[]);
        assert!(result.is_compliant);
        assert_eq!(result.overall_level, ComplianceLevel::FullyCompliant);
    }

    #[test]
    fn test_busy_consecutive_days_are_compliant() {
        let mut factory = EntryFactory::new();
        let mut entries = factory.busy_day(day(3), 12);
        entries.extend(factory.busy_day(day(2), 12));
        entries.extend(factory.busy_day(day(1), 12));
        let result = validate(&entries);
        assert!(result.is_compliant, "{:?}", result.violations);
    }

    #[test]
    fn test_gap_reports_missing_days() {
        let mut factory = EntryFactory::new();
        let mut entries = factory.busy_day(day(10), 12);
        entries.extend(factory.busy_day(day(9), 12));
        entries.extend(factory.busy_day(day(5), 12));

        let result = validate(&entries);
        let missing = kinds(&result, ViolationType::MissingEntry);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].severity, Severity::High);
        assert_eq!(missing[0].details["gap_days"], "3");
        assert_eq!(missing[0].details["last_log_date"], day(9).date_naive().to_string());
        assert_eq!(missing[0].details["next_log_date"], day(5).date_naive().to_string());
        assert_eq!(result.overall_level, ComplianceLevel::PartiallyCompliant);
    }

    #[test_case(9 => 1 ; "below threshold")]
    #[test_case(10 => 0 ; "at threshold")]
    fn test_low_activity_threshold(count: usize) -> usize {
        let mut factory = EntryFactory::new();
        let mut entries = factory.busy_day(day(2), count);
        entries.extend(factory.busy_day(day(1), 12));
        kinds(&validate(&entries), ViolationType::SuspiciousPattern).len()
    }

    #[test]
    fn test_last_day_is_not_judged_for_low_activity() {
        let mut factory = EntryFactory::new();
        let mut entries = factory.busy_day(day(2), 12);
        entries.extend(factory.busy_day(day(1), 5));
        assert!(validate(&entries).is_compliant);
    }

    #[test]
    fn test_missing_required_types() {
        let mut factory = EntryFactory::new();
        let entries = vec![
            factory.entry(AuditEventType::Login, "u", day(1)),
            factory.entry(AuditEventType::Logout, "u", day(1)),
        ];
        let result = validate(&entries);
        let missing = kinds(&result, ViolationType::MissingEntry);
        assert_eq!(missing.len(), 3);
        assert!(missing.iter().all(|v| v.severity == Severity::Medium));
        assert!(missing.iter().any(|v| v.details["event_type"] == "api_key_accessed"));
        assert_eq!(result.overall_level, ComplianceLevel::MostlyCompliant);
    }

    #[test]
    fn test_configured_required_types() {
        let validator = CompletenessValidator::new(CompletenessConfig {
            required_event_types: vec![AuditEventType::DataExported],
            ..CompletenessConfig::default()
        });
        let mut factory = EntryFactory::new();
        let entries = vec![factory.entry(AuditEventType::DataExported, "u", day(1))];
        assert!(validator.validate_at(&entries, ReportPeriod::default(), fixed_now()).is_compliant);
    }

    #[test]
    fn test_validate_completeness_wall_clock() {
        let result = CompletenessValidator::default().validate_completeness(&[], None, None);
        assert!(result.is_compliant);
        assert_eq!(result.overall_level, ComplianceLevel::FullyCompliant);
        assert_eq!(result.validator, "Completeness validation");
    }
}
