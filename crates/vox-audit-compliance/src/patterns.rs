//! Heuristic detection of attack-shaped activity in security telemetry.

use crate::config::{PatternConfig, RapidSuccessionMode};
use chrono::{DateTime, Duration, DurationRound, FixedOffset, Timelike, Utc};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use vox_audit_types::{AuditEventType, AuditLogEntry, PatternType, Severity, SuspiciousPattern};

/// Runs the brute force, off-hours and rapid succession detectors.
#[derive(Debug, Clone, Default)]
pub struct SuspiciousPatternDetector {
    config: PatternConfig,
}

impl SuspiciousPatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// All detected patterns, brute force first, then off-hours, then rapid succession.
    pub fn detect_patterns(&self, entries: &[AuditLogEntry]) -> Vec<SuspiciousPattern> {
        let mut patterns = self.detect_brute_force(entries);
        patterns.extend(self.detect_off_hours(entries));
        patterns.extend(self.detect_rapid_succession(entries));
        debug!(entries = entries.len(), patterns = patterns.len(), "Pattern detection complete");
        patterns
    }

    /// Repeated authentication failures for one user within one clock hour.
    pub fn detect_brute_force(&self, entries: &[AuditLogEntry]) -> Vec<SuspiciousPattern> {
        let mut groups: BTreeMap<(DateTime<Utc>, &str), Vec<&AuditLogEntry>> = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.event_type == AuditEventType::AuthenticationFailed) {
            let Ok(bucket) = entry.timestamp.duration_trunc(Duration::hours(1)) else {
                continue;
            };
            groups.entry((bucket, entry.user_id.as_str())).or_default().push(entry);
        }

        groups
            .into_iter()
            .filter(|(_, group)| group.len() >= self.config.brute_force_threshold)
            .filter_map(|((bucket, user_id), group)| {
                let window = span(&group)?;
                Some(
                    SuspiciousPattern::new(
                        PatternType::BruteForceAttempt,
                        Severity::High,
                        format!(
                            "{} failed authentication attempts for user {} within one hour",
                            group.len(),
                            user_id
                        ),
                        window,
                        ids(&group),
                        "Lock the account and notify the user and security team",
                    )
                    .with_detail("user_id", user_id)
                    .with_detail("hour_bucket", bucket.to_rfc3339())
                    .with_detail("threshold", self.config.brute_force_threshold),
                )
            })
            .collect()
    }

    /// Logins outside business hours, per user.
    pub fn detect_off_hours(&self, entries: &[AuditLogEntry]) -> Vec<SuspiciousPattern> {
        let Some(offset) = self
            .config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
        else {
            warn!(offset = self.config.utc_offset_minutes, "Invalid UTC offset; skipping off-hours detection");
            return Vec::new();
        };

        let mut groups: BTreeMap<&str, Vec<&AuditLogEntry>> = BTreeMap::new();
        for entry in entries.iter().filter(|e| e.event_type == AuditEventType::Login) {
            let hour = entry.timestamp.with_timezone(&offset).hour();
            if hour < self.config.off_hours_start || hour > self.config.off_hours_end {
                groups.entry(entry.user_id.as_str()).or_default().push(entry);
            }
        }

        groups
            .into_iter()
            .filter(|(_, group)| group.len() >= self.config.off_hours_threshold)
            .filter_map(|(user_id, group)| {
                let window = span(&group)?;
                Some(
                    SuspiciousPattern::new(
                        PatternType::OffHoursActivity,
                        Severity::Medium,
                        format!("{} off-hours logins for user {}", group.len(), user_id),
                        window,
                        ids(&group),
                        "Confirm the off-hours access with the user",
                    )
                    .with_detail("user_id", user_id)
                    .with_detail(
                        "business_hours",
                        format!("{:02}:00-{:02}:59", self.config.off_hours_start, self.config.off_hours_end),
                    ),
                )
            })
            .collect()
    }

    /// Bursts of security events: `rapid_window_size` consecutive events
    /// spanning at most `rapid_window_secs`.
    pub fn detect_rapid_succession(&self, entries: &[AuditLogEntry]) -> Vec<SuspiciousPattern> {
        let size = self.config.rapid_window_size;
        let Some(limit) = Duration::try_seconds(self.config.rapid_window_secs) else {
            warn!(secs = self.config.rapid_window_secs, "Invalid rapid succession window; skipping");
            return Vec::new();
        };
        if size < 2 {
            return Vec::new();
        }

        let mut events: Vec<&AuditLogEntry> = entries.iter().filter(|e| e.event_type.is_security_relevant()).collect();
        events.sort_by(|a, b| a.chain_order(b));

        let qualifying: Vec<usize> = (0..events.len().saturating_sub(size - 1))
            .filter(|&i| events[i + size - 1].timestamp - events[i].timestamp <= limit)
            .collect();

        let ranges: Vec<(usize, usize)> = match self.config.rapid_mode {
            RapidSuccessionMode::Overlapping => qualifying.iter().map(|&i| (i, i + size)).collect(),
            RapidSuccessionMode::Merged => {
                let mut merged: Vec<(usize, usize)> = Vec::new();
                for &i in &qualifying {
                    match merged.last_mut() {
                        Some((_, end)) if i < *end => *end = i + size,
                        _ => merged.push((i, i + size)),
                    }
                }
                merged
            }
        };

        ranges
            .into_iter()
            .filter_map(|(start, end)| {
                let group = &events[start..end];
                let window = span(group)?;
                let seconds = (window.1 - window.0).num_seconds();
                Some(
                    SuspiciousPattern::new(
                        PatternType::RapidSuccessionEvents,
                        Severity::Medium,
                        format!("{} security events within {} seconds", group.len(), seconds),
                        window,
                        ids(group),
                        "Review the burst for automated or scripted activity",
                    )
                    .with_detail("span_seconds", seconds)
                    .with_detail("window_size", size),
                )
            })
            .collect()
    }
}

fn span(group: &[&AuditLogEntry]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let first = group.iter().map(|e| e.timestamp).min()?;
    let last = group.iter().map(|e| e.timestamp).max()?;
    Some((first, last))
}

fn ids(group: &[&AuditLogEntry]) -> Vec<String> {
    group.iter().map(|e| e.id.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;
    use vox_test_utils::{day, EntryFactory};

    fn failures(factory: &mut EntryFactory, user: &str, start: DateTime<Utc>, count: i64) -> Vec<AuditLogEntry> {
        (0..count)
            .map(|i| factory.entry(AuditEventType::AuthenticationFailed, user, start + Duration::minutes(i * 10)))
            .collect()
    }

    #[test_case(5 => 1 ; "at threshold")]
    #[test_case(4 => 0 ; "below threshold")]
    fn test_brute_force_threshold(count: i64) -> usize {
        let mut factory = EntryFactory::new();
        let entries = failures(&mut factory, "u1", day(1) + Duration::hours(10), count);
        let patterns = SuspiciousPatternDetector::default().detect_brute_force(&entries);
        if let Some(pattern) = patterns.first() {
            assert_eq!(pattern.occurrence_count, 5);
            assert_eq!(pattern.severity, Severity::High);
            assert_eq!(pattern.first_occurrence, entries[0].timestamp);
            assert_eq!(pattern.last_occurrence, entries[4].timestamp);
        }
        patterns.len()
    }

    #[test]
    fn test_brute_force_groups_by_hour_and_user() {
        let mut factory = EntryFactory::new();
        // Three in the 10:00 bucket and three in the 11:00 bucket.
        let mut entries = failures(&mut factory, "u1", day(1) + Duration::minutes(10 * 60 + 30), 6);
        entries.extend(failures(&mut factory, "u2", day(1) + Duration::hours(10), 4));
        assert!(SuspiciousPatternDetector::default().detect_brute_force(&entries).is_empty());
    }

    #[test]
    fn test_off_hours_logins() {
        let mut factory = EntryFactory::new();
        let entries = vec![
            factory.entry(AuditEventType::Login, "night", day(3) + Duration::hours(2)),
            factory.entry(AuditEventType::Login, "night", day(2) + Duration::hours(23)),
            factory.entry(AuditEventType::Login, "night", day(1) + Duration::hours(5)),
            factory.entry(AuditEventType::Login, "day", day(1) + Duration::hours(6)),
            factory.entry(AuditEventType::Login, "day", day(1) + Duration::hours(22)),
            factory.entry(AuditEventType::Login, "day", day(2) + Duration::hours(12)),
        ];
        let patterns = SuspiciousPatternDetector::default().detect_off_hours(&entries);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].pattern_type, PatternType::OffHoursActivity);
        assert_eq!(patterns[0].pattern_details["user_id"], "night");
        assert_eq!(patterns[0].occurrence_count, 3);
    }

    #[test]
    fn test_off_hours_uses_local_offset() {
        let mut factory = EntryFactory::new();
        // 12:00 UTC is 01:00 at UTC+13.
        let entries: Vec<_> = (1..=3)
            .map(|d| factory.entry(AuditEventType::Login, "u", day(d) + Duration::hours(12)))
            .collect();
        let utc = SuspiciousPatternDetector::default();
        assert!(utc.detect_off_hours(&entries).is_empty());

        let shifted = SuspiciousPatternDetector::new(PatternConfig {
            utc_offset_minutes: 13 * 60,
            ..PatternConfig::default()
        });
        assert_eq!(shifted.detect_off_hours(&entries).len(), 1);
    }

    fn burst(count: i64, step_secs: i64) -> Vec<AuditLogEntry> {
        let mut factory = EntryFactory::new();
        (0..count)
            .map(|i| factory.entry(AuditEventType::Login, "u", day(1) + Duration::seconds(i * step_secs)))
            .collect()
    }

    #[test]
    fn test_rapid_succession_overlapping_windows() {
        let detector = SuspiciousPatternDetector::default();
        assert_eq!(detector.detect_rapid_succession(&burst(5, 15)).len(), 1);
        assert_eq!(detector.detect_rapid_succession(&burst(7, 10)).len(), 3);
        assert!(detector.detect_rapid_succession(&burst(4, 1)).is_empty());
        // 5 events spanning 64 seconds.
        assert!(detector.detect_rapid_succession(&burst(5, 16)).is_empty());
    }

    #[test]
    fn test_rapid_succession_merged_windows() {
        let detector = SuspiciousPatternDetector::new(PatternConfig {
            rapid_mode: RapidSuccessionMode::Merged,
            ..PatternConfig::default()
        });
        let patterns = detector.detect_rapid_succession(&burst(7, 10));
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrence_count, 7);
    }

    #[test]
    fn test_rapid_succession_ignores_non_security_events() {
        let mut factory = EntryFactory::new();
        let entries: Vec<_> = (0..10)
            .map(|i| factory.entry(AuditEventType::DictationCompleted, "u", day(1) + Duration::seconds(i)))
            .collect();
        assert!(SuspiciousPatternDetector::default().detect_rapid_succession(&entries).is_empty());
    }

    #[test]
    fn test_rapid_succession_sorts_input() {
        let mut entries = burst(5, 10);
        entries.reverse();
        let patterns = SuspiciousPatternDetector::default().detect_rapid_succession(&entries);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].affected_entry_ids[0], "e00000");
    }

    #[test]
    fn test_detect_patterns_empty() {
        assert!(SuspiciousPatternDetector::default().detect_patterns(&[]).is_empty());
    }
}
