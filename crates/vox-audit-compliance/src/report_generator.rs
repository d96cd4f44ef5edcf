//! Compliance report generation.

use crate::completeness::CompletenessValidator;
use crate::config::{EngineConfig, ReportConfig};
use crate::error::{ReportError, ValidationError};
use crate::integrity::IntegrityValidator;
use crate::patterns::SuspiciousPatternDetector;
use crate::retention::RetentionPolicyValidator;
use crate::store::{AuditLogStore, AuditQuery};
use crate::validator::{catch_panic, days_before, AuditSnapshot, ComplianceValidator, ValidatorKind};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use vox_audit_immutability::HashChainVerifier;
use vox_audit_types::{
    ComplianceLevel, ComplianceReport, ComplianceResult, HashChainValidationResult, ReportPeriod,
    Severity, SuspiciousPattern,
};

/// Outputs of the five independent checks.
struct CheckOutputs {
    integrity: ComplianceResult,
    completeness: ComplianceResult,
    retention: ComplianceResult,
    hash_chain: HashChainValidationResult,
    patterns: Vec<SuspiciousPattern>,
}

/// Orchestrates the validators over one store snapshot.
pub struct ComplianceReportGenerator {
    store: Arc<dyn AuditLogStore>,
    integrity: Arc<dyn ComplianceValidator>,
    completeness: Arc<dyn ComplianceValidator>,
    retention: Arc<dyn ComplianceValidator>,
    retention_policy: RetentionPolicyValidator,
    chain_verifier: HashChainVerifier,
    pattern_detector: Arc<SuspiciousPatternDetector>,
    config: ReportConfig,
}

impl ComplianceReportGenerator {
    /// Create a generator with the built-in validators.
    pub fn new(store: Arc<dyn AuditLogStore>, config: EngineConfig) -> Self {
        let retention_policy = RetentionPolicyValidator::new(config.retention.clone());
        Self {
            store,
            integrity: Arc::new(IntegrityValidator::new(config.integrity)),
            completeness: Arc::new(CompletenessValidator::new(config.completeness)),
            retention: Arc::new(retention_policy.clone()),
            retention_policy,
            chain_verifier: HashChainVerifier::new(),
            pattern_detector: Arc::new(SuspiciousPatternDetector::new(config.patterns)),
            config: config.report,
        }
    }

    /// Replace the validator filling `validator.kind()`'s slot.
    pub fn with_validator(mut self, validator: Arc<dyn ComplianceValidator>) -> Self {
        match validator.kind() {
            ValidatorKind::Integrity => self.integrity = validator,
            ValidatorKind::Completeness => self.completeness = validator,
            ValidatorKind::Retention => self.retention = validator,
        }
        self
    }

    /// Generate a report for `[start, end)`. Never fails: orchestration
    /// errors yield a non-compliant report explaining the failure.
    #[instrument(skip(self))]
    pub async fn generate_report(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> ComplianceReport {
        let captured_at = Utc::now();
        let period = match self.resolve_period(start, end, captured_at) {
            Ok(period) => period,
            Err(e) => return self.failed_report(ReportPeriod::new(start, end), captured_at, &e),
        };

        match self.try_generate(period, captured_at).await {
            Ok(report) => report,
            Err(e) => self.failed_report(period, captured_at, &e),
        }
    }

    /// Generate a report from a snapshot the caller already holds.
    pub fn generate_report_from_snapshot(&self, snapshot: &AuditSnapshot) -> ComplianceReport {
        match catch_panic(|| self.run_checks(snapshot)) {
            Ok(outputs) => self.assemble(snapshot, outputs),
            Err(panic) => self.failed_report(
                snapshot.period,
                snapshot.captured_at,
                &ReportError::from(ValidationError::Panicked(panic)),
            ),
        }
    }

    /// Fetch the working set for `period` from the store.
    pub async fn fetch_snapshot(
        &self,
        period: ReportPeriod,
        captured_at: DateTime<Utc>,
    ) -> Result<AuditSnapshot, ReportError> {
        let window = self.retention_policy.sample_window(captured_at)?;
        let entries_query = AuditQuery::between(period.start, period.end);
        let sample_query = AuditQuery::between(window.start, window.end);

        let (entries, statistics, sample) = tokio::try_join!(
            self.store.query(&entries_query),
            self.store.statistics(),
            self.store.query(&sample_query),
        )?;

        debug!(
            entries = entries.len(),
            total_entries = statistics.total_entries,
            sample = sample.len(),
            "Fetched audit snapshot"
        );

        Ok(AuditSnapshot::new(period, captured_at, entries)
            .with_statistics(statistics)
            .with_retention_sample(sample))
    }

    async fn try_generate(
        &self,
        period: ReportPeriod,
        captured_at: DateTime<Utc>,
    ) -> Result<ComplianceReport, ReportError> {
        let snapshot = Arc::new(self.fetch_snapshot(period, captured_at).await?);

        let outputs = if self.config.parallel {
            self.run_checks_parallel(Arc::clone(&snapshot)).await?
        } else {
            catch_panic(|| self.run_checks(&snapshot))
                .map_err(|panic| ReportError::from(ValidationError::Panicked(panic)))?
        };

        Ok(self.assemble(&snapshot, outputs))
    }

    fn resolve_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        captured_at: DateTime<Utc>,
    ) -> Result<ReportPeriod, ReportError> {
        let end = end.unwrap_or(captured_at);
        let start = match start {
            Some(start) => start,
            None => days_before(end, self.config.default_period_days)?,
        };
        Ok(ReportPeriod::between(start, end))
    }

    fn run_checks(&self, snapshot: &AuditSnapshot) -> CheckOutputs {
        CheckOutputs {
            integrity: self.integrity.validate(snapshot),
            completeness: self.completeness.validate(snapshot),
            retention: self.retention.validate(snapshot),
            hash_chain: self.chain_verifier.verify_chain_at(&snapshot.entries, snapshot.captured_at),
            patterns: self.pattern_detector.detect_patterns(&snapshot.entries),
        }
    }

    async fn run_checks_parallel(&self, snapshot: Arc<AuditSnapshot>) -> Result<CheckOutputs, ReportError> {
        let validate = |validator: &Arc<dyn ComplianceValidator>| {
            let validator = Arc::clone(validator);
            let snapshot = Arc::clone(&snapshot);
            tokio::task::spawn_blocking(move || validator.validate(&snapshot))
        };
        let integrity = validate(&self.integrity);
        let completeness = validate(&self.completeness);
        let retention = validate(&self.retention);

        let verifier = self.chain_verifier;
        let chain_snapshot = Arc::clone(&snapshot);
        let hash_chain = tokio::task::spawn_blocking(move || {
            verifier.verify_chain_at(&chain_snapshot.entries, chain_snapshot.captured_at)
        });

        let detector = Arc::clone(&self.pattern_detector);
        let pattern_snapshot = Arc::clone(&snapshot);
        let patterns = tokio::task::spawn_blocking(move || detector.detect_patterns(&pattern_snapshot.entries));

        let (integrity, completeness, retention, hash_chain, patterns) =
            tokio::try_join!(integrity, completeness, retention, hash_chain, patterns)?;

        Ok(CheckOutputs {
            integrity,
            completeness,
            retention,
            hash_chain,
            patterns,
        })
    }

    fn assemble(&self, snapshot: &AuditSnapshot, outputs: CheckOutputs) -> ComplianceReport {
        let CheckOutputs {
            integrity,
            completeness,
            retention,
            hash_chain,
            patterns,
        } = outputs;

        let mut entries_by_event_type = BTreeMap::new();
        let mut entries_by_compliance_type = BTreeMap::new();
        for entry in &snapshot.entries {
            *entries_by_event_type.entry(entry.event_type).or_insert(0) += 1;
            *entries_by_compliance_type.entry(entry.compliance_type).or_insert(0) += 1;
        }

        let results = [&integrity, &completeness, &retention];
        let count = |severity: Severity| results.iter().map(|r| r.count_severity(severity)).sum::<usize>();
        let (critical, high, medium, low) = (
            count(Severity::Critical),
            count(Severity::High),
            count(Severity::Medium),
            count(Severity::Low),
        );
        let overall = ComplianceLevel::overall(results);

        let failing: Vec<&str> = results
            .iter()
            .copied()
            .filter(|r| !r.is_compliant)
            .map(|r| r.validator.as_str())
            .collect();
        let summary = format!(
            "{}: {} entries analysed, {} critical, {} high, {} medium and {} low violation(s); \
             failing checks: {}; hash chain {}; {} suspicious pattern(s) detected",
            overall.display_name(),
            snapshot.entries.len(),
            critical,
            high,
            medium,
            low,
            if failing.is_empty() { "none".to_string() } else { failing.join(", ") },
            if hash_chain.is_valid { "intact" } else { "broken" },
            patterns.len(),
        );
        let recommendations = recommendations(&results, &hash_chain, &patterns, critical);

        info!(
            overall = %overall.display_name(),
            critical,
            high,
            chain_valid = hash_chain.is_valid,
            patterns = patterns.len(),
            "Compliance report generated"
        );
        if !hash_chain.is_valid {
            warn!(
                breaks = hash_chain.breaks.len(),
                first_break = ?hash_chain.first_break_at,
                "Audit hash chain is broken"
            );
        }

        ComplianceReport {
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: snapshot.captured_at,
            period_start: snapshot.period.start,
            period_end: snapshot.period.end,
            total_entries: snapshot.entries.len(),
            entries_by_event_type,
            entries_by_compliance_type,
            integrity_validation: integrity,
            completeness_validation: completeness,
            retention_validation: retention,
            hash_chain_validation: hash_chain,
            suspicious_patterns: patterns,
            overall_compliance: overall,
            critical_violations: critical,
            high_violations: high,
            medium_violations: medium,
            low_violations: low,
            summary,
            recommendations,
        }
    }

    fn failed_report(&self, period: ReportPeriod, at: DateTime<Utc>, error: &ReportError) -> ComplianceReport {
        warn!(error = %error, "Compliance report generation failed; reporting non-compliant");

        let fault = |kind: ValidatorKind| ComplianceResult::internal_fault(kind.name(), period, 0, error, at);
        let integrity = fault(ValidatorKind::Integrity);
        let completeness = fault(ValidatorKind::Completeness);
        let retention = fault(ValidatorKind::Retention);
        let critical = [&integrity, &completeness, &retention]
            .iter()
            .map(|r| r.count_severity(Severity::Critical))
            .sum();

        ComplianceReport {
            id: uuid::Uuid::new_v4().to_string(),
            generated_at: at,
            period_start: period.start,
            period_end: period.end,
            total_entries: 0,
            entries_by_event_type: BTreeMap::new(),
            entries_by_compliance_type: BTreeMap::new(),
            integrity_validation: integrity,
            completeness_validation: completeness,
            retention_validation: retention,
            hash_chain_validation: HashChainValidationResult {
                is_valid: false,
                entries_verified: 0,
                breaks: Vec::new(),
                first_break_at: None,
                chain_head: None,
                verified_at: at,
            },
            suspicious_patterns: Vec::new(),
            overall_compliance: ComplianceLevel::NonCompliant,
            critical_violations: critical,
            high_violations: 0,
            medium_violations: 0,
            low_violations: 0,
            summary: format!("Compliance report generation failed: {}", error),
            recommendations: vec![
                "Resolve the report generation failure and re-run the compliance report".to_string(),
                "Treat this period as unverified until a complete report is produced".to_string(),
            ],
        }
    }
}

fn recommendations(
    results: &[&ComplianceResult; 3],
    hash_chain: &HashChainValidationResult,
    patterns: &[SuspiciousPattern],
    critical: usize,
) -> Vec<String> {
    let [integrity, completeness, retention] = *results;
    let mut out = Vec::new();

    if critical > 0 {
        out.push(format!("Escalate {} critical violation(s) for immediate review", critical));
    }
    if !integrity.is_compliant {
        out.push("Investigate integrity violations and restore tampered entries from a trusted backup".to_string());
    }
    if !completeness.is_compliant {
        out.push("Review gaps in the audit trail and confirm audit logging is continuously enabled".to_string());
    }
    if !retention.is_compliant {
        out.push("Review the retention policy: purge expired entries and verify long-term storage".to_string());
    }
    if !hash_chain.is_valid {
        let at = hash_chain.first_break_at.as_deref().unwrap_or("an unknown entry");
        out.push(format!(
            "Hash chain broken at {}: treat the log as potentially tampered and begin incident response",
            at
        ));
    }
    if !patterns.is_empty() {
        out.push(format!(
            "Investigate {} suspicious pattern(s) in security activity",
            patterns.len()
        ));
    }
    if out.is_empty() {
        out.push("Continue monitoring audit log integrity and compliance".to_string());
    }

    out
}
