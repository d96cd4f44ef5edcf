//! Cryptographic hash chain for audit integrity.

use crate::hash::{compute_entry_hash, hash_matches};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use vox_audit_types::{AuditLogEntry, ChainBreak, HashChainValidationResult, Severity};

/// Metadata key holding the predecessor's digest.
const PREVIOUS_HASH_KEY: &str = "previousHash";
const PREVIOUS_HASH_ALIAS: &str = "previous_hash";

/// Read the predecessor digest recorded in an entry's metadata.
///
/// `Ok(None)` when the entry has no metadata or predates chain-linking;
/// `Err` when metadata is present but not valid JSON. A non-string value is
/// returned in its JSON text form so that it can never match a digest.
pub fn linked_previous_hash(entry: &AuditLogEntry) -> Result<Option<String>, serde_json::Error> {
    let Some(raw) = entry.metadata.as_deref() else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_json::from_str(raw)?;
    let link = value
        .get(PREVIOUS_HASH_KEY)
        .or_else(|| value.get(PREVIOUS_HASH_ALIAS));

    Ok(link.map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }))
}

/// Verifies recomputed digests and predecessor links over a snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Create a verifier.
    pub fn new() -> Self {
        Self
    }

    /// Verify the chain formed by `entries`, in any input order.
    pub fn verify_chain(&self, entries: &[AuditLogEntry]) -> HashChainValidationResult {
        self.verify_chain_at(entries, Utc::now())
    }

    /// Verify with an explicit verification instant.
    pub fn verify_chain_at(
        &self,
        entries: &[AuditLogEntry],
        verified_at: DateTime<Utc>,
    ) -> HashChainValidationResult {
        let mut ordered: Vec<&AuditLogEntry> = entries.iter().collect();
        if !ordered.windows(2).all(|w| w[0].chain_order(w[1]).is_le()) {
            ordered.sort_by(|a, b| a.chain_order(b));
        }

        let mut breaks = Vec::new();

        for (position, entry) in ordered.iter().enumerate() {
            let expected = compute_entry_hash(entry);
            if !hash_matches(&expected, &entry.integrity_hash) {
                breaks.push(ChainBreak {
                    entry_id: entry.id.clone(),
                    position,
                    expected_hash: expected,
                    actual_hash: entry.integrity_hash.clone(),
                    severity: Severity::Critical,
                    reason: "integrity hash mismatch".to_string(),
                });
            }

            if position == 0 {
                continue;
            }
            let previous = ordered[position - 1];

            match linked_previous_hash(entry) {
                Ok(Some(link)) if !hash_matches(&previous.integrity_hash, &link) => {
                    breaks.push(ChainBreak {
                        entry_id: entry.id.clone(),
                        position,
                        expected_hash: previous.integrity_hash.clone(),
                        actual_hash: link,
                        severity: Severity::Critical,
                        reason: format!("chain link broken: predecessor is {}", previous.id),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    breaks.push(ChainBreak {
                        entry_id: entry.id.clone(),
                        position,
                        expected_hash: previous.integrity_hash.clone(),
                        actual_hash: String::new(),
                        severity: Severity::High,
                        reason: format!("possible tampering: invalid metadata ({})", e),
                    });
                }
            }
        }

        if breaks.is_empty() {
            debug!(entries = ordered.len(), "Hash chain verified");
        } else {
            warn!(entries = ordered.len(), breaks = breaks.len(), "Hash chain broken");
        }

        let head = ordered.last().map(|e| e.integrity_hash.clone());
        HashChainValidationResult::new(ordered.len(), breaks, head, verified_at)
    }
}

/// Seals entries the way the audit writer does at append time: computes the
/// digest and records the predecessor's digest in metadata.
#[derive(Debug, Clone, Default)]
pub struct ChainSealer {
    head: Option<String>,
}

impl ChainSealer {
    /// Start a new chain.
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Continue an existing chain whose last digest is `head`.
    pub fn resume(head: impl Into<String>) -> Self {
        Self {
            head: Some(head.into()),
        }
    }

    /// Digest of the most recently sealed entry.
    pub fn head(&self) -> Option<&str> {
        self.head.as_deref()
    }

    /// Seal one entry as the next link.
    pub fn seal(&mut self, mut entry: AuditLogEntry) -> Result<AuditLogEntry, ChainError> {
        if let Some(previous) = &self.head {
            let mut map = match entry.metadata.as_deref().map(str::trim) {
                None | Some("") => Map::new(),
                Some(raw) => match serde_json::from_str::<Value>(raw) {
                    Ok(Value::Object(map)) => map,
                    Ok(_) => {
                        return Err(ChainError::MetadataNotObject {
                            entry_id: entry.id.clone(),
                        })
                    }
                    Err(source) => {
                        return Err(ChainError::InvalidMetadata {
                            entry_id: entry.id.clone(),
                            source,
                        })
                    }
                },
            };
            map.insert(PREVIOUS_HASH_KEY.to_string(), Value::String(previous.clone()));
            entry.metadata = Some(Value::Object(map).to_string());
        }

        entry.integrity_hash = compute_entry_hash(&entry);
        self.head = Some(entry.integrity_hash.clone());
        Ok(entry)
    }

    /// Seal a batch in chain order.
    pub fn seal_all(
        &mut self,
        mut entries: Vec<AuditLogEntry>,
    ) -> Result<Vec<AuditLogEntry>, ChainError> {
        entries.sort_by(|a, b| a.chain_order(b));
        entries.into_iter().map(|e| self.seal(e)).collect()
    }
}

/// Chain sealing error.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("metadata of entry {entry_id} is not a JSON object")]
    MetadataNotObject { entry_id: String },
    #[error("metadata of entry {entry_id} is not valid JSON: {source}")]
    InvalidMetadata {
        entry_id: String,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use vox_audit_types::AuditEventType;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap()
    }

    fn unsealed(n: usize) -> Vec<AuditLogEntry> {
        (0..n)
            .map(|i| {
                AuditLogEntry::builder(AuditEventType::DictationCompleted, "user-1")
                    .id(format!("e{:03}", i))
                    .timestamp(base() + Duration::minutes(i as i64))
                    .description(format!("dictation {}", i))
                    .build()
            })
            .collect()
    }

    fn sealed(n: usize) -> Vec<AuditLogEntry> {
        ChainSealer::new().seal_all(unsealed(n)).unwrap()
    }

    #[test]
    fn test_empty_chain_is_valid() {
        let result = HashChainVerifier::new().verify_chain(&[]);
        assert!(result.is_valid);
        assert_eq!(result.entries_verified, 0);
        assert!(result.chain_head.is_none());
    }

    #[test]
    fn test_sealed_chain_links_predecessors() {
        let chain = sealed(3);
        assert!(chain[0].metadata.is_none());
        assert_eq!(
            linked_previous_hash(&chain[1]).unwrap().as_deref(),
            Some(chain[0].integrity_hash.as_str())
        );
        assert_eq!(
            linked_previous_hash(&chain[2]).unwrap().as_deref(),
            Some(chain[1].integrity_hash.as_str())
        );
    }

    #[test]
    fn test_unsorted_input_is_verified_in_chain_order() {
        let mut chain = sealed(5);
        chain.reverse();
        let result = HashChainVerifier::new().verify_chain(&chain);
        assert!(result.is_valid, "breaks: {:?}", result.breaks);
        assert_eq!(result.chain_head.as_deref(), Some(chain[0].integrity_hash.as_str()));
    }

    #[test]
    fn test_tampered_description_breaks_only_that_entry() {
        let mut chain = sealed(5);
        chain[2].description = "rewritten".into();

        let result = HashChainVerifier::new().verify_chain(&chain);
        assert!(!result.is_valid);
        assert_eq!(result.breaks.len(), 1);
        assert_eq!(result.breaks[0].entry_id, "e002");
        assert_eq!(result.breaks[0].severity, Severity::Critical);
        assert_eq!(result.breaks[0].position, 2);
    }

    #[test]
    fn test_rehashed_tamper_breaks_successor_link() {
        let mut chain = sealed(4);
        chain[1].description = "rewritten".into();
        chain[1].integrity_hash = compute_entry_hash(&chain[1]);

        let result = HashChainVerifier::new().verify_chain(&chain);
        assert_eq!(result.breaks.len(), 1);
        assert_eq!(result.breaks[0].entry_id, "e002");
        assert!(result.breaks[0].reason.starts_with("chain link broken"));
    }

    #[test]
    fn test_invalid_metadata_is_high_break() {
        let mut chain = sealed(3);
        chain[2].metadata = Some("{not json".into());

        let result = HashChainVerifier::new().verify_chain(&chain);
        assert_eq!(result.breaks.len(), 1);
        assert_eq!(result.breaks[0].severity, Severity::High);
        assert!(result.breaks[0].reason.contains("invalid metadata"));
    }

    #[test]
    fn test_invalid_metadata_on_first_entry_is_not_checked() {
        let mut chain = sealed(2);
        chain[0].metadata = Some("{not json".into());
        assert!(HashChainVerifier::new().verify_chain(&chain).is_valid);
    }

    #[test]
    fn test_pre_chain_entries_without_links_are_valid() {
        let entries: Vec<_> = unsealed(3)
            .into_iter()
            .map(|mut e| {
                e.integrity_hash = compute_entry_hash(&e);
                e
            })
            .collect();
        assert!(HashChainVerifier::new().verify_chain(&entries).is_valid);
    }

    #[test]
    fn test_non_string_link_never_matches() {
        let mut chain = sealed(2);
        chain[1].metadata = Some("{\"previousHash\": 42}".into());
        let result = HashChainVerifier::new().verify_chain(&chain);
        assert_eq!(result.breaks.len(), 1);
        assert_eq!(result.breaks[0].actual_hash, "42");
    }

    #[test]
    fn test_alias_key_is_accepted() {
        let mut entry = unsealed(1).remove(0);
        entry.metadata = Some("{\"previous_hash\":\"abc\"}".into());
        assert_eq!(linked_previous_hash(&entry).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_seal_preserves_existing_metadata() {
        let mut sealer = ChainSealer::resume("abc");
        let entry = AuditLogEntry::builder(AuditEventType::Login, "u")
            .metadata(serde_json::json!({ "ip": "10.0.0.1" }))
            .build();
        let sealed = sealer.seal(entry).unwrap();
        let meta: Value = serde_json::from_str(sealed.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(meta["ip"], "10.0.0.1");
        assert_eq!(meta["previousHash"], "abc");
        assert_eq!(sealer.head(), Some(sealed.integrity_hash.as_str()));
    }

    #[test]
    fn test_seal_rejects_non_object_metadata() {
        let mut sealer = ChainSealer::resume("abc");
        let entry = AuditLogEntry::builder(AuditEventType::Login, "u")
            .metadata_raw("[1,2]")
            .build();
        assert!(matches!(sealer.seal(entry), Err(ChainError::MetadataNotObject { .. })));
    }

    proptest! {
        #[test]
        fn test_sealed_chain_round_trip(n in 0usize..40) {
            let result = HashChainVerifier::new().verify_chain(&sealed(n));
            prop_assert!(result.is_valid);
            prop_assert!(result.breaks.is_empty());
            prop_assert_eq!(result.entries_verified, n);
        }

        #[test]
        fn test_single_tamper_is_attributed(n in 2usize..20, pick in 0usize..20) {
            let mut chain = sealed(n);
            let target = pick % n;
            chain[target].description.push_str(" (edited)");
            let result = HashChainVerifier::new().verify_chain(&chain);
            prop_assert_eq!(result.breaks.len(), 1);
            prop_assert_eq!(&result.breaks[0].entry_id, &chain[target].id);
        }
    }
}
