//! Entry digest computation.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use vox_audit_types::AuditLogEntry;

/// Timestamp form that enters the digest: RFC 3339, millisecond precision,
/// `Z` suffix.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Hex SHA-256 of `timestamp|event_type|user_id|description`.
pub fn compute_entry_hash(entry: &AuditLogEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_timestamp(&entry.timestamp).as_bytes());
    hasher.update(b"|");
    hasher.update(entry.event_type.to_string().as_bytes());
    hasher.update(b"|");
    hasher.update(entry.user_id.as_bytes());
    hasher.update(b"|");
    hasher.update(entry.description.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Compare hex digests ignoring case.
pub fn hash_matches(expected: &str, actual: &str) -> bool {
    expected.eq_ignore_ascii_case(actual)
}
