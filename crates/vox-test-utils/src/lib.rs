//! Test utilities for Vox crates.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::path::PathBuf;
use tempfile::TempDir;
use vox_audit_immutability::{compute_entry_hash, ChainSealer};
use vox_audit_types::{AuditEventType, AuditLogEntry};

/// Creates a temporary directory that is cleaned up on drop.
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// Creates a temporary file with given content.
pub fn temp_file(content: &str) -> (TempDir, PathBuf) {
    let dir = temp_dir();
    let path = dir.path().join("test_file");
    std::fs::write(&path, content).expect("Failed to write temp file");
    (dir, path)
}

/// Fixed reference instant used as "now" by fixtures: Monday 2026-03-02 12:00 UTC.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0)
        .single()
        .expect("valid fixture instant")
}

/// Midnight UTC `days` before [`fixed_now`].
pub fn day(days_ago: i64) -> DateTime<Utc> {
    let midnight = fixed_now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("valid midnight")
        .and_utc();
    midnight - Duration::days(days_ago)
}

/// Builds entries with deterministic ids and correct integrity hashes.
///
/// Security-relevant events get a populated security context so that they
/// pass the metadata completeness check.
#[derive(Debug, Default)]
pub struct EntryFactory {
    next_id: usize,
}

impl EntryFactory {
    /// Create a factory; ids start at `e00000`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry without a digest.
    pub fn unsealed(
        &mut self,
        event_type: AuditEventType,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> AuditLogEntry {
        let id = format!("e{:05}", self.next_id);
        self.next_id += 1;

        let mut builder = AuditLogEntry::builder(event_type, user_id)
            .id(id)
            .timestamp(timestamp)
            .description(format!("{} by {}", event_type, user_id));
        if event_type.is_security_relevant() {
            builder = builder.metadata(serde_json::json!({
                "ip_address": "127.0.0.1",
                "client": "vox-desktop",
            }));
        }
        builder.build()
    }

    /// Entry with a correct digest and no chain link.
    pub fn entry(
        &mut self,
        event_type: AuditEventType,
        user_id: &str,
        timestamp: DateTime<Utc>,
    ) -> AuditLogEntry {
        let mut entry = self.unsealed(event_type, user_id, timestamp);
        entry.integrity_hash = compute_entry_hash(&entry);
        entry
    }

    /// A busy, well-formed day starting at `midnight`: every required event
    /// type plus dictation traffic, `count` entries in total (minimum 5),
    /// spread evenly between 09:00 and 17:00.
    pub fn busy_day(&mut self, midnight: DateTime<Utc>, count: usize) -> Vec<AuditLogEntry> {
        let required = AuditEventType::default_required();
        let count = count.max(required.len());
        let step = Duration::minutes((8 * 60 / count as i64).max(1));
        let start = midnight + Duration::hours(9);

        (0..count)
            .map(|i| {
                let event_type = required
                    .get(i)
                    .copied()
                    .unwrap_or(AuditEventType::DictationCompleted);
                self.unsealed(event_type, "user-1", start + step * i as i32)
            })
            .collect()
    }
}

/// Seal entries into a valid chain.
pub fn sealed_chain(entries: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
    ChainSealer::new()
        .seal_all(entries)
        .expect("fixture entries must have object metadata")
}

/// Assert that a Result is Ok and return the value.
#[macro_export]
macro_rules! assert_ok {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
}

/// Assert that a Result is Err.
#[macro_export]
macro_rules! assert_err {
    ($expr:expr) => {
        match $expr {
            Ok(v) => panic!("Expected Err, got Ok: {:?}", v),
            Err(_) => {}
        }
    };
}
