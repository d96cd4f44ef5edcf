//! The audit log store collaborator.
//!
//! The engine only ever reads from the store. Appending and persistence are
//! owned by the host application's audit writer.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use vox_audit_types::{AuditEventType, AuditLogEntry, ComplianceType};

/// Filter for [`AuditLogStore::query`]. Start is inclusive, end exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub event_type: Option<AuditEventType>,
    pub compliance_type: Option<ComplianceType>,
}

impl AuditQuery {
    /// Match everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Match entries in `[start, end)`.
    pub fn between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            start,
            end,
            ..Self::default()
        }
    }

    /// Restrict to one event type.
    pub fn with_event_type(mut self, event_type: AuditEventType) -> Self {
        self.event_type = Some(event_type);
        self
    }

    /// Restrict to one compliance type.
    pub fn with_compliance_type(mut self, compliance_type: ComplianceType) -> Self {
        self.compliance_type = Some(compliance_type);
        self
    }

    /// Whether an entry satisfies the filter.
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.start.map_or(true, |s| entry.timestamp >= s)
            && self.end.map_or(true, |e| entry.timestamp < e)
            && self.event_type.map_or(true, |t| entry.event_type == t)
            && self.compliance_type.map_or(true, |c| entry.compliance_type == c)
    }
}

/// Aggregate statistics reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStatistics {
    pub total_entries: u64,
    /// Entries older than the retention horizon that have not been purged.
    pub entries_past_retention: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

impl AuditStatistics {
    /// Compute statistics over entries, counting those before `retention_cutoff`.
    pub fn from_entries(entries: &[AuditLogEntry], retention_cutoff: DateTime<Utc>) -> Self {
        Self {
            total_entries: entries.len() as u64,
            entries_past_retention: entries
                .iter()
                .filter(|e| e.timestamp < retention_cutoff)
                .count() as u64,
            oldest_entry: entries.iter().map(|e| e.timestamp).min(),
            newest_entry: entries.iter().map(|e| e.timestamp).max(),
        }
    }
}

/// Read-only access to the append-only audit log.
#[async_trait]
pub trait AuditLogStore: Send + Sync {
    /// Entries matching the query, in any order.
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError>;

    /// Aggregate statistics over the whole log.
    async fn statistics(&self) -> Result<AuditStatistics, StoreError>;
}

#[async_trait]
impl<S: AuditLogStore + ?Sized> AuditLogStore for Arc<S> {
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).query(query).await
    }

    async fn statistics(&self) -> Result<AuditStatistics, StoreError> {
        (**self).statistics().await
    }
}

/// In-process store backed by a vector.
pub struct InMemoryAuditLogStore {
    entries: RwLock<Vec<AuditLogEntry>>,
    retention_days: i64,
}

impl InMemoryAuditLogStore {
    /// Create an empty store with the given retention horizon.
    pub fn new(retention_days: i64) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            retention_days,
        }
    }

    /// Create a store preloaded with entries.
    pub fn with_entries(retention_days: i64, entries: Vec<AuditLogEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
            retention_days,
        }
    }

    /// Append one entry.
    pub fn append(&self, entry: AuditLogEntry) {
        self.entries.write().push(entry);
    }

    /// Append many entries.
    pub fn extend(&self, entries: impl IntoIterator<Item = AuditLogEntry>) {
        self.entries.write().extend(entries);
    }

    /// Remove entries older than `cutoff`; returns how many were removed.
    pub fn purge_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.timestamp >= cutoff);
        before - entries.len()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn retention_cutoff(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, StoreError> {
        Duration::try_days(self.retention_days)
            .and_then(|horizon| now.checked_sub_signed(horizon))
            .ok_or_else(|| {
                StoreError::Query(format!("retention horizon of {} days is out of range", self.retention_days))
            })
    }
}

#[async_trait]
impl AuditLogStore for InMemoryAuditLogStore {
    async fn query(&self, query: &AuditQuery) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .filter(|e| query.matches(e))
            .cloned()
            .collect())
    }

    async fn statistics(&self) -> Result<AuditStatistics, StoreError> {
        let cutoff = self.retention_cutoff(Utc::now())?;
        Ok(AuditStatistics::from_entries(&self.entries.read(), cutoff))
    }
}
