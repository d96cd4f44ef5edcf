//! Audit log entries as read back from the store.

use crate::{AuditEventType, ComplianceType, DataSensitivity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One immutable record from the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Opaque unique identifier.
    pub id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Event category.
    pub event_type: AuditEventType,
    /// Acting user, possibly pre-hashed by the writer.
    pub user_id: String,
    /// Session the event belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Free-text description.
    pub description: String,
    /// Raw structured metadata as written. Kept as text so that records
    /// with unparsable metadata can still be loaded and reported on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    /// Sensitivity of the described data.
    #[serde(default)]
    pub data_sensitivity: DataSensitivity,
    /// Hex SHA-256 digest computed by the writer.
    #[serde(default)]
    pub integrity_hash: String,
    /// Compliance framework tag.
    #[serde(default)]
    pub compliance_type: ComplianceType,
}

impl AuditLogEntry {
    /// Create a new entry builder.
    pub fn builder(event_type: AuditEventType, user_id: impl Into<String>) -> AuditLogEntryBuilder {
        AuditLogEntryBuilder::new(event_type, user_id)
    }

    /// Chain order: timestamp, ties broken by id.
    pub fn chain_order(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }

    /// Whether the entry carries non-empty metadata.
    ///
    /// Blank text and the JSON literals `null`, `{}` and `[]` count as empty.
    pub fn has_metadata(&self) -> bool {
        let Some(raw) = self.metadata.as_deref() else {
            return false;
        };
        if raw.trim().is_empty() {
            return false;
        }
        match serde_json::from_str::<serde_json::Value>(raw) {
            Ok(serde_json::Value::Null) => false,
            Ok(serde_json::Value::Object(map)) => !map.is_empty(),
            Ok(serde_json::Value::Array(items)) => !items.is_empty(),
            _ => true,
        }
    }
}

/// Builder for constructing entries. Produces unsealed entries: the
/// integrity hash is left empty until the entry is sealed.
#[derive(Debug)]
pub struct AuditLogEntryBuilder {
    id: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    event_type: AuditEventType,
    user_id: String,
    session_id: Option<String>,
    description: String,
    metadata: Option<String>,
    data_sensitivity: DataSensitivity,
    integrity_hash: String,
    compliance_type: ComplianceType,
}

impl AuditLogEntryBuilder {
    /// Create a new builder.
    pub fn new(event_type: AuditEventType, user_id: impl Into<String>) -> Self {
        Self {
            id: None,
            timestamp: None,
            event_type,
            user_id: user_id.into(),
            session_id: None,
            description: String::new(),
            metadata: None,
            data_sensitivity: DataSensitivity::default(),
            integrity_hash: String::new(),
            compliance_type: ComplianceType::default(),
        }
    }

    /// Set the id (defaults to a random UUID).
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the timestamp (defaults to now).
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Set the session id.
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set raw metadata text.
    pub fn metadata_raw(mut self, raw: impl Into<String>) -> Self {
        self.metadata = Some(raw.into());
        self
    }

    /// Set metadata from a JSON value.
    pub fn metadata(mut self, value: serde_json::Value) -> Self {
        self.metadata = Some(value.to_string());
        self
    }

    /// Set the data sensitivity.
    pub fn data_sensitivity(mut self, sensitivity: DataSensitivity) -> Self {
        self.data_sensitivity = sensitivity;
        self
    }

    /// Set a precomputed integrity hash.
    pub fn integrity_hash(mut self, hash: impl Into<String>) -> Self {
        self.integrity_hash = hash.into();
        self
    }

    /// Set the compliance type.
    pub fn compliance_type(mut self, compliance_type: ComplianceType) -> Self {
        self.compliance_type = compliance_type;
        self
    }

    /// Build the entry.
    pub fn build(self) -> AuditLogEntry {
        AuditLogEntry {
            id: self.id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            event_type: self.event_type,
            user_id: self.user_id,
            session_id: self.session_id,
            description: self.description,
            metadata: self.metadata,
            data_sensitivity: self.data_sensitivity,
            integrity_hash: self.integrity_hash,
            compliance_type: self.compliance_type,
        }
    }
}
