//! Audit log and compliance value types for Vox.
//!
//! Everything here is an immutable value object: entries are produced by the
//! external audit writer, and results and reports are assembled by the
//! compliance engine and never mutated after they are returned.

mod entry;
mod event_type;
mod level;
mod pattern;
mod report;
mod result;
mod severity;
mod tags;
mod violation;

pub use entry::{AuditLogEntry, AuditLogEntryBuilder};
pub use event_type::AuditEventType;
pub use level::ComplianceLevel;
pub use pattern::{PatternType, SuspiciousPattern};
pub use report::ComplianceReport;
pub use result::{ChainBreak, ComplianceResult, HashChainValidationResult, ReportPeriod};
pub use severity::Severity;
pub use tags::{ComplianceType, DataSensitivity};
pub use violation::{ComplianceViolation, ViolationType};
