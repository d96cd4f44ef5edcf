//! Audit trail compliance validation for Vox.
//!
//! Validators, the suspicious pattern detector and the report generator all
//! read one immutable [`AuditSnapshot`] and never return an error: internal
//! faults are reported as Critical `DataIntegrity` violations and the verdict
//! fails closed.

pub mod completeness;
pub mod config;
pub mod error;
pub mod integrity;
pub mod patterns;
pub mod report_generator;
pub mod retention;
pub mod store;
pub mod validator;

pub use completeness::CompletenessValidator;
pub use config::{
    expand_env_vars, CompletenessConfig, ConfigError, ConfigLoader, EngineConfig, IntegrityConfig,
    PatternConfig, RapidSuccessionMode, ReportConfig, RetentionConfig,
};
pub use error::{ReportError, StoreError, ValidationError};
pub use integrity::IntegrityValidator;
pub use patterns::SuspiciousPatternDetector;
pub use report_generator::ComplianceReportGenerator;
pub use retention::RetentionPolicyValidator;
pub use store::{AuditLogStore, AuditQuery, AuditStatistics, InMemoryAuditLogStore};
pub use validator::{catch_panic, AuditSnapshot, ComplianceValidator, ValidatorKind};

pub use vox_audit_immutability::HashChainVerifier;
