//! Audit event types.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Category of a recorded audit event.
///
/// The `Display` form is the canonical text that enters the integrity hash,
/// so renaming a variant's text form invalidates every stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumIter, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditEventType {
    // Authentication
    Login,
    Logout,
    AuthenticationSucceeded,
    AuthenticationFailed,

    // Authorization
    AuthorizationFailed,
    RoleChanged,
    PrivilegeEscalation,

    // Credentials
    PasswordChanged,
    TokenIssued,
    TokenExpired,
    AccountLocked,
    AccountUnlocked,
    CredentialAccessed,
    ApiKeyAccessed,
    ApiKeyCreated,
    ApiKeyRevoked,

    // Security
    SecurityConfigurationChanged,
    SecurityEvent,

    // Dictation
    DictationStarted,
    DictationCompleted,
    TextInjected,

    // Application
    SettingsChanged,
    DataExported,
    DataDeleted,
    ApplicationStarted,
    ApplicationStopped,
}

impl AuditEventType {
    /// Get all event types.
    pub fn all() -> impl Iterator<Item = Self> {
        use strum::IntoEnumIterator;
        Self::iter()
    }

    /// Events that must carry security context in their metadata and that
    /// feed the rapid-succession detector.
    pub fn is_security_relevant(&self) -> bool {
        matches!(
            self,
            Self::Login
                | Self::Logout
                | Self::AuthenticationSucceeded
                | Self::AuthenticationFailed
                | Self::AuthorizationFailed
                | Self::RoleChanged
                | Self::PrivilegeEscalation
                | Self::PasswordChanged
                | Self::TokenIssued
                | Self::TokenExpired
                | Self::AccountLocked
                | Self::AccountUnlocked
                | Self::SecurityConfigurationChanged
                | Self::CredentialAccessed
                | Self::SecurityEvent
        )
    }

    /// Event types whose absence over a reporting period indicates a gap in
    /// the trail.
    pub fn default_required() -> Vec<Self> {
        vec![
            Self::Login,
            Self::Logout,
            Self::AuthenticationSucceeded,
            Self::AuthenticationFailed,
            Self::ApiKeyAccessed,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_display_is_snake_case() {
        assert_eq!(AuditEventType::AuthenticationFailed.to_string(), "authentication_failed");
        assert_eq!(AuditEventType::ApiKeyAccessed.to_string(), "api_key_accessed");
    }

    #[test]
    fn test_parse_matches_serde() {
        let parsed = AuditEventType::from_str("security_configuration_changed").unwrap();
        assert_eq!(parsed, AuditEventType::SecurityConfigurationChanged);

        let json = serde_json::to_string(&parsed).unwrap();
        assert_eq!(json, "\"security_configuration_changed\"");
    }

    #[test]
    fn test_security_relevant_set() {
        let relevant: Vec<_> = AuditEventType::all()
            .filter(AuditEventType::is_security_relevant)
            .collect();
        assert_eq!(relevant.len(), 15);
        assert!(!AuditEventType::DictationStarted.is_security_relevant());
        assert!(!AuditEventType::ApiKeyAccessed.is_security_relevant());
    }
}
