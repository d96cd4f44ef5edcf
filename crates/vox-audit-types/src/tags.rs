//! Classification tags carried by every entry.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Ordinal sensitivity of the data an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataSensitivity {
    Public,
    #[default]
    Internal,
    Confidential,
    Restricted,
}

/// Compliance framework an entry is recorded for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, Default)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ComplianceType {
    #[default]
    General,
    Soc2,
    Gdpr,
    Hipaa,
    Iso27001,
}
