//! Engine configuration and `.vox/audit.yaml` loading.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use vox_audit_types::AuditEventType;

/// Root engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub integrity: IntegrityConfig,
    pub completeness: CompletenessConfig,
    pub retention: RetentionConfig,
    pub patterns: PatternConfig,
    pub report: ReportConfig,
}

/// Integrity validator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// How far in the future a timestamp may lie (clock skew allowance).
    pub future_tolerance_secs: i64,
    /// Oldest plausible entry age.
    pub max_age_days: i64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            future_tolerance_secs: 300,
            max_age_days: 3650,
        }
    }
}

/// Completeness validator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletenessConfig {
    /// A populated day followed directly by another with fewer entries than
    /// this is reported as low activity.
    pub low_activity_threshold: usize,
    /// Event types that must appear at least once per period.
    pub required_event_types: Vec<AuditEventType>,
}

impl Default for CompletenessConfig {
    fn default() -> Self {
        Self {
            low_activity_threshold: 10,
            required_event_types: AuditEventType::default_required(),
        }
    }
}

/// Retention validator thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Minimum retention the compliance framework requires (7 years).
    pub horizon_days: i64,
    /// Width of the sample window just inside the horizon.
    pub sample_window_days: i64,
    /// Entries the sample window must hold.
    pub min_sample_entries: usize,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            horizon_days: 2555,
            sample_window_days: 10,
            min_sample_entries: 100,
        }
    }
}

/// How overlapping rapid-succession windows are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RapidSuccessionMode {
    /// Every qualifying window is its own pattern.
    #[default]
    Overlapping,
    /// Overlapping qualifying windows collapse into one pattern per burst.
    Merged,
}

/// Suspicious pattern detector thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Failed authentications per user per hour bucket.
    pub brute_force_threshold: usize,
    /// Local hours before this are off-hours.
    pub off_hours_start: u32,
    /// Local hours after this are off-hours.
    pub off_hours_end: u32,
    /// Off-hours logins per user.
    pub off_hours_threshold: usize,
    /// Offset of local time from UTC.
    pub utc_offset_minutes: i32,
    /// Events per sliding window.
    pub rapid_window_size: usize,
    /// Maximum span of a qualifying window.
    pub rapid_window_secs: i64,
    pub rapid_mode: RapidSuccessionMode,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            brute_force_threshold: 5,
            off_hours_start: 6,
            off_hours_end: 22,
            off_hours_threshold: 3,
            utc_offset_minutes: 0,
            rapid_window_size: 5,
            rapid_window_secs: 60,
            rapid_mode: RapidSuccessionMode::default(),
        }
    }
}

/// Report orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Period length used when no start is given.
    pub default_period_days: i64,
    /// Fan the checks out onto blocking worker threads.
    pub parallel: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_period_days: 30,
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |message: &str| {
            Err(ConfigError::Invalid {
                message: message.to_string(),
            })
        };

        if self.integrity.future_tolerance_secs < 0 {
            return fail("integrity.future_tolerance_secs must not be negative");
        }
        if !(1..=36_500).contains(&self.integrity.max_age_days) {
            return fail("integrity.max_age_days must be between 1 and 36500");
        }
        if self.completeness.low_activity_threshold == 0 {
            return fail("completeness.low_activity_threshold must be greater than 0");
        }
        if self.retention.horizon_days <= 0 || self.retention.horizon_days > 36_500 {
            return fail("retention.horizon_days must be between 1 and 36500");
        }
        if self.retention.sample_window_days <= 0
            || self.retention.sample_window_days > self.retention.horizon_days
        {
            return fail("retention.sample_window_days must be between 1 and horizon_days");
        }
        if self.patterns.brute_force_threshold == 0 || self.patterns.off_hours_threshold == 0 {
            return fail("pattern thresholds must be greater than 0");
        }
        if self.patterns.off_hours_start > 23 || self.patterns.off_hours_end > 23 {
            return fail("off-hours bounds must be between 0 and 23");
        }
        if self.patterns.utc_offset_minutes.abs() > 1080 {
            return fail("patterns.utc_offset_minutes must be within +/-1080");
        }
        if self.patterns.rapid_window_size < 2 {
            return fail("patterns.rapid_window_size must be at least 2");
        }
        if self.patterns.rapid_window_secs <= 0 {
            return fail("patterns.rapid_window_secs must be greater than 0");
        }
        if self.report.default_period_days <= 0 {
            return fail("report.default_period_days must be greater than 0");
        }

        Ok(())
    }
}

/// Failure to load or apply `.vox/audit.yaml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("audit config not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to access audit config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid audit config YAML at line {}: {message}", line.map(|l| l.to_string()).unwrap_or_else(|| "unknown".to_string()))]
    Yaml { line: Option<usize>, message: String },

    #[error("invalid audit config: {message}")]
    Invalid { message: String },

    #[error("audit config references unset environment variable {var}")]
    MissingEnvVar { var: String },
}

const CONFIG_FILE: &str = ".vox/audit.yaml";
const ENV_VAR_PATTERN: &str = r"\$\{([^}:]+)(?::-([^}]*))?\}";

/// Configuration loader.
pub struct ConfigLoader {
    base_path: PathBuf,
}

impl ConfigLoader {
    /// Create a loader for the given application data directory.
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Path of the config file this loader reads.
    pub fn config_path(&self) -> PathBuf {
        self.base_path.join(CONFIG_FILE)
    }

    /// Load configuration from `.vox/audit.yaml`, falling back to defaults
    /// when the file does not exist.
    pub fn load(&self) -> Result<EngineConfig, ConfigError> {
        let config_path = self.config_path();
        if !config_path.exists() {
            return Ok(EngineConfig::default());
        }
        self.load_from(&config_path)
    }

    /// Load from an explicit file; the file must exist.
    pub fn load_from(&self, path: &Path) -> Result<EngineConfig, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&contents)?;

        let config: EngineConfig =
            serde_yaml::from_str(&expanded).map_err(|e| ConfigError::Yaml {
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `.vox/audit.yaml`.
    pub fn save(&self, config: &EngineConfig) -> Result<(), ConfigError> {
        config.validate()?;

        let config_path = self.config_path();
        if let Some(dir) = config_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let yaml = serde_yaml::to_string(config).map_err(|e| ConfigError::Yaml {
            line: None,
            message: e.to_string(),
        })?;

        std::fs::write(config_path, yaml)?;
        Ok(())
    }
}

fn env_var_regex() -> Result<&'static Regex, ConfigError> {
    static ENV_VAR_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    ENV_VAR_RE
        .get_or_init(|| Regex::new(ENV_VAR_PATTERN))
        .as_ref()
        .map_err(|e| ConfigError::Yaml {
            line: None,
            message: e.to_string(),
        })
}

/// Expand environment variables in the form `${VAR}` or `${VAR:-default}`.
pub fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
    let re = env_var_regex()?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let var_name = &cap[1];
        let default = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) => v,
            Err(_) => match default {
                Some(d) => d.to_string(),
                None => {
                    return Err(ConfigError::MissingEnvVar {
                        var: var_name.to_string(),
                    })
                }
            },
        };

        result = result.replace(full_match.as_str(), &value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use vox_test_utils::{assert_err, assert_ok, temp_dir, temp_file};

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert_ok!(config.validate());
        assert_eq!(config.retention.horizon_days, 2555);
        assert_eq!(config.patterns.rapid_mode, RapidSuccessionMode::Overlapping);
        assert_eq!(config.completeness.required_event_types.len(), 5);
    }

    #[test]
    fn test_load_defaults_when_no_file() {
        let dir = temp_dir();
        let config = assert_ok!(ConfigLoader::new(dir.path()).load());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_yaml_merges_with_defaults() {
        let dir = temp_dir();
        fs::create_dir_all(dir.path().join(".vox")).unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
patterns:
  brute_force_threshold: 8
  rapid_mode: merged
retention:
  min_sample_entries: 25
"#,
        )
        .unwrap();

        let config = assert_ok!(ConfigLoader::new(dir.path()).load());
        assert_eq!(config.patterns.brute_force_threshold, 8);
        assert_eq!(config.patterns.rapid_mode, RapidSuccessionMode::Merged);
        assert_eq!(config.retention.min_sample_entries, 25);
        assert_eq!(config.patterns.off_hours_start, 6);
        assert_eq!(config.integrity.future_tolerance_secs, 300);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let (_dir, path) = temp_file("patterns:\n  brute_force_threshold: [oops\n");
        match ConfigLoader::new(".").load_from(&path) {
            Err(ConfigError::Yaml { line, .. }) => assert!(line.is_some()),
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_values_rejected() {
        let (_dir, path) = temp_file("patterns:\n  rapid_window_size: 1\n");
        assert!(matches!(
            ConfigLoader::new(".").load_from(&path),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_file() {
        let dir = temp_dir();
        assert_err!(ConfigLoader::new(".").load_from(&dir.path().join("absent.yaml")));
    }

    #[test]
    fn test_env_var_expansion() {
        std::env::set_var("VOX_TEST_BRUTE_FORCE", "7");
        let (_dir, path) = temp_file(
            "patterns:\n  brute_force_threshold: ${VOX_TEST_BRUTE_FORCE}\n  off_hours_threshold: ${VOX_TEST_UNSET_VAR:-4}\n",
        );
        let config = assert_ok!(ConfigLoader::new(".").load_from(&path));
        std::env::remove_var("VOX_TEST_BRUTE_FORCE");
        assert_eq!(config.patterns.brute_force_threshold, 7);
        assert_eq!(config.patterns.off_hours_threshold, 4);
    }

    #[test]
    fn test_expansion_regex_is_shared() {
        let first = assert_ok!(env_var_regex());
        let second = assert_ok!(env_var_regex());
        assert!(std::ptr::eq(first, second));
        for _ in 0..3 {
            assert_eq!(assert_ok!(expand_env_vars("a: ${VOX_TEST_UNSET_SHARED:-1}")), "a: 1");
        }
    }

    #[test]
    fn test_missing_env_var_without_default() {
        let result = expand_env_vars("key: ${VOX_TEST_DEFINITELY_UNSET}");
        assert!(matches!(result, Err(ConfigError::MissingEnvVar { var }) if var == "VOX_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_save_round_trips() {
        let dir = temp_dir();
        let loader = ConfigLoader::new(dir.path());
        let mut config = EngineConfig::default();
        config.patterns.utc_offset_minutes = -300;
        config.report.parallel = false;

        assert_ok!(loader.save(&config));
        assert_eq!(assert_ok!(loader.load()), config);
    }
}
