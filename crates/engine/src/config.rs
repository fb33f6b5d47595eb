//! Engine configuration, read from a `replan.toml` file.
//!
//! Every section and field is optional; missing values take their defaults.
//!
//! ```toml
//! [validation]
//! max_patches = 7
//!
//! [resolution]
//! past_within_days = 3
//! future_within_days = 7
//!
//! [proposals]
//! ttl_minutes = 20
//!
//! [clock]
//! utc_offset_minutes = 60
//! ```

use std::path::{Path, PathBuf};

use replan_core::{AmbiguityPolicy, ValidatorConfig};
use serde::{Deserialize, Serialize};
use time::{Duration, UtcOffset};

/// Default proposal time-to-live.
pub const DEFAULT_TTL_MINUTES: u32 = 20;

/// Longest proposal time-to-live accepted (one day).
pub const MAX_TTL_MINUTES: u32 = 24 * 60;

/// Largest UTC offset accepted, in minutes.
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalConfig {
    pub ttl_minutes: u32,
}

impl Default for ProposalConfig {
    fn default() -> Self {
        ProposalConfig {
            ttl_minutes: DEFAULT_TTL_MINUTES,
        }
    }
}

impl ProposalConfig {
    pub fn ttl(&self) -> Duration {
        Duration::minutes(i64::from(self.ttl_minutes))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Offset of the civil calendar "today" is taken from.
    pub utc_offset_minutes: i32,
}

impl ClockConfig {
    pub fn offset(&self) -> Result<UtcOffset, ConfigError> {
        let out_of_range = || {
            ConfigError::Invalid(format!(
                "clock.utc_offset_minutes {} is outside +/-{}",
                self.utc_offset_minutes, MAX_OFFSET_MINUTES
            ))
        };
        if self.utc_offset_minutes.unsigned_abs() > MAX_OFFSET_MINUTES.unsigned_abs() {
            return Err(out_of_range());
        }
        let seconds = self
            .utc_offset_minutes
            .checked_mul(60)
            .ok_or_else(out_of_range)?;
        UtcOffset::from_whole_seconds(seconds)
            .map_err(|e| ConfigError::Invalid(format!("clock.utc_offset_minutes: {}", e)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub validation: ValidatorConfig,
    pub resolution: AmbiguityPolicy,
    pub proposals: ProposalConfig,
    pub clock: ClockConfig,
}

impl EngineConfig {
    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.validation.max_patches == 0 {
            return Err(ConfigError::Invalid(
                "validation.max_patches must be at least 1".to_string(),
            ));
        }
        if self.proposals.ttl_minutes == 0 || self.proposals.ttl_minutes > MAX_TTL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "proposals.ttl_minutes must be between 1 and {}, got {}",
                MAX_TTL_MINUTES, self.proposals.ttl_minutes
            )));
        }
        self.clock.offset()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.validation.max_patches, 7);
        assert_eq!(config.resolution.past_within_days, 3);
        assert_eq!(config.resolution.future_within_days, 7);
        assert_eq!(config.proposals.ttl(), Duration::minutes(20));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            [resolution]
            past_within_days = 2

            [clock]
            utc_offset_minutes = -300
            "#,
        )
        .unwrap();
        assert_eq!(config.resolution.past_within_days, 2);
        assert_eq!(config.resolution.future_within_days, 7);
        assert_eq!(config.clock.offset().unwrap().whole_hours(), -5);
    }

    #[test]
    fn invalid_values_are_rejected() {
        for text in [
            "[validation]\nmax_patches = 0",
            "[proposals]\nttl_minutes = 0",
            "[proposals]\nttl_minutes = 1441",
            "[clock]\nutc_offset_minutes = 1200",
            "[clock]\nutc_offset_minutes = -1081",
            "[clock]\nutc_offset_minutes = -2147483648",
            "[clock]\nutc_offset_minutes = 2147483647",
        ] {
            assert!(
                matches!(EngineConfig::from_toml_str(text), Err(ConfigError::Invalid(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn syntax_errors_are_parse_errors() {
        assert!(matches!(
            EngineConfig::from_toml_str("[validation\nmax_patches = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[validation]\nmax_patches = 3").unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.validation.max_patches, 3);

        let missing = EngineConfig::load(Path::new("/nonexistent/replan.toml"));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }
}
