//! Engine configuration
//!
//! Tunables for retention, freshness and thresholds. Loaded from an
//! optional YAML file; every field falls back to its default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, EngineResult};

/// Default session time-to-live (hours)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Default minimum interval between insight recomputes (minutes)
pub const DEFAULT_INSIGHT_INTERVAL_MINUTES: i64 = 60;

/// Default response-time sample capacity
pub const DEFAULT_RESPONSE_SAMPLE_CAPACITY: usize = 1000;

/// Default bounce threshold (milliseconds on page)
pub const DEFAULT_BOUNCE_THRESHOLD_MS: u64 = 30_000;

/// Default number of ranked items surfaced by dashboards
pub const DEFAULT_TOP_ITEMS_LIMIT: usize = 10;

/// Configuration file name
const CONFIG_FILENAME: &str = "engagement.yaml";

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sessions older than this are removed by a sweep
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Insights are reused until they are this old
    #[serde(default = "default_insight_interval_minutes")]
    pub insight_interval_minutes: i64,

    /// Most recent response-time samples kept
    #[serde(default = "default_response_sample_capacity")]
    pub response_sample_capacity: usize,

    /// Page views with explicit time below this count as bounces
    #[serde(default = "default_bounce_threshold_ms")]
    pub bounce_threshold_ms: u64,

    /// Alert retention; `None` keeps every alert until cleared
    #[serde(default)]
    pub max_alerts: Option<usize>,

    /// Ranked items surfaced by dashboards and reports
    #[serde(default = "default_top_items_limit")]
    pub top_items_limit: usize,
}

fn default_session_ttl_hours() -> i64 {
    DEFAULT_SESSION_TTL_HOURS
}

fn default_insight_interval_minutes() -> i64 {
    DEFAULT_INSIGHT_INTERVAL_MINUTES
}

fn default_response_sample_capacity() -> usize {
    DEFAULT_RESPONSE_SAMPLE_CAPACITY
}

fn default_bounce_threshold_ms() -> u64 {
    DEFAULT_BOUNCE_THRESHOLD_MS
}

fn default_top_items_limit() -> usize {
    DEFAULT_TOP_ITEMS_LIMIT
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            insight_interval_minutes: DEFAULT_INSIGHT_INTERVAL_MINUTES,
            response_sample_capacity: DEFAULT_RESPONSE_SAMPLE_CAPACITY,
            bounce_threshold_ms: DEFAULT_BOUNCE_THRESHOLD_MS,
            max_alerts: None,
            top_items_limit: DEFAULT_TOP_ITEMS_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Loads configuration from a directory
    ///
    /// # Arguments
    /// * `config_dir` - Directory holding `engagement.yaml`
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file is missing or unreadable
    pub fn load(config_dir: &Path) -> Self {
        let config_path = config_dir.join(CONFIG_FILENAME);

        if !config_path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&config_path) {
            Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %config_path.display(), error = %e, "Unparsable config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Saves configuration to a directory
    pub fn save(&self, config_dir: &Path) -> EngineResult<()> {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir)?;
        }

        let content = serde_yaml::to_string(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(Self::config_path(config_dir), content)?;
        Ok(())
    }

    /// Full path of the configuration file inside `config_dir`
    pub fn config_path(config_dir: &Path) -> PathBuf {
        config_dir.join(CONFIG_FILENAME)
    }

    /// Rejects values that would make the engine misbehave
    pub fn validate(&self) -> EngineResult<()> {
        if self.session_ttl_hours <= 0 {
            return Err(EngineError::Config("session_ttl_hours must be positive".to_string()));
        }
        if chrono::TimeDelta::try_hours(self.session_ttl_hours).is_none() {
            return Err(EngineError::Config("session_ttl_hours is out of range".to_string()));
        }
        if self.insight_interval_minutes <= 0 {
            return Err(EngineError::Config(
                "insight_interval_minutes must be positive".to_string(),
            ));
        }
        if chrono::TimeDelta::try_minutes(self.insight_interval_minutes).is_none() {
            return Err(EngineError::Config(
                "insight_interval_minutes is out of range".to_string(),
            ));
        }
        if self.response_sample_capacity == 0 {
            return Err(EngineError::Config(
                "response_sample_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_alerts == Some(0) {
            return Err(EngineError::Config(
                "max_alerts must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    /// Session lifetime; out-of-range values fall back to the default
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::TimeDelta::try_hours(self.session_ttl_hours)
            .unwrap_or_else(|| chrono::TimeDelta::hours(DEFAULT_SESSION_TTL_HOURS))
    }

    pub fn insight_interval(&self) -> chrono::Duration {
        chrono::TimeDelta::try_minutes(self.insight_interval_minutes)
            .unwrap_or_else(|| chrono::TimeDelta::minutes(DEFAULT_INSIGHT_INTERVAL_MINUTES))
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.session_ttl_hours, 24);
        assert_eq!(config.response_sample_capacity, 1000);
        assert_eq!(config.bounce_threshold_ms, 30_000);
        assert!(config.max_alerts.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_nonexistent_config() {
        let dir = tempdir().unwrap();
        let config = EngineConfig::load(dir.path());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_save_and_load_config() {
        let dir = tempdir().unwrap();
        let config = EngineConfig {
            max_alerts: Some(50),
            session_ttl_hours: 6,
            ..Default::default()
        };

        config.save(dir.path()).unwrap();

        let loaded = EngineConfig::load(dir.path());
        assert_eq!(loaded.max_alerts, Some(50));
        assert_eq!(loaded.session_ttl_hours, 6);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        fs::write(EngineConfig::config_path(dir.path()), "bounce_threshold_ms: 10000\n").unwrap();

        let loaded = EngineConfig::load(dir.path());
        assert_eq!(loaded.bounce_threshold_ms, 10_000);
        assert_eq!(loaded.insight_interval_minutes, DEFAULT_INSIGHT_INTERVAL_MINUTES);
    }

    #[test]
    fn test_invalid_yaml_falls_back() {
        let dir = tempdir().unwrap();
        fs::write(EngineConfig::config_path(dir.path()), "session_ttl_hours: [oops").unwrap();

        let loaded = EngineConfig::load(dir.path());
        assert_eq!(loaded, EngineConfig::default());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let config = EngineConfig {
            insight_interval_minutes: i64::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
        assert_eq!(config.insight_interval(), chrono::Duration::minutes(60));

        let config = EngineConfig {
            session_ttl_hours: i64::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
        assert_eq!(config.session_ttl(), chrono::Duration::hours(24));

        // Largest representable values are still accepted
        let config = EngineConfig {
            insight_interval_minutes: i64::MAX / 60_000,
            session_ttl_hours: i64::MAX / 3_600_000,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let config = EngineConfig {
            response_sample_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));

        let config = EngineConfig {
            max_alerts: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
