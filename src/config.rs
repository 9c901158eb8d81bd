// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management for the pulse generator.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. pulsegen.yaml file
//! 3. Environment variables (PULSEGEN_*)

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Default scheduling options for requests
    #[serde(default)]
    pub options: ScheduleOptions,

    /// Buffer pool settings
    #[serde(default)]
    pub pool: PoolConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        // Load from file if specified
        if let Some(path) = config_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                config = serde_yaml::from_str(&content)?;
            }
        } else {
            // Try default locations
            for path in &["pulsegen.yaml", "pulsegen.yml"] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        // Override with environment variables
        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PULSEGEN_TIME_TOLERANCE") {
            if let Ok(v) = val.parse() {
                self.options.time_tolerance = v;
            }
        }
        if let Ok(val) = env::var("PULSEGEN_AMP_TOLERANCE") {
            if let Ok(v) = val.parse() {
                self.options.amp_tolerance = v;
            }
        }
        if let Ok(val) = env::var("PULSEGEN_PHASE_TOLERANCE") {
            if let Ok(v) = val.parse() {
                self.options.phase_tolerance = v;
            }
        }
        if let Ok(val) = env::var("PULSEGEN_ALLOW_OVERSIZE") {
            self.options.allow_oversize = val.to_lowercase() == "true" || val == "1";
        }
        if let Ok(val) = env::var("PULSEGEN_POOL_MAX_RETAINED") {
            if let Ok(v) = val.parse() {
                self.pool.max_retained_per_bucket = v;
            }
        }
        if let Ok(val) = env::var("PULSEGEN_LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("PULSEGEN_LOG_FORMAT") {
            self.logging.format = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.options.validate()?;
        if self.pool.max_retained_per_bucket == 0 {
            return Err(Error::Config(
                "pool.max_retained_per_bucket must be at least 1".into(),
            ));
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err(Error::Config(format!(
                "logging.format must be 'json' or 'pretty', got '{}'",
                self.logging.format
            )));
        }
        if self.options.allow_oversize {
            tracing::warn!(
                "Oversizing is allowed. Elements that exceed their slot will overhang \
                 instead of failing the request."
            );
        }
        Ok(())
    }
}

/// Tolerances and layout policy for a schedule request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    /// Time differences below this are treated as equal (seconds)
    #[serde(default = "default_time_tolerance")]
    pub time_tolerance: f64,

    /// Pulses with amplitude below this are dropped
    #[serde(default = "default_amp_tolerance")]
    pub amp_tolerance: f64,

    /// Accumulated carrier phase drift below this (radians) is ignored
    #[serde(default = "default_phase_tolerance")]
    pub phase_tolerance: f64,

    /// Allow elements to overhang the duration their parent allots
    #[serde(default)]
    pub allow_oversize: bool,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            time_tolerance: default_time_tolerance(),
            amp_tolerance: default_amp_tolerance(),
            phase_tolerance: default_phase_tolerance(),
            allow_oversize: false,
        }
    }
}

impl ScheduleOptions {
    /// Check that every tolerance is finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("time_tolerance", self.time_tolerance),
            ("amp_tolerance", self.amp_tolerance),
            ("phase_tolerance", self.phase_tolerance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::Config(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn default_time_tolerance() -> f64 {
    1e-12
}

fn default_amp_tolerance() -> f64 {
    0.1 / 65536.0
}

fn default_phase_tolerance() -> f64 {
    1e-4
}

/// Buffer pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Free buffers kept per capacity class
    #[serde(default = "default_max_retained")]
    pub max_retained_per_bucket: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained_per_bucket: default_max_retained(),
        }
    }
}

fn default_max_retained() -> usize {
    64
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "json".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write as _;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.options.time_tolerance, 1e-12);
        assert_relative_eq!(config.options.amp_tolerance, 0.1 / 2f64.powi(16), epsilon = 1e-18);
        assert_eq!(config.options.phase_tolerance, 1e-4);
        assert!(!config.options.allow_oversize);
        assert_eq!(config.pool.max_retained_per_bucket, 64);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());

        let mut bad_config = Config::default();
        bad_config.options.time_tolerance = -1.0;
        assert!(bad_config.validate().is_err());
    }

    #[test]
    fn test_validate_nan_tolerance() {
        let mut config = Config::default();
        config.options.phase_tolerance = f64::NAN;
        let msg = format!("{}", config.validate().unwrap_err());
        assert!(msg.contains("phase_tolerance"));
    }

    #[test]
    fn test_validate_zero_retention() {
        let mut config = Config::default();
        config.pool.max_retained_per_bucket = 0;
        let msg = format!("{}", config.validate().unwrap_err());
        assert!(msg.contains("max_retained_per_bucket"));
    }

    #[test]
    fn test_validate_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());
        config.logging.format = "pretty".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_allow_oversize_still_passes() {
        let mut config = Config::default();
        config.options.allow_oversize = true;
        // Should warn but still pass validation
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_load_from_file() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            f,
            r#"
options:
  time_tolerance: 1.0e-9
  allow_oversize: true
pool:
  max_retained_per_bucket: 4
"#
        )
        .unwrap();

        let config = Config::load(Some(f.path())).unwrap();
        assert_eq!(config.options.time_tolerance, 1e-9);
        assert!(config.options.allow_oversize);
        // Unspecified fields keep their defaults
        assert_eq!(config.options.phase_tolerance, 1e-4);
        assert_eq!(config.pool.max_retained_per_bucket, 4);
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let path = std::path::Path::new("/tmp/does_not_exist_pulsegen_test.yaml");
        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.pool.max_retained_per_bucket, 64);
    }

    #[test]
    fn test_config_load_invalid_yaml() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "{{{{not: valid: yaml::::").unwrap();

        let result = Config::load(Some(f.path()));
        assert!(matches!(result, Err(Error::Serialization(_))));
    }

    #[test]
    fn test_env_override_tolerances() {
        let mut config = Config::default();
        std::env::set_var("PULSEGEN_TIME_TOLERANCE", "1e-10");
        std::env::set_var("PULSEGEN_AMP_TOLERANCE", "not-a-number");
        config.apply_env_overrides();
        assert_eq!(config.options.time_tolerance, 1e-10);
        assert_relative_eq!(config.options.amp_tolerance, 0.1 / 65536.0, epsilon = 1e-18);
        std::env::remove_var("PULSEGEN_TIME_TOLERANCE");
        std::env::remove_var("PULSEGEN_AMP_TOLERANCE");
    }

    #[test]
    fn test_env_override_allow_oversize() {
        let mut config = Config::default();
        std::env::set_var("PULSEGEN_ALLOW_OVERSIZE", "TRUE");
        config.apply_env_overrides();
        assert!(config.options.allow_oversize);

        std::env::set_var("PULSEGEN_ALLOW_OVERSIZE", "0");
        config.apply_env_overrides();
        assert!(!config.options.allow_oversize);
        std::env::remove_var("PULSEGEN_ALLOW_OVERSIZE");
    }

    #[test]
    fn test_env_override_log_level() {
        let mut config = Config::default();
        std::env::set_var("PULSEGEN_LOG_LEVEL", "debug");
        config.apply_env_overrides();
        assert_eq!(config.logging.level, "debug");
        std::env::remove_var("PULSEGEN_LOG_LEVEL");
    }

    #[test]
    fn test_options_yaml_defaults() {
        let options: ScheduleOptions = serde_yaml::from_str("allow_oversize: true").unwrap();
        assert!(options.allow_oversize);
        assert_eq!(options.time_tolerance, 1e-12);
    }
}
