//! Configuration management for the rebar cell simulator
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (RBC_* prefix, highest precedence)
//! 2. rebarcell.local.toml (gitignored, local overrides)
//! 3. rebarcell.toml (git-tracked, project config)
//! 4. ~/.config/rebarcell/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use rebarcell_kernel::ProcessParams;
use rebarcell_types::{ControlAuthority, SupervisoryMode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main simulator configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebarcellConfig {
    pub process: ProcessConfig,
    pub scheduler: SchedulerConfig,
    pub cell: CellConfig,
}

/// Physical increments and fault thresholds, per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub feed_rate: f64,
    pub heat_rate: f64,
    pub cut_heat_bump: f64,
    pub overshoot_margin: f64,
    pub conflict_window_low: f64,
    pub conflict_window_high: f64,
    pub forced_target_length: f64,
    pub overheat_threshold: f64,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        ProcessParams::default().into()
    }
}

impl From<ProcessParams> for ProcessConfig {
    fn from(params: ProcessParams) -> Self {
        Self {
            feed_rate: params.feed_rate,
            heat_rate: params.heat_rate,
            cut_heat_bump: params.cut_heat_bump,
            overshoot_margin: params.overshoot_margin,
            conflict_window_low: params.conflict_window_low,
            conflict_window_high: params.conflict_window_high,
            forced_target_length: params.forced_target_length,
            overheat_threshold: params.overheat_threshold,
        }
    }
}

impl From<&ProcessConfig> for ProcessParams {
    fn from(config: &ProcessConfig) -> Self {
        Self {
            feed_rate: config.feed_rate,
            heat_rate: config.heat_rate,
            cut_heat_bump: config.cut_heat_bump,
            overshoot_margin: config.overshoot_margin,
            conflict_window_low: config.conflict_window_low,
            conflict_window_high: config.conflict_window_high,
            forced_target_length: config.forced_target_length,
            overheat_threshold: config.overheat_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Wall-clock period between ticks in real-time mode.
    pub tick_period_ms: u64,
    /// Capacity of the effect broadcast channel.
    pub effect_buffer: usize,
}

impl SchedulerConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_period_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms: 50,
            effect_buffer: 256,
        }
    }
}

/// Environment the cell powers on with. Survives a simulation reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CellConfig {
    pub control_authority: ControlAuthority,
    pub priority_enabled: bool,
    pub supervisory_mode: SupervisoryMode,
}

impl RebarcellConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, bypassing the layered sources.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Process parameters for the transition function.
    pub fn process_params(&self) -> ProcessParams {
        ProcessParams::from(&self.process)
    }

    /// Rejects values the transition function cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.process;

        let positive = [
            ("process.feed_rate", p.feed_rate),
            ("process.overshoot_margin", p.overshoot_margin),
            ("process.forced_target_length", p.forced_target_length),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must be positive, got {value}"
                )));
            }
        }

        let non_negative = [
            ("process.heat_rate", p.heat_rate),
            ("process.cut_heat_bump", p.cut_heat_bump),
            ("process.conflict_window_low", p.conflict_window_low),
        ];
        for (key, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "{key} must not be negative, got {value}"
                )));
            }
        }

        if !p.overheat_threshold.is_finite() {
            return Err(ConfigError::ValidationError(
                "process.overheat_threshold must be finite".to_string(),
            ));
        }

        if !(p.conflict_window_high.is_finite() && p.conflict_window_low < p.conflict_window_high)
        {
            return Err(ConfigError::ValidationError(format!(
                "conflict window is empty: ({}, {})",
                p.conflict_window_low, p.conflict_window_high
            )));
        }

        if self.scheduler.tick_period_ms == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.tick_period_ms must be at least 1".to_string(),
            ));
        }

        if self.scheduler.effect_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "scheduler.effect_buffer must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RebarcellConfig::default();
        assert_eq!(config.process.feed_rate, 0.05);
        assert_eq!(config.process.forced_target_length, 3.0);
        assert_eq!(config.scheduler.tick_period(), Duration::from_millis(50));
        assert_eq!(config.cell.control_authority, ControlAuthority::Shared);
        assert_eq!(config.cell.supervisory_mode, SupervisoryMode::Manual);
        assert!(!config.cell.priority_enabled);
        config.validate().expect("defaults should be valid");
    }

    #[test]
    fn test_process_params_round_trip_defaults() {
        let config = RebarcellConfig::default();
        assert_eq!(config.process_params(), ProcessParams::default());
    }

    #[test]
    fn test_rejects_zero_feed_rate() {
        let mut config = RebarcellConfig::default();
        config.process.feed_rate = 0.0;

        let err = config.validate().expect_err("zero feed rate must be rejected");
        assert!(err.to_string().contains("process.feed_rate"));
    }

    #[test]
    fn test_rejects_inverted_window() {
        let mut config = RebarcellConfig::default();
        config.process.conflict_window_low = 4.0;
        config.process.conflict_window_high = 2.0;

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_tick_period() {
        let mut config = RebarcellConfig::default();
        config.scheduler.tick_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("cell.toml");
        std::fs::write(
            &path,
            r#"
[process]
feed_rate = 0.1

[cell]
control_authority = "remote"
supervisory_mode = "scada"
"#,
        )
        .expect("Failed to write config");

        let config = RebarcellConfig::from_file(&path).expect("Failed to load config");

        assert_eq!(config.process.feed_rate, 0.1);
        assert_eq!(config.process.heat_rate, 0.01);
        assert_eq!(config.cell.control_authority, ControlAuthority::Remote);
        assert_eq!(config.cell.supervisory_mode, SupervisoryMode::Scada);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let missing = RebarcellConfig::from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "[process\nfeed_rate = ").expect("Failed to write config");
        let broken = RebarcellConfig::from_file(&path);
        assert!(matches!(broken, Err(ConfigError::ParseError { .. })));
    }
}
