//! Configuration loader with multi-source merging

use crate::{Paths, RebarcellConfig};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    include_user_config: bool,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "RBC".to_string(),
            include_user_config: true,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "RBC")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Skip ~/.config/rebarcell/config.toml, for hermetic runs
    pub fn without_user_config(mut self) -> Self {
        self.include_user_config = false;
        self
    }

    /// Load configuration from all sources with proper precedence
    pub fn load(self) -> Result<RebarcellConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = RebarcellConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/rebarcell/config.toml)
        if self.include_user_config
            && let Ok(user_config_file) = Paths::new().user_config_file()
            && user_config_file.exists()
        {
            builder = builder.add_source(
                config::File::from(user_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Project config (rebarcell.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (rebarcell.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (RBC_PROCESS__FEED_RATE=0.1)
        //    Double underscore separates sections because keys contain '_'.
        builder = builder.add_source(
            config::Environment::with_prefix(&self.env_prefix)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let rebarcell_config: RebarcellConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        rebarcell_config
            .validate()
            .context("Configuration failed validation")?;

        Ok(rebarcell_config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default(self) -> RebarcellConfig {
        self.load().unwrap_or_default()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use rebarcell_types::{ControlAuthority, SupervisoryMode};
    use std::fs;
    use tempfile::tempdir;

    fn loader(project_dir: &Path) -> ConfigLoader {
        ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("RBC_LOADER_TEST")
            .without_user_config()
    }

    #[test]
    fn test_load_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = loader(temp_dir.path()).load().expect("Failed to load config");

        assert_eq!(config, RebarcellConfig::default());
    }

    #[test]
    fn test_load_project_config() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        let config_content = r#"
[process]
feed_rate = 0.08
overshoot_margin = 2.0

[scheduler]
tick_period_ms = 20

[cell]
control_authority = "local"
priority_enabled = true
supervisory_mode = "mes"
"#;
        fs::write(project_dir.join("rebarcell.toml"), config_content)
            .expect("Failed to write config");

        let config = loader(project_dir).load().expect("Failed to load config");

        assert_eq!(config.process.feed_rate, 0.08);
        assert_eq!(config.process.overshoot_margin, 2.0);
        assert_eq!(config.process.heat_rate, 0.01);
        assert_eq!(config.scheduler.tick_period_ms, 20);
        assert_eq!(config.scheduler.effect_buffer, 256);
        assert_eq!(config.cell.control_authority, ControlAuthority::Local);
        assert!(config.cell.priority_enabled);
        assert_eq!(config.cell.supervisory_mode, SupervisoryMode::Mes);
    }

    #[test]
    fn test_local_overrides() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("rebarcell.toml"),
            r#"
[scheduler]
tick_period_ms = 100
"#,
        )
        .expect("Failed to write project config");

        fs::write(
            project_dir.join("rebarcell.local.toml"),
            r#"
[scheduler]
tick_period_ms = 10
"#,
        )
        .expect("Failed to write local config");

        let config = loader(project_dir).load().expect("Failed to load config");

        // Local config should override project config
        assert_eq!(config.scheduler.tick_period_ms, 10);
    }

    #[test]
    fn test_invalid_values_fail_load() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();

        fs::write(
            project_dir.join("rebarcell.toml"),
            r#"
[process]
conflict_window_low = 5.0
conflict_window_high = 1.0
"#,
        )
        .expect("Failed to write config");

        let err = loader(project_dir)
            .load()
            .expect_err("inverted window must fail validation");
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(loader(project_dir).load_or_default() == RebarcellConfig::default());
    }

    static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    /// Sets variables for the life of the guard, restoring them on drop.
    struct EnvGuard {
        prev: Vec<(&'static str, Option<String>)>,
        _lock: std::sync::MutexGuard<'static, ()>,
    }

    impl EnvGuard {
        #[allow(unsafe_code)]
        fn set_many(vars: &[(&'static str, &str)]) -> Self {
            let lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
            let mut prev = Vec::with_capacity(vars.len());
            for (key, value) in vars {
                prev.push((*key, env::var(key).ok()));
                // SAFETY: serialized by ENV_LOCK; only this module's tests
                // read variables under the RBC_ENV_TEST prefix.
                unsafe { env::set_var(key, value) };
            }
            Self { prev, _lock: lock }
        }
    }

    impl Drop for EnvGuard {
        #[allow(unsafe_code)]
        fn drop(&mut self) {
            for (key, prev) in self.prev.drain(..) {
                // SAFETY: still holding ENV_LOCK.
                match prev {
                    Some(prev) => unsafe { env::set_var(key, prev) },
                    None => unsafe { env::remove_var(key) },
                }
            }
        }
    }

    #[test]
    fn test_env_overrides_files() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let project_dir = temp_dir.path();
        fs::write(
            project_dir.join("rebarcell.toml"),
            r#"
[process]
feed_rate = 0.08

[scheduler]
tick_period_ms = 100
"#,
        )
        .expect("Failed to write config");

        let _env = EnvGuard::set_many(&[
            ("RBC_ENV_TEST_PROCESS__FEED_RATE", "0.1"),
            ("RBC_ENV_TEST_PROCESS__OVERHEAT_THRESHOLD", "55.5"),
            ("RBC_ENV_TEST_SCHEDULER__TICK_PERIOD_MS", "20"),
            ("RBC_ENV_TEST_CELL__SUPERVISORY_MODE", "scada"),
            ("RBC_ENV_TEST_CELL__PRIORITY_ENABLED", "true"),
        ]);

        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .with_env_prefix("RBC_ENV_TEST")
            .without_user_config()
            .load()
            .expect("Failed to load config");

        // Double underscore splits sections; single underscores stay in keys.
        assert_eq!(config.process.feed_rate, 0.1);
        assert_eq!(config.process.overheat_threshold, 55.5);
        assert_eq!(config.scheduler.tick_period_ms, 20);
        assert_eq!(config.cell.supervisory_mode, SupervisoryMode::Scada);
        assert!(config.cell.priority_enabled);
        assert_eq!(config.process.heat_rate, 0.01);
    }

    #[test]
    fn test_env_values_are_validated() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let _env = EnvGuard::set_many(&[("RBC_ENV_TEST_SCHEDULER__TICK_PERIOD_MS", "0")]);

        let err = ConfigLoader::new()
            .with_project_dir(temp_dir.path())
            .with_env_prefix("RBC_ENV_TEST")
            .without_user_config()
            .load()
            .expect_err("zero tick period must fail validation");
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }
}
