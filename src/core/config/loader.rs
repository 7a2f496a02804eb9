#![allow(clippy::result_large_err)]

use super::{ConfigValidator, FlowbuilderConfig};
use crate::core::error::AppError;
use crate::core::types::{ErrorCategory, IdStrategy};
use std::env;
use std::path::Path;

pub const CONFIG_FILE_NAME: &str = "flowbuilder.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load config from workspace root (workspace/flowbuilder.toml)
    /// Environment variables override config file values; a missing file means defaults.
    pub fn load_from_workspace(workspace_path: &Path) -> Result<FlowbuilderConfig, AppError> {
        let config_path = workspace_path.join(CONFIG_FILE_NAME);
        let mut config = Self::load_from_file(&config_path)?.unwrap_or_default();

        Self::apply_env_overrides(&mut config);
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Returns Ok(None) if the file doesn't exist
    pub fn load_from_file(path: &Path) -> Result<Option<FlowbuilderConfig>, AppError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::new(
                ErrorCategory::IoError,
                format!("Failed to read config file {}: {}", path.display(), e),
            )
        })?;

        let config: FlowbuilderConfig = toml::from_str(&content).map_err(|e| {
            AppError::new(
                ErrorCategory::ConfigError,
                format!("Failed to parse config file {}: {}", path.display(), e),
            )
        })?;

        Ok(Some(config))
    }

    fn apply_env_overrides(config: &mut FlowbuilderConfig) {
        if let Ok(days) = env::var("FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS") {
            match days.trim().parse::<u32>() {
                Ok(days) => config.compiler.default_task_wait_days = days,
                Err(_) => tracing::warn!(
                    value = %days,
                    "ignoring FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS; expected a whole number"
                ),
            }
        }

        if let Ok(strategy) = env::var("FLOWBUILDER_ID_STRATEGY") {
            match strategy.parse::<IdStrategy>() {
                Ok(strategy) => config.ids.strategy = strategy,
                Err(err) => tracing::warn!("ignoring FLOWBUILDER_ID_STRATEGY: {}", err),
            }
        }
    }

    /// Get documentation for supported environment variables
    pub fn env_var_documentation() -> &'static [&'static str] {
        &[
            "FLOWBUILDER_DEFAULT_TASK_WAIT_DAYS - Override the wait-step size for tasks without due days (default: 7)",
            "FLOWBUILDER_ID_STRATEGY - Override the id strategy (random/sequential, default: random)",
            "FLOWBUILDER_LOG_LEVEL - Override the default log level",
            "FLOWBUILDER_CONSOLE_OUTPUT - Override console log output (stdout/stderr/none)",
        ]
    }
}
