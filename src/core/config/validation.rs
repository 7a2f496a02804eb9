#![allow(clippy::result_large_err)]

use super::FlowbuilderConfig;
use crate::core::error::AppError;
use crate::core::types::ErrorCategory;

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &FlowbuilderConfig) -> Result<(), AppError> {
        if config.compiler.default_task_wait_days < 1 {
            return Err(AppError::new(
                ErrorCategory::ConfigError,
                "compiler.default_task_wait_days must be at least 1",
            ));
        }

        if let Some(path) = &config.compiler.statuses_file {
            if path.as_os_str().is_empty() {
                return Err(AppError::new(
                    ErrorCategory::ConfigError,
                    "compiler.statuses_file cannot be empty",
                ));
            }
        }

        Ok(())
    }
}
