use crate::core::compiler::{CompileOptions, DEFAULT_TASK_WAIT_DAYS};
use crate::core::types::IdStrategy;
use crate::core::workflow_builder::COPY_SUFFIX;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod loader;
pub mod validation;

pub use loader::ConfigLoader;
pub use validation::ConfigValidator;

/// Settings loaded from flowbuilder.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct FlowbuilderConfig {
    #[serde(default)]
    pub compiler: CompilerConfig,

    #[serde(default)]
    pub ids: IdsConfig,

    #[serde(default)]
    pub session: SessionConfig,
}

/// Compiler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Wait-step size when the waited-on task has no due-day count
    #[serde(default = "default_task_wait_days")]
    pub default_task_wait_days: u32,

    /// JSON array of statuses that replaces the document's own list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdsConfig {
    #[serde(default)]
    pub strategy: IdStrategy,
}

/// Builder session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Appended to the names of duplicated steps
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,
}

fn default_task_wait_days() -> u32 {
    DEFAULT_TASK_WAIT_DAYS
}

fn default_copy_suffix() -> String {
    COPY_SUFFIX.to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        CompilerConfig {
            default_task_wait_days: default_task_wait_days(),
            statuses_file: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            copy_suffix: default_copy_suffix(),
        }
    }
}

impl FlowbuilderConfig {
    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            default_task_wait_days: self.compiler.default_task_wait_days,
        }
    }
}
