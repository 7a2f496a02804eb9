#![allow(clippy::result_large_err)] // Compile errors carry every collected issue by value.

//! Authoring-to-runtime compiler.
//!
//! [`WorkflowCompiler::validate`] collects every issue in one pass;
//! [`WorkflowCompiler::compile`] validates and then lowers the nested step tree into a flat
//! runtime step list addressed by explicit gotos.

mod lower;
pub mod template;
pub mod validate;

pub use validate::{ValidationContext, ValidationRegistry, ValidationRule};

use flowbuilder_types::{RuntimeStep, WorkflowDefinition, WorkflowStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wait-step size used when a waited-on task has no due-day count.
pub const DEFAULT_TASK_WAIT_DAYS: u32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssueCode {
    InvalidShape,
    DuplicateStepId,
    DuplicateActionId,
    UnsupportedAction,
    UnsupportedAdvancement,
    InvalidAdvancement,
    InvalidBranch,
    InvalidStatus,
    UnsupportedVariableReference,
}

impl ValidationIssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationIssueCode::InvalidShape => "invalid_shape",
            ValidationIssueCode::DuplicateStepId => "duplicate_step_id",
            ValidationIssueCode::DuplicateActionId => "duplicate_action_id",
            ValidationIssueCode::UnsupportedAction => "unsupported_action",
            ValidationIssueCode::UnsupportedAdvancement => "unsupported_advancement",
            ValidationIssueCode::InvalidAdvancement => "invalid_advancement",
            ValidationIssueCode::InvalidBranch => "invalid_branch",
            ValidationIssueCode::InvalidStatus => "invalid_status",
            ValidationIssueCode::UnsupportedVariableReference => "unsupported_variable_reference",
        }
    }
}

impl fmt::Display for ValidationIssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in an authoring document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: ValidationIssueCode,
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(
        code: ValidationIssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Raised when a document cannot be compiled; carries every issue found.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("workflow definition failed to compile: {}", summarize(.issues))]
pub struct WorkflowCompileError {
    pub issues: Vec<ValidationIssue>,
}

impl WorkflowCompileError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn single(
        code: ValidationIssueCode,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(vec![ValidationIssue::new(code, path, message)])
    }

    pub fn has_code(&self, code: ValidationIssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

fn summarize(issues: &[ValidationIssue]) -> String {
    match issues {
        [] => "no issues recorded".to_string(),
        [issue] => format!("{} at {}: {}", issue.code, issue.path, issue.message),
        [first, rest @ ..] => format!(
            "{} at {}: {} (and {} more)",
            first.code,
            first.path,
            first.message,
            rest.len()
        ),
    }
}

/// Knobs for lowering.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOptions {
    pub default_task_wait_days: u32,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_task_wait_days: DEFAULT_TASK_WAIT_DAYS,
        }
    }
}

pub struct WorkflowCompiler {
    options: CompileOptions,
    registry: ValidationRegistry,
}

impl WorkflowCompiler {
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            registry: ValidationRegistry::new(),
        }
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Every issue in `definition`. `statuses`, when given, replaces the document's own list.
    pub fn validate(
        &self,
        definition: &WorkflowDefinition,
        statuses: Option<&[WorkflowStatus]>,
    ) -> Vec<ValidationIssue> {
        let ctx = ValidationContext::new(definition, statuses);
        self.registry.run(definition, &ctx)
    }

    /// Validate, then lower into the runtime step list.
    pub fn compile(
        &self,
        definition: &WorkflowDefinition,
        statuses: Option<&[WorkflowStatus]>,
    ) -> Result<Vec<RuntimeStep>, WorkflowCompileError> {
        let issues = self.validate(definition, statuses);
        if !issues.is_empty() {
            tracing::warn!(
                definition_id = %definition.id,
                issues = issues.len(),
                "workflow definition rejected by validation"
            );
            return Err(WorkflowCompileError::new(issues));
        }

        let steps = lower::lower_definition(definition, &self.options)?;
        tracing::info!(
            definition_id = %definition.id,
            authoring_steps = definition.steps.len(),
            runtime_steps = steps.len(),
            "workflow definition compiled"
        );
        Ok(steps)
    }
}

impl Default for WorkflowCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

pub fn validate_workflow_definition(
    definition: &WorkflowDefinition,
    statuses: Option<&[WorkflowStatus]>,
) -> Vec<ValidationIssue> {
    WorkflowCompiler::default().validate(definition, statuses)
}

pub fn compile_workflow_definition(
    definition: &WorkflowDefinition,
    statuses: Option<&[WorkflowStatus]>,
) -> Result<Vec<RuntimeStep>, WorkflowCompileError> {
    WorkflowCompiler::default().compile(definition, statuses)
}
