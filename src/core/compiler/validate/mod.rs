use super::ValidationIssue;
use flowbuilder_types::{
    AuthoringStep, BranchStep, StandardStep, WorkflowDefinition, WorkflowStatus,
};

mod rules;
pub use rules::built_in_rules;

/// Shared inputs for validation rules.
pub struct ValidationContext<'a> {
    statuses: &'a [WorkflowStatus],
}

impl<'a> ValidationContext<'a> {
    /// Externally supplied statuses take precedence over the document's own list.
    pub fn new(
        definition: &'a WorkflowDefinition,
        statuses: Option<&'a [WorkflowStatus]>,
    ) -> Self {
        Self {
            statuses: statuses.unwrap_or(definition.statuses.as_slice()),
        }
    }

    pub fn statuses(&self) -> &'a [WorkflowStatus] {
        self.statuses
    }

    pub fn has_status(&self, status_id: &str) -> bool {
        self.statuses.iter().any(|status| status.id == status_id)
    }
}

/// Trait implemented by document validation rules.
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(
        &self,
        definition: &WorkflowDefinition,
        ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue>;
}

/// Runs every rule and concatenates the issues; no rule short-circuits another.
pub struct ValidationRegistry {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl ValidationRegistry {
    pub fn new() -> Self {
        Self {
            rules: built_in_rules(),
        }
    }

    pub fn with_rules(rules: Vec<Box<dyn ValidationRule>>) -> Self {
        Self { rules }
    }

    pub fn run(
        &self,
        definition: &WorkflowDefinition,
        ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        for rule in &self.rules {
            let found = rule.validate(definition, ctx);
            if !found.is_empty() {
                tracing::debug!(
                    rule = rule.name(),
                    issues = found.len(),
                    "validation rule reported issues"
                );
            }
            issues.extend(found);
        }
        issues
    }
}

impl Default for ValidationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A standard step and its document path, top-level or nested in a track.
pub(crate) struct LocatedStep<'a> {
    pub path: String,
    pub step: &'a StandardStep,
}

/// Every standard step in document order, descending into branch tracks.
pub(crate) fn standard_steps(definition: &WorkflowDefinition) -> Vec<LocatedStep<'_>> {
    let mut located = Vec::new();
    for (index, step) in definition.steps.iter().enumerate() {
        let path = format!("steps[{}]", index);
        match step {
            AuthoringStep::Standard(standard) => located.push(LocatedStep {
                path,
                step: standard,
            }),
            AuthoringStep::Branch(branch) => {
                for (track_index, track) in branch.tracks.iter().enumerate() {
                    for (nested_index, nested) in track.steps.iter().enumerate() {
                        located.push(LocatedStep {
                            path: format!(
                                "{}.tracks[{}].steps[{}]",
                                path, track_index, nested_index
                            ),
                            step: nested,
                        });
                    }
                }
            }
        }
    }
    located
}

pub(crate) fn branch_steps(definition: &WorkflowDefinition) -> Vec<(String, &BranchStep)> {
    definition
        .steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| {
            step.as_branch()
                .map(|branch| (format!("steps[{}]", index), branch))
        })
        .collect()
}
