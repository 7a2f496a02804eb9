use super::{branch_steps, standard_steps, ValidationContext, ValidationRule};
use crate::core::compiler::template::{normalize_variable_reference, template_fields, unsupported_references};
use crate::core::compiler::{ValidationIssue, ValidationIssueCode};
use flowbuilder_types::{
    ActionType, AdvancementCondition, BranchOperator, WorkflowAction, WorkflowDefinition,
    WorkflowTrigger,
};
use std::collections::{HashMap, HashSet};

/// Action types the runtime can execute.
const SUPPORTED_ACTION_TYPES: [ActionType; 5] = [
    ActionType::CreateTask,
    ActionType::SendEmail,
    ActionType::Notification,
    ActionType::UpdateContact,
    ActionType::UpdateStatus,
];

pub fn built_in_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(StatusDefinitionsRule),
        Box::new(TriggerShapeRule),
        Box::new(UniqueStepIdsRule),
        Box::new(UniqueActionIdsRule),
        Box::new(SupportedActionTypesRule),
        Box::new(VariableReferencesRule),
        Box::new(AdvancementRule),
        Box::new(BranchShapeRule),
    ]
}

struct StatusDefinitionsRule;

impl ValidationRule for StatusDefinitionsRule {
    fn name(&self) -> &'static str {
        "status_definitions"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        let statuses = ctx.statuses();
        if statuses.is_empty() {
            out.push(ValidationIssue::new(
                ValidationIssueCode::InvalidStatus,
                "statuses",
                "workflow must define at least one status",
            ));
        }

        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for (index, status) in statuses.iter().enumerate() {
            if !ids.insert(status.id.as_str()) {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidStatus,
                    format!("statuses[{}].id", index),
                    format!("duplicate status id '{}'", status.id),
                ));
            }
            if !orders.insert(status.order) {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidStatus,
                    format!("statuses[{}].order", index),
                    format!(
                        "status '{}' reuses order {} of another status",
                        status.id, status.order
                    ),
                ));
            }
        }

        if let Some(initial) = definition.trigger.initial_status() {
            if !ctx.has_status(initial) {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidStatus,
                    "trigger.initialStatus",
                    format!("trigger initial status '{}' is not a defined status", initial),
                ));
            }
        }

        for located in standard_steps(definition) {
            for (index, action) in located.step.actions.iter().enumerate() {
                if let WorkflowAction::UpdateStatus { config, .. } = action {
                    if !ctx.has_status(&config.status) {
                        out.push(ValidationIssue::new(
                            ValidationIssueCode::InvalidStatus,
                            format!("{}.actions[{}].config.status", located.path, index),
                            format!(
                                "update_status action '{}' references undefined status '{}'",
                                action.id(),
                                config.status
                            ),
                        ));
                    }
                }
            }
        }
        out
    }
}

struct TriggerShapeRule;

impl ValidationRule for TriggerShapeRule {
    fn name(&self) -> &'static str {
        "trigger_shape"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        match &definition.trigger {
            WorkflowTrigger::Api { .. } => vec![ValidationIssue::new(
                ValidationIssueCode::InvalidShape,
                "trigger.type",
                "api triggers cannot be compiled; use manual, contact_created, contact_field_changed or form_submission",
            )],
            WorkflowTrigger::FormSubmission { form_id, .. } if form_id.trim().is_empty() => {
                vec![ValidationIssue::new(
                    ValidationIssueCode::InvalidShape,
                    "trigger.formId",
                    "form_submission trigger requires a form id",
                )]
            }
            _ => Vec::new(),
        }
    }
}

/// Step ids share one namespace across the top level and every track.
struct UniqueStepIdsRule;

impl ValidationRule for UniqueStepIdsRule {
    fn name(&self) -> &'static str {
        "unique_step_ids"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut candidates: Vec<(String, &str)> = definition
            .steps
            .iter()
            .enumerate()
            .map(|(index, step)| (format!("steps[{}]", index), step.id()))
            .collect();
        for located in standard_steps(definition) {
            if located.path.contains(".tracks[") {
                candidates.push((located.path, &located.step.id));
            }
        }

        let mut out = Vec::new();
        let mut seen: HashMap<&str, String> = HashMap::new();
        for (path, id) in candidates {
            if id.trim().is_empty() {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidShape,
                    format!("{}.id", path),
                    "step id must not be empty",
                ));
                continue;
            }
            if let Some(first) = seen.get(id) {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::DuplicateStepId,
                    format!("{}.id", path),
                    format!("step id '{}' is already used at {}", id, first),
                ));
            } else {
                seen.insert(id, path);
            }
        }
        out
    }
}

/// Action ids are unique across the whole document, nested steps included.
struct UniqueActionIdsRule;

impl ValidationRule for UniqueActionIdsRule {
    fn name(&self) -> &'static str {
        "unique_action_ids"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        let mut seen: HashMap<&str, String> = HashMap::new();
        for located in standard_steps(definition) {
            for (index, action) in located.step.actions.iter().enumerate() {
                let path = format!("{}.actions[{}]", located.path, index);
                let id = action.id();
                if id.trim().is_empty() {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::InvalidShape,
                        format!("{}.id", path),
                        "action id must not be empty",
                    ));
                    continue;
                }
                if let Some(first) = seen.get(id) {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::DuplicateActionId,
                        format!("{}.id", path),
                        format!("action id '{}' is already used at {}", id, first),
                    ));
                } else {
                    seen.insert(id, path);
                }
            }
        }
        out
    }
}

struct SupportedActionTypesRule;

impl ValidationRule for SupportedActionTypesRule {
    fn name(&self) -> &'static str {
        "supported_action_types"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for located in standard_steps(definition) {
            for (index, action) in located.step.actions.iter().enumerate() {
                let path = format!("{}.actions[{}]", located.path, index);
                let supported = match action.action_type() {
                    Some(action_type) => SUPPORTED_ACTION_TYPES.contains(&action_type),
                    // A known type name that still fell through has a config it could not read.
                    None if action.type_name().parse::<ActionType>().is_ok() => {
                        out.push(ValidationIssue::new(
                            ValidationIssueCode::InvalidShape,
                            format!("{}.config", path),
                            format!(
                                "action '{}' of type '{}' has a malformed config",
                                action.id(),
                                action.type_name()
                            ),
                        ));
                        continue;
                    }
                    None => false,
                };
                if !supported {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::UnsupportedAction,
                        format!("{}.type", path),
                        format!(
                            "action '{}' has type '{}' which the runtime cannot execute",
                            action.id(),
                            action.type_name()
                        ),
                    ));
                }
            }
        }
        out
    }
}

struct VariableReferencesRule;

impl ValidationRule for VariableReferencesRule {
    fn name(&self) -> &'static str {
        "variable_references"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for located in standard_steps(definition) {
            for (index, action) in located.step.actions.iter().enumerate() {
                for field in template_fields(action) {
                    for reference in unsupported_references(field.value) {
                        out.push(ValidationIssue::new(
                            ValidationIssueCode::UnsupportedVariableReference,
                            format!("{}.actions[{}].{}", located.path, index, field.path),
                            format!(
                                "variable reference '{}' is not supported; only var-contact.<field> references compile",
                                reference
                            ),
                        ));
                    }
                }
            }
        }
        out
    }
}

struct AdvancementRule;

impl ValidationRule for AdvancementRule {
    fn name(&self) -> &'static str {
        "advancement"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for located in standard_steps(definition) {
            let path = format!("{}.advancement", located.path);
            match &located.step.advancement {
                AdvancementCondition::Automatic => {}
                AdvancementCondition::WhenTaskCompleted { task_action_id } => {
                    let references_task = located.step.actions.iter().any(|action| {
                        action.id() == task_action_id
                            && action.action_type() == Some(ActionType::CreateTask)
                    });
                    if !references_task {
                        out.push(ValidationIssue::new(
                            ValidationIssueCode::InvalidAdvancement,
                            format!("{}.taskActionId", path),
                            format!(
                                "step '{}' waits for '{}' which is not a create_task action in the same step",
                                located.step.id, task_action_id
                            ),
                        ));
                    }
                }
                AdvancementCondition::WhenDurationPasses { duration, unit } => {
                    let days = unit.to_days(*duration);
                    if !(days.is_finite() && days > 0.0) {
                        out.push(ValidationIssue::new(
                            ValidationIssueCode::InvalidAdvancement,
                            format!("{}.duration", path),
                            format!(
                                "step '{}' delay must be a positive, finite number of days, got {} {:?}",
                                located.step.id, duration, unit
                            ),
                        ));
                    }
                }
                AdvancementCondition::Compound { .. } => {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::UnsupportedAdvancement,
                        path,
                        format!(
                            "step '{}' uses a compound condition; split it into sequential steps",
                            located.step.id
                        ),
                    ));
                }
                AdvancementCondition::Other { condition_type } => {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::UnsupportedAdvancement,
                        path,
                        format!(
                            "step '{}' has an unknown or malformed advancement '{}'",
                            located.step.id, condition_type
                        ),
                    ));
                }
                other => {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::UnsupportedAdvancement,
                        path,
                        format!(
                            "step '{}' uses advancement '{}' which the compiler does not support",
                            located.step.id,
                            other.type_name()
                        ),
                    ));
                }
            }
        }
        out
    }
}

struct BranchShapeRule;

impl ValidationRule for BranchShapeRule {
    fn name(&self) -> &'static str {
        "branch_shape"
    }

    fn validate(
        &self,
        definition: &WorkflowDefinition,
        _ctx: &ValidationContext<'_>,
    ) -> Vec<ValidationIssue> {
        let mut out = Vec::new();
        for (path, branch) in branch_steps(definition) {
            if branch.tracks.len() != 2 {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.tracks", path),
                    format!(
                        "branch '{}' must have exactly two tracks, found {}",
                        branch.id,
                        branch.tracks.len()
                    ),
                ));
            }

            let mut track_ids = HashSet::new();
            for (index, track) in branch.tracks.iter().enumerate() {
                if track.id.trim().is_empty() || !track_ids.insert(track.id.as_str()) {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::InvalidBranch,
                        format!("{}.tracks[{}].id", path, index),
                        format!("branch '{}' track ids must be unique and non-empty", branch.id),
                    ));
                }
                if track.steps.is_empty() {
                    out.push(ValidationIssue::new(
                        ValidationIssueCode::InvalidBranch,
                        format!("{}.tracks[{}].steps", path, index),
                        format!(
                            "track '{}' of branch '{}' must contain at least one step",
                            track.name, branch.id
                        ),
                    ));
                }
            }

            let condition = &branch.condition;
            if !matches!(
                &condition.operator,
                BranchOperator::Equals | BranchOperator::NotEquals
            ) {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.condition.operator", path),
                    format!(
                        "branch '{}' operator '{}' is not supported; use equals or not_equals",
                        branch.id,
                        condition.operator.as_str()
                    ),
                ));
            }
            if !condition.compare_value.is_string() {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.condition.compareValue", path),
                    format!("branch '{}' compare value must be a string", branch.id),
                ));
            }
            if condition.variable_ref.trim().is_empty() {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.condition.variableRef", path),
                    format!("branch '{}' must reference a variable", branch.id),
                ));
            } else if normalize_variable_reference(&condition.variable_ref).is_none() {
                out.push(ValidationIssue::new(
                    ValidationIssueCode::UnsupportedVariableReference,
                    format!("{}.condition.variableRef", path),
                    format!(
                        "branch '{}' references '{}'; only contact fields can be compared",
                        branch.id, condition.variable_ref
                    ),
                ));
            }
        }
        out
    }
}
