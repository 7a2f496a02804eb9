use super::template::{convert_template, normalize_variable_reference};
use super::{CompileOptions, ValidationIssueCode, WorkflowCompileError};
use flowbuilder_types::{
    AdvancementCondition, AuthoringStep, BranchOperator, BranchStep, ConditionBranch,
    ConditionConfig, ConditionTest, DelayConfig, RuntimeStep, RuntimeStepKind,
    RuntimeTriggerKind, StandardStep, TriggerStepConfig, WaitForTaskConfig, WorkflowAction,
    WorkflowDefinition, WorkflowTrigger, WORKFLOW_END_STEP_ID,
};
use std::collections::{HashMap, HashSet};

const TRIGGER_STEP_ID: &str = "trigger";

/// Hands out runtime ids, renaming on collision instead of failing.
#[derive(Debug, Default)]
struct IdRegistry {
    used: HashSet<String>,
}

impl IdRegistry {
    fn claim(&mut self, candidate: &str) -> String {
        if self.used.insert(candidate.to_string()) {
            return candidate.to_string();
        }
        let mut suffix = 2;
        loop {
            let renamed = format!("{}_{}", candidate, suffix);
            if self.used.insert(renamed.clone()) {
                tracing::warn!(
                    original = candidate,
                    renamed = %renamed,
                    "runtime step id collision; renamed"
                );
                return renamed;
            }
            suffix += 1;
        }
    }
}

/// A merge step whose goto is filled in once every top-level chunk exists.
struct PendingMerge {
    step_index: usize,
    chunk_index: usize,
}

struct Lowering<'a> {
    options: &'a CompileOptions,
    ids: IdRegistry,
    steps: Vec<RuntimeStep>,
    chunk_starts: Vec<String>,
    pending_merges: Vec<PendingMerge>,
}

/// Lower an already validated document into the flat runtime step list.
pub(super) fn lower_definition(
    definition: &WorkflowDefinition,
    options: &CompileOptions,
) -> Result<Vec<RuntimeStep>, WorkflowCompileError> {
    let mut lowering = Lowering {
        options,
        ids: IdRegistry::default(),
        steps: Vec::new(),
        chunk_starts: Vec::with_capacity(definition.steps.len()),
        pending_merges: Vec::new(),
    };
    lowering.ids.claim(WORKFLOW_END_STEP_ID);

    let trigger = lower_trigger(&definition.trigger)?;
    let trigger_id = lowering.ids.claim(TRIGGER_STEP_ID);
    lowering.steps.push(RuntimeStep::new(trigger_id, "Trigger", trigger));

    for (chunk_index, step) in definition.steps.iter().enumerate() {
        let chunk_start = lowering.steps.len();
        match step {
            AuthoringStep::Standard(standard) => {
                let compiled =
                    lowering.lower_standard(standard, &format!("steps[{}]", chunk_index))?;
                lowering.steps.extend(compiled);
            }
            AuthoringStep::Branch(branch) => {
                lowering.lower_branch(branch, chunk_index)?;
            }
        }
        match lowering.steps.get(chunk_start) {
            Some(first) => lowering.chunk_starts.push(first.id.clone()),
            None => {
                return Err(WorkflowCompileError::single(
                    ValidationIssueCode::InvalidShape,
                    format!("steps[{}]", chunk_index),
                    format!("step '{}' compiled to no runtime steps", step.id()),
                ))
            }
        }
    }

    lowering.steps.push(RuntimeStep::new(
        WORKFLOW_END_STEP_ID,
        "End",
        RuntimeStepKind::Condition(ConditionConfig::default()),
    ));
    lowering.patch_merges();

    verify_runtime_steps(&lowering.steps)?;
    Ok(lowering.steps)
}

impl Lowering<'_> {
    fn lower_standard(
        &mut self,
        step: &StandardStep,
        path: &str,
    ) -> Result<Vec<RuntimeStep>, WorkflowCompileError> {
        let mut compiled = Vec::new();
        let mut task_steps: HashMap<&str, (String, Option<u32>)> = HashMap::new();

        for (index, action) in step.actions.iter().enumerate() {
            let kind = lower_action(action).ok_or_else(|| {
                WorkflowCompileError::single(
                    ValidationIssueCode::UnsupportedAction,
                    format!("{}.actions[{}].type", path, index),
                    format!("action type '{}' cannot be compiled", action.type_name()),
                )
            })?;
            let id = self.ids.claim(action.id());
            if let WorkflowAction::CreateTask { config, .. } = action {
                task_steps.insert(action.id(), (id.clone(), config.due_days));
            }
            compiled.push(RuntimeStep::new(id, step.name.clone(), kind));
        }

        match &step.advancement {
            AdvancementCondition::Automatic => {}
            AdvancementCondition::WhenTaskCompleted { task_action_id } => {
                let (task_step_id, due_days) =
                    task_steps.get(task_action_id.as_str()).ok_or_else(|| {
                        WorkflowCompileError::single(
                            ValidationIssueCode::InvalidAdvancement,
                            format!("{}.advancement.taskActionId", path),
                            format!(
                                "task action '{}' is not part of step '{}'",
                                task_action_id, step.id
                            ),
                        )
                    })?;
                let timeout_days = due_days
                    .unwrap_or(self.options.default_task_wait_days)
                    .max(1);
                let id = self.ids.claim(&format!("{}__wait", step.id));
                compiled.push(RuntimeStep::new(
                    id,
                    format!("{}: wait for task", step.name),
                    RuntimeStepKind::WaitForTask(WaitForTaskConfig {
                        task_step_id: task_step_id.clone(),
                        timeout_days,
                    }),
                ));
            }
            AdvancementCondition::WhenDurationPasses { duration, unit } => {
                let days = unit.to_days(*duration);
                if !(days.is_finite() && days > 0.0) {
                    return Err(WorkflowCompileError::single(
                        ValidationIssueCode::InvalidAdvancement,
                        format!("{}.advancement.duration", path),
                        format!("delay of {} {:?} is not a usable day count", duration, unit),
                    ));
                }
                let id = self.ids.claim(&format!("{}__delay", step.id));
                compiled.push(RuntimeStep::new(
                    id,
                    format!("{}: delay", step.name),
                    RuntimeStepKind::Delay(DelayConfig { days }),
                ));
            }
            other => {
                return Err(WorkflowCompileError::single(
                    ValidationIssueCode::UnsupportedAdvancement,
                    format!("{}.advancement", path),
                    format!("advancement '{}' cannot be compiled", other.type_name()),
                ))
            }
        }

        if compiled.is_empty() {
            let id = self.ids.claim(&step.id);
            compiled.push(RuntimeStep::new(
                id,
                step.name.clone(),
                RuntimeStepKind::Condition(ConditionConfig::default()),
            ));
        }
        Ok(compiled)
    }

    /// Emits: condition, track A, merge, track B. Track B falls through to the next chunk.
    fn lower_branch(
        &mut self,
        branch: &BranchStep,
        chunk_index: usize,
    ) -> Result<(), WorkflowCompileError> {
        let path = format!("steps[{}]", chunk_index);
        let [track_a, track_b] = branch.tracks.as_slice() else {
            return Err(WorkflowCompileError::single(
                ValidationIssueCode::InvalidBranch,
                format!("{}.tracks", path),
                format!("branch '{}' must have exactly two tracks", branch.id),
            ));
        };
        let variable = normalize_variable_reference(&branch.condition.variable_ref).ok_or_else(
            || {
                WorkflowCompileError::single(
                    ValidationIssueCode::UnsupportedVariableReference,
                    format!("{}.condition.variableRef", path),
                    format!(
                        "'{}' is not a contact field reference",
                        branch.condition.variable_ref
                    ),
                )
            },
        )?;
        let value = branch
            .condition
            .compare_value
            .as_str()
            .ok_or_else(|| {
                WorkflowCompileError::single(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.condition.compareValue", path),
                    "compare value must be a string",
                )
            })?
            .to_string();

        let condition_id = self.ids.claim(&branch.id);
        let mut compiled_a = Vec::new();
        for (index, step) in track_a.steps.iter().enumerate() {
            let nested_path = format!("{}.tracks[0].steps[{}]", path, index);
            compiled_a.extend(self.lower_standard(step, &nested_path)?);
        }
        let merge_id = self.ids.claim(&format!("{}__merge", branch.id));
        let mut compiled_b = Vec::new();
        for (index, step) in track_b.steps.iter().enumerate() {
            let nested_path = format!("{}.tracks[1].steps[{}]", path, index);
            compiled_b.extend(self.lower_standard(step, &nested_path)?);
        }

        let (Some(start_a), Some(start_b)) = (compiled_a.first(), compiled_b.first()) else {
            return Err(WorkflowCompileError::single(
                ValidationIssueCode::InvalidBranch,
                format!("{}.tracks", path),
                format!("both tracks of branch '{}' must contain steps", branch.id),
            ));
        };
        let (match_target, default_target) = match &branch.condition.operator {
            BranchOperator::Equals => (start_a.id.clone(), start_b.id.clone()),
            BranchOperator::NotEquals => (start_b.id.clone(), start_a.id.clone()),
            other => {
                return Err(WorkflowCompileError::single(
                    ValidationIssueCode::InvalidBranch,
                    format!("{}.condition.operator", path),
                    format!("operator '{}' cannot be compiled", other.as_str()),
                ))
            }
        };

        self.steps.push(RuntimeStep::new(
            condition_id,
            branch.name.clone(),
            RuntimeStepKind::Condition(ConditionConfig {
                branches: vec![ConditionBranch {
                    when: Some(ConditionTest {
                        variable,
                        operator: BranchOperator::Equals,
                        value,
                    }),
                    goto: match_target,
                }],
                default_goto: Some(default_target),
            }),
        ));
        self.steps.extend(compiled_a);
        self.pending_merges.push(PendingMerge {
            step_index: self.steps.len(),
            chunk_index,
        });
        self.steps.push(RuntimeStep::new(
            merge_id,
            format!("{}: merge", branch.name),
            RuntimeStepKind::Condition(ConditionConfig {
                branches: vec![ConditionBranch {
                    when: None,
                    goto: WORKFLOW_END_STEP_ID.to_string(),
                }],
                default_goto: None,
            }),
        ));
        self.steps.extend(compiled_b);
        Ok(())
    }

    fn patch_merges(&mut self) {
        for pending in std::mem::take(&mut self.pending_merges) {
            let target = self
                .chunk_starts
                .get(pending.chunk_index + 1)
                .cloned()
                .unwrap_or_else(|| WORKFLOW_END_STEP_ID.to_string());
            if let Some(RuntimeStepKind::Condition(config)) = self
                .steps
                .get_mut(pending.step_index)
                .map(|step| &mut step.kind)
            {
                for branch in &mut config.branches {
                    branch.goto = target.clone();
                }
            }
        }
    }
}

fn lower_trigger(trigger: &WorkflowTrigger) -> Result<RuntimeStepKind, WorkflowCompileError> {
    let initial_status = trigger.initial_status().map(str::to_string);
    let config = match trigger {
        WorkflowTrigger::Manual { .. } => TriggerStepConfig {
            trigger: RuntimeTriggerKind::Manual,
            watched_fields: None,
            form_id: None,
            initial_status,
        },
        WorkflowTrigger::ContactCreated { .. } => TriggerStepConfig {
            trigger: RuntimeTriggerKind::ContactCreated,
            watched_fields: None,
            form_id: None,
            initial_status,
        },
        WorkflowTrigger::ContactFieldChanged { watched_fields, .. } => TriggerStepConfig {
            trigger: RuntimeTriggerKind::ContactFieldChanged,
            watched_fields: Some(watched_fields.clone()),
            form_id: None,
            initial_status,
        },
        WorkflowTrigger::FormSubmission { form_id, .. } => TriggerStepConfig {
            trigger: RuntimeTriggerKind::FormSubmission,
            watched_fields: None,
            form_id: Some(form_id.clone()),
            initial_status,
        },
        WorkflowTrigger::Api { .. } => {
            return Err(WorkflowCompileError::single(
                ValidationIssueCode::InvalidShape,
                "trigger.type",
                "api triggers cannot be compiled",
            ))
        }
    };
    Ok(RuntimeStepKind::Trigger(config))
}

/// Runtime form of an action with every template field converted.
fn lower_action(action: &WorkflowAction) -> Option<RuntimeStepKind> {
    let kind = match action {
        WorkflowAction::CreateTask { config, .. } => {
            let mut config = config.clone();
            config.title = convert_template(&config.title);
            config.description = config.description.as_deref().map(convert_template);
            for link in &mut config.links {
                link.label = convert_template(&link.label);
                link.url = convert_template(&link.url);
            }
            RuntimeStepKind::AssignTask(config)
        }
        WorkflowAction::SendEmail { config, .. } => {
            let mut config = config.clone();
            config.to = convert_template(&config.to);
            config.subject = convert_template(&config.subject);
            config.body = convert_template(&config.body);
            config.cc = config.cc.as_deref().map(convert_template);
            RuntimeStepKind::SendEmail(config)
        }
        WorkflowAction::Notification { config, .. } => {
            let mut config = config.clone();
            config.title = convert_template(&config.title);
            config.message = convert_template(&config.message);
            config.recipient = config.recipient.as_deref().map(convert_template);
            RuntimeStepKind::Notification(config)
        }
        WorkflowAction::UpdateContact { config, .. } => {
            let mut config = config.clone();
            for update in &mut config.fields {
                update.value = convert_template(&update.value);
            }
            RuntimeStepKind::UpdateContact(config)
        }
        WorkflowAction::UpdateStatus { config, .. } => RuntimeStepKind::UpdateStatus(config.clone()),
        WorkflowAction::UpdateTask { .. }
        | WorkflowAction::CreateContact { .. }
        | WorkflowAction::SetVariable { .. }
        | WorkflowAction::Other { .. } => return None,
    };
    Some(kind)
}

/// Post-lowering check: ids unique, every goto resolves.
fn verify_runtime_steps(steps: &[RuntimeStep]) -> Result<(), WorkflowCompileError> {
    let mut ids = HashSet::new();
    for (index, step) in steps.iter().enumerate() {
        if !ids.insert(step.id.as_str()) {
            return Err(WorkflowCompileError::single(
                ValidationIssueCode::InvalidShape,
                format!("runtime[{}].id", index),
                format!("runtime step id '{}' is emitted twice", step.id),
            ));
        }
    }
    for (index, step) in steps.iter().enumerate() {
        for target in step.goto_targets() {
            if !ids.contains(target) {
                return Err(WorkflowCompileError::single(
                    ValidationIssueCode::InvalidShape,
                    format!("runtime[{}].goto", index),
                    format!("step '{}' jumps to unknown step '{}'", step.id, target),
                ));
            }
        }
    }
    Ok(())
}
