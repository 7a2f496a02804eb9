//! Persistence envelope.
//!
//! The authoring document lives under [`AUTHORING_KEY`] inside an opaque record owned by the
//! storage layer. Reading tolerates records written before the key existed by rebuilding a
//! document from their runtime-shaped `steps`.

use crate::core::clock::Clock;
use crate::core::compiler::template::revert_template;
use crate::core::error::AppError;
use crate::core::ids::{EntityKind, IdGenerator};
use crate::core::types::ErrorCategory;
use flowbuilder_types::{
    AdvancementCondition, DurationUnit, RuntimeStep, RuntimeStepKind, RuntimeTriggerKind,
    StandardStep, WorkflowAction, WorkflowDefinition, WorkflowStatus, WorkflowTrigger,
    WORKFLOW_END_STEP_ID,
};
use serde_json::{Map, Value};

pub const AUTHORING_KEY: &str = "flowbuilder.authoring.v2";

const UNTITLED_WORKFLOW: &str = "Untitled workflow";

/// Store `definition` under the authoring key, leaving every other record field alone.
pub fn write_envelope(record: &mut Value, definition: &WorkflowDefinition) -> Result<(), AppError> {
    let object = record.as_object_mut().ok_or_else(|| {
        AppError::new(
            ErrorCategory::SerializationError,
            "persisted record must be a JSON object",
        )
    })?;
    object.insert(AUTHORING_KEY.to_string(), serde_json::to_value(definition)?);
    Ok(())
}

/// Read the authoring document out of `record`.
///
/// A legacy trigger shape under the key is rewritten in `record` itself. Without the key, a
/// best-effort document is rebuilt from the record's runtime steps.
pub fn read_envelope(
    record: &mut Value,
    ids: &mut dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<WorkflowDefinition, AppError> {
    let object = record.as_object_mut().ok_or_else(|| {
        AppError::new(
            ErrorCategory::SerializationError,
            "persisted record must be a JSON object",
        )
    })?;

    match object.get_mut(AUTHORING_KEY) {
        Some(document) => {
            if upgrade_legacy_trigger(document) {
                tracing::warn!("upgraded legacy trigger shape in persisted record");
            }
            Ok(serde_json::from_value(document.clone())?)
        }
        None => {
            tracing::warn!(
                key = AUTHORING_KEY,
                "authoring document missing; reconstructing from runtime steps"
            );
            Ok(reconstruct_definition(object, ids, clock))
        }
    }
}

/// Accept either a bare authoring document or an envelope record.
pub fn load_definition(
    mut value: Value,
    ids: &mut dyn IdGenerator,
    clock: &dyn Clock,
) -> Result<WorkflowDefinition, AppError> {
    if value.get(AUTHORING_KEY).is_some() {
        return read_envelope(&mut value, ids, clock);
    }
    upgrade_legacy_trigger(&mut value);
    Ok(serde_json::from_value(value)?)
}

/// Rewrite an older trigger encoding into the current one. Returns whether anything changed.
///
/// Two legacy forms exist: a bare type string, and `{type, config: {...}}` with the trigger
/// settings nested under `config`.
pub fn upgrade_legacy_trigger(document: &mut Value) -> bool {
    let Some(trigger) = document.get_mut("trigger") else {
        return false;
    };

    if let Some(kind) = trigger.as_str() {
        let mut upgraded = Map::new();
        upgraded.insert("type".to_string(), Value::String(kind.to_string()));
        *trigger = Value::Object(upgraded);
        return true;
    }

    let Some(object) = trigger.as_object_mut() else {
        return false;
    };
    let Some(Value::Object(config)) = object.remove("config") else {
        return false;
    };
    for (key, value) in config {
        object.entry(key).or_insert(value);
    }
    true
}

fn reconstruct_definition(
    record: &Map<String, Value>,
    ids: &mut dyn IdGenerator,
    clock: &dyn Clock,
) -> WorkflowDefinition {
    let now = clock.now();
    let id = record
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| ids.next_id(EntityKind::Workflow));
    let name = record
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or(UNTITLED_WORKFLOW);
    let mut definition = WorkflowDefinition::new(id, name, now);

    if let Some(statuses) = record.get("statuses") {
        match serde_json::from_value::<Vec<WorkflowStatus>>(statuses.clone()) {
            Ok(statuses) => definition.statuses = statuses,
            Err(err) => tracing::warn!("ignoring unreadable statuses: {}", err),
        }
    }

    let runtime_steps = record
        .get("steps")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let mut steps: Vec<StandardStep> = Vec::new();
    for (index, raw) in runtime_steps.into_iter().enumerate() {
        let step: RuntimeStep = match serde_json::from_value(raw) {
            Ok(step) => step,
            Err(err) => {
                tracing::warn!(index, "skipping unreadable runtime step: {}", err);
                continue;
            }
        };
        match step.kind {
            RuntimeStepKind::Trigger(config) => {
                definition.trigger = match config.trigger {
                    RuntimeTriggerKind::Manual => WorkflowTrigger::Manual {
                        initial_status: config.initial_status,
                    },
                    RuntimeTriggerKind::ContactCreated => WorkflowTrigger::ContactCreated {
                        initial_status: config.initial_status,
                    },
                    RuntimeTriggerKind::ContactFieldChanged => {
                        WorkflowTrigger::ContactFieldChanged {
                            watched_fields: config.watched_fields.unwrap_or_default(),
                            initial_status: config.initial_status,
                        }
                    }
                    RuntimeTriggerKind::FormSubmission => WorkflowTrigger::FormSubmission {
                        form_id: config.form_id.unwrap_or_default(),
                        initial_status: config.initial_status,
                    },
                };
            }
            RuntimeStepKind::WaitForTask(config) => {
                let waits_on_last = steps.last().is_some_and(|last| {
                    last.actions
                        .iter()
                        .any(|action| action.id() == config.task_step_id)
                });
                match steps.last_mut() {
                    Some(last) if waits_on_last => {
                        last.advancement = AdvancementCondition::WhenTaskCompleted {
                            task_action_id: config.task_step_id,
                        };
                    }
                    _ => tracing::warn!(
                        step_id = %step.id,
                        "wait step does not follow its task; dropped"
                    ),
                }
            }
            RuntimeStepKind::Delay(config) => {
                let delay = AdvancementCondition::WhenDurationPasses {
                    duration: config.days,
                    unit: DurationUnit::Days,
                };
                match steps.last_mut() {
                    Some(last) if last.advancement == AdvancementCondition::Automatic => {
                        last.advancement = delay;
                    }
                    _ => {
                        let mut pause = StandardStep::new(ids.next_id(EntityKind::Step), step.name);
                        pause.advancement = delay;
                        steps.push(pause);
                    }
                }
            }
            RuntimeStepKind::Condition(config) => {
                if !config.branches.is_empty() {
                    tracing::warn!(
                        step_id = %step.id,
                        "branch structure cannot be rebuilt from runtime steps; dropped"
                    );
                } else if config.default_goto.is_none() && step.id != WORKFLOW_END_STEP_ID {
                    // Anchor of a step that had no actions.
                    steps.push(StandardStep::new(ids.next_id(EntityKind::Step), step.name));
                }
            }
            kind => {
                if let Some(action) = action_from_runtime(&step.id, kind) {
                    let mut rebuilt = StandardStep::new(ids.next_id(EntityKind::Step), step.name);
                    rebuilt.actions.push(action);
                    steps.push(rebuilt);
                }
            }
        }
    }

    definition.steps = steps.into_iter().map(Into::into).collect();
    definition
}

fn action_from_runtime(id: &str, kind: RuntimeStepKind) -> Option<WorkflowAction> {
    let id = id.to_string();
    let action = match kind {
        RuntimeStepKind::AssignTask(mut config) => {
            config.title = revert_template(&config.title);
            config.description = config.description.as_deref().map(revert_template);
            for link in &mut config.links {
                link.label = revert_template(&link.label);
                link.url = revert_template(&link.url);
            }
            WorkflowAction::CreateTask { id, config }
        }
        RuntimeStepKind::SendEmail(mut config) => {
            config.to = revert_template(&config.to);
            config.subject = revert_template(&config.subject);
            config.body = revert_template(&config.body);
            config.cc = config.cc.as_deref().map(revert_template);
            WorkflowAction::SendEmail { id, config }
        }
        RuntimeStepKind::Notification(mut config) => {
            config.title = revert_template(&config.title);
            config.message = revert_template(&config.message);
            config.recipient = config.recipient.as_deref().map(revert_template);
            WorkflowAction::Notification { id, config }
        }
        RuntimeStepKind::UpdateContact(mut config) => {
            for update in &mut config.fields {
                update.value = revert_template(&update.value);
            }
            WorkflowAction::UpdateContact { id, config }
        }
        RuntimeStepKind::UpdateStatus(config) => WorkflowAction::UpdateStatus { id, config },
        _ => return None,
    };
    Some(action)
}
