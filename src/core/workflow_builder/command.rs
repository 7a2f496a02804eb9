//! Derivation of externally stable definition commands from builder transitions.

use crate::core::workflow_builder::event::BuilderEvent;
use crate::core::workflow_builder::reducer::BuilderState;
use chrono::{DateTime, Utc};
use flowbuilder_types::{
    AuthoringStep, StandardStep, WorkflowDefinition, WorkflowTrigger, WorkflowVariable,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Closed vocabulary of outbound command types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionCommandType {
    #[serde(rename = "definition.replace")]
    Replace,
    SetTrigger,
    ReorderSteps,
    AddStep,
    UpdateStep,
    UpdateTrackStep,
    DeleteStep,
    DuplicateStep,
    AddTrackStep,
    DeleteTrackStep,
    AddVariable,
}

impl DefinitionCommandType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DefinitionCommandType::Replace => "definition.replace",
            DefinitionCommandType::SetTrigger => "set_trigger",
            DefinitionCommandType::ReorderSteps => "reorder_steps",
            DefinitionCommandType::AddStep => "add_step",
            DefinitionCommandType::UpdateStep => "update_step",
            DefinitionCommandType::UpdateTrackStep => "update_track_step",
            DefinitionCommandType::DeleteStep => "delete_step",
            DefinitionCommandType::DuplicateStep => "duplicate_step",
            DefinitionCommandType::AddTrackStep => "add_track_step",
            DefinitionCommandType::DeleteTrackStep => "delete_track_step",
            DefinitionCommandType::AddVariable => "add_variable",
        }
    }
}

impl fmt::Display for DefinitionCommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum CommandPayload {
    Replace {
        definition: Box<WorkflowDefinition>,
    },
    SetTrigger {
        trigger: WorkflowTrigger,
    },
    ReorderSteps {
        step_ids: Vec<String>,
    },
    AddStep {
        step: AuthoringStep,
        index: Option<usize>,
    },
    UpdateStep {
        step: AuthoringStep,
    },
    UpdateTrackStep {
        branch_id: String,
        track_id: String,
        step: AuthoringStep,
    },
    DeleteStep {
        step_id: String,
    },
    DuplicateStep {
        source_step_id: String,
        duplicated_step_id: Option<String>,
    },
    AddTrackStep {
        branch_id: String,
        track_id: String,
        step: StandardStep,
    },
    DeleteTrackStep {
        branch_id: String,
        track_id: String,
        step_id: String,
    },
    AddVariable {
        variable: WorkflowVariable,
    },
}

impl CommandPayload {
    pub fn command_type(&self) -> DefinitionCommandType {
        match self {
            CommandPayload::Replace { .. } => DefinitionCommandType::Replace,
            CommandPayload::SetTrigger { .. } => DefinitionCommandType::SetTrigger,
            CommandPayload::ReorderSteps { .. } => DefinitionCommandType::ReorderSteps,
            CommandPayload::AddStep { .. } => DefinitionCommandType::AddStep,
            CommandPayload::UpdateStep { .. } => DefinitionCommandType::UpdateStep,
            CommandPayload::UpdateTrackStep { .. } => DefinitionCommandType::UpdateTrackStep,
            CommandPayload::DeleteStep { .. } => DefinitionCommandType::DeleteStep,
            CommandPayload::DuplicateStep { .. } => DefinitionCommandType::DuplicateStep,
            CommandPayload::AddTrackStep { .. } => DefinitionCommandType::AddTrackStep,
            CommandPayload::DeleteTrackStep { .. } => DefinitionCommandType::DeleteTrackStep,
            CommandPayload::AddVariable { .. } => DefinitionCommandType::AddVariable,
        }
    }
}

/// One audit-log record describing a document mutation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionCommand {
    #[serde(rename = "type")]
    pub command_type: DefinitionCommandType,
    pub definition_id: String,
    pub definition_version: DateTime<Utc>,
    pub payload: CommandPayload,
}

impl DefinitionCommand {
    fn new(next: &BuilderState, payload: CommandPayload) -> Self {
        Self {
            command_type: payload.command_type(),
            definition_id: next.definition.id.clone(),
            definition_version: next.definition.updated_at,
            payload,
        }
    }
}

/// Map a transition to its command. UI-only events produce `None`.
///
/// `step_updated` is addressed by the selection held *before* the event: a track-step
/// selection yields `update_track_step`, anything else `update_step`.
pub fn serialize_definition_command(
    event: &BuilderEvent,
    previous: &BuilderState,
    next: &BuilderState,
) -> Option<DefinitionCommand> {
    let payload = match event {
        BuilderEvent::TriggerChanged { trigger } => CommandPayload::SetTrigger {
            trigger: trigger.clone(),
        },
        BuilderEvent::StepsReordered { .. } => CommandPayload::ReorderSteps {
            step_ids: next
                .definition
                .steps
                .iter()
                .map(|step| step.id().to_string())
                .collect(),
        },
        BuilderEvent::StepAdded { step, .. } => CommandPayload::AddStep {
            step: step.clone(),
            index: next
                .definition
                .steps
                .iter()
                .position(|candidate| candidate.id() == step.id()),
        },
        BuilderEvent::StepUpdated { step } => match &previous.selection.track_address() {
            Some(address) => CommandPayload::UpdateTrackStep {
                branch_id: address.branch_id.clone(),
                track_id: address.track_id.clone(),
                step: step.clone(),
            },
            None => CommandPayload::UpdateStep { step: step.clone() },
        },
        BuilderEvent::StepDeleted { step_id, .. } => CommandPayload::DeleteStep {
            step_id: step_id.clone(),
        },
        BuilderEvent::StepDuplicated { step_id } => CommandPayload::DuplicateStep {
            source_step_id: step_id.clone(),
            duplicated_step_id: new_step_id(&previous.definition, &next.definition),
        },
        BuilderEvent::TrackStepAdded {
            branch_id,
            track_id,
            step,
        } => CommandPayload::AddTrackStep {
            branch_id: branch_id.clone(),
            track_id: track_id.clone(),
            step: step.clone(),
        },
        BuilderEvent::TrackStepDeleted {
            branch_id,
            track_id,
            step_id,
        } => CommandPayload::DeleteTrackStep {
            branch_id: branch_id.clone(),
            track_id: track_id.clone(),
            step_id: step_id.clone(),
        },
        BuilderEvent::VariableAdded { variable } => CommandPayload::AddVariable {
            variable: variable.clone(),
        },
        BuilderEvent::WorkflowReplaced { .. } => CommandPayload::Replace {
            definition: Box::new(next.definition.clone()),
        },
        BuilderEvent::TriggerSelected
        | BuilderEvent::StepSelected { .. }
        | BuilderEvent::TrackStepSelected { .. }
        | BuilderEvent::JsonExportToggled
        | BuilderEvent::DefinitionCommandLogCleared => return None,
    };

    let command = DefinitionCommand::new(next, payload);
    tracing::debug!(
        command = %command.command_type,
        definition_id = %command.definition_id,
        "definition command derived"
    );
    Some(command)
}

/// The first top-level id present in `next` but not in `previous`.
fn new_step_id(previous: &WorkflowDefinition, next: &WorkflowDefinition) -> Option<String> {
    let known: HashSet<&str> = previous.steps.iter().map(AuthoringStep::id).collect();
    next.steps
        .iter()
        .map(AuthoringStep::id)
        .find(|id| !known.contains(id))
        .map(str::to_string)
}
