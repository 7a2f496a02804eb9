use flowbuilder_types::{
    AuthoringStep, StandardStep, WorkflowDefinition, WorkflowTrigger, WorkflowVariable,
};
use serde::{Deserialize, Serialize};

/// Discrete inbound builder events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BuilderEvent {
    TriggerChanged {
        trigger: WorkflowTrigger,
    },
    StepsReordered {
        step_ids: Vec<String>,
    },
    StepAdded {
        step: AuthoringStep,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    StepUpdated {
        step: AuthoringStep,
    },
    StepDeleted {
        step_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback_step_id: Option<String>,
    },
    StepDuplicated {
        step_id: String,
    },
    TrackStepAdded {
        branch_id: String,
        track_id: String,
        step: StandardStep,
    },
    TrackStepDeleted {
        branch_id: String,
        track_id: String,
        step_id: String,
    },
    VariableAdded {
        variable: WorkflowVariable,
    },
    WorkflowReplaced {
        definition: Box<WorkflowDefinition>,
    },
    TriggerSelected,
    StepSelected {
        step_id: String,
    },
    TrackStepSelected {
        branch_id: String,
        track_id: String,
        step_id: String,
    },
    JsonExportToggled,
    DefinitionCommandLogCleared,
}

impl BuilderEvent {
    pub fn type_name(&self) -> &'static str {
        match self {
            BuilderEvent::TriggerChanged { .. } => "trigger_changed",
            BuilderEvent::StepsReordered { .. } => "steps_reordered",
            BuilderEvent::StepAdded { .. } => "step_added",
            BuilderEvent::StepUpdated { .. } => "step_updated",
            BuilderEvent::StepDeleted { .. } => "step_deleted",
            BuilderEvent::StepDuplicated { .. } => "step_duplicated",
            BuilderEvent::TrackStepAdded { .. } => "track_step_added",
            BuilderEvent::TrackStepDeleted { .. } => "track_step_deleted",
            BuilderEvent::VariableAdded { .. } => "variable_added",
            BuilderEvent::WorkflowReplaced { .. } => "workflow_replaced",
            BuilderEvent::TriggerSelected => "trigger_selected",
            BuilderEvent::StepSelected { .. } => "step_selected",
            BuilderEvent::TrackStepSelected { .. } => "track_step_selected",
            BuilderEvent::JsonExportToggled => "json_export_toggled",
            BuilderEvent::DefinitionCommandLogCleared => "definition_command_log_cleared",
        }
    }

    /// Whether applying the event changes the document (and so its version).
    pub fn mutates_document(&self) -> bool {
        !matches!(
            self,
            BuilderEvent::TriggerSelected
                | BuilderEvent::StepSelected { .. }
                | BuilderEvent::TrackStepSelected { .. }
                | BuilderEvent::JsonExportToggled
                | BuilderEvent::DefinitionCommandLogCleared
        )
    }
}
