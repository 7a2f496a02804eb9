use crate::core::clock::{next_version, Clock};
use crate::core::ids::IdGenerator;
use crate::core::workflow_builder::event::BuilderEvent;
use crate::core::workflow_builder::ops::{self, TrackAddress, COPY_SUFFIX};
use crate::core::workflow_builder::selection::Selection;
use flowbuilder_types::WorkflowDefinition;
use serde::{Deserialize, Serialize};

/// Document plus builder focus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuilderState {
    pub definition: WorkflowDefinition,
    pub selection: Selection,
    #[serde(default)]
    pub json_export_open: bool,
}

impl BuilderState {
    pub fn new(definition: WorkflowDefinition) -> Self {
        let selection = Selection::initial(&definition.steps);
        Self {
            definition,
            selection,
            json_export_open: false,
        }
    }
}

/// Collaborators the reducer needs to mint ids and version stamps.
pub struct ReducerContext<'a> {
    pub ids: &'a mut dyn IdGenerator,
    pub clock: &'a dyn Clock,
    pub copy_suffix: &'a str,
}

impl<'a> ReducerContext<'a> {
    pub fn new(ids: &'a mut dyn IdGenerator, clock: &'a dyn Clock) -> Self {
        Self {
            ids,
            clock,
            copy_suffix: COPY_SUFFIX,
        }
    }

    pub fn with_copy_suffix(mut self, suffix: &'a str) -> Self {
        self.copy_suffix = suffix;
        self
    }
}

/// Apply one event. Document-mutating events produce a new version stamp; selection-only
/// events leave the document untouched.
pub fn reduce_builder_state(
    state: &BuilderState,
    event: &BuilderEvent,
    ctx: &mut ReducerContext<'_>,
) -> BuilderState {
    let mut next = state.clone();
    let steps = &state.definition.steps;

    match event {
        BuilderEvent::TriggerChanged { trigger } => {
            next.definition.trigger = trigger.clone();
        }
        BuilderEvent::StepsReordered { step_ids } => {
            next.definition.steps = ops::reorder_steps(steps, step_ids);
        }
        BuilderEvent::StepAdded { step, index } => {
            next.definition.steps = ops::insert_step(steps, step.clone(), *index);
            next.selection = Selection::step(step.id());
        }
        BuilderEvent::StepUpdated { step } => {
            let track = state.selection.track_address();
            next.definition.steps =
                ops::update_workflow_step(steps, step.id(), step.clone(), track.as_ref());
        }
        BuilderEvent::StepDeleted {
            step_id,
            fallback_step_id,
        } => {
            next.definition.steps = ops::remove_step(steps, step_id);
            next.selection = state
                .selection
                .after_step_deleted(&next.definition.steps, fallback_step_id.as_deref());
        }
        BuilderEvent::StepDuplicated { step_id } => {
            let duplicated =
                ops::duplicate_step_in_list(steps, step_id, &mut *ctx.ids, ctx.copy_suffix);
            next.definition.steps = duplicated.items;
            if let Some(new_id) = duplicated.duplicated_id {
                next.selection = Selection::step(new_id);
            }
        }
        BuilderEvent::TrackStepAdded {
            branch_id,
            track_id,
            step,
        } => {
            let address = TrackAddress::new(branch_id.clone(), track_id.clone());
            next.definition.steps = ops::add_track_step_to_branch(steps, &address, step.clone());
            let selection = Selection::track_step(branch_id.clone(), track_id.clone(), step.id.clone());
            if selection.resolves(&next.definition.steps) {
                next.selection = selection;
            }
        }
        BuilderEvent::TrackStepDeleted {
            branch_id,
            track_id,
            step_id,
        } => {
            let address = TrackAddress::new(branch_id.clone(), track_id.clone());
            next.definition.steps = ops::remove_track_step_from_branch(steps, &address, step_id);
            next.selection = state
                .selection
                .after_track_step_deleted(&next.definition.steps, &address);
        }
        BuilderEvent::VariableAdded { variable } => {
            let variables = &mut next.definition.variables;
            match variables.iter_mut().find(|existing| existing.id == variable.id) {
                Some(existing) => *existing = variable.clone(),
                None => variables.push(variable.clone()),
            }
        }
        BuilderEvent::WorkflowReplaced { definition } => {
            let previous_version = state.definition.updated_at.max(definition.updated_at);
            next.definition = definition.as_ref().clone();
            next.definition.updated_at = previous_version;
            next.selection = state.selection.reconcile(&next.definition.steps);
        }
        BuilderEvent::TriggerSelected => {
            next.selection = Selection::Trigger;
        }
        BuilderEvent::StepSelected { step_id } => {
            let selection = Selection::step(step_id.clone());
            if selection.resolves(steps) {
                next.selection = selection;
            }
        }
        BuilderEvent::TrackStepSelected {
            branch_id,
            track_id,
            step_id,
        } => {
            let selection =
                Selection::track_step(branch_id.clone(), track_id.clone(), step_id.clone());
            if selection.resolves(steps) {
                next.selection = selection;
            }
        }
        BuilderEvent::JsonExportToggled => {
            next.json_export_open = !state.json_export_open;
        }
        BuilderEvent::DefinitionCommandLogCleared => {}
    }

    if event.mutates_document() {
        next.definition.updated_at = next_version(next.definition.updated_at, ctx.clock);
    }

    tracing::debug!(
        event = event.type_name(),
        definition_id = %next.definition.id,
        version = %next.definition.updated_at,
        steps = next.definition.steps.len(),
        "builder event applied"
    );
    next
}
