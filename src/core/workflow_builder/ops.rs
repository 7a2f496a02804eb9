//! Pure edits over the authoring step tree.
//!
//! Every function takes the current steps by reference and returns a new list; an id that
//! does not resolve leaves the input unchanged.

use crate::core::ids::{EntityKind, IdGenerator};
use flowbuilder_types::{
    AdvancementCondition, AuthoringStep, BranchStep, BranchTrack, StandardStep, WorkflowAction,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Suffix appended to the name of a duplicated step.
pub const COPY_SUFFIX: &str = " (Copy)";

/// Address of one track inside one branch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackAddress {
    pub branch_id: String,
    pub track_id: String,
}

impl TrackAddress {
    pub fn new(branch_id: impl Into<String>, track_id: impl Into<String>) -> Self {
        Self {
            branch_id: branch_id.into(),
            track_id: track_id.into(),
        }
    }
}

/// Result of a duplicate operation. `duplicated_id` is `None` when the source id was absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Duplicated<T> {
    pub items: Vec<T>,
    pub duplicated_id: Option<String>,
}

/// A step resolved from either addressing level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepRef<'a> {
    TopLevel(&'a AuthoringStep),
    Track {
        branch: &'a BranchStep,
        track: &'a BranchTrack,
        step: &'a StandardStep,
    },
}

impl<'a> StepRef<'a> {
    pub fn id(&self) -> &'a str {
        match self {
            StepRef::TopLevel(step) => step.id(),
            StepRef::Track { step, .. } => &step.id,
        }
    }
}

pub fn clone_action(action: &WorkflowAction, ids: &mut dyn IdGenerator) -> WorkflowAction {
    let mut cloned = action.clone();
    cloned.set_id(ids.next_id(EntityKind::Action));
    cloned
}

/// Deep copy with fresh step and action ids. Task references in the advancement condition
/// follow the renamed actions.
pub fn clone_standard_step(
    step: &StandardStep,
    ids: &mut dyn IdGenerator,
    suffix: Option<&str>,
) -> StandardStep {
    let mut renamed: HashMap<String, String> = HashMap::new();
    let actions = step
        .actions
        .iter()
        .map(|action| {
            let cloned = clone_action(action, ids);
            renamed.insert(action.id().to_string(), cloned.id().to_string());
            cloned
        })
        .collect();

    StandardStep {
        id: ids.next_id(EntityKind::Step),
        name: with_suffix(&step.name, suffix),
        actions,
        advancement: remap_task_references(&step.advancement, &renamed),
        phase_id: step.phase_id.clone(),
        description: step.description.clone(),
    }
}

/// Deep copy of a branch: fresh branch, track, nested step and action ids.
/// Only the branch itself is renamed.
pub fn clone_branch_step(
    branch: &BranchStep,
    ids: &mut dyn IdGenerator,
    suffix: Option<&str>,
) -> BranchStep {
    let id = ids.next_id(EntityKind::Branch);
    let tracks = branch
        .tracks
        .iter()
        .map(|track| BranchTrack {
            id: ids.next_id(EntityKind::Track),
            name: track.name.clone(),
            steps: track
                .steps
                .iter()
                .map(|step| clone_standard_step(step, ids, None))
                .collect(),
        })
        .collect();

    BranchStep {
        id,
        name: with_suffix(&branch.name, suffix),
        condition: branch.condition.clone(),
        tracks,
        description: branch.description.clone(),
    }
}

pub fn clone_step(
    step: &AuthoringStep,
    ids: &mut dyn IdGenerator,
    suffix: Option<&str>,
) -> AuthoringStep {
    match step {
        AuthoringStep::Standard(standard) => {
            AuthoringStep::Standard(clone_standard_step(standard, ids, suffix))
        }
        AuthoringStep::Branch(branch) => {
            AuthoringStep::Branch(clone_branch_step(branch, ids, suffix))
        }
    }
}

/// Clone the step with `step_id` and insert the copy right after it.
pub fn duplicate_step_in_list(
    steps: &[AuthoringStep],
    step_id: &str,
    ids: &mut dyn IdGenerator,
    suffix: &str,
) -> Duplicated<AuthoringStep> {
    let Some(index) = steps.iter().position(|step| step.id() == step_id) else {
        return Duplicated {
            items: steps.to_vec(),
            duplicated_id: None,
        };
    };
    let copy = clone_step(&steps[index], ids, Some(suffix));
    let duplicated_id = copy.id().to_string();
    let mut items = steps.to_vec();
    items.insert(index + 1, copy);
    Duplicated {
        items,
        duplicated_id: Some(duplicated_id),
    }
}

/// Clone the action with `action_id` and insert the copy right after it.
pub fn duplicate_action_in_list(
    actions: &[WorkflowAction],
    action_id: &str,
    ids: &mut dyn IdGenerator,
) -> Duplicated<WorkflowAction> {
    let Some(index) = actions.iter().position(|action| action.id() == action_id) else {
        return Duplicated {
            items: actions.to_vec(),
            duplicated_id: None,
        };
    };
    let copy = clone_action(&actions[index], ids);
    let duplicated_id = copy.id().to_string();
    let mut items = actions.to_vec();
    items.insert(index + 1, copy);
    Duplicated {
        items,
        duplicated_id: Some(duplicated_id),
    }
}

/// Resolve a step by top-level id first, then by track address.
pub fn find_selected_step<'a>(
    steps: &'a [AuthoringStep],
    step_id: &str,
    track: Option<&TrackAddress>,
) -> Option<StepRef<'a>> {
    if let Some(step) = steps.iter().find(|step| step.id() == step_id) {
        return Some(StepRef::TopLevel(step));
    }
    let address = track?;
    let branch = find_branch(steps, &address.branch_id)?;
    let track = branch.track(&address.track_id)?;
    let step = track.steps.iter().find(|step| step.id == step_id)?;
    Some(StepRef::Track {
        branch,
        track,
        step,
    })
}

pub fn find_branch<'a>(steps: &'a [AuthoringStep], branch_id: &str) -> Option<&'a BranchStep> {
    steps
        .iter()
        .filter_map(AuthoringStep::as_branch)
        .find(|branch| branch.id == branch_id)
}

/// Replace a step at the top level, or inside the addressed track. Only standard steps can
/// live in a track.
pub fn update_workflow_step(
    steps: &[AuthoringStep],
    step_id: &str,
    updated: AuthoringStep,
    track: Option<&TrackAddress>,
) -> Vec<AuthoringStep> {
    let mut items = steps.to_vec();
    if let Some(slot) = items.iter_mut().find(|step| step.id() == step_id) {
        *slot = updated;
        return items;
    }

    let (Some(address), AuthoringStep::Standard(updated)) = (track, updated) else {
        return items;
    };
    if let Some(slot) = track_mut(&mut items, address)
        .and_then(|track| track.steps.iter_mut().find(|step| step.id == step_id))
    {
        *slot = updated;
    }
    items
}

pub fn add_track_step_to_branch(
    steps: &[AuthoringStep],
    address: &TrackAddress,
    step: StandardStep,
) -> Vec<AuthoringStep> {
    let mut items = steps.to_vec();
    if let Some(track) = track_mut(&mut items, address) {
        track.steps.push(step);
    }
    items
}

pub fn remove_track_step_from_branch(
    steps: &[AuthoringStep],
    address: &TrackAddress,
    step_id: &str,
) -> Vec<AuthoringStep> {
    let mut items = steps.to_vec();
    if let Some(track) = track_mut(&mut items, address) {
        track.steps.retain(|step| step.id != step_id);
    }
    items
}

pub fn insert_step(
    steps: &[AuthoringStep],
    step: AuthoringStep,
    index: Option<usize>,
) -> Vec<AuthoringStep> {
    let mut items = steps.to_vec();
    let index = index.unwrap_or(items.len()).min(items.len());
    items.insert(index, step);
    items
}

pub fn remove_step(steps: &[AuthoringStep], step_id: &str) -> Vec<AuthoringStep> {
    steps
        .iter()
        .filter(|step| step.id() != step_id)
        .cloned()
        .collect()
}

/// Order steps by `ordered_ids`. Unknown ids are ignored and unnamed steps keep their
/// relative order after the named ones.
pub fn reorder_steps(steps: &[AuthoringStep], ordered_ids: &[String]) -> Vec<AuthoringStep> {
    let mut remaining: Vec<Option<&AuthoringStep>> = steps.iter().map(Some).collect();
    let mut items = Vec::with_capacity(steps.len());
    for id in ordered_ids {
        if let Some(slot) = remaining
            .iter_mut()
            .find(|slot| slot.is_some_and(|step| step.id() == id))
        {
            if let Some(step) = slot.take() {
                items.push(step.clone());
            }
        }
    }
    items.extend(remaining.into_iter().flatten().cloned());
    items
}

fn track_mut<'a>(
    steps: &'a mut [AuthoringStep],
    address: &TrackAddress,
) -> Option<&'a mut BranchTrack> {
    steps
        .iter_mut()
        .filter_map(AuthoringStep::as_branch_mut)
        .find(|branch| branch.id == address.branch_id)?
        .track_mut(&address.track_id)
}

fn with_suffix(name: &str, suffix: Option<&str>) -> String {
    match suffix {
        Some(suffix) => format!("{}{}", name, suffix),
        None => name.to_string(),
    }
}

fn remap_task_references(
    advancement: &AdvancementCondition,
    renamed: &HashMap<String, String>,
) -> AdvancementCondition {
    let remap = |id: &String| renamed.get(id).cloned().unwrap_or_else(|| id.clone());
    match advancement {
        AdvancementCondition::WhenTaskCompleted { task_action_id } => {
            AdvancementCondition::WhenTaskCompleted {
                task_action_id: remap(task_action_id),
            }
        }
        AdvancementCondition::WhenTasksCompleted {
            task_action_ids,
            mode,
        } => AdvancementCondition::WhenTasksCompleted {
            task_action_ids: task_action_ids.iter().map(remap).collect(),
            mode: *mode,
        },
        AdvancementCondition::Compound {
            operator,
            conditions,
        } => AdvancementCondition::Compound {
            operator: *operator,
            conditions: conditions
                .iter()
                .map(|condition| remap_task_references(condition, renamed))
                .collect(),
        },
        other => other.clone(),
    }
}
