use crate::core::workflow_builder::ops::{find_selected_step, TrackAddress};
use flowbuilder_types::AuthoringStep;
use serde::{Deserialize, Serialize};

/// The single focus of the builder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Selection {
    #[default]
    None,
    Trigger,
    Step {
        step_id: String,
    },
    TrackStep {
        branch_id: String,
        track_id: String,
        step_id: String,
    },
}

impl Selection {
    pub fn step(step_id: impl Into<String>) -> Self {
        Selection::Step {
            step_id: step_id.into(),
        }
    }

    pub fn track_step(
        branch_id: impl Into<String>,
        track_id: impl Into<String>,
        step_id: impl Into<String>,
    ) -> Self {
        Selection::TrackStep {
            branch_id: branch_id.into(),
            track_id: track_id.into(),
            step_id: step_id.into(),
        }
    }

    /// Initial focus for a document: its first step, or nothing.
    pub fn initial(steps: &[AuthoringStep]) -> Self {
        first_step_or_none(steps)
    }

    pub fn selected_step_id(&self) -> Option<&str> {
        match self {
            Selection::Step { step_id } | Selection::TrackStep { step_id, .. } => Some(step_id),
            Selection::None | Selection::Trigger => None,
        }
    }

    pub fn track_address(&self) -> Option<TrackAddress> {
        match self {
            Selection::TrackStep {
                branch_id,
                track_id,
                ..
            } => Some(TrackAddress::new(branch_id.clone(), track_id.clone())),
            _ => None,
        }
    }

    pub fn is_track_step(&self) -> bool {
        matches!(self, Selection::TrackStep { .. })
    }

    /// Whether the selection still points at something in `steps`.
    pub fn resolves(&self, steps: &[AuthoringStep]) -> bool {
        match self {
            Selection::None | Selection::Trigger => true,
            Selection::Step { step_id } => steps.iter().any(|step| step.id() == step_id),
            Selection::TrackStep { step_id, .. } => {
                let address = self.track_address();
                find_selected_step(steps, step_id, address.as_ref()).is_some()
            }
        }
    }

    /// Focus after a top-level step was deleted. Only a selection left dangling moves: to
    /// `fallback` when it still exists, else to the first remaining step, else to nothing.
    pub fn after_step_deleted(
        &self,
        remaining: &[AuthoringStep],
        fallback: Option<&str>,
    ) -> Selection {
        if self.resolves(remaining) {
            return self.clone();
        }
        match fallback.filter(|id| remaining.iter().any(|step| step.id() == *id)) {
            Some(id) => Selection::step(id),
            None => first_step_or_none(remaining),
        }
    }

    /// Focus after a track step was deleted: a dangling selection moves to the parent branch.
    pub fn after_track_step_deleted(
        &self,
        remaining: &[AuthoringStep],
        address: &TrackAddress,
    ) -> Selection {
        if self.resolves(remaining) {
            return self.clone();
        }
        if remaining.iter().any(|step| step.id() == address.branch_id) {
            Selection::step(address.branch_id.clone())
        } else {
            first_step_or_none(remaining)
        }
    }

    /// Keep the selection if it resolves in `steps`, otherwise fall back to the first step.
    pub fn reconcile(&self, steps: &[AuthoringStep]) -> Selection {
        if self.resolves(steps) {
            self.clone()
        } else {
            first_step_or_none(steps)
        }
    }
}

fn first_step_or_none(steps: &[AuthoringStep]) -> Selection {
    steps
        .first()
        .map(|step| Selection::step(step.id()))
        .unwrap_or(Selection::None)
}
