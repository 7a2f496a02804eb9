use crate::core::clock::Clock;
use crate::core::ids::IdGenerator;
use crate::core::workflow_builder::command::{serialize_definition_command, DefinitionCommand};
use crate::core::workflow_builder::event::BuilderEvent;
use crate::core::workflow_builder::ops::COPY_SUFFIX;
use crate::core::workflow_builder::reducer::{reduce_builder_state, BuilderState, ReducerContext};
use flowbuilder_types::WorkflowDefinition;
use serde::Serialize;

/// Builder state plus the append-only command log derived from it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub builder: BuilderState,
    pub command_log: Vec<DefinitionCommand>,
}

impl SessionState {
    pub fn new(definition: WorkflowDefinition) -> Self {
        Self {
            builder: BuilderState::new(definition),
            command_log: Vec::new(),
        }
    }
}

/// Reduce the builder state, then append the derived command (if any) to the log.
/// `definition_command_log_cleared` empties the log and nothing else.
pub fn reduce_session(
    state: &SessionState,
    event: &BuilderEvent,
    ctx: &mut ReducerContext<'_>,
) -> SessionState {
    if let BuilderEvent::DefinitionCommandLogCleared = event {
        tracing::debug!(cleared = state.command_log.len(), "definition command log cleared");
        return SessionState {
            builder: state.builder.clone(),
            command_log: Vec::new(),
        };
    }

    let builder = reduce_builder_state(&state.builder, event, ctx);
    let mut command_log = state.command_log.clone();
    if let Some(command) = serialize_definition_command(event, &state.builder, &builder) {
        command_log.push(command);
    }
    SessionState {
        builder,
        command_log,
    }
}

/// Single-writer owner of a session. Dispatches go through `&mut self`, so one event is
/// fully applied before the next is accepted.
pub struct BuilderSession {
    state: SessionState,
    ids: Box<dyn IdGenerator>,
    clock: Box<dyn Clock>,
    copy_suffix: String,
}

impl BuilderSession {
    pub fn new(
        definition: WorkflowDefinition,
        ids: Box<dyn IdGenerator>,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            state: SessionState::new(definition),
            ids,
            clock,
            copy_suffix: COPY_SUFFIX.to_string(),
        }
    }

    pub fn with_copy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.copy_suffix = suffix.into();
        self
    }

    /// Apply one event; returns the command it appended to the log, if any.
    pub fn dispatch(&mut self, event: &BuilderEvent) -> Option<&DefinitionCommand> {
        let logged_before = self.state.command_log.len();
        let mut ctx = ReducerContext::new(self.ids.as_mut(), self.clock.as_ref())
            .with_copy_suffix(&self.copy_suffix);
        self.state = reduce_session(&self.state, event, &mut ctx);
        if self.state.command_log.len() > logged_before {
            self.state.command_log.last()
        } else {
            None
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn builder(&self) -> &BuilderState {
        &self.state.builder
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.state.builder.definition
    }

    pub fn command_log(&self) -> &[DefinitionCommand] {
        &self.state.command_log
    }

    pub fn into_state(self) -> SessionState {
        self.state
    }
}
