//! Editable builder session: tree edits, selection, event reducer and the derived
//! definition-command log.

pub mod command;
pub mod event;
pub mod ops;
pub mod reducer;
pub mod selection;
pub mod session;

pub use command::{
    serialize_definition_command, CommandPayload, DefinitionCommand, DefinitionCommandType,
};
pub use event::BuilderEvent;
pub use ops::{StepRef, TrackAddress, COPY_SUFFIX};
pub use reducer::{reduce_builder_state, BuilderState, ReducerContext};
pub use selection::Selection;
pub use session::{reduce_session, BuilderSession, SessionState};
