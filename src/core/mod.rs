pub mod clock;
pub mod compiler;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod types;
pub mod workflow_builder;

pub use clock::{Clock, ManualClock, SystemClock};
pub use compiler::{
    compile_workflow_definition, validate_workflow_definition, CompileOptions, ValidationIssue,
    ValidationIssueCode, WorkflowCompileError, WorkflowCompiler,
};
pub use config::{ConfigLoader, ConfigValidator, FlowbuilderConfig};
pub use envelope::{load_definition, read_envelope, write_envelope, AUTHORING_KEY};
pub use error::{AppError, DefaultErrorReporter, ErrorReporter};
pub use ids::{EntityKind, IdGenerator, RandomIdGenerator, SequentialIdGenerator};
pub use types::*;
pub use workflow_builder::{BuilderEvent, BuilderSession, BuilderState, Selection, SessionState};
