//! Shared data model for workflow authoring documents and compiled runtime steps.

pub mod authoring;
pub mod runtime;

pub use authoring::*;
pub use runtime::*;
