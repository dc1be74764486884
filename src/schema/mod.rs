//! Schema evaluation.
//!
//! [`SchemaEvaluator`] is the seam to the keyword engine; [`SchemaAdapter`]
//! walks the contract's schema graph, calls the evaluator per node and turns
//! what it reports into [`crate::errors::SchemaValidationFailure`]s.

mod adapter;
mod evaluator;

pub use adapter::SchemaAdapter;
pub use evaluator::{EvaluatorError, JsonSchemaEvaluator, RawDiagnostic, SchemaEvaluator};
