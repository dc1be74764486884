use crate::errors::FailureKind;
use crate::spec::{SchemaId, SchemaNode};
use crate::validator_cache::ValidatorCache;
use jsonschema::error::ValidationErrorKind;
use serde_json::Value;
use std::fmt;

/// One diagnostic produced by an evaluator at a single schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDiagnostic {
    pub kind: FailureKind,
    pub message: String,
    /// Pointer relative to the evaluated value, empty for the value itself
    pub instance_path: String,
    /// Missing property name for `required` failures
    pub property: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorError(pub String);

impl fmt::Display for EvaluatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema evaluation failed: {}", self.0)
    }
}

impl std::error::Error for EvaluatorError {}

/// Checks the node-local assertions of one schema node against a value.
///
/// Implementations never descend into child schemas; the adapter walks the
/// arena and calls back once per node.
pub trait SchemaEvaluator: Send + Sync {
    fn evaluate(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        instance: &Value,
    ) -> Result<Vec<RawDiagnostic>, EvaluatorError>;
}

/// [`SchemaEvaluator`] backed by the `jsonschema` crate.
#[derive(Debug, Clone)]
pub struct JsonSchemaEvaluator {
    cache: ValidatorCache,
}

impl JsonSchemaEvaluator {
    pub fn new(cache: ValidatorCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &ValidatorCache {
        &self.cache
    }
}

impl SchemaEvaluator for JsonSchemaEvaluator {
    fn evaluate(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        instance: &Value,
    ) -> Result<Vec<RawDiagnostic>, EvaluatorError> {
        if node.is_unconstrained() {
            return Ok(Vec::new());
        }
        let validator = self
            .cache
            .get_or_compile(id, &node.keywords)
            .map_err(EvaluatorError)?;
        let diagnostics = validator
            .iter_errors(instance)
            .map(|err| {
                let (kind, property) = classify(&err.kind);
                RawDiagnostic {
                    kind,
                    message: err.to_string(),
                    instance_path: err.instance_path.to_string(),
                    property,
                }
            })
            .collect();
        Ok(diagnostics)
    }
}

fn classify(kind: &ValidationErrorKind) -> (FailureKind, Option<String>) {
    match kind {
        ValidationErrorKind::Type { .. } => (FailureKind::Type, None),
        ValidationErrorKind::Enum { .. } => (FailureKind::Enum, None),
        ValidationErrorKind::Format { .. } => (FailureKind::Format, None),
        ValidationErrorKind::Required { property } => (
            FailureKind::Required,
            property.as_str().map(str::to_string),
        ),
        _ => (FailureKind::Constraint, None),
    }
}
