use super::evaluator::{RawDiagnostic, SchemaEvaluator};
use crate::errors::{FailureKind, SchemaValidationFailure, ValidationSource};
use crate::spec::{push_pointer, Residual, SchemaArena, SchemaId, SchemaNode};
use serde_json::{Map, Value};
use std::collections::HashSet;

type Visit = (SchemaId, String);

/// Walk state. `seen` stops a node from reporting twice at one location,
/// `active` holds the nodes currently being walked and breaks cycles.
#[derive(Debug, Default)]
struct Scope {
    seen: HashSet<Visit>,
    active: HashSet<Visit>,
}

impl Scope {
    /// Fresh reporting state that still stops at the enclosing cycle guard.
    fn nested(&self) -> Self {
        Scope {
            seen: HashSet::new(),
            active: self.active.clone(),
        }
    }
}

/// Members of one instance that some successful subschema accounted for.
#[derive(Debug, Default)]
struct Evaluated {
    keys: HashSet<String>,
    all_keys: bool,
    prefix: usize,
    indices: HashSet<usize>,
    all_items: bool,
}

/// Walks the schema arena and drives a [`SchemaEvaluator`] at every node.
///
/// Children are followed recursively: object properties and their
/// patterns, `additionalProperties`, `propertyNames`, `dependentSchemas`,
/// positional and trailing array items, and `allOf`. `anyOf`, `oneOf`,
/// `not`, `contains` and `if` evaluate their subschemas in isolation and
/// report one failure from the outcome. `unevaluatedProperties` and
/// `unevaluatedItems` see what the successful subschemas already covered.
pub struct SchemaAdapter<'a> {
    arena: &'a SchemaArena,
    evaluator: &'a dyn SchemaEvaluator,
}

impl<'a> SchemaAdapter<'a> {
    pub fn new(arena: &'a SchemaArena, evaluator: &'a dyn SchemaEvaluator) -> Self {
        Self { arena, evaluator }
    }

    /// Evaluates `value` against `root`, stamping every failure with `source`.
    pub fn evaluate(
        &self,
        value: &Value,
        root: SchemaId,
        source: ValidationSource,
    ) -> Vec<SchemaValidationFailure> {
        let mut failures = Vec::new();
        self.walk(root, value, "", &mut Scope::default(), &mut failures);
        for failure in &mut failures {
            failure.validation_source = Some(source);
        }
        failures
    }

    fn walk(
        &self,
        id: SchemaId,
        value: &Value,
        pointer: &str,
        scope: &mut Scope,
        out: &mut Vec<SchemaValidationFailure>,
    ) {
        let visit = (id, pointer.to_string());
        if scope.active.contains(&visit) || !scope.seen.insert(visit.clone()) {
            return;
        }
        scope.active.insert(visit.clone());
        let node = self.arena.get(id);

        match self.evaluator.evaluate(id, node, value) {
            Ok(diagnostics) => {
                out.extend(diagnostics.into_iter().map(|d| from_diagnostic(node, pointer, d)));
            }
            Err(e) => out.push(failure_at(node, pointer, e.to_string(), FailureKind::Constraint)),
        }

        match value {
            Value::Object(map) => {
                self.walk_object(node, map, pointer, scope, out);
                for (trigger, dependent) in &node.dependent_schemas {
                    if map.contains_key(trigger) {
                        self.walk(*dependent, value, pointer, scope, out);
                    }
                }
            }
            Value::Array(items) => self.walk_array(node, items, pointer, scope, out),
            _ => {}
        }

        for member in &node.all_of {
            self.walk(*member, value, pointer, scope, out);
        }

        if !node.any_of.is_empty() {
            let matched = self.matching_branches(&node.any_of, value, pointer, scope);
            if matched == 0 {
                out.push(failure_at(
                    node,
                    pointer,
                    "Value does not match any of the schemas in 'anyOf'".to_string(),
                    FailureKind::Composition,
                ));
            }
        }

        if !node.one_of.is_empty() {
            let matched = self.matching_branches(&node.one_of, value, pointer, scope);
            if matched != 1 {
                out.push(failure_at(
                    node,
                    pointer,
                    format!(
                        "Value matches {matched} of the schemas in 'oneOf', expected exactly one"
                    ),
                    FailureKind::Composition,
                ));
            }
        }

        if let Some(not) = node.not {
            if self.passes(not, value, pointer, scope) {
                out.push(failure_at(
                    node,
                    pointer,
                    "Value must not be valid against the schema in 'not'".to_string(),
                    FailureKind::Composition,
                ));
            }
        }

        if let Some(conditional) = node.conditional {
            let branch = if self.passes(conditional.when, value, pointer, scope) {
                conditional.then
            } else {
                conditional.otherwise
            };
            if let Some(branch) = branch {
                self.walk(branch, value, pointer, scope, out);
            }
        }

        self.walk_unevaluated(id, node, value, pointer, scope, out);
        scope.active.remove(&visit);
    }

    fn walk_object(
        &self,
        node: &SchemaNode,
        map: &Map<String, Value>,
        pointer: &str,
        scope: &mut Scope,
        out: &mut Vec<SchemaValidationFailure>,
    ) {
        for (name, child) in &node.properties {
            if let Some(v) = map.get(name) {
                self.walk(*child, v, &push_pointer(pointer, name), scope, out);
            }
        }
        for (pattern, child) in &node.pattern_properties {
            for (key, v) in map.iter().filter(|(key, _)| pattern.is_match(key)) {
                self.walk(*child, v, &push_pointer(pointer, key), scope, out);
            }
        }
        if node.additional_properties != Residual::Allowed {
            for (key, v) in map.iter().filter(|(key, _)| !node.declares(key)) {
                let child_pointer = push_pointer(pointer, key);
                let policy = node.additional_properties;
                let label = "Additional property";
                self.residual(node, policy, label, key, v, &child_pointer, scope, out);
            }
        }
        if let Some(names) = node.property_names {
            for key in map.keys() {
                let name = Value::String(key.clone());
                self.walk(names, &name, &push_pointer(pointer, key), scope, out);
            }
        }
    }

    fn walk_array(
        &self,
        node: &SchemaNode,
        items: &[Value],
        pointer: &str,
        scope: &mut Scope,
        out: &mut Vec<SchemaValidationFailure>,
    ) {
        for (i, item) in items.iter().enumerate() {
            let schema = node.prefix_items.get(i).copied().or(node.items);
            if let Some(schema) = schema {
                self.walk(schema, item, &push_pointer(pointer, &i.to_string()), scope, out);
            }
        }

        if let Some(contains) = node.contains {
            let matched = self.containing_indices(contains.schema, items, pointer, scope).len();
            let matched = matched as u64;
            let reason = if matched < contains.min {
                Some(format!(
                    "Array has {matched} items matching 'contains', expected at least {}",
                    contains.min
                ))
            } else {
                contains.max.filter(|max| matched > *max).map(|max| {
                    format!("Array has {matched} items matching 'contains', expected at most {max}")
                })
            };
            if let Some(reason) = reason {
                out.push(failure_at(node, pointer, reason, FailureKind::Constraint));
            }
        }
    }

    fn walk_unevaluated(
        &self,
        id: SchemaId,
        node: &SchemaNode,
        value: &Value,
        pointer: &str,
        scope: &mut Scope,
        out: &mut Vec<SchemaValidationFailure>,
    ) {
        let properties = node.unevaluated_properties;
        let items = node.unevaluated_items;
        if properties == Residual::Allowed && items == Residual::Allowed {
            return;
        }
        let mut evaluated = Evaluated::default();
        let mut seen = HashSet::new();
        self.collect_evaluated(id, value, pointer, scope, &mut evaluated, &mut seen, true);

        match value {
            Value::Object(map) if properties != Residual::Allowed && !evaluated.all_keys => {
                for (key, v) in map.iter().filter(|(key, _)| !evaluated.keys.contains(*key)) {
                    let child_pointer = push_pointer(pointer, key);
                    let label = "Unevaluated property";
                    self.residual(node, properties, label, key, v, &child_pointer, scope, out);
                }
            }
            Value::Array(values) if items != Residual::Allowed && !evaluated.all_items => {
                for (i, v) in values.iter().enumerate() {
                    if i < evaluated.prefix || evaluated.indices.contains(&i) {
                        continue;
                    }
                    let index = i.to_string();
                    let child_pointer = push_pointer(pointer, &index);
                    let label = "Unevaluated item";
                    self.residual(node, items, label, &index, v, &child_pointer, scope, out);
                }
            }
            _ => {}
        }
    }

    /// Applies a residual policy to one member no other keyword covered.
    #[allow(clippy::too_many_arguments)]
    fn residual(
        &self,
        node: &SchemaNode,
        policy: Residual,
        label: &str,
        key: &str,
        value: &Value,
        pointer: &str,
        scope: &mut Scope,
        out: &mut Vec<SchemaValidationFailure>,
    ) {
        match policy {
            Residual::Allowed => {}
            Residual::Schema(schema) => self.walk(schema, value, pointer, scope, out),
            Residual::Forbidden => {
                let reason = format!("{label} '{key}' is not allowed");
                let mut f = failure_at(node, pointer, reason, FailureKind::Constraint);
                f.field_name = key.to_string();
                out.push(f);
            }
        }
    }

    /// Records the members `id` and its successful in-place subschemas cover.
    #[allow(clippy::too_many_arguments)]
    fn collect_evaluated(
        &self,
        id: SchemaId,
        value: &Value,
        pointer: &str,
        scope: &Scope,
        acc: &mut Evaluated,
        seen: &mut HashSet<SchemaId>,
        root: bool,
    ) {
        if !seen.insert(id) {
            return;
        }
        let node = self.arena.get(id);
        match value {
            Value::Object(map) => {
                if node.additional_properties != Residual::Allowed
                    || (!root && node.unevaluated_properties != Residual::Allowed)
                {
                    acc.all_keys = true;
                }
                acc.keys.extend(map.keys().filter(|key| node.declares(key)).cloned());
            }
            Value::Array(items) => {
                if node.items.is_some()
                    || (!root && node.unevaluated_items != Residual::Allowed)
                {
                    acc.all_items = true;
                }
                acc.prefix = acc.prefix.max(node.prefix_items.len());
                if let Some(contains) = node.contains {
                    acc.indices
                        .extend(self.containing_indices(contains.schema, items, pointer, scope));
                }
            }
            _ => {}
        }

        let mut nested: Vec<SchemaId> = node.all_of.clone();
        nested.extend(
            node.any_of
                .iter()
                .chain(&node.one_of)
                .filter(|branch| self.passes(**branch, value, pointer, scope))
                .copied(),
        );
        if let Some(conditional) = node.conditional {
            if self.passes(conditional.when, value, pointer, scope) {
                nested.push(conditional.when);
                nested.extend(conditional.then);
            } else {
                nested.extend(conditional.otherwise);
            }
        }
        if let Value::Object(map) = value {
            nested.extend(
                node.dependent_schemas
                    .iter()
                    .filter(|(trigger, _)| map.contains_key(trigger))
                    .map(|(_, schema)| *schema),
            );
        }
        for child in nested {
            self.collect_evaluated(child, value, pointer, scope, acc, seen, false);
        }
    }

    fn containing_indices(
        &self,
        schema: SchemaId,
        items: &[Value],
        pointer: &str,
        scope: &Scope,
    ) -> Vec<usize> {
        items
            .iter()
            .enumerate()
            .filter(|(i, item)| {
                self.passes(schema, item, &push_pointer(pointer, &i.to_string()), scope)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Whether `value` satisfies `id`, without reporting anything.
    fn passes(&self, id: SchemaId, value: &Value, pointer: &str, scope: &Scope) -> bool {
        let mut failures = Vec::new();
        self.walk(id, value, pointer, &mut scope.nested(), &mut failures);
        failures.is_empty()
    }

    fn matching_branches(
        &self,
        branches: &[SchemaId],
        value: &Value,
        pointer: &str,
        scope: &Scope,
    ) -> usize {
        branches
            .iter()
            .filter(|branch| self.passes(**branch, value, pointer, scope))
            .count()
    }
}

fn render_location(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

fn last_segment(pointer: &str) -> String {
    pointer
        .rsplit('/')
        .next()
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .unwrap_or_default()
}

fn failure_at(
    node: &SchemaNode,
    pointer: &str,
    reason: String,
    kind: FailureKind,
) -> SchemaValidationFailure {
    let mut f = SchemaValidationFailure::new(reason, render_location(pointer)).with_kind(kind);
    f.field_name = last_segment(pointer);
    if let Some(pos) = node.position {
        f.spec_line = pos.line;
        f.spec_col = pos.column;
    }
    f
}

fn from_diagnostic(node: &SchemaNode, pointer: &str, d: RawDiagnostic) -> SchemaValidationFailure {
    let location = format!("{pointer}{}", d.instance_path);
    let mut f = failure_at(node, &location, d.message, d.kind);
    if let Some(property) = d.property {
        f.field_name = property;
    }
    f
}
