//! Schema nodes interned by document location.
//!
//! Every schema reachable from an operation is stored once and addressed by a
//! [`SchemaId`]. A `$ref` resolves to the handle of its target, so shared and
//! recursive definitions become shared handles instead of copies.

use super::source_map::SourceMap;
use super::types::SourcePosition;
use super::{pointer_from_fragment, push_pointer};
use crate::errors::ContractError;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// Handle of a node in a [`SchemaArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(pub(crate) u32);

impl SchemaId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for SchemaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What happens to members no other keyword accounts for
/// (`additionalProperties`, `unevaluatedProperties`, `unevaluatedItems`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Residual {
    /// Keyword absent
    #[default]
    Allowed,
    Forbidden,
    Schema(SchemaId),
}

/// `contains` with its `minContains` / `maxContains` bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contains {
    pub schema: SchemaId,
    pub min: u64,
    pub max: Option<u64>,
}

/// `if` / `then` / `else`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conditional {
    pub when: SchemaId,
    pub then: Option<SchemaId>,
    pub otherwise: Option<SchemaId>,
}

/// Keywords that assert on the value at the node itself.
///
/// Everything that descends into children is modelled by the arena instead.
const NODE_LOCAL_KEYWORDS: &[&str] = &[
    "type",
    "enum",
    "const",
    "format",
    "multipleOf",
    "maximum",
    "exclusiveMaximum",
    "minimum",
    "exclusiveMinimum",
    "maxLength",
    "minLength",
    "pattern",
    "maxItems",
    "minItems",
    "uniqueItems",
    "maxProperties",
    "minProperties",
    "required",
    "dependentRequired",
];

#[derive(Debug, Clone, Default)]
pub struct SchemaNode {
    /// JSON pointer of the definition in the document
    pub pointer: String,
    pub position: Option<SourcePosition>,
    /// Declared types, widened with `null` for nullable nodes
    pub types: Vec<String>,
    pub format: Option<String>,
    /// Node-local assertions handed to the evaluator, always an object
    pub keywords: Value,
    pub properties: Vec<(String, SchemaId)>,
    pub pattern_properties: Vec<(Regex, SchemaId)>,
    pub additional_properties: Residual,
    pub property_names: Option<SchemaId>,
    pub dependent_schemas: Vec<(String, SchemaId)>,
    pub unevaluated_properties: Residual,
    /// Positional item schemas (`prefixItems`, or the array form of `items`)
    pub prefix_items: Vec<SchemaId>,
    /// Schema for items past `prefix_items`
    pub items: Option<SchemaId>,
    pub contains: Option<Contains>,
    pub unevaluated_items: Residual,
    pub all_of: Vec<SchemaId>,
    pub any_of: Vec<SchemaId>,
    pub one_of: Vec<SchemaId>,
    pub not: Option<SchemaId>,
    pub conditional: Option<Conditional>,
}

impl SchemaNode {
    pub fn has_type(&self, ty: &str) -> bool {
        self.types.iter().any(|t| t == ty)
    }

    pub fn property(&self, name: &str) -> Option<SchemaId> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| *id)
    }

    /// True when a `patternProperties` regex matches `key`.
    pub fn matches_pattern(&self, key: &str) -> bool {
        self.pattern_properties.iter().any(|(re, _)| re.is_match(key))
    }

    /// True when `properties` or `patternProperties` account for `key`.
    pub fn declares(&self, key: &str) -> bool {
        self.property(key).is_some() || self.matches_pattern(key)
    }

    /// True when the evaluator has nothing to check at this node.
    pub fn is_unconstrained(&self) -> bool {
        self.keywords.as_object().map_or(true, Map::is_empty)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaArena {
    nodes: Vec<SchemaNode>,
    by_pointer: HashMap<String, SchemaId>,
}

impl SchemaArena {
    /// Ids are only minted by the arena that owns them.
    pub fn get(&self, id: SchemaId) -> &SchemaNode {
        &self.nodes[id.index()]
    }

    pub fn lookup(&self, pointer: &str) -> Option<SchemaId> {
        self.by_pointer.get(pointer).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = SchemaId> + '_ {
        (0..self.nodes.len()).map(|i| SchemaId(i as u32))
    }

    /// Types declared on the node or, failing that, on its `allOf` members.
    pub fn effective_types(&self, id: SchemaId) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_types(id, &mut seen, &mut out);
        out
    }

    fn collect_types<'a>(
        &'a self,
        id: SchemaId,
        seen: &mut HashSet<SchemaId>,
        out: &mut Vec<&'a str>,
    ) {
        if !seen.insert(id) {
            return;
        }
        let node = self.get(id);
        if !node.types.is_empty() {
            for t in &node.types {
                if !out.contains(&t.as_str()) {
                    out.push(t);
                }
            }
            return;
        }
        for member in &node.all_of {
            self.collect_types(*member, seen, out);
        }
    }

    /// Property schema declared on the node or any of its `allOf` members.
    pub fn effective_property(&self, id: SchemaId, name: &str) -> Option<SchemaId> {
        let mut seen = HashSet::new();
        self.find_property(id, name, &mut seen)
    }

    fn find_property(
        &self,
        id: SchemaId,
        name: &str,
        seen: &mut HashSet<SchemaId>,
    ) -> Option<SchemaId> {
        if !seen.insert(id) {
            return None;
        }
        let node = self.get(id);
        node.property(name).or_else(|| {
            node.all_of
                .iter()
                .find_map(|m| self.find_property(*m, name, seen))
        })
    }

    /// Property names declared on the node and its `allOf` members, in order.
    pub fn effective_property_names(&self, id: SchemaId) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.collect_property_names(id, &mut seen, &mut out);
        out
    }

    fn collect_property_names<'a>(
        &'a self,
        id: SchemaId,
        seen: &mut HashSet<SchemaId>,
        out: &mut Vec<&'a str>,
    ) {
        if !seen.insert(id) {
            return;
        }
        let node = self.get(id);
        for (name, _) in &node.properties {
            if !out.contains(&name.as_str()) {
                out.push(name);
            }
        }
        for member in &node.all_of {
            self.collect_property_names(*member, seen, out);
        }
    }

    /// Item schema of the node or of its `allOf` members.
    pub fn effective_items(&self, id: SchemaId) -> Option<SchemaId> {
        let node = self.get(id);
        node.items
            .or_else(|| node.all_of.iter().find_map(|m| self.get(*m).items))
    }
}

/// Builds a [`SchemaArena`] from a document.
pub(crate) struct SchemaInterner<'a> {
    doc: &'a Value,
    source_map: Option<&'a SourceMap>,
    arena: SchemaArena,
}

impl<'a> SchemaInterner<'a> {
    pub(crate) fn new(doc: &'a Value, source_map: Option<&'a SourceMap>) -> Self {
        SchemaInterner {
            doc,
            source_map,
            arena: SchemaArena::default(),
        }
    }

    pub(crate) fn finish(self) -> SchemaArena {
        self.arena
    }

    /// Interns the schema at `pointer`, following `$ref`s to their target.
    pub(crate) fn intern(&mut self, pointer: &str) -> Result<SchemaId, ContractError> {
        let (target, value) = resolve_ref_chain(self.doc, pointer)?;
        if let Some(id) = self.arena.by_pointer.get(&target) {
            return Ok(*id);
        }

        // Register before descending so recursive definitions find the handle.
        let id = SchemaId(self.arena.nodes.len() as u32);
        self.arena.nodes.push(SchemaNode::default());
        self.arena.by_pointer.insert(target.clone(), id);
        if target != pointer {
            self.arena.by_pointer.insert(pointer.to_string(), id);
        }

        let node = self.build_node(&target, value)?;
        self.arena.nodes[id.index()] = node;
        Ok(id)
    }

    fn build_node(&mut self, pointer: &str, value: &Value) -> Result<SchemaNode, ContractError> {
        let position = self.source_map.and_then(|m| m.position(pointer));
        let obj = match value {
            Value::Object(obj) => obj,
            Value::Bool(true) => {
                return Ok(SchemaNode {
                    pointer: pointer.to_string(),
                    position,
                    keywords: Value::Object(Map::new()),
                    ..SchemaNode::default()
                })
            }
            Value::Bool(false) => {
                let mut keywords = Map::new();
                keywords.insert("not".into(), Value::Object(Map::new()));
                return Ok(SchemaNode {
                    pointer: pointer.to_string(),
                    position,
                    keywords: Value::Object(keywords),
                    ..SchemaNode::default()
                });
            }
            _ => {
                return Err(ContractError::InvalidDocument {
                    location: pointer.to_string(),
                    message: "schema must be an object or a boolean".into(),
                })
            }
        };

        let keywords = local_keywords(obj);
        let types = declared_types(&keywords);
        let format = obj.get("format").and_then(Value::as_str).map(str::to_string);

        let properties = self.intern_map(pointer, obj, "properties")?;
        let mut pattern_properties = Vec::new();
        for (pattern, child) in self.intern_map(pointer, obj, "patternProperties")? {
            let regex = Regex::new(&pattern).map_err(|e| ContractError::InvalidDocument {
                location: push_pointer(&push_pointer(pointer, "patternProperties"), &pattern),
                message: format!("invalid patternProperties regex: {e}"),
            })?;
            pattern_properties.push((regex, child));
        }
        let additional_properties = self.intern_residual(pointer, obj, "additionalProperties")?;
        let property_names = self.intern_optional(pointer, obj, "propertyNames")?;
        let dependent_schemas = self.intern_map(pointer, obj, "dependentSchemas")?;
        let unevaluated_properties =
            self.intern_residual(pointer, obj, "unevaluatedProperties")?;

        // The array form of `items` predates `prefixItems`.
        let (prefix_items, items) = if matches!(obj.get("items"), Some(Value::Array(_))) {
            (
                self.intern_list(pointer, obj, "items")?,
                self.intern_optional(pointer, obj, "additionalItems")?,
            )
        } else {
            (
                self.intern_list(pointer, obj, "prefixItems")?,
                self.intern_optional(pointer, obj, "items")?,
            )
        };
        let contains = match self.intern_optional(pointer, obj, "contains")? {
            Some(schema) => Some(Contains {
                schema,
                min: obj.get("minContains").and_then(Value::as_u64).unwrap_or(1),
                max: obj.get("maxContains").and_then(Value::as_u64),
            }),
            None => None,
        };
        let unevaluated_items = self.intern_residual(pointer, obj, "unevaluatedItems")?;

        let all_of = self.intern_list(pointer, obj, "allOf")?;
        let any_of = self.intern_list(pointer, obj, "anyOf")?;
        let one_of = self.intern_list(pointer, obj, "oneOf")?;
        let not = self.intern_optional(pointer, obj, "not")?;
        let conditional = match self.intern_optional(pointer, obj, "if")? {
            Some(when) => Some(Conditional {
                when,
                then: self.intern_optional(pointer, obj, "then")?,
                otherwise: self.intern_optional(pointer, obj, "else")?,
            }),
            None => None,
        };

        Ok(SchemaNode {
            pointer: pointer.to_string(),
            position,
            types,
            format,
            keywords,
            properties,
            pattern_properties,
            additional_properties,
            property_names,
            dependent_schemas,
            unevaluated_properties,
            prefix_items,
            items,
            contains,
            unevaluated_items,
            all_of,
            any_of,
            one_of,
            not,
            conditional,
        })
    }

    /// Interns `obj[key]` when it holds a schema (object or boolean).
    fn intern_optional(
        &mut self,
        pointer: &str,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Result<Option<SchemaId>, ContractError> {
        match obj.get(key) {
            Some(Value::Object(_)) | Some(Value::Bool(_)) => {
                Ok(Some(self.intern(&push_pointer(pointer, key))?))
            }
            _ => Ok(None),
        }
    }

    fn intern_residual(
        &mut self,
        pointer: &str,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Result<Residual, ContractError> {
        if obj.get(key) == Some(&Value::Bool(false)) {
            return Ok(Residual::Forbidden);
        }
        Ok(self
            .intern_optional(pointer, obj, key)?
            .map_or(Residual::Allowed, Residual::Schema))
    }

    /// Interns every schema of a name-to-schema map, in declaration order.
    fn intern_map(
        &mut self,
        pointer: &str,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Result<Vec<(String, SchemaId)>, ContractError> {
        let Some(Value::Object(members)) = obj.get(key) else {
            return Ok(Vec::new());
        };
        let base = push_pointer(pointer, key);
        members
            .keys()
            .map(|name| Ok((name.clone(), self.intern(&push_pointer(&base, name))?)))
            .collect()
    }

    fn intern_list(
        &mut self,
        pointer: &str,
        obj: &Map<String, Value>,
        key: &str,
    ) -> Result<Vec<SchemaId>, ContractError> {
        let Some(Value::Array(members)) = obj.get(key) else {
            return Ok(Vec::new());
        };
        let base = push_pointer(pointer, key);
        (0..members.len())
            .map(|i| self.intern(&push_pointer(&base, &i.to_string())))
            .collect()
    }
}

/// Follows a chain of local `$ref`s starting at `pointer`.
///
/// Returns the pointer and value of the first non-reference node.
pub(crate) fn resolve_ref_chain<'a>(
    doc: &'a Value,
    pointer: &str,
) -> Result<(String, &'a Value), ContractError> {
    let mut current = pointer.to_string();
    let mut seen = HashSet::new();
    loop {
        let value = doc
            .pointer(&current)
            .ok_or_else(|| ContractError::UnresolvedReference {
                reference: format!("#{current}"),
            })?;
        let Some(reference) = value.get("$ref").and_then(Value::as_str) else {
            return Ok((current, value));
        };
        if !seen.insert(current.clone()) {
            return Err(ContractError::CircularReference {
                reference: reference.to_string(),
            });
        }
        current = pointer_from_fragment(reference).ok_or_else(|| {
            ContractError::UnresolvedReference {
                reference: reference.to_string(),
            }
        })?;
    }
}

fn local_keywords(obj: &Map<String, Value>) -> Value {
    let mut out = Map::new();
    for key in NODE_LOCAL_KEYWORDS {
        if let Some(v) = obj.get(*key) {
            out.insert((*key).to_string(), v.clone());
        }
    }

    // OpenAPI 3.0 boolean exclusive bounds become the numeric form.
    for (flag, bound) in [("exclusiveMinimum", "minimum"), ("exclusiveMaximum", "maximum")] {
        if let Some(Value::Bool(exclusive)) = out.get(flag).cloned() {
            out.remove(flag);
            if exclusive {
                if let Some(limit) = out.remove(bound) {
                    out.insert(flag.to_string(), limit);
                }
            }
        }
    }

    if obj.get("nullable").and_then(Value::as_bool) == Some(true) {
        let widened = match out.get("type") {
            Some(Value::String(ty)) => Some(Value::Array(vec![
                Value::String(ty.clone()),
                Value::String("null".into()),
            ])),
            Some(Value::Array(types)) if !types.iter().any(|t| t == "null") => {
                let mut types = types.clone();
                types.push(Value::String("null".into()));
                Some(Value::Array(types))
            }
            _ => None,
        };
        if let Some(types) = widened {
            out.insert("type".into(), types);
        }
        if let Some(Value::Array(values)) = out.get_mut("enum") {
            if !values.contains(&Value::Null) {
                values.push(Value::Null);
            }
        }
    }

    Value::Object(out)
}

fn declared_types(keywords: &Value) -> Vec<String> {
    match keywords.get("type") {
        Some(Value::String(t)) => vec![t.clone()],
        Some(Value::Array(ts)) => ts
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}
