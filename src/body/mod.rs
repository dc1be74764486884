//! Body validation.
//!
//! The content type of a request or response body selects an entry of the
//! declared content map; the payload is decoded according to that media type
//! and its schema is evaluated on the decoded value.

mod media;

pub use media::{essence, negotiate};

use crate::errors::{ExchangeSide, ValidationError};
use crate::params::{coerce_text, parse_query_pairs};
use crate::schema::SchemaAdapter;
use crate::spec::{ContentMap, SchemaArena, SchemaId};
use media::Decoder;
use serde_json::{Map, Value};
use tracing::debug;

/// A body as seen on the wire.
#[derive(Debug, Clone, Copy)]
pub struct BodyInput<'b> {
    pub content_type: Option<&'b str>,
    pub bytes: &'b [u8],
}

pub struct BodyValidator<'a> {
    arena: &'a SchemaArena,
    adapter: &'a SchemaAdapter<'a>,
}

impl<'a> BodyValidator<'a> {
    pub fn new(arena: &'a SchemaArena, adapter: &'a SchemaAdapter<'a>) -> Self {
        Self { arena, adapter }
    }

    /// Validates `body` against `content`.
    ///
    /// An empty body is only reported when `required` is set; an empty content
    /// map declares nothing to check.
    pub fn validate(
        &self,
        content: &ContentMap,
        body: BodyInput<'_>,
        side: ExchangeSide,
        required: bool,
    ) -> Vec<ValidationError> {
        if body.bytes.is_empty() {
            return if required {
                vec![ValidationError::body_missing(side)]
            } else {
                Vec::new()
            };
        }
        if content.is_empty() {
            return Vec::new();
        }

        let declared: Vec<String> = content.iter().map(|m| m.media_type.clone()).collect();
        let Some(content_type) = body.content_type else {
            return vec![ValidationError::body_content_type(side, None, &declared)];
        };
        let media_type = essence(content_type);
        let Some(entry) = negotiate(content, &media_type) else {
            debug!(side = side.as_str(), content_type, "Content type not declared");
            return vec![ValidationError::body_content_type(
                side,
                Some(content_type),
                &declared,
            )];
        };
        let Some(schema) = entry.schema else {
            return Vec::new();
        };

        let value = match self.decode(&media_type, body.bytes, schema) {
            Ok(Some(value)) => value,
            Ok(None) => return Vec::new(),
            Err(detail) => {
                debug!(
                    side = side.as_str(),
                    media_type = %media_type,
                    detail = %detail,
                    "Body decoding failed"
                );
                return vec![ValidationError::body_decode(side, &media_type, &detail)];
            }
        };

        let failures = self
            .adapter
            .evaluate(&value, schema, side.validation_source());
        if failures.is_empty() {
            return Vec::new();
        }
        vec![ValidationError::body_schema(
            side,
            &media_type,
            failures,
            self.arena.get(schema).position,
        )]
    }

    /// `Ok(None)` for media types that are accepted without evaluation.
    fn decode(
        &self,
        media_type: &str,
        bytes: &[u8],
        schema: SchemaId,
    ) -> Result<Option<Value>, String> {
        match Decoder::for_media_type(media_type) {
            Decoder::Json => serde_json::from_slice(bytes)
                .map(Some)
                .map_err(|e| format!("invalid JSON: {e}")),
            Decoder::Text => std::str::from_utf8(bytes)
                .map(|s| Some(Value::String(s.to_string())))
                .map_err(|e| format!("invalid UTF-8: {e}")),
            Decoder::Form => {
                let text = std::str::from_utf8(bytes).map_err(|e| format!("invalid UTF-8: {e}"))?;
                Ok(Some(self.decode_form(text, schema)))
            }
            Decoder::Opaque => Ok(None),
        }
    }

    /// Form fields coerced through their property schemas. Values that do not
    /// coerce stay strings so the evaluator reports the type mismatch.
    fn decode_form(&self, text: &str, schema: SchemaId) -> Value {
        let mut map = Map::new();
        for (key, raw) in parse_query_pairs(text) {
            let prop = self.arena.effective_property(schema, &key);
            let is_array = prop.is_some_and(|p| self.arena.effective_types(p).contains(&"array"));
            let item_schema = if is_array {
                prop.and_then(|p| self.arena.effective_items(p))
            } else {
                prop
            };
            let types = item_schema
                .map(|s| self.arena.effective_types(s))
                .unwrap_or_default();
            let value = coerce_text(&raw, &types).unwrap_or(Value::String(raw));
            if is_array {
                match map.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(items) => items.push(value),
                    other => *other = Value::Array(vec![value]),
                }
            } else {
                map.entry(key).or_insert(value);
            }
        }
        Value::Object(map)
    }
}
