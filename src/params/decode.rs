//! Style-aware parameter decoding.
//!
//! Decoding happens in two steps. The raw text is first split according to
//! the parameter's `style` and `explode` into a [`RawValue`]; each piece is
//! then coerced to the JSON type its schema expects. Splitting failures are
//! encoding problems, coercion failures are type failures.

use super::extract::RequestParts;
use crate::errors::{FailureKind, SchemaValidationFailure, ValidationSource};
use crate::spec::{push_pointer, ParameterMeta, ParameterStyle, SchemaArena, SchemaId};
use serde_json::{Map, Number, Value};

/// Parameter text split by style, before type coercion.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawValue {
    Scalar(String),
    List(Vec<String>),
    Map(Vec<(String, String)>),
}

impl RawValue {
    /// Sent, but with nothing in it (`?status=`).
    pub(crate) fn is_empty(&self) -> bool {
        match self {
            RawValue::Scalar(s) => s.is_empty(),
            RawValue::List(items) => items.iter().all(String::is_empty),
            RawValue::Map(pairs) => pairs.is_empty(),
        }
    }
}

/// Container shape the schema asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    Primitive,
    Array,
    Object,
}

pub(crate) fn shape_of(arena: &SchemaArena, param: &ParameterMeta) -> Shape {
    if param.content_json {
        return Shape::Primitive;
    }
    let Some(schema) = param.schema else {
        return Shape::Primitive;
    };
    let types = arena.effective_types(schema);
    if types.contains(&"array") {
        Shape::Array
    } else if types.contains(&"object") {
        Shape::Object
    } else {
        Shape::Primitive
    }
}

fn percent_decode(raw: &str) -> Result<String, String> {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .map_err(|_| format!("'{raw}' is not valid percent-encoded UTF-8"))
}

fn decode_all<'s>(pieces: impl Iterator<Item = &'s str>) -> Result<Vec<String>, String> {
    pieces.map(percent_decode).collect()
}

/// `k,v,k2,v2` style pairs.
fn flat_pairs(pieces: Vec<String>) -> Result<Vec<(String, String)>, String> {
    if pieces.len() % 2 != 0 {
        return Err("object value has a key without a value".to_string());
    }
    let mut pairs = Vec::with_capacity(pieces.len() / 2);
    let mut iter = pieces.into_iter();
    while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
        pairs.push((k, v));
    }
    Ok(pairs)
}

/// `k=v` entries.
fn keyed_pairs<'s>(
    entries: impl Iterator<Item = &'s str>,
    decode: bool,
) -> Result<Vec<(String, String)>, String> {
    entries
        .filter(|e| !e.is_empty())
        .map(|entry| {
            let (k, v) = entry
                .split_once('=')
                .ok_or_else(|| format!("'{entry}' is not a key=value pair"))?;
            if decode {
                Ok((percent_decode(k)?, percent_decode(v)?))
            } else {
                Ok((k.trim().to_string(), v.trim().to_string()))
            }
        })
        .collect()
}

/// Splits a captured path segment (still percent-encoded).
pub(crate) fn split_path(
    raw: &str,
    param: &ParameterMeta,
    shape: Shape,
) -> Result<RawValue, String> {
    match param.style {
        ParameterStyle::Label => {
            let rest = raw
                .strip_prefix('.')
                .ok_or_else(|| format!("label style value '{raw}' must start with '.'"))?;
            let delimiter = if param.explode { '.' } else { ',' };
            match shape {
                Shape::Primitive => Ok(RawValue::Scalar(percent_decode(rest)?)),
                Shape::Array => Ok(RawValue::List(decode_all(rest.split(delimiter))?)),
                Shape::Object if param.explode => {
                    Ok(RawValue::Map(keyed_pairs(rest.split('.'), true)?))
                }
                Shape::Object => Ok(RawValue::Map(flat_pairs(decode_all(rest.split(','))?)?)),
            }
        }
        ParameterStyle::Matrix => {
            let rest = raw
                .strip_prefix(';')
                .ok_or_else(|| format!("matrix style value '{raw}' must start with ';'"))?;
            split_matrix(rest, &param.name, param.explode, shape)
        }
        _ => match shape {
            Shape::Primitive => Ok(RawValue::Scalar(percent_decode(raw)?)),
            Shape::Array => Ok(RawValue::List(decode_all(raw.split(','))?)),
            Shape::Object if param.explode => {
                Ok(RawValue::Map(keyed_pairs(raw.split(','), true)?))
            }
            Shape::Object => Ok(RawValue::Map(flat_pairs(decode_all(raw.split(','))?)?)),
        },
    }
}

fn split_matrix(rest: &str, name: &str, explode: bool, shape: Shape) -> Result<RawValue, String> {
    let value_of = |entry: &str| -> Result<String, String> {
        if entry == name {
            return Ok(String::new());
        }
        entry
            .strip_prefix(name)
            .and_then(|r| r.strip_prefix('='))
            .ok_or_else(|| format!("matrix entry '{entry}' does not name '{name}'"))
            .and_then(percent_decode)
    };
    match shape {
        Shape::Primitive => Ok(RawValue::Scalar(value_of(rest)?)),
        Shape::Array if explode => Ok(RawValue::List(
            rest.split(';').map(value_of).collect::<Result<_, _>>()?,
        )),
        Shape::Array => {
            let joined = rest
                .strip_prefix(name)
                .and_then(|r| r.strip_prefix('='))
                .ok_or_else(|| format!("matrix entry '{rest}' does not name '{name}'"))?;
            Ok(RawValue::List(decode_all(joined.split(','))?))
        }
        Shape::Object if explode => Ok(RawValue::Map(keyed_pairs(rest.split(';'), true)?)),
        Shape::Object => {
            let joined = rest
                .strip_prefix(name)
                .and_then(|r| r.strip_prefix('='))
                .ok_or_else(|| format!("matrix entry '{rest}' does not name '{name}'"))?;
            Ok(RawValue::Map(flat_pairs(decode_all(joined.split(','))?)?))
        }
    }
}

/// Splits a header or cookie value (`simple` and `form` behave alike here).
pub(crate) fn split_delimited(
    raw: &str,
    explode: bool,
    shape: Shape,
) -> Result<RawValue, String> {
    match shape {
        Shape::Primitive => Ok(RawValue::Scalar(raw.trim().to_string())),
        Shape::Array => Ok(RawValue::List(
            raw.split(',').map(|s| s.trim().to_string()).collect(),
        )),
        Shape::Object if explode => Ok(RawValue::Map(keyed_pairs(raw.split(','), false)?)),
        Shape::Object => flat_pairs(raw.split(',').map(|s| s.trim().to_string()).collect())
            .map(RawValue::Map),
    }
}

/// Collects a query parameter. `Ok(None)` means it was not sent.
pub(crate) fn extract_query(
    parts: &RequestParts<'_>,
    param: &ParameterMeta,
    shape: Shape,
    arena: &SchemaArena,
) -> Result<Option<RawValue>, String> {
    if param.style == ParameterStyle::DeepObject {
        return deep_object(parts, &param.name);
    }

    let values = parts.query_values(&param.name);
    match shape {
        Shape::Primitive => Ok(values.first().map(|v| RawValue::Scalar((*v).to_string()))),
        Shape::Array => {
            if values.is_empty() {
                return Ok(None);
            }
            let delimiter = match param.style {
                ParameterStyle::SpaceDelimited => ' ',
                ParameterStyle::PipeDelimited => '|',
                _ => ',',
            };
            let items = if param.explode {
                values.iter().map(|v| (*v).to_string()).collect()
            } else {
                values
                    .iter()
                    .flat_map(|v| v.split(delimiter))
                    .map(str::to_string)
                    .collect()
            };
            Ok(Some(RawValue::List(items)))
        }
        Shape::Object if param.explode => {
            let Some(schema) = param.schema else {
                return Ok(None);
            };
            let pairs: Vec<(String, String)> = arena
                .effective_property_names(schema)
                .into_iter()
                .filter_map(|prop| {
                    parts
                        .query_values(prop)
                        .first()
                        .map(|v| (prop.to_string(), (*v).to_string()))
                })
                .collect();
            Ok((!pairs.is_empty()).then_some(RawValue::Map(pairs)))
        }
        Shape::Object => match values.first() {
            None => Ok(None),
            Some(v) if v.is_empty() => Ok(Some(RawValue::Scalar(String::new()))),
            Some(v) => {
                let delimiter = match param.style {
                    ParameterStyle::SpaceDelimited => ' ',
                    ParameterStyle::PipeDelimited => '|',
                    _ => ',',
                };
                flat_pairs(v.split(delimiter).map(str::to_string).collect())
                    .map(|pairs| Some(RawValue::Map(pairs)))
            }
        },
    }
}

fn deep_object(parts: &RequestParts<'_>, name: &str) -> Result<Option<RawValue>, String> {
    let prefix = format!("{name}[");
    let mut pairs = Vec::new();
    for (key, value) in parts.query_pairs() {
        let Some(rest) = key.strip_prefix(&prefix) else {
            continue;
        };
        let property = rest
            .strip_suffix(']')
            .filter(|p| !p.is_empty() && !p.contains(['[', ']']))
            .ok_or_else(|| format!("'{key}' is not a valid deepObject key"))?;
        pairs.push((property.to_string(), value.clone()));
    }
    Ok((!pairs.is_empty()).then_some(RawValue::Map(pairs)))
}

/// Query keys a declared parameter accounts for.
pub(crate) fn owns_query_key(param: &ParameterMeta, key: &str, arena: &SchemaArena) -> bool {
    if param.name == key {
        return true;
    }
    if param.style == ParameterStyle::DeepObject {
        return key
            .strip_prefix(param.name.as_str())
            .is_some_and(|rest| rest.starts_with('['));
    }
    if param.explode && shape_of(arena, param) == Shape::Object {
        if let Some(schema) = param.schema {
            return arena.effective_property_names(schema).contains(&key);
        }
    }
    false
}

/// Coerces split text into JSON, collecting a type failure per bad piece.
pub(crate) fn coerce(
    raw: RawValue,
    arena: &SchemaArena,
    schema: Option<SchemaId>,
) -> (Value, Vec<SchemaValidationFailure>) {
    let mut failures = Vec::new();
    let value = match raw {
        RawValue::Scalar(s) => coerce_scalar(&s, arena, schema, "", &mut failures),
        RawValue::List(items) => {
            let item_schema = schema.and_then(|s| arena.effective_items(s));
            Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        coerce_scalar(item, arena, item_schema, &format!("/{i}"), &mut failures)
                    })
                    .collect(),
            )
        }
        RawValue::Map(pairs) => {
            let mut map = Map::new();
            for (key, text) in pairs {
                let prop = schema.and_then(|s| arena.effective_property(s, &key));
                let pointer = push_pointer("", &key);
                let v = coerce_scalar(&text, arena, prop, &pointer, &mut failures);
                map.insert(key, v);
            }
            Value::Object(map)
        }
    };
    (value, failures)
}

fn coerce_scalar(
    text: &str,
    arena: &SchemaArena,
    schema: Option<SchemaId>,
    pointer: &str,
    failures: &mut Vec<SchemaValidationFailure>,
) -> Value {
    let types = schema.map(|s| arena.effective_types(s)).unwrap_or_default();
    match coerce_text(text, &types) {
        Some(v) => v,
        None => {
            let expected = types
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(", ");
            let mut failure = SchemaValidationFailure::new(
                format!("\"{text}\" is not of type {expected}"),
                if pointer.is_empty() { "/" } else { pointer },
            )
            .with_kind(FailureKind::Type)
            .with_source(ValidationSource::Parameter);
            failure.field_name = pointer.rsplit('/').next().unwrap_or_default().to_string();
            if let Some(pos) = schema.and_then(|s| arena.get(s).position) {
                failure.spec_line = pos.line;
                failure.spec_col = pos.column;
            }
            failures.push(failure);
            Value::String(text.to_string())
        }
    }
}

/// Text to the first declared type it parses as; strings accept anything.
pub(crate) fn coerce_text(text: &str, types: &[&str]) -> Option<Value> {
    if types.is_empty() {
        return Some(Value::String(text.to_string()));
    }
    let integer = types.contains(&"integer");
    let number = types.contains(&"number");
    if integer || number {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::from(i));
        }
        if let Ok(u) = text.parse::<u64>() {
            return Some(Value::from(u));
        }
        if let Some(f) = text.parse::<f64>().ok().filter(|f| f.is_finite()) {
            // `3.0` and `1e3` are integers too.
            let integral = f.fract() == 0.0;
            if integral && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                return Some(Value::from(f as i64));
            }
            if integral || number {
                if let Some(n) = Number::from_f64(f) {
                    return Some(Value::Number(n));
                }
            }
        }
    }
    if types.contains(&"boolean") {
        match text {
            "true" => return Some(Value::Bool(true)),
            "false" => return Some(Value::Bool(false)),
            _ => {}
        }
    }
    if types.contains(&"null") && text == "null" {
        return Some(Value::Null);
    }
    types
        .contains(&"string")
        .then(|| Value::String(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{load_contract_from_str, DocumentFormat, ParameterLocation};
    use http::{HeaderMap, Uri};
    use serde_json::json;

    fn param(style: ParameterStyle, explode: bool) -> ParameterMeta {
        ParameterMeta {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            required: true,
            style,
            explode,
            allow_empty_value: false,
            schema: None,
            content_json: false,
            position: None,
        }
    }

    #[test]
    fn test_simple_path_values() {
        let p = param(ParameterStyle::Simple, false);
        assert_eq!(
            split_path("a%20b", &p, Shape::Primitive).unwrap(),
            RawValue::Scalar("a b".to_string())
        );
        assert_eq!(
            split_path("3,4%2C5", &p, Shape::Array).unwrap(),
            RawValue::List(vec!["3".to_string(), "4,5".to_string()])
        );
        assert_eq!(
            split_path("role,admin,age,3", &p, Shape::Object).unwrap(),
            RawValue::Map(vec![
                ("role".to_string(), "admin".to_string()),
                ("age".to_string(), "3".to_string())
            ])
        );
        let exploded = param(ParameterStyle::Simple, true);
        assert_eq!(
            split_path("role=admin,age=3", &exploded, Shape::Object).unwrap(),
            RawValue::Map(vec![
                ("role".to_string(), "admin".to_string()),
                ("age".to_string(), "3".to_string())
            ])
        );
    }

    #[test]
    fn test_label_and_matrix_path_values() {
        let label = param(ParameterStyle::Label, true);
        assert_eq!(
            split_path(".3.4", &label, Shape::Array).unwrap(),
            RawValue::List(vec!["3".to_string(), "4".to_string()])
        );
        assert!(split_path("3", &label, Shape::Primitive).is_err());

        let matrix = param(ParameterStyle::Matrix, false);
        assert_eq!(
            split_path(";id=5", &matrix, Shape::Primitive).unwrap(),
            RawValue::Scalar("5".to_string())
        );
        assert_eq!(
            split_path(";id=3,4", &matrix, Shape::Array).unwrap(),
            RawValue::List(vec!["3".to_string(), "4".to_string()])
        );
        let matrix_exploded = param(ParameterStyle::Matrix, true);
        assert_eq!(
            split_path(";id=3;id=4", &matrix_exploded, Shape::Array).unwrap(),
            RawValue::List(vec!["3".to_string(), "4".to_string()])
        );
        assert!(split_path(";other=5", &matrix, Shape::Primitive).is_err());
    }

    #[test]
    fn test_invalid_utf8_percent_encoding() {
        let p = param(ParameterStyle::Simple, false);
        assert!(split_path("%FF%FE", &p, Shape::Primitive).is_err());
    }

    #[test]
    fn test_odd_object_pairs_rejected() {
        assert!(split_delimited("a,1,b", false, Shape::Object).is_err());
        assert!(split_delimited("a=1,b", true, Shape::Object).is_err());
    }

    #[test]
    fn test_coerce_text() {
        assert_eq!(coerce_text("42", &["integer"]), Some(json!(42)));
        assert_eq!(coerce_text("4.5", &["integer"]), None);
        assert_eq!(coerce_text("4.5", &["number"]), Some(json!(4.5)));
        assert_eq!(coerce_text("true", &["boolean"]), Some(json!(true)));
        assert_eq!(coerce_text("yes", &["boolean"]), None);
        assert_eq!(coerce_text("7", &["string"]), Some(json!("7")));
        assert_eq!(coerce_text("abc", &["integer", "string"]), Some(json!("abc")));
        assert_eq!(coerce_text("null", &["integer", "null"]), Some(Value::Null));
        assert_eq!(coerce_text("x", &[]), Some(json!("x")));
    }

    #[test]
    fn test_coerce_integral_text() {
        assert_eq!(coerce_text("3.0", &["integer"]), Some(json!(3)));
        assert_eq!(coerce_text("1e3", &["integer"]), Some(json!(1000)));
        assert_eq!(coerce_text("18446744073709551615", &["integer"]), Some(json!(u64::MAX)));
        let big = coerce_text("18446744073709551616", &["integer"]).unwrap();
        assert_eq!(big.as_f64(), Some(18_446_744_073_709_551_616.0));
        assert_eq!(coerce_text("NaN", &["number"]), None);
        assert_eq!(coerce_text("inf", &["integer"]), None);
        assert_eq!(coerce_text("2.5", &["number"]), Some(json!(2.5)));
    }

    const DOC: &str = r#"
openapi: 3.0.3
info: {title: Decode, version: "1"}
paths:
  /items:
    get:
      parameters:
        - name: ids
          in: query
          schema:
            type: array
            items: {type: integer}
        - name: filter
          in: query
          style: deepObject
          explode: true
          schema:
            type: object
            properties:
              color: {type: string}
              size: {type: integer}
        - name: point
          in: query
          style: form
          explode: true
          schema:
            type: object
            properties:
              x: {type: integer}
              y: {type: integer}
      responses: {}
"#;

    #[test]
    fn test_query_extraction_by_style() {
        let contract = load_contract_from_str(DOC, DocumentFormat::Yaml).unwrap();
        let op = contract.operations().next().unwrap();
        let arena = contract.schemas();
        let uri: Uri = "/items?ids=1&ids=x&filter[color]=red&filter[size]=3&x=1&y=2&extra=0"
            .parse()
            .unwrap();
        let headers = HeaderMap::new();
        let parts = RequestParts::new(&uri, &headers);

        let ids = &op.parameters[0];
        let raw = extract_query(&parts, ids, shape_of(arena, ids), arena).unwrap().unwrap();
        let (value, failures) = coerce(raw, arena, ids.schema);
        assert_eq!(value, json!([1, "x"]));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].location, "/1");
        assert_eq!(failures[0].kind, FailureKind::Type);

        let filter = &op.parameters[1];
        let raw = extract_query(&parts, filter, shape_of(arena, filter), arena)
            .unwrap()
            .unwrap();
        let (value, failures) = coerce(raw, arena, filter.schema);
        assert_eq!(value, json!({"color": "red", "size": 3}));
        assert!(failures.is_empty());

        let point = &op.parameters[2];
        let raw = extract_query(&parts, point, shape_of(arena, point), arena)
            .unwrap()
            .unwrap();
        assert_eq!(coerce(raw, arena, point.schema).0, json!({"x": 1, "y": 2}));

        assert!(owns_query_key(filter, "filter[color]", arena));
        assert!(owns_query_key(point, "y", arena));
        assert!(!op.parameters.iter().any(|p| owns_query_key(p, "extra", arena)));
    }

    #[test]
    fn test_malformed_deep_object_key() {
        let contract = load_contract_from_str(DOC, DocumentFormat::Yaml).unwrap();
        let op = contract.operations().next().unwrap();
        let uri: Uri = "/items?filter[color=red".parse().unwrap();
        let headers = HeaderMap::new();
        let parts = RequestParts::new(&uri, &headers);
        let filter = &op.parameters[1];
        assert!(extract_query(&parts, filter, Shape::Object, contract.schemas()).is_err());
    }
}
