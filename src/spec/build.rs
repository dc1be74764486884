use super::arena::{resolve_ref_chain, SchemaInterner};
use super::source_map::SourceMap;
use super::types::{
    Contract, ContentMap, MediaTypeMeta, OperationMeta, ParameterLocation, ParameterMeta,
    ParameterStyle, PathEntry, RequestBodyMeta, ResponseKey, ResponseMeta, SourcePosition,
};
use super::push_pointer;
use crate::errors::{log_issues, ContractError, ContractIssue};
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

const METHODS: [&str; 8] = ["get", "put", "post", "delete", "options", "head", "patch", "trace"];

struct Builder<'a> {
    doc: &'a Value,
    source_map: Option<&'a SourceMap>,
    schemas: SchemaInterner<'a>,
    issues: Vec<ContractIssue>,
}

impl<'a> Builder<'a> {
    fn position(&self, pointer: &str) -> Option<SourcePosition> {
        self.source_map.and_then(|m| m.position(pointer))
    }

    fn object_at(&self, pointer: &str) -> Result<(String, &'a Map<String, Value>), ContractError> {
        let (target, value) = resolve_ref_chain(self.doc, pointer)?;
        match value.as_object() {
            Some(obj) => Ok((target, obj)),
            None => Err(invalid(&target, "expected an object")),
        }
    }

    fn parameters(&mut self, list_pointer: &str) -> Result<Vec<ParameterMeta>, ContractError> {
        let Some(list) = self.doc.pointer(list_pointer) else {
            return Ok(Vec::new());
        };
        let Some(items) = list.as_array() else {
            return Err(invalid(list_pointer, "parameters must be a list"));
        };
        let mut out = Vec::with_capacity(items.len());
        for i in 0..items.len() {
            let pointer = push_pointer(list_pointer, &i.to_string());
            out.push(self.parameter(&pointer)?);
        }
        Ok(out)
    }

    fn parameter(&mut self, pointer: &str) -> Result<ParameterMeta, ContractError> {
        let (target, param) = self.object_at(pointer)?;
        let name = param
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid(&target, "parameter has no name"))?
            .to_string();
        let location = param
            .get("in")
            .cloned()
            .and_then(|v| serde_json::from_value::<oas3::spec::ParameterIn>(v).ok())
            .map(ParameterLocation::from)
            .ok_or_else(|| {
                invalid(&target, "parameter 'in' must be path, query, header or cookie")
            })?;
        let style = match param.get("style") {
            Some(v) => serde_json::from_value::<oas3::spec::ParameterStyle>(v.clone())
                .map(ParameterStyle::from)
                .map_err(|e| invalid(&target, &format!("unknown parameter style: {e}")))?,
            None => location.default_style(),
        };
        let explode = param
            .get("explode")
            .and_then(Value::as_bool)
            .unwrap_or(style == ParameterStyle::Form);
        let required = location == ParameterLocation::Path
            || param.get("required").and_then(Value::as_bool).unwrap_or(false);
        let allow_empty_value = param
            .get("allowEmptyValue")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let (schema, content_json) = if param.get("schema").is_some() {
            (Some(self.schemas.intern(&push_pointer(&target, "schema"))?), false)
        } else if let Some(Value::Object(content)) = param.get("content") {
            let content_pointer = push_pointer(&target, "content");
            match content.iter().next() {
                Some((media_type, entry)) if entry.get("schema").is_some() => {
                    let schema_pointer =
                        push_pointer(&push_pointer(&content_pointer, media_type), "schema");
                    (Some(self.schemas.intern(&schema_pointer)?), true)
                }
                _ => (None, true),
            }
        } else {
            (None, false)
        };

        Ok(ParameterMeta {
            name,
            location,
            required,
            style,
            explode,
            allow_empty_value,
            schema,
            content_json,
            position: self.position(&target),
        })
    }

    fn content(
        &mut self,
        owner: &str,
        obj: &Map<String, Value>,
    ) -> Result<ContentMap, ContractError> {
        let Some(Value::Object(content)) = obj.get("content") else {
            return Ok(Vec::new());
        };
        let content_pointer = push_pointer(owner, "content");
        let mut out = Vec::with_capacity(content.len());
        for (media_type, entry) in content {
            let schema = if entry.get("schema").is_some() {
                let pointer = push_pointer(&push_pointer(&content_pointer, media_type), "schema");
                Some(self.schemas.intern(&pointer)?)
            } else {
                None
            };
            out.push(MediaTypeMeta {
                media_type: media_type.trim().to_ascii_lowercase(),
                schema,
            });
        }
        Ok(out)
    }

    fn request_body(
        &mut self,
        op_pointer: &str,
        op: &Map<String, Value>,
    ) -> Result<Option<RequestBodyMeta>, ContractError> {
        if op.get("requestBody").is_none() {
            return Ok(None);
        }
        let (target, body) = self.object_at(&push_pointer(op_pointer, "requestBody"))?;
        Ok(Some(RequestBodyMeta {
            required: body.get("required").and_then(Value::as_bool).unwrap_or(false),
            content: self.content(&target, body)?,
            position: self.position(&target),
        }))
    }

    fn responses(
        &mut self,
        op_pointer: &str,
        op: &Map<String, Value>,
    ) -> Result<Vec<ResponseMeta>, ContractError> {
        let Some(Value::Object(responses)) = op.get("responses") else {
            return Ok(Vec::new());
        };
        let responses_pointer = push_pointer(op_pointer, "responses");
        let mut out = Vec::with_capacity(responses.len());
        for code in responses.keys() {
            let pointer = push_pointer(&responses_pointer, code);
            let Some(key) = ResponseKey::parse(code) else {
                self.issues.push(ContractIssue::new(
                    pointer,
                    "response_code",
                    format!("'{code}' is not a status code, range or 'default'"),
                ));
                continue;
            };
            let (target, resp) = self.object_at(&pointer)?;
            out.push(ResponseMeta {
                key,
                content: self.content(&target, resp)?,
                position: self.position(&target),
            });
        }
        Ok(out)
    }

    fn lint_path_params(&mut self, template: &str, op_pointer: &str, op: &OperationMeta) {
        let declared: Vec<&str> = op.path_parameters().map(|p| p.name.as_str()).collect();
        let in_template = template_params(template);
        for name in &in_template {
            if !declared.contains(name) {
                self.issues.push(ContractIssue::new(
                    op_pointer,
                    "path_param",
                    format!("template parameter '{{{name}}}' has no 'in: path' declaration"),
                ));
            }
        }
        for name in declared {
            if !in_template.contains(&name) {
                self.issues.push(ContractIssue::new(
                    op_pointer,
                    "path_param",
                    format!("path parameter '{name}' does not appear in '{template}'"),
                ));
            }
        }
    }
}

/// Names of `{param}` placeholders in a path template.
pub fn template_params(template: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        out.push(&rest[start + 1..start + len]);
        rest = &rest[start + len + 1..];
    }
    out
}

fn invalid(location: &str, message: &str) -> ContractError {
    ContractError::InvalidDocument {
        location: location.to_string(),
        message: message.to_string(),
    }
}

/// Path component of the first server URL, without a trailing slash.
///
/// Server variables are substituted with their defaults; relative URLs are
/// resolved against a dummy host.
fn base_path(doc: &Value) -> String {
    let Some(first) = doc.get("servers").and_then(Value::as_array).and_then(|s| s.first()) else {
        return String::new();
    };
    let Ok(server) = serde_json::from_value::<oas3::spec::Server>(first.clone()) else {
        return String::new();
    };
    let mut url_str = server.url.clone();
    for (name, var) in &server.variables {
        url_str = url_str.replace(&format!("{{{name}}}"), &var.default);
    }
    url::Url::parse(&url_str)
        .or_else(|_| url::Url::parse(&format!("http://dummy{url_str}")))
        .map(|u| {
            let p = u.path().trim_end_matches('/');
            if p == "/" || p.is_empty() {
                String::new()
            } else {
                p.to_string()
            }
        })
        .unwrap_or_default()
}

fn check_version(doc: &Value) -> Result<String, ContractError> {
    let version = match doc.get("openapi") {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    if version.starts_with("3.0") || version.starts_with("3.1") {
        Ok(version)
    } else {
        Err(ContractError::UnsupportedVersion { found: version })
    }
}

/// Builds a [`Contract`] from a parsed document.
///
/// `source_map` supplies line and column information; pass `None` for JSON
/// input.
///
/// # Errors
///
/// Returns [`ContractError`] when the version is unsupported, a reference
/// cannot be resolved or loops, or the document is not shaped like OpenAPI.
/// Lint findings are not errors; they are logged and kept on
/// [`Contract::issues`].
pub fn build_contract(
    doc: &Value,
    source_map: Option<&SourceMap>,
) -> Result<Contract, ContractError> {
    let openapi = check_version(doc)?;
    let info: oas3::spec::Info = doc
        .get("info")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| invalid("/info", &e.to_string()))?
        .ok_or_else(|| invalid("", "missing 'info'"))?;
    let base_path = base_path(doc);

    let mut builder = Builder {
        doc,
        source_map,
        schemas: SchemaInterner::new(doc, source_map),
        issues: Vec::new(),
    };

    let mut paths = Vec::new();
    match doc.get("paths") {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for template in map.keys() {
                let item_pointer = push_pointer("/paths", template);
                let (item_target, item) = builder.object_at(&item_pointer)?;
                let shared = builder.parameters(&push_pointer(&item_target, "parameters"))?;
                let template_arc: Arc<str> = Arc::from(template.as_str());

                let mut operations = Vec::new();
                for (key, op_value) in item {
                    let lower = key.to_ascii_lowercase();
                    if !METHODS.contains(&lower.as_str()) {
                        continue;
                    }
                    let op_pointer = push_pointer(&item_target, key);
                    let Some(op) = op_value.as_object() else {
                        return Err(invalid(&op_pointer, "operation must be an object"));
                    };
                    let method = Method::from_bytes(lower.to_ascii_uppercase().as_bytes())
                        .map_err(|e| invalid(&op_pointer, &e.to_string()))?;

                    let mut parameters = shared.clone();
                    for param in builder.parameters(&push_pointer(&op_pointer, "parameters"))? {
                        let existing = parameters
                            .iter_mut()
                            .find(|p| p.matches(&param.name, param.location));
                        match existing {
                            Some(existing) => *existing = param,
                            None => parameters.push(param),
                        }
                    }

                    let meta = OperationMeta {
                        method,
                        path_template: Arc::clone(&template_arc),
                        operation_id: op
                            .get("operationId")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                        parameters,
                        request_body: builder.request_body(&op_pointer, op)?,
                        responses: builder.responses(&op_pointer, op)?,
                        position: builder.position(&op_pointer),
                    };
                    builder.lint_path_params(template, &op_pointer, &meta);
                    operations.push(Arc::new(meta));
                }

                paths.push(PathEntry {
                    template: template_arc,
                    operations,
                    position: builder.position(&item_pointer),
                });
            }
        }
        Some(_) => return Err(invalid("/paths", "paths must be an object")),
    }

    let Builder { schemas, issues, .. } = builder;
    log_issues(&issues);

    let contract = Contract {
        title: info.title,
        openapi,
        base_path,
        paths,
        schemas: schemas.finish(),
        issues,
    };
    info!(
        title = %contract.title,
        openapi = %contract.openapi,
        routes = contract.operations().count(),
        schemas = contract.schemas.len(),
        base_path = %contract.base_path,
        "OpenAPI contract loaded"
    );
    Ok(contract)
}
