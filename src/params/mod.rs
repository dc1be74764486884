//! Parameter validation.
//!
//! Each declared parameter is located in the request, decoded according to
//! its serialization style and evaluated against its schema. Problems are
//! reported per parameter, in declaration order.

mod decode;
mod extract;

pub use extract::{parse_cookies, parse_query_pairs, RequestParts};
pub(crate) use decode::coerce_text;

use crate::errors::{FailureKind, ValidationError, ValidationSource};
use crate::router::RouteMatch;
use crate::schema::SchemaAdapter;
use crate::spec::{OperationMeta, ParameterLocation, ParameterMeta, SchemaArena};
use decode::{
    coerce, extract_query, owns_query_key, shape_of, split_delimited, split_path, RawValue,
};
use serde_json::Value;
use tracing::debug;

pub struct ParameterValidator<'a> {
    arena: &'a SchemaArena,
    adapter: &'a SchemaAdapter<'a>,
    reject_undeclared_query: bool,
}

impl<'a> ParameterValidator<'a> {
    pub fn new(arena: &'a SchemaArena, adapter: &'a SchemaAdapter<'a>) -> Self {
        Self {
            arena,
            adapter,
            reject_undeclared_query: false,
        }
    }

    /// Report query keys that no declared parameter accounts for.
    #[must_use]
    pub fn reject_undeclared_query(mut self, reject: bool) -> Self {
        self.reject_undeclared_query = reject;
        self
    }

    /// Validates every parameter of `operation`.
    pub fn validate_operation(
        &self,
        operation: &OperationMeta,
        route: &RouteMatch,
        parts: &RequestParts<'_>,
    ) -> Vec<ValidationError> {
        let mut errors: Vec<ValidationError> = operation
            .parameters
            .iter()
            .filter(|p| !is_reserved_header(p))
            .flat_map(|p| self.validate(p, route, parts))
            .collect();

        if self.reject_undeclared_query {
            let mut reported: Vec<&str> = Vec::new();
            for (key, _) in parts.query_pairs() {
                let declared = operation
                    .parameters
                    .iter()
                    .filter(|p| p.location == ParameterLocation::Query)
                    .any(|p| owns_query_key(p, key, self.arena));
                if !declared && !reported.contains(&key.as_str()) {
                    reported.push(key);
                    errors.push(ValidationError::query_undeclared(key));
                }
            }
        }
        errors
    }

    /// Validates a single parameter; at most one error is returned.
    pub fn validate(
        &self,
        param: &ParameterMeta,
        route: &RouteMatch,
        parts: &RequestParts<'_>,
    ) -> Option<ValidationError> {
        let shape = shape_of(self.arena, param);
        let extracted = match param.location {
            ParameterLocation::Path => route
                .get_path_param(&param.name)
                .map(|raw| split_path(raw, param, shape))
                .transpose(),
            ParameterLocation::Query => extract_query(parts, param, shape, self.arena),
            ParameterLocation::Header => parts.header(&param.name).and_then(|raw| {
                raw.map(|r| split_delimited(&r, param.explode, shape))
                    .transpose()
            }),
            ParameterLocation::Cookie => parts
                .cookie(&param.name)
                .map(|raw| split_delimited(raw, param.explode, shape))
                .transpose(),
        };

        let raw = match extracted {
            Err(detail) => {
                debug!(
                    parameter = %param.name,
                    location = %param.location,
                    detail = %detail,
                    "Parameter decoding failed"
                );
                return Some(ValidationError::parameter_encoding(
                    &param.name,
                    param.location,
                    &detail,
                    param.position,
                ));
            }
            Ok(None) => {
                return param.required.then(|| {
                    ValidationError::parameter_missing(&param.name, param.location, param.position)
                });
            }
            Ok(Some(raw)) => raw,
        };

        if param.location == ParameterLocation::Query && raw.is_empty() {
            if param.allow_empty_value {
                return None;
            }
            if param.required {
                return Some(ValidationError::parameter_empty(
                    &param.name,
                    param.location,
                    param.position,
                ));
            }
        }

        let (value, coerced) = if param.content_json {
            let RawValue::Scalar(text) = raw else {
                return None;
            };
            match serde_json::from_str::<Value>(&text) {
                Ok(v) => (v, Vec::new()),
                Err(e) => {
                    return Some(ValidationError::parameter_encoding(
                        &param.name,
                        param.location,
                        &format!("value is not valid JSON: {e}"),
                        param.position,
                    ));
                }
            }
        } else {
            coerce(raw, self.arena, param.schema)
        };

        // Pieces that failed coercion stay strings; the schema reports their
        // type again, so keep one type failure per location.
        let mut failures = coerced;
        if let Some(schema) = param.schema {
            let evaluated: Vec<_> = self
                .adapter
                .evaluate(&value, schema, ValidationSource::Parameter)
                .into_iter()
                .filter(|f| {
                    f.kind != FailureKind::Type
                        || !failures
                            .iter()
                            .any(|c| c.kind == FailureKind::Type && c.location == f.location)
                })
                .collect();
            failures.extend(evaluated);
        }
        (!failures.is_empty()).then(|| {
            ValidationError::parameter_schema(&param.name, param.location, failures, param.position)
        })
    }
}

/// Header parameters OpenAPI says to ignore; the HTTP layer owns them.
fn is_reserved_header(param: &ParameterMeta) -> bool {
    param.location == ParameterLocation::Header
        && ["accept", "content-type", "authorization"]
            .iter()
            .any(|reserved| param.name.eq_ignore_ascii_case(reserved))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ErrorCategory, FailureKind, ValidationSubType, ValidationType};
    use crate::router::Router;
    use crate::schema::JsonSchemaEvaluator;
    use crate::spec::{load_contract_from_str, Contract, DocumentFormat};
    use crate::validator_cache::ValidatorCache;
    use http::{HeaderMap, HeaderValue, Method, Uri};

    const DOC: &str = r#"
openapi: 3.0.3
info: {title: Params, version: "1"}
paths:
  /pets/{petId}:
    parameters:
      - name: petId
        in: path
        required: true
        schema: {type: integer, minimum: 1}
    get:
      parameters:
        - name: status
          in: query
          required: true
          schema:
            type: string
            enum: [available, sold]
        - name: tags
          in: query
          schema:
            type: array
            items: {type: string}
        - name: X-Request-Id
          in: header
          schema: {type: string, format: uuid}
        - name: session
          in: cookie
          required: true
          schema: {type: string, minLength: 3}
        - name: meta
          in: query
          content:
            application/json:
              schema:
                type: object
                required: [a]
        - name: ids
          in: query
          schema:
            type: array
            maxItems: 1
            items: {type: integer, minimum: 10}
        - name: Authorization
          in: header
          required: true
          schema: {type: string, minLength: 20}
      responses: {}
"#;

    struct Fixture {
        contract: Contract,
        router: Router,
        evaluator: JsonSchemaEvaluator,
    }

    fn fixture() -> Fixture {
        let contract = load_contract_from_str(DOC, DocumentFormat::Yaml).unwrap();
        let router = Router::new(&contract);
        Fixture {
            contract,
            router,
            evaluator: JsonSchemaEvaluator::new(ValidatorCache::new(true, true)),
        }
    }

    fn run(fx: &Fixture, uri: &str, headers: &HeaderMap, strict: bool) -> Vec<ValidationError> {
        let uri: Uri = uri.parse().unwrap();
        let route = fx.router.resolve(&Method::GET, uri.path()).unwrap();
        let parts = RequestParts::new(&uri, headers);
        let adapter = SchemaAdapter::new(fx.contract.schemas(), &fx.evaluator);
        ParameterValidator::new(fx.contract.schemas(), &adapter)
            .reject_undeclared_query(strict)
            .validate_operation(&route.operation, &route, &parts)
    }

    fn cookie() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::COOKIE, HeaderValue::from_static("session=abcd"));
        headers
    }

    #[test]
    fn test_valid_request_has_no_errors() {
        let fx = fixture();
        let errors = run(&fx, "/pets/3?status=sold&tags=a&tags=b", &cookie(), false);
        assert!(errors.is_empty(), "{errors:?}");
    }

    #[test]
    fn test_path_type_failure() {
        let fx = fixture();
        let errors = run(&fx, "/pets/not-a-number?status=sold", &cookie(), false);
        assert_eq!(errors.len(), 1);
        let err = &errors[0];
        assert_eq!(err.validation_type, ValidationType::Path);
        assert_eq!(err.validation_sub_type, ValidationSubType::Type);
        assert_eq!(err.error_category, Some(ErrorCategory::Schema));
        assert_eq!(err.schema_validation_errors.len(), 1);
        assert_eq!(err.parameter_name.as_deref(), Some("petId"));
    }

    #[test]
    fn test_path_minimum() {
        let fx = fixture();
        let errors = run(&fx, "/pets/0?status=sold", &cookie(), false);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_schema_error());
    }

    #[test]
    fn test_missing_required_query_is_retrieval() {
        let fx = fixture();
        let errors = run(&fx, "/pets/3", &cookie(), false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].validation_type, ValidationType::Parameter);
        assert_eq!(errors[0].validation_sub_type, ValidationSubType::Missing);
        assert!(errors[0].is_retrieval_error());
        assert_eq!(errors[0].parameter_location, Some(ParameterLocation::Query));
    }

    #[test]
    fn test_enum_query() {
        let fx = fixture();
        let errors = run(&fx, "/pets/3?status=lost", &cookie(), false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].validation_type, ValidationType::Query);
        assert_eq!(errors[0].validation_sub_type, ValidationSubType::Enum);
        assert!(errors[0].is_schema_error());
    }

    #[test]
    fn test_empty_required_query() {
        let fx = fixture();
        let errors = run(&fx, "/pets/3?status=", &cookie(), false);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].validation_sub_type, ValidationSubType::Required);
    }

    #[test]
    fn test_missing_cookie_and_bad_header() {
        let fx = fixture();
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("not-a-uuid"));
        let errors = run(&fx, "/pets/3?status=sold", &headers, false);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].validation_type, ValidationType::Header);
        assert_eq!(errors[0].validation_sub_type, ValidationSubType::Format);
        assert_eq!(errors[1].parameter_location, Some(ParameterLocation::Cookie));
        assert!(errors[1].is_retrieval_error());
    }

    #[test]
    fn test_json_content_parameter() {
        let fx = fixture();
        let ok = run(&fx, "/pets/3?status=sold&meta=%7B%22a%22%3A1%7D", &cookie(), false);
        assert!(ok.is_empty(), "{ok:?}");

        let bad = run(&fx, "/pets/3?status=sold&meta=%7Bnope", &cookie(), false);
        assert_eq!(bad.len(), 1);
        assert_eq!(bad[0].validation_sub_type, ValidationSubType::Encoding);
        assert!(bad[0].is_structural_error());
    }

    #[test]
    fn test_undeclared_query_in_strict_mode() {
        let fx = fixture();
        let lenient = run(&fx, "/pets/3?status=sold&debug=1", &cookie(), false);
        assert!(lenient.is_empty());
        let strict = run(&fx, "/pets/3?status=sold&debug=1&debug=2", &cookie(), true);
        assert_eq!(strict.len(), 1);
        assert_eq!(strict[0].parameter_name.as_deref(), Some("debug"));
    }

    #[test]
    fn test_coercion_failure_keeps_other_constraints() {
        let fx = fixture();
        let errors = run(&fx, "/pets/3?status=sold&ids=1&ids=x", &cookie(), false);
        assert_eq!(errors.len(), 1);
        let err = &errors[0];
        assert_eq!(err.validation_sub_type, ValidationSubType::Type);
        let found: Vec<(&str, FailureKind)> = err
            .schema_validation_errors
            .iter()
            .map(|f| (f.location.as_str(), f.kind))
            .collect();
        assert_eq!(
            found,
            vec![
                ("/1", FailureKind::Type),
                ("/", FailureKind::Constraint),
                ("/0", FailureKind::Constraint),
            ]
        );
    }

    #[test]
    fn test_integral_forms_coerce_to_integer() {
        let fx = fixture();
        assert!(run(&fx, "/pets/3.0?status=sold", &cookie(), false).is_empty());
        let errors = run(&fx, "/pets/3.5?status=sold", &cookie(), false);
        assert_eq!(errors[0].validation_sub_type, ValidationSubType::Type);
    }

    #[test]
    fn test_reserved_headers_are_ignored() {
        let fx = fixture();
        let mut headers = cookie();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static("short"));
        assert!(run(&fx, "/pets/3?status=sold", &headers, false).is_empty());
        assert!(run(&fx, "/pets/3?status=sold", &cookie(), false).is_empty());
    }
}
