use super::constants::{
    ErrorCategory, ExchangeSide, FailureKind, ValidationSource, ValidationSubType, ValidationType,
};
use crate::spec::{ParameterLocation, SourcePosition};
use serde::{Deserialize, Serialize};
use std::fmt;

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// A single failure reported by the schema evaluator.
///
/// `location` is a JSON pointer into the validated value (`/` for the value
/// itself), `validation_source` records which half of the exchange the value
/// came from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationFailure {
    pub reason: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_source: Option<ValidationSource>,
    #[serde(default)]
    pub kind: FailureKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field_name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub spec_line: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub spec_col: usize,
}

impl SchemaValidationFailure {
    pub fn new(reason: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            location: location.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ValidationSource) -> Self {
        self.validation_source = Some(source);
        self
    }

    #[must_use]
    pub fn with_kind(mut self, kind: FailureKind) -> Self {
        self.kind = kind;
        self
    }
}

impl fmt::Display for SchemaValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Reason: {}, Location: {}", self.reason, self.location)
    }
}

impl std::error::Error for SchemaValidationFailure {}

/// The unit of reporting returned to callers.
///
/// `error_category` is derived from `validation_type`, `validation_sub_type`
/// and the presence of `schema_validation_errors`. Every constructor in this
/// module categorises before returning; callers assembling a value by hand
/// call [`ValidationError::set_error_category`] once the inputs are final.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub message: String,
    pub reason: String,
    pub validation_type: ValidationType,
    pub validation_sub_type: ValidationSubType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schema_validation_errors: Vec<SchemaValidationFailure>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub spec_line: usize,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub spec_col: usize,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub how_to_fix: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub request_method: String,
    /// Path template of the matched operation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub spec_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_location: Option<ParameterLocation>,
}

impl ValidationError {
    fn categorized(
        validation_type: ValidationType,
        validation_sub_type: ValidationSubType,
        message: String,
        reason: String,
        schema_validation_errors: Vec<SchemaValidationFailure>,
    ) -> Self {
        let mut err = Self {
            message,
            reason,
            validation_type,
            validation_sub_type,
            schema_validation_errors,
            ..Self::default()
        };
        err.set_error_category();
        err
    }

    /// No path template in the contract matches the request path.
    pub fn path_missing(method: &str, path: &str) -> Self {
        let mut err = Self::categorized(
            ValidationType::Path,
            ValidationSubType::Missing,
            format!("{method} Path '{path}' not found"),
            format!(
                "The {method} request contains a path of '{path}' however that path, \
                 or the {method} method for that path does not exist in the contract"
            ),
            Vec::new(),
        );
        err.how_to_fix = "Check the request path against the paths declared in the contract".into();
        err
    }

    /// A template matched but declares no operation for the method.
    pub fn operation_missing(
        method: &str,
        path: &str,
        template: &str,
        position: Option<SourcePosition>,
    ) -> Self {
        let mut err = Self::categorized(
            ValidationType::Path,
            ValidationSubType::MissingOperation,
            format!("{method} operation for path '{template}' does not exist"),
            format!(
                "The path '{path}' matched '{template}', however no {method} operation \
                 is defined for that path"
            ),
            Vec::new(),
        );
        err.spec_path = template.to_string();
        err.at(position);
        err
    }

    /// A required parameter is absent from the request.
    pub fn parameter_missing(
        name: &str,
        location: ParameterLocation,
        position: Option<SourcePosition>,
    ) -> Self {
        let mut err = Self::categorized(
            ValidationType::Parameter,
            ValidationSubType::Missing,
            format!("{} parameter '{name}' is missing", location.title()),
            format!(
                "The {location} parameter '{name}' is defined as being required, \
                 however it's missing from the request"
            ),
            Vec::new(),
        );
        err.how_to_fix = format!("Add the {location} parameter '{name}' to the request");
        err.for_parameter(name, location);
        err.at(position);
        err
    }

    /// A required parameter is present with an empty value.
    pub fn parameter_empty(
        name: &str,
        location: ParameterLocation,
        position: Option<SourcePosition>,
    ) -> Self {
        let mut err = Self::categorized(
            ValidationType::Parameter,
            ValidationSubType::Required,
            format!("{} parameter '{name}' is empty", location.title()),
            format!(
                "The {location} parameter '{name}' is required and does not allow empty values, \
                 however the request sent an empty value"
            ),
            Vec::new(),
        );
        err.how_to_fix = format!("Provide a value for the {location} parameter '{name}'");
        err.for_parameter(name, location);
        err.at(position);
        err
    }

    /// The raw parameter value does not follow its serialization style.
    pub fn parameter_encoding(
        name: &str,
        location: ParameterLocation,
        detail: &str,
        position: Option<SourcePosition>,
    ) -> Self {
        let mut err = Self::categorized(
            ValidationType::from(location),
            ValidationSubType::Encoding,
            format!("{} parameter '{name}' is not encoded correctly", location.title()),
            format!("The {location} parameter '{name}' could not be decoded: {detail}"),
            Vec::new(),
        );
        err.for_parameter(name, location);
        err.at(position);
        err
    }

    /// The decoded parameter value failed schema evaluation.
    ///
    /// The sub type follows the kind of the leading failure.
    pub fn parameter_schema(
        name: &str,
        location: ParameterLocation,
        failures: Vec<SchemaValidationFailure>,
        position: Option<SourcePosition>,
    ) -> Self {
        let sub_type = leading_sub_type(&failures);
        let first = failures
            .first()
            .map(|f| f.reason.clone())
            .unwrap_or_default();
        let mut err = Self::categorized(
            ValidationType::from(location),
            sub_type,
            format!("{} parameter '{name}' failed to validate", location.title()),
            format!("The {location} parameter '{name}' does not match its schema: {first}"),
            failures,
        );
        err.for_parameter(name, location);
        err.at(position);
        err
    }

    /// A query key that no declared parameter accounts for (strict mode).
    pub fn query_undeclared(name: &str) -> Self {
        let mut err = Self::categorized(
            ValidationType::Query,
            ValidationSubType::Invalid,
            format!("Query parameter '{name}' is not defined"),
            format!("The query parameter '{name}' is not declared by the operation"),
            Vec::new(),
        );
        err.how_to_fix = format!("Remove the query parameter '{name}' from the request");
        err.parameter_name = Some(name.to_string());
        err.parameter_location = Some(ParameterLocation::Query);
        err
    }

    /// A required body was not sent.
    pub fn body_missing(side: ExchangeSide) -> Self {
        let side_name = side.as_str();
        Self::categorized(
            side.validation_type(),
            ValidationSubType::Missing,
            format!("{} body is missing", capitalize(side_name)),
            format!("The {side_name} body is defined as being required, however it's missing"),
            Vec::new(),
        )
    }

    /// The content type is absent or not declared by the contract.
    pub fn body_content_type(
        side: ExchangeSide,
        content_type: Option<&str>,
        declared: &[String],
    ) -> Self {
        let side_name = side.as_str();
        let (message, reason) = match content_type {
            Some(ct) => (
                format!("{side_name} content type '{ct}' is not supported"),
                format!(
                    "The content type '{ct}' of the {side_name} body is not declared, \
                     declared types are: [{}]",
                    declared.join(", ")
                ),
            ),
            None => (
                format!("{side_name} content type is missing"),
                format!(
                    "The {side_name} carries a body without a content type, \
                     declared types are: [{}]",
                    declared.join(", ")
                ),
            ),
        };
        let mut err = Self::categorized(
            side.validation_type(),
            ValidationSubType::ContentType,
            capitalize(&message),
            reason,
            Vec::new(),
        );
        if !declared.is_empty() {
            err.how_to_fix =
                format!("Send one of the declared content types: {}", declared.join(", "));
        }
        err
    }

    /// The payload could not be decoded at all.
    pub fn body_decode(side: ExchangeSide, media_type: &str, detail: &str) -> Self {
        let side_name = side.as_str();
        Self::categorized(
            side.validation_type(),
            ValidationSubType::Schema,
            format!("{} body cannot be decoded", capitalize(side_name)),
            format!("The {side_name} body declared as '{media_type}' cannot be decoded: {detail}"),
            Vec::new(),
        )
    }

    /// The decoded payload failed schema evaluation.
    pub fn body_schema(
        side: ExchangeSide,
        media_type: &str,
        failures: Vec<SchemaValidationFailure>,
        position: Option<SourcePosition>,
    ) -> Self {
        let side_name = side.as_str();
        let sub_type = leading_sub_type(&failures);
        let count = failures.len();
        let mut err = Self::categorized(
            side.validation_type(),
            sub_type,
            format!("{} body for '{media_type}' failed to validate schema", capitalize(side_name)),
            format!(
                "The {side_name} body is defined as '{media_type}' but {count} schema \
                 violation(s) were found"
            ),
            failures,
        );
        err.at(position);
        err
    }

    /// The response status has no declaration under the operation.
    pub fn response_status_missing(status: u16, template: &str) -> Self {
        let mut err = Self::categorized(
            ValidationType::Response,
            ValidationSubType::Missing,
            format!("Response code '{status}' is not defined"),
            format!(
                "The operation for '{template}' does not declare a response for status code \
                 '{status}' and has no default response"
            ),
            Vec::new(),
        );
        err.spec_path = template.to_string();
        err
    }

    fn for_parameter(&mut self, name: &str, location: ParameterLocation) {
        self.parameter_name = Some(name.to_string());
        self.parameter_location = Some(location);
    }

    fn at(&mut self, position: Option<SourcePosition>) {
        if let Some(pos) = position {
            self.spec_line = pos.line;
            self.spec_col = pos.column;
        }
    }

    #[must_use]
    pub fn is_path_missing_error(&self) -> bool {
        self.validation_type == ValidationType::Path
            && self.validation_sub_type == ValidationSubType::Missing
    }

    #[must_use]
    pub fn is_operation_missing_error(&self) -> bool {
        self.validation_type == ValidationType::Path
            && self.validation_sub_type == ValidationSubType::MissingOperation
    }

    #[must_use]
    pub fn is_schema_error(&self) -> bool {
        !self.schema_validation_errors.is_empty()
    }

    #[must_use]
    pub fn is_retrieval_error(&self) -> bool {
        self.error_category == Some(ErrorCategory::Retrieval)
    }

    #[must_use]
    pub fn is_structural_error(&self) -> bool {
        self.error_category == Some(ErrorCategory::Structural)
    }

    /// Maps the validation type to the part of the exchange it concerns.
    ///
    /// Returns `None` for types without a natural source; the caller picks
    /// the default.
    #[must_use]
    pub fn determine_validation_source(&self) -> Option<ValidationSource> {
        match self.validation_type {
            ValidationType::Request => Some(ValidationSource::RequestBody),
            ValidationType::Response => Some(ValidationSource::ResponseBody),
            ValidationType::Parameter
            | ValidationType::Query
            | ValidationType::Header
            | ValidationType::Cookie => Some(ValidationSource::Parameter),
            ValidationType::Schema => Some(ValidationSource::Document),
            ValidationType::Path | ValidationType::Body | ValidationType::Other(_) => None,
        }
    }

    /// Category implied by the current type, sub type and schema failures.
    ///
    /// First match wins: schema failures, then the retrieval pairs, then
    /// structural for everything else.
    #[must_use]
    pub fn derive_category(&self) -> ErrorCategory {
        if self.is_schema_error() {
            return ErrorCategory::Schema;
        }
        match (&self.validation_type, &self.validation_sub_type) {
            (
                ValidationType::Path,
                ValidationSubType::Missing | ValidationSubType::MissingOperation,
            ) => ErrorCategory::Retrieval,
            (
                ValidationType::Request,
                ValidationSubType::ContentType | ValidationSubType::Missing,
            ) => ErrorCategory::Retrieval,
            (
                ValidationType::Parameter,
                ValidationSubType::Missing | ValidationSubType::Required,
            ) => ErrorCategory::Retrieval,
            _ => ErrorCategory::Structural,
        }
    }

    pub fn set_error_category(&mut self) {
        self.error_category = Some(self.derive_category());
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}, Reason: {}", self.message, self.reason)?;
        if !self.schema_validation_errors.is_empty() {
            f.write_str(", Validation Errors: [")?;
            for (i, failure) in self.schema_validation_errors.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{failure}")?;
            }
            f.write_str("]")?;
        }
        if self.spec_line != 0 {
            write!(f, ", Line: {}, Column: {}", self.spec_line, self.spec_col)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn leading_sub_type(failures: &[SchemaValidationFailure]) -> ValidationSubType {
    failures
        .first()
        .map(|f| ValidationSubType::from(f.kind))
        .unwrap_or(ValidationSubType::Schema)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(reason: &str, location: &str) -> SchemaValidationFailure {
        SchemaValidationFailure::new(reason, location)
    }

    fn typed(vt: &str, vst: &str) -> ValidationError {
        ValidationError {
            validation_type: ValidationType::from(vt),
            validation_sub_type: ValidationSubType::from(vst),
            ..ValidationError::default()
        }
    }

    #[test]
    fn test_schema_failure_display() {
        let f = failure("Invalid type", "/path/to/property");
        assert_eq!(f.to_string(), "Reason: Invalid type, Location: /path/to/property");
    }

    #[test]
    fn test_display_without_schema_errors() {
        let v = ValidationError {
            message: "Missing required field".into(),
            reason: "The field 'id' is required but missing".into(),
            ..ValidationError::default()
        };
        assert_eq!(
            v.to_string(),
            "Error: Missing required field, Reason: The field 'id' is required but missing"
        );
    }

    #[test]
    fn test_display_with_line_and_column() {
        let v = ValidationError {
            message: "Invalid data type".into(),
            reason: "Expected 'string', got 'integer'".into(),
            spec_line: 10,
            spec_col: 15,
            ..ValidationError::default()
        };
        assert_eq!(
            v.to_string(),
            "Error: Invalid data type, Reason: Expected 'string', got 'integer', \
             Line: 10, Column: 15"
        );
    }

    #[test]
    fn test_display_with_schema_errors_and_position() {
        let v = ValidationError {
            message: "Enum validation failed".into(),
            reason: "Invalid enum value".into(),
            schema_validation_errors: vec![
                failure("Invalid enum value", "/path/to/enum"),
                failure("too long", "/name"),
            ],
            spec_line: 12,
            spec_col: 5,
            ..ValidationError::default()
        };
        assert_eq!(
            v.to_string(),
            "Error: Enum validation failed, Reason: Invalid enum value, Validation Errors: \
             [Reason: Invalid enum value, Location: /path/to/enum \
             Reason: too long, Location: /name], \
             Line: 12, Column: 5"
        );
    }

    #[test]
    fn test_path_and_operation_predicates() {
        let mut v = typed("path", "missing");
        assert!(v.is_path_missing_error());
        v.validation_sub_type = ValidationSubType::from("wrongType");
        assert!(!v.is_path_missing_error());
        v = typed("request", "missing");
        assert!(!v.is_path_missing_error());

        let mut v = typed("path", "missingOperation");
        assert!(v.is_operation_missing_error());
        v.validation_type = ValidationType::Request;
        assert!(!v.is_operation_missing_error());
    }

    #[test]
    fn test_schema_error_predicate() {
        let mut v = ValidationError {
            schema_validation_errors: vec![failure("Invalid type", "/field")],
            ..ValidationError::default()
        };
        assert!(v.is_schema_error());
        v.schema_validation_errors.clear();
        assert!(!v.is_schema_error());
    }

    #[test]
    fn test_category_predicates() {
        let mut v = ValidationError {
            error_category: Some(ErrorCategory::Retrieval),
            ..ValidationError::default()
        };
        assert!(v.is_retrieval_error());
        assert!(!v.is_structural_error());
        v.error_category = Some(ErrorCategory::Structural);
        assert!(v.is_structural_error());
        v.error_category = Some(ErrorCategory::Schema);
        assert!(!v.is_retrieval_error());
        assert!(!v.is_structural_error());
    }

    #[test]
    fn test_uncategorized_error_has_no_category() {
        let v = typed("path", "missing");
        assert_eq!(v.error_category, None);
        assert!(!v.is_retrieval_error());
    }

    #[test]
    fn test_set_error_category_table() {
        let cases = [
            ("path", "missing", ErrorCategory::Retrieval),
            ("path", "missingOperation", ErrorCategory::Retrieval),
            ("request", "contentType", ErrorCategory::Retrieval),
            ("request", "missing", ErrorCategory::Retrieval),
            ("request", "schema", ErrorCategory::Structural),
            ("parameter", "missing", ErrorCategory::Retrieval),
            ("parameter", "required", ErrorCategory::Retrieval),
            ("parameter", "format", ErrorCategory::Structural),
            ("response", "contentType", ErrorCategory::Structural),
            ("query", "missing", ErrorCategory::Structural),
            ("unknown", "unknown", ErrorCategory::Structural),
        ];
        for (vt, vst, expected) in cases {
            let mut v = typed(vt, vst);
            v.set_error_category();
            assert_eq!(v.error_category, Some(expected), "({vt}, {vst})");
        }
    }

    #[test]
    fn test_schema_errors_take_precedence() {
        let retrieval = [("path", "missing"), ("parameter", "missing"), ("request", "contentType")];
        for (vt, vst) in retrieval {
            let mut v = typed(vt, vst);
            v.schema_validation_errors.push(failure("Test schema error", "/test"));
            v.set_error_category();
            assert_eq!(v.error_category, Some(ErrorCategory::Schema));
        }
    }

    #[test]
    fn test_set_error_category_is_idempotent() {
        let mut v = typed("request", "contentType");
        v.set_error_category();
        let first = v.error_category;
        v.set_error_category();
        assert_eq!(v.error_category, first);
    }

    #[test]
    fn test_category_recomputed_after_input_change() {
        let mut v = typed("parameter", "missing");
        v.set_error_category();
        assert!(v.is_retrieval_error());
        v.validation_sub_type = ValidationSubType::Format;
        v.set_error_category();
        assert!(v.is_structural_error());
    }

    #[test]
    fn test_determine_validation_source() {
        let cases = [
            ("request", Some(ValidationSource::RequestBody)),
            ("response", Some(ValidationSource::ResponseBody)),
            ("parameter", Some(ValidationSource::Parameter)),
            ("query", Some(ValidationSource::Parameter)),
            ("header", Some(ValidationSource::Parameter)),
            ("cookie", Some(ValidationSource::Parameter)),
            ("schema", Some(ValidationSource::Document)),
            ("path", None),
            ("whatever", None),
        ];
        for (vt, expected) in cases {
            assert_eq!(typed(vt, "").determine_validation_source(), expected, "{vt}");
        }
    }

    #[test]
    fn test_constructors_are_categorized() {
        let e = ValidationError::path_missing("GET", "/nope");
        assert!(e.is_path_missing_error());
        assert!(e.is_retrieval_error());

        let e = ValidationError::operation_missing("PUT", "/pets/1", "/pets/{id}", None);
        assert!(e.is_operation_missing_error());
        assert!(e.is_retrieval_error());
        assert_eq!(e.spec_path, "/pets/{id}");

        let e = ValidationError::parameter_missing(
            "status",
            ParameterLocation::Query,
            Some(SourcePosition { line: 7, column: 11 }),
        );
        assert!(e.is_retrieval_error());
        assert_eq!(e.parameter_location, Some(ParameterLocation::Query));
        assert_eq!((e.spec_line, e.spec_col), (7, 11));

        let e = ValidationError::parameter_encoding("ids", ParameterLocation::Path, "odd", None);
        assert_eq!(e.validation_type, ValidationType::Path);
        assert!(e.is_structural_error());

        let e = ValidationError::body_decode(ExchangeSide::Request, "application/json", "eof");
        assert_eq!(e.validation_sub_type, ValidationSubType::Schema);
        assert!(e.is_structural_error());

        let e = ValidationError::body_content_type(ExchangeSide::Request, Some("text/xml"), &[]);
        assert!(e.is_retrieval_error());
        let e = ValidationError::body_content_type(ExchangeSide::Response, None, &[]);
        assert!(e.is_structural_error());
    }

    #[test]
    fn test_schema_constructor_uses_leading_kind() {
        let failures = vec![
            failure("not one of", "/").with_kind(FailureKind::Enum),
            failure("too short", "/").with_kind(FailureKind::Constraint),
        ];
        let e =
            ValidationError::parameter_schema("status", ParameterLocation::Query, failures, None);
        assert_eq!(e.validation_type, ValidationType::Query);
        assert_eq!(e.validation_sub_type, ValidationSubType::Enum);
        assert_eq!(e.error_category, Some(ErrorCategory::Schema));
    }

    #[test]
    fn test_serialize_round_trip_keeps_wire_strings() {
        let e = ValidationError::parameter_missing("api-key", ParameterLocation::Header, None);
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["validationType"], "parameter");
        assert_eq!(json["validationSubType"], "missing");
        assert_eq!(json["errorCategory"], "retrieval");
        assert_eq!(json["parameterLocation"], "header");
        let back: ValidationError = serde_json::from_value(json).unwrap();
        assert_eq!(back, e);
    }
}
