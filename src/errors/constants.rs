//! Closed vocabularies of the error model.
//!
//! Every enumeration renders to (and parses from) the exact wire string used in
//! serialized reports. Strings that are not part of the vocabulary survive a
//! round trip through the `Other` variants so that reports produced elsewhere
//! can still be categorised.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationType {
    Path,
    Request,
    Response,
    Parameter,
    Query,
    Header,
    Cookie,
    Body,
    Schema,
    /// Unrecognised value that crossed a serialization boundary
    Other(String),
}

impl ValidationType {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationType::Path => "path",
            ValidationType::Request => "request",
            ValidationType::Response => "response",
            ValidationType::Parameter => "parameter",
            ValidationType::Query => "query",
            ValidationType::Header => "header",
            ValidationType::Cookie => "cookie",
            ValidationType::Body => "body",
            ValidationType::Schema => "schema",
            ValidationType::Other(s) => s.as_str(),
        }
    }
}

impl Default for ValidationType {
    fn default() -> Self {
        ValidationType::Other(String::new())
    }
}

impl From<&str> for ValidationType {
    fn from(s: &str) -> Self {
        match s {
            "path" => ValidationType::Path,
            "request" => ValidationType::Request,
            "response" => ValidationType::Response,
            "parameter" => ValidationType::Parameter,
            "query" => ValidationType::Query,
            "header" => ValidationType::Header,
            "cookie" => ValidationType::Cookie,
            "body" => ValidationType::Body,
            "schema" => ValidationType::Schema,
            other => ValidationType::Other(other.to_string()),
        }
    }
}

impl From<String> for ValidationType {
    fn from(s: String) -> Self {
        ValidationType::from(s.as_str())
    }
}

impl From<ValidationType> for String {
    fn from(v: ValidationType) -> Self {
        match v {
            ValidationType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fine classification of a validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValidationSubType {
    Missing,
    MissingOperation,
    Invalid,
    Required,
    Enum,
    Type,
    Format,
    Encoding,
    ContentType,
    Schema,
    /// Unrecognised value that crossed a serialization boundary
    Other(String),
}

impl ValidationSubType {
    pub fn as_str(&self) -> &str {
        match self {
            ValidationSubType::Missing => "missing",
            ValidationSubType::MissingOperation => "missingOperation",
            ValidationSubType::Invalid => "invalid",
            ValidationSubType::Required => "required",
            ValidationSubType::Enum => "enum",
            ValidationSubType::Type => "type",
            ValidationSubType::Format => "format",
            ValidationSubType::Encoding => "encoding",
            ValidationSubType::ContentType => "contentType",
            ValidationSubType::Schema => "schema",
            ValidationSubType::Other(s) => s.as_str(),
        }
    }
}

impl Default for ValidationSubType {
    fn default() -> Self {
        ValidationSubType::Other(String::new())
    }
}

impl From<&str> for ValidationSubType {
    fn from(s: &str) -> Self {
        match s {
            "missing" => ValidationSubType::Missing,
            "missingOperation" => ValidationSubType::MissingOperation,
            "invalid" => ValidationSubType::Invalid,
            "required" => ValidationSubType::Required,
            "enum" => ValidationSubType::Enum,
            "type" => ValidationSubType::Type,
            "format" => ValidationSubType::Format,
            "encoding" => ValidationSubType::Encoding,
            "contentType" => ValidationSubType::ContentType,
            "schema" => ValidationSubType::Schema,
            other => ValidationSubType::Other(other.to_string()),
        }
    }
}

impl From<String> for ValidationSubType {
    fn from(s: String) -> Self {
        ValidationSubType::from(s.as_str())
    }
}

impl From<ValidationSubType> for String {
    fn from(v: ValidationSubType) -> Self {
        match v {
            ValidationSubType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl From<FailureKind> for ValidationSubType {
    fn from(kind: FailureKind) -> Self {
        match kind {
            FailureKind::Type => ValidationSubType::Type,
            FailureKind::Enum => ValidationSubType::Enum,
            FailureKind::Format => ValidationSubType::Format,
            FailureKind::Required => ValidationSubType::Required,
            FailureKind::Composition | FailureKind::Constraint => ValidationSubType::Schema,
        }
    }
}

impl fmt::Display for ValidationSubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High-level classification derived from type, subtype and schema failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Decoded data violates a schema node
    Schema,
    /// Nothing matching was found to validate against
    Retrieval,
    /// The target exists but its encoding or framing is wrong
    Structural,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Schema => "schema",
            ErrorCategory::Retrieval => "retrieval",
            ErrorCategory::Structural => "structural",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the HTTP exchange the offending value originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValidationSource {
    RequestBody,
    ResponseBody,
    Parameter,
    Document,
}

impl ValidationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationSource::RequestBody => "requestBody",
            ValidationSource::ResponseBody => "responseBody",
            ValidationSource::Parameter => "parameter",
            ValidationSource::Document => "document",
        }
    }
}

impl fmt::Display for ValidationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyword family of a single schema failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    Type,
    Enum,
    Format,
    Required,
    /// allOf / anyOf / oneOf outcome
    Composition,
    /// Any other keyword (bounds, lengths, patterns, ...)
    #[default]
    Constraint,
}

/// Which half of the exchange a body belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeSide {
    Request,
    Response,
}

impl ExchangeSide {
    pub fn validation_type(self) -> ValidationType {
        match self {
            ExchangeSide::Request => ValidationType::Request,
            ExchangeSide::Response => ValidationType::Response,
        }
    }

    pub fn validation_source(self) -> ValidationSource {
        match self {
            ExchangeSide::Request => ValidationSource::RequestBody,
            ExchangeSide::Response => ValidationSource::ResponseBody,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeSide::Request => "request",
            ExchangeSide::Response => "response",
        }
    }
}
