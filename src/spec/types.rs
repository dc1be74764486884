use super::arena::{SchemaArena, SchemaId};
use crate::errors::{ContractIssue, ValidationType};
use http::Method;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }

    /// Capitalised name used at the start of messages.
    pub fn title(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "Path",
            ParameterLocation::Query => "Query",
            ParameterLocation::Header => "Header",
            ParameterLocation::Cookie => "Cookie",
        }
    }

    /// Style used when the parameter declares none.
    pub fn default_style(&self) -> ParameterStyle {
        match self {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
        }
    }
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<oas3::spec::ParameterIn> for ParameterLocation {
    fn from(loc: oas3::spec::ParameterIn) -> Self {
        match loc {
            oas3::spec::ParameterIn::Path => ParameterLocation::Path,
            oas3::spec::ParameterIn::Query => ParameterLocation::Query,
            oas3::spec::ParameterIn::Header => ParameterLocation::Header,
            oas3::spec::ParameterIn::Cookie => ParameterLocation::Cookie,
        }
    }
}

impl From<ParameterLocation> for ValidationType {
    fn from(loc: ParameterLocation) -> Self {
        match loc {
            ParameterLocation::Path => ValidationType::Path,
            ParameterLocation::Query => ValidationType::Query,
            ParameterLocation::Header => ValidationType::Header,
            ParameterLocation::Cookie => ValidationType::Cookie,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl From<oas3::spec::ParameterStyle> for ParameterStyle {
    fn from(style: oas3::spec::ParameterStyle) -> Self {
        use oas3::spec::ParameterStyle as PS;
        match style {
            PS::Matrix => ParameterStyle::Matrix,
            PS::Label => ParameterStyle::Label,
            PS::Form => ParameterStyle::Form,
            PS::Simple => ParameterStyle::Simple,
            PS::SpaceDelimited => ParameterStyle::SpaceDelimited,
            PS::PipeDelimited => ParameterStyle::PipeDelimited,
            PS::DeepObject => ParameterStyle::DeepObject,
        }
    }
}

impl std::fmt::Display for ParameterStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Label => "label",
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        };
        f.write_str(s)
    }
}

/// 1-based line and column of a node in the contract document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone)]
pub struct ParameterMeta {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub style: ParameterStyle,
    pub explode: bool,
    pub allow_empty_value: bool,
    pub schema: Option<SchemaId>,
    /// Declared through `content` rather than `schema`; the raw value is JSON
    pub content_json: bool,
    pub position: Option<SourcePosition>,
}

impl ParameterMeta {
    pub fn matches(&self, name: &str, location: ParameterLocation) -> bool {
        self.location == location
            && if location == ParameterLocation::Header {
                self.name.eq_ignore_ascii_case(name)
            } else {
                self.name == name
            }
    }
}

/// One entry of a `content` map.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaTypeMeta {
    /// Lowercased media range as declared, e.g. `application/json` or `text/*`
    pub media_type: String,
    pub schema: Option<SchemaId>,
}

pub type ContentMap = Vec<MediaTypeMeta>;

#[derive(Debug, Clone)]
pub struct RequestBodyMeta {
    pub required: bool,
    pub content: ContentMap,
    pub position: Option<SourcePosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseKey {
    Code(u16),
    /// `2XX` and friends, holding the leading digit
    Range(u8),
    Default,
}

impl ResponseKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("default") {
            return Some(ResponseKey::Default);
        }
        let bytes = key.as_bytes();
        if bytes.len() != 3 {
            return None;
        }
        if bytes[1..].iter().all(|b| b.eq_ignore_ascii_case(&b'x')) {
            return match bytes[0] {
                d @ b'1'..=b'5' => Some(ResponseKey::Range(d - b'0')),
                _ => None,
            };
        }
        key.parse::<u16>()
            .ok()
            .filter(|c| (100..600).contains(c))
            .map(ResponseKey::Code)
    }
}

impl std::fmt::Display for ResponseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseKey::Code(c) => write!(f, "{c}"),
            ResponseKey::Range(d) => write!(f, "{d}XX"),
            ResponseKey::Default => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResponseMeta {
    pub key: ResponseKey,
    pub content: ContentMap,
    pub position: Option<SourcePosition>,
}

#[derive(Debug, Clone)]
pub struct OperationMeta {
    pub method: Method,
    pub path_template: Arc<str>,
    pub operation_id: Option<String>,
    /// Path-item parameters merged with the operation's own, in declaration order
    pub parameters: Vec<ParameterMeta>,
    pub request_body: Option<RequestBodyMeta>,
    pub responses: Vec<ResponseMeta>,
    pub position: Option<SourcePosition>,
}

impl OperationMeta {
    /// Exact status first, then its `NXX` range, then `default`.
    pub fn response_for(&self, status: u16) -> Option<&ResponseMeta> {
        let range = u8::try_from(status / 100).ok();
        self.responses
            .iter()
            .find(|r| r.key == ResponseKey::Code(status))
            .or_else(|| {
                self.responses
                    .iter()
                    .find(|r| range.is_some_and(|d| r.key == ResponseKey::Range(d)))
            })
            .or_else(|| self.responses.iter().find(|r| r.key == ResponseKey::Default))
    }

    pub fn path_parameters(&self) -> impl Iterator<Item = &ParameterMeta> {
        self.parameters
            .iter()
            .filter(|p| p.location == ParameterLocation::Path)
    }
}

#[derive(Debug, Clone)]
pub struct PathEntry {
    pub template: Arc<str>,
    pub operations: Vec<Arc<OperationMeta>>,
    pub position: Option<SourcePosition>,
}

impl PathEntry {
    pub fn operation(&self, method: &Method) -> Option<&Arc<OperationMeta>> {
        self.operations.iter().find(|op| op.method == *method)
    }
}

/// Immutable, shareable view of an OpenAPI description.
#[derive(Debug, Clone)]
pub struct Contract {
    pub(crate) title: String,
    pub(crate) openapi: String,
    pub(crate) base_path: String,
    pub(crate) paths: Vec<PathEntry>,
    pub(crate) schemas: SchemaArena,
    pub(crate) issues: Vec<ContractIssue>,
}

impl Contract {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn openapi_version(&self) -> &str {
        &self.openapi
    }

    /// Path of the first server URL without a trailing slash, empty when none.
    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Path templates in declaration order.
    pub fn paths(&self) -> &[PathEntry] {
        &self.paths
    }

    pub fn schemas(&self) -> &SchemaArena {
        &self.schemas
    }

    pub fn issues(&self) -> &[ContractIssue] {
        &self.issues
    }

    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationMeta>> {
        self.paths.iter().flat_map(|p| p.operations.iter())
    }

    pub fn find_operation(&self, method: &Method, template: &str) -> Option<&Arc<OperationMeta>> {
        self.paths
            .iter()
            .find(|p| &*p.template == template)
            .and_then(|p| p.operation(method))
    }
}
