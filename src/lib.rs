//! # brrtvalidator
//!
//! **brrtvalidator** checks live HTTP traffic against an
//! [OpenAPI 3.x](https://spec.openapis.org/oas/v3.1.0) contract. Given a
//! request, and optionally the response it received, it reports whether the
//! exchange conforms to the declared operations, parameters and schemas, and
//! if not, returns a categorised list of failures.
//!
//! ## Architecture
//!
//! - **[`errors`]** - Failure taxonomy: [`ValidationError`], [`SchemaValidationFailure`],
//!   categorisation and rendering, plus [`ContractError`] for unusable contracts
//! - **[`spec`]** - Loads YAML/JSON documents into an immutable [`Contract`] with a schema
//!   arena and source positions
//! - **[`router`]** - Resolves method and path to an operation through a radix tree
//! - **[`params`]** - Locates, decodes and checks path, query, header and cookie parameters
//! - **[`body`]** - Negotiates the media type, decodes and checks request and response bodies
//! - **[`schema`]** - Walks schema graphs and drives the `jsonschema` keyword engine
//! - **[`validator`]** - The [`Validator`] facade over `http::Request` / `http::Response`
//! - **[`config`]** / **[`logging`]** - Strictness flags and `tracing` setup from the environment
//! - **[`cli`]** - The `brrtv` command-line tool
//!
//! ### Validation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Caller
//!     participant V as Validator
//!     participant R as Router
//!     participant P as ParameterValidator
//!     participant B as BodyValidator
//!     participant S as SchemaAdapter
//!
//!     Caller->>V: validate_request(&req)
//!     V->>R: resolve(method, path)
//!     alt No template or no operation
//!         R-->>Caller: (false, [path missing / missingOperation])
//!     end
//!     R-->>V: RouteMatch (operation, raw path params)
//!     V->>P: validate_operation(...)
//!     P->>S: evaluate(decoded value, schema, parameter)
//!     V->>B: validate(content map, body)
//!     B->>S: evaluate(decoded body, schema, requestBody)
//!     V-->>Caller: (ok, failures in declaration order)
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use brrtvalidator::spec::load_contract;
//! use brrtvalidator::Validator;
//!
//! let validator = Validator::new(load_contract("openapi.yaml").expect("contract"));
//!
//! let request = http::Request::post("/pets")
//!     .header("content-type", "application/json")
//!     .body(br#"{"name": "rex"}"#.to_vec())
//!     .unwrap();
//!
//! let (ok, failures) = validator.validate_request(&request);
//! for failure in &failures {
//!     println!("{failure}");
//! }
//! assert_eq!(ok, failures.is_empty());
//! ```
//!
//! ## Failure Categories
//!
//! | Category | Meaning | Examples |
//! |---|---|---|
//! | `schema` | a decoded value violates its schema | wrong type, enum, format, missing property |
//! | `retrieval` | nothing to validate against | unknown path, missing parameter |
//! | `structural` | the value exists but cannot be decoded | malformed JSON, bad percent-encoding |
//!
//! ## Concurrency
//!
//! A [`Contract`] is read-only once built and a [`Validator`] keeps no
//! per-call state, so one instance can serve any number of threads.

pub mod body;
pub mod cli;
pub mod config;
pub mod errors;
pub mod logging;
pub mod params;
pub mod router;
pub mod schema;
pub mod spec;
pub mod validator;
pub mod validator_cache;

pub use config::ValidatorOptions;
pub use errors::{
    ContractError, ContractIssue, ErrorCategory, SchemaValidationFailure, ValidationError,
    ValidationSource, ValidationSubType, ValidationType,
};
pub use router::{RouteMatch, Router};
pub use spec::{load_contract, load_contract_from_str, Contract, DocumentFormat};
pub use validator::Validator;
