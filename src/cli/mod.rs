//! # CLI Module
//!
//! Command-line access to the validator, shipped as the `brrtv` binary.
//!
//! ## Commands
//!
//! ### `check`
//!
//! Validate a recorded exchange against a contract:
//!
//! ```bash
//! brrtv check --spec openapi.yaml --exchange exchange.json --format json
//! ```
//!
//! The exchange file holds a request and, optionally, the response it got:
//!
//! ```json
//! {
//!   "request":  {"method": "POST", "path": "/pets",
//!                "headers": {"content-type": "application/json"},
//!                "body": {"name": "rex"}},
//!   "response": {"status": 201, "headers": {}, "body": {"id": 1}}
//! }
//! ```
//!
//! A JSON string body is sent verbatim; any other JSON value is serialized.
//!
//! ### `routes`
//!
//! List every operation as `METHOD /base/template`:
//!
//! ```bash
//! brrtv routes --spec openapi.yaml
//! ```
//!
//! ### `resolve`
//!
//! Show which template a concrete request path resolves to:
//!
//! ```bash
//! brrtv resolve --spec openapi.yaml --method GET --path /pets/42
//! ```
//!
//! ## Exit codes
//!
//! `0` when everything passed, `1` when validation or resolution failed, `2`
//! when the inputs could not be read.

mod commands;


pub use commands::{run, run_cli, Cli, Commands, OutputFormat, RecordedExchange};
