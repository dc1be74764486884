//! # Router Module
//!
//! Resolves a concrete request path and method to an operation of the
//! contract and captures the raw path-parameter substrings.
//!
//! ## Matching
//!
//! Templates live in a radix tree keyed by path segment. A literal segment
//! matches exactly (case-sensitive), `{name}` matches any non-empty segment
//! and mixed segments such as `{id}.json` match through an anchored regex.
//! All matching templates are collected and ranked: more literal segments
//! win, then more mixed segments, then literals further to the left, then
//! declaration order.
//!
//! The path of the first server URL is stripped before matching when the
//! request carries it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use brrtvalidator::router::Router;
//! use brrtvalidator::spec::load_contract;
//!
//! let contract = load_contract("openapi.yaml")?;
//! let router = Router::new(&contract);
//! match router.resolve(&http::Method::GET, "/pets/123") {
//!     Ok(m) => println!("{} {:?}", m.template, m.path_params),
//!     Err(e) => println!("{e}"),
//! }
//! ```

mod core;
mod radix;
#[cfg(test)]
mod tests;

pub use core::{ParamVec, RouteMatch, Router, MAX_INLINE_PARAMS};
