//! # Validator Configuration
//!
//! Strictness flags for the validator, loaded from environment variables in
//! the same way as the rest of the runtime settings.
//!
//! ## Environment Variables
//!
//! | Variable | Effect | Default |
//! |---|---|---|
//! | `BRRTV_STRICT_QUERY` | undeclared query keys are failures | `false` |
//! | `BRRTV_VALIDATE_FORMATS` | assert `format` keywords (`uuid`, `date-time`, ...) | `true` |
//! | `BRRTV_VALIDATE_RESPONSE_STATUS` | undeclared response codes are failures | `true` |
//! | `BRRTV_SCHEMA_CACHE` | `off` compiles schemas on every evaluation | on |
//!
//! Boolean variables accept `1`, `true`, `yes`, `on` and their negations;
//! anything else keeps the default.
//!
//! ## Usage
//!
//! ```rust
//! use brrtvalidator::config::ValidatorOptions;
//!
//! let options = ValidatorOptions::from_env();
//! println!("strict query: {}", options.reject_undeclared_query_params);
//! ```

use std::env;

/// Options that change what counts as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Report query keys that no declared parameter accounts for
    pub reject_undeclared_query_params: bool,
    /// Assert `format` keywords during schema evaluation
    pub validate_formats: bool,
    /// Report response status codes the operation does not declare
    pub validate_response_status: bool,
    /// Keep compiled schema validators between calls
    pub schema_cache: bool,
}

impl Default for ValidatorOptions {
    fn default() -> Self {
        Self {
            reject_undeclared_query_params: false,
            validate_formats: true,
            validate_response_status: true,
            schema_cache: true,
        }
    }
}

impl ValidatorOptions {
    /// Load options from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load options through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| {
            lookup(key)
                .and_then(|v| parse_flag(&v))
                .unwrap_or(default)
        };
        Self {
            reject_undeclared_query_params: flag(
                "BRRTV_STRICT_QUERY",
                defaults.reject_undeclared_query_params,
            ),
            validate_formats: flag("BRRTV_VALIDATE_FORMATS", defaults.validate_formats),
            validate_response_status: flag(
                "BRRTV_VALIDATE_RESPONSE_STATUS",
                defaults.validate_response_status,
            ),
            schema_cache: flag("BRRTV_SCHEMA_CACHE", defaults.schema_cache),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
