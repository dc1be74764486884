//! Error model shared by every validation stage.
//!
//! Traffic failures are values of [`ValidationError`]; a broken contract is a
//! [`ContractError`].

mod constants;
mod contract;
mod validation_error;

pub use constants::{
    ErrorCategory, ExchangeSide, FailureKind, ValidationSource, ValidationSubType, ValidationType,
};
pub use contract::{fail_if_issues, log_issues, ContractError, ContractIssue};
pub use validation_error::{SchemaValidationFailure, ValidationError};
