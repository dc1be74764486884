use std::fmt;

/// A non-fatal finding about the contract itself.
///
/// Collected while the contract is built and exposed through
/// [`crate::spec::Contract::issues`]. `location` is a JSON pointer into the
/// document, `kind` a short tag such as `path_param`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractIssue {
    pub location: String,
    pub kind: String,
    pub message: String,
}

impl ContractIssue {
    pub fn new(
        location: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ContractIssue {
            location: location.into(),
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ContractIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Logs every issue as a warning.
pub fn log_issues(issues: &[ContractIssue]) {
    if issues.is_empty() {
        return;
    }
    tracing::warn!(count = issues.len(), "OpenAPI contract has lint issues");
    for issue in issues {
        tracing::warn!(
            kind = %issue.kind,
            location = %issue.location,
            "{}",
            issue.message
        );
    }
}

/// Converts a non-empty issue list into an error.
///
/// Used by callers that want lint findings to be fatal.
pub fn fail_if_issues(issues: &[ContractIssue]) -> Result<(), ContractError> {
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ContractError::Issues(issues.to_vec()))
    }
}

/// The contract graph cannot be built.
///
/// Distinct from [`super::ValidationError`]: these describe a broken contract,
/// never a broken request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// `openapi` is missing or not a 3.0.x / 3.1.x version
    UnsupportedVersion { found: String },
    /// A `$ref` that is not local or points at nothing
    UnresolvedReference { reference: String },
    /// A `$ref` chain loops back on itself
    CircularReference { reference: String },
    /// The document does not have the shape of an OpenAPI description
    InvalidDocument { location: String, message: String },
    /// Lint findings promoted to an error
    Issues(Vec<ContractIssue>),
}

impl fmt::Display for ContractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractError::UnsupportedVersion { found } => {
                write!(
                    f,
                    "Unsupported OpenAPI version '{found}'. Only 3.0.x and 3.1.x are supported"
                )
            }
            ContractError::UnresolvedReference { reference } => {
                write!(f, "Unable to resolve reference '{reference}'")
            }
            ContractError::CircularReference { reference } => {
                write!(f, "Circular reference detected at '{reference}'")
            }
            ContractError::InvalidDocument { location, message } => {
                write!(f, "Invalid OpenAPI document at '{location}': {message}")
            }
            ContractError::Issues(issues) => {
                write!(f, "OpenAPI contract has {} issue(s)", issues.len())?;
                for issue in issues {
                    write!(f, "\n  {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ContractError {}
