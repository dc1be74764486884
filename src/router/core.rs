use super::radix::{Candidate, KindVec, RadixNode};
use crate::errors::ValidationError;
use crate::spec::{Contract, OperationMeta, PathEntry};
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters: name from the template, raw (still encoded) value.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of resolving a request to a contract operation
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub operation: Arc<OperationMeta>,
    /// Matched path template, e.g. `/pets/{petId}`
    pub template: Arc<str>,
    pub path_params: ParamVec,
}

impl RouteMatch {
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves concrete request paths to contract operations.
#[derive(Debug, Clone)]
pub struct Router {
    root: RadixNode,
    paths: Vec<PathEntry>,
    base_path: String,
}

impl Router {
    pub fn new(contract: &Contract) -> Self {
        let mut root = RadixNode::root();
        for (index, entry) in contract.paths().iter().enumerate() {
            root.insert(&split_segments(&entry.template), index);
        }

        let routes_summary: Vec<String> = contract
            .operations()
            .take(10)
            .map(|op| format!("{} {}", op.method, op.path_template))
            .collect();
        info!(
            paths_count = contract.paths().len(),
            routes_count = contract.operations().count(),
            base_path = %contract.base_path(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            root,
            paths: contract.paths().to_vec(),
            base_path: contract.base_path().to_string(),
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// `METHOD template` for every operation, in declaration order.
    pub fn route_lines(&self) -> Vec<String> {
        self.paths
            .iter()
            .flat_map(|p| p.operations.iter())
            .map(|op| format!("{} {}{}", op.method, self.base_path, op.path_template))
            .collect()
    }

    /// Removes the server base path when the request carries it.
    pub fn strip_base_path<'p>(&self, path: &'p str) -> &'p str {
        if self.base_path.is_empty() {
            return path;
        }
        match path.strip_prefix(self.base_path.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    /// Every template matching `path`, most specific first.
    ///
    /// Ties keep declaration order.
    pub(crate) fn candidates(&self, path: &str) -> Vec<Candidate> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let path = self.strip_base_path(path);
        let mut out = Vec::new();
        self.root.search_all(
            &split_segments(path),
            &mut ParamVec::new(),
            &mut KindVec::new(),
            &mut out,
        );
        out.sort_by(|a, b| {
            b.specificity()
                .cmp(&a.specificity())
                .then(a.path_index.cmp(&b.path_index))
        });
        out
    }

    /// Resolves `method` and `path` to an operation.
    ///
    /// The most specific template that defines `method` wins. When templates
    /// match but none defines the method, the failure names the most specific.
    ///
    /// # Errors
    ///
    /// `(path, missing)` when no template matches and `(path, missingOperation)`
    /// when no matching template defines the method.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, ValidationError> {
        debug!(method = %method, path = %path, "Route match attempt");

        let candidates = self.candidates(path);
        let Some(best) = candidates.first() else {
            warn!(method = %method, path = %path, "No route matched");
            return Err(ValidationError::path_missing(method.as_str(), path));
        };

        for candidate in &candidates {
            let entry = &self.paths[candidate.path_index];
            if let Some(operation) = entry.operation(method) {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %entry.template,
                    path_params = ?candidate.params,
                    candidates = candidates.len(),
                    "Route matched"
                );
                return Ok(RouteMatch {
                    operation: Arc::clone(operation),
                    template: Arc::clone(&entry.template),
                    path_params: candidate.params.clone(),
                });
            }
        }

        let entry = &self.paths[best.path_index];
        warn!(
            method = %method,
            path = %path,
            route_pattern = %entry.template,
            "Path matched but method is not defined"
        );
        Err(ValidationError::operation_missing(
            method.as_str(),
            path,
            &entry.template,
            entry.position,
        ))
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}
