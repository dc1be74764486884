//! # Schema Validator Cache Module
//!
//! Thread-safe caching of compiled JSON Schema validators, so that the
//! node-local keywords of a schema are compiled once per contract rather than
//! once per request.
//!
//! Entries are keyed by [`SchemaId`]: the arena interns every schema exactly
//! once, so the handle identifies the compiled keywords for the lifetime of the
//! contract. Validators are shared as `Arc<Validator>` and the map sits behind
//! an `Arc<RwLock<_>>`; readers never block each other.
//!
//! The cache can be disabled via `BRRTV_SCHEMA_CACHE=off`, in which case
//! every lookup compiles on demand.

use crate::spec::{SchemaArena, SchemaId};
use jsonschema::Validator;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, error, info};

/// Thread-safe cache for compiled JSON Schema validators
#[derive(Clone)]
pub struct ValidatorCache {
    cache: Arc<RwLock<HashMap<SchemaId, Arc<Validator>>>>,
    enabled: bool,
    validate_formats: bool,
}

impl ValidatorCache {
    pub fn new(enabled: bool, validate_formats: bool) -> Self {
        info!(enabled, validate_formats, "Initializing JSON Schema validator cache");
        Self {
            cache: Arc::new(RwLock::new(HashMap::new())),
            enabled,
            validate_formats,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn compile(&self, keywords: &Value) -> Result<Validator, String> {
        jsonschema::options()
            .should_validate_formats(self.validate_formats)
            .build(keywords)
            .map_err(|e| e.to_string())
    }

    /// Get a cached validator or compile and cache a new one
    ///
    /// # Errors
    ///
    /// Returns the compiler's message when `keywords` is not a valid schema.
    pub fn get_or_compile(&self, id: SchemaId, keywords: &Value) -> Result<Arc<Validator>, String> {
        if !self.enabled {
            return self.compile(keywords).map(Arc::new);
        }

        // Fast path: read lock only
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(validator) = cache.get(&id) {
                debug!(schema = %id, "Schema validator cache hit");
                return Ok(Arc::clone(validator));
            }
        }

        match self.compile(keywords) {
            Ok(compiled) => {
                let validator = Arc::new(compiled);
                let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
                // Another thread may have compiled while we waited for the lock
                if let Some(existing) = cache.get(&id) {
                    debug!(schema = %id, "Schema validator compiled by another thread");
                    return Ok(Arc::clone(existing));
                }
                cache.insert(id, Arc::clone(&validator));
                debug!(
                    schema = %id,
                    cache_size = cache.len(),
                    "Schema validator compiled and cached"
                );
                Ok(validator)
            }
            Err(e) => {
                error!(schema = %id, error = %e, "Failed to compile JSON Schema");
                Err(e)
            }
        }
    }

    /// Number of cached validators
    pub fn size(&self) -> usize {
        self.cache.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        let dropped = cache.len();
        cache.clear();
        info!(dropped, "Schema validator cache cleared");
    }

    /// Compiles every constrained node of the arena up front.
    ///
    /// Returns the number of validators now cached. Nodes that fail to compile
    /// are logged and left to fail again at validation time.
    pub fn precompile(&self, arena: &SchemaArena) -> usize {
        if !self.enabled {
            return 0;
        }
        let mut compiled = 0;
        for id in arena.ids() {
            let node = arena.get(id);
            if node.is_unconstrained() {
                continue;
            }
            if self.get_or_compile(id, &node.keywords).is_ok() {
                compiled += 1;
            }
        }
        info!(compiled, total = arena.len(), "Pre-compiled schema validators");
        compiled
    }
}

impl std::fmt::Debug for ValidatorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorCache")
            .field("enabled", &self.enabled)
            .field("validate_formats", &self.validate_formats)
            .field("size", &self.size())
            .finish()
    }
}
