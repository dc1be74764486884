//! # Validator Facade
//!
//! [`Validator`] ties the pieces together for one contract:
//!
//! 1. the [`Router`](crate::router::Router) resolves method and path to an
//!    operation; a resolution failure is returned on its own,
//! 2. every declared parameter is validated in declaration order,
//! 3. the request (or response) body is validated against the declared
//!    content map.
//!
//! Failures of every stage are concatenated; the boolean is `true` only when
//! nothing failed. A `Validator` holds no per-call state and can be shared
//! across threads behind an `Arc`.
//!
//! ```no_run
//! use brrtvalidator::spec::load_contract;
//! use brrtvalidator::Validator;
//!
//! let contract = load_contract("openapi.yaml").expect("contract");
//! let validator = Validator::new(contract);
//! let request = http::Request::get("/pets?limit=10").body(Vec::<u8>::new()).unwrap();
//! let (ok, failures) = validator.validate_request(&request);
//! if !ok {
//!     for failure in &failures {
//!         eprintln!("{failure}");
//!     }
//! }
//! ```

use crate::body::{BodyInput, BodyValidator};
use crate::config::ValidatorOptions;
use crate::errors::{ExchangeSide, ValidationError};
use crate::params::{ParameterValidator, RequestParts};
use crate::router::{RouteMatch, Router};
use crate::schema::{JsonSchemaEvaluator, SchemaAdapter, SchemaEvaluator};
use crate::spec::Contract;
use crate::validator_cache::ValidatorCache;
use http::header::CONTENT_TYPE;
use http::{HeaderMap, Request, Response};
use std::sync::Arc;
use tracing::{debug, info};

pub struct Validator {
    contract: Arc<Contract>,
    router: Router,
    evaluator: Arc<dyn SchemaEvaluator>,
    options: ValidatorOptions,
}

impl Validator {
    pub fn new(contract: Contract) -> Self {
        Self::with_options(contract, ValidatorOptions::default())
    }

    /// Builds a validator backed by the `jsonschema` evaluator.
    ///
    /// With the schema cache enabled every constrained schema node is
    /// compiled up front.
    pub fn with_options(contract: Contract, options: ValidatorOptions) -> Self {
        let cache = ValidatorCache::new(options.schema_cache, options.validate_formats);
        cache.precompile(contract.schemas());
        Self::with_evaluator(contract, options, Arc::new(JsonSchemaEvaluator::new(cache)))
    }

    /// Builds a validator around a caller-supplied schema evaluator.
    pub fn with_evaluator(
        contract: Contract,
        options: ValidatorOptions,
        evaluator: Arc<dyn SchemaEvaluator>,
    ) -> Self {
        let router = Router::new(&contract);
        info!(
            title = %contract.title(),
            openapi = %contract.openapi_version(),
            operations = contract.operations().count(),
            schemas = contract.schemas().len(),
            strict_query = options.reject_undeclared_query_params,
            validate_formats = options.validate_formats,
            "Validator ready"
        );
        Self {
            contract: Arc::new(contract),
            router,
            evaluator,
            options,
        }
    }

    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn options(&self) -> &ValidatorOptions {
        &self.options
    }

    /// Validates a request against its operation.
    pub fn validate_request<B: AsRef<[u8]>>(
        &self,
        req: &Request<B>,
    ) -> (bool, Vec<ValidationError>) {
        let (template, errors) = match self.resolve(req) {
            Ok(route) => (Some(Arc::clone(&route.template)), self.request_errors(req, &route)),
            Err(err) => (None, vec![err]),
        };
        self.finish(req, "request", template, errors)
    }

    /// Validates a response against the operation the request resolves to.
    pub fn validate_response<B, R>(
        &self,
        req: &Request<B>,
        resp: &Response<R>,
    ) -> (bool, Vec<ValidationError>)
    where
        R: AsRef<[u8]>,
    {
        let (template, errors) = match self.resolve(req) {
            Ok(route) => (Some(Arc::clone(&route.template)), self.response_errors(&route, resp)),
            Err(err) => (None, vec![err]),
        };
        self.finish(req, "response", template, errors)
    }

    /// Request failures followed by response failures.
    ///
    /// A request that resolves to no operation is reported once.
    pub fn validate_exchange<B, R>(
        &self,
        req: &Request<B>,
        resp: &Response<R>,
    ) -> (bool, Vec<ValidationError>)
    where
        B: AsRef<[u8]>,
        R: AsRef<[u8]>,
    {
        let (template, errors) = match self.resolve(req) {
            Ok(route) => {
                let mut errors = self.request_errors(req, &route);
                errors.extend(self.response_errors(&route, resp));
                (Some(Arc::clone(&route.template)), errors)
            }
            Err(err) => (None, vec![err]),
        };
        self.finish(req, "exchange", template, errors)
    }

    fn resolve<B>(&self, req: &Request<B>) -> Result<RouteMatch, ValidationError> {
        self.router.resolve(req.method(), req.uri().path())
    }

    fn request_errors<B: AsRef<[u8]>>(
        &self,
        req: &Request<B>,
        route: &RouteMatch,
    ) -> Vec<ValidationError> {
        let arena = self.contract.schemas();
        let adapter = SchemaAdapter::new(arena, self.evaluator.as_ref());
        let parts = RequestParts::from_request(req);

        let mut errors = ParameterValidator::new(arena, &adapter)
            .reject_undeclared_query(self.options.reject_undeclared_query_params)
            .validate_operation(&route.operation, route, &parts);

        if let Some(body) = &route.operation.request_body {
            errors.extend(BodyValidator::new(arena, &adapter).validate(
                &body.content,
                body_input(req.headers(), req.body().as_ref()),
                ExchangeSide::Request,
                body.required,
            ));
        }
        errors
    }

    fn response_errors<R: AsRef<[u8]>>(
        &self,
        route: &RouteMatch,
        resp: &Response<R>,
    ) -> Vec<ValidationError> {
        let status = resp.status().as_u16();
        let Some(declared) = route.operation.response_for(status) else {
            if self.options.validate_response_status {
                return vec![ValidationError::response_status_missing(status, &route.template)];
            }
            return Vec::new();
        };

        let arena = self.contract.schemas();
        let adapter = SchemaAdapter::new(arena, self.evaluator.as_ref());
        BodyValidator::new(arena, &adapter).validate(
            &declared.content,
            body_input(resp.headers(), resp.body().as_ref()),
            ExchangeSide::Response,
            false,
        )
    }

    /// Stamps request coordinates and the matched template on every failure.
    fn finish<B>(
        &self,
        req: &Request<B>,
        stage: &str,
        template: Option<Arc<str>>,
        mut errors: Vec<ValidationError>,
    ) -> (bool, Vec<ValidationError>) {
        for err in &mut errors {
            err.request_method = req.method().to_string();
            err.request_path = req.uri().path().to_string();
            if let (true, Some(t)) = (err.spec_path.is_empty(), &template) {
                err.spec_path = t.to_string();
            }
        }
        debug!(
            stage,
            method = %req.method(),
            path = %req.uri().path(),
            failures = errors.len(),
            "Validation finished"
        );
        (errors.is_empty(), errors)
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Validator")
            .field("title", &self.contract.title())
            .field("routes", &self.router.route_lines().len())
            .field("options", &self.options)
            .finish()
    }
}

fn body_input<'b>(headers: &'b HeaderMap, bytes: &'b [u8]) -> BodyInput<'b> {
    BodyInput {
        content_type: headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
        bytes,
    }
}
