//! Matchit routing configuration.

use std::sync::Arc;

use matchit::Router as MatchitRouter;

use datamart_core::schema::SchemaMapper;
use datamart_core::transport::{Method, WireRequest, WireResponse};
use datamart_core::FieldErrors;

use crate::config::StubConfig;
use crate::handlers;
use crate::handlers::request_utils::{record_key, MatchitParams};
use crate::store::MemoryStore;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Collection store
    pub store: Arc<MemoryStore>,
    /// Backend configuration
    pub config: Arc<StubConfig>,
    /// Field-name mapping for bodies and query parameters
    pub mapper: SchemaMapper,
}

/// Request router.
pub struct Router {
    inner: MatchitRouter<RouteHandler>,
    state: AppState,
}

impl Router {
    /// Creates a router serving every collection in `store`.
    pub fn new(store: Arc<MemoryStore>, config: Arc<StubConfig>) -> Result<Self, RouterError> {
        let mut router = MatchitRouter::new();

        for (path, handler) in [
            ("/{collection}", RouteHandler::Collection),
            ("/{collection}/{id}", RouteHandler::Record),
            ("/{collection}/{id}/{id2}", RouteHandler::Record),
        ] {
            router.insert(path, handler).map_err(|e| {
                RouterError::InternalError(format!("Failed to insert {} route: {}", path, e))
            })?;
        }

        let mapper = SchemaMapper::new(config.wire_case);
        Ok(Self {
            inner: router,
            state: AppState {
                store,
                config,
                mapper,
            },
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Routes a request to the appropriate handler.
    pub fn route(&self, req: &WireRequest) -> Result<WireResponse, RouterError> {
        match self.inner.at(&req.path) {
            Ok(matched) => matched.value.handle(req, &matched.params, &self.state),
            Err(_) => Err(RouterError::NotFound(format!(
                "No route found for {}",
                req.path
            ))),
        }
    }

    /// Routes a request, rendering failures as problem responses.
    pub fn handle(&self, req: &WireRequest) -> WireResponse {
        let response = match self.route(req) {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(method = %req.method, path = %req.path, error = %err, "request failed");
                err.into_response(&self.state.mapper)
            }
        };
        tracing::debug!(
            method = %req.method,
            path = %req.path,
            status = response.status,
            "request handled"
        );
        response
    }
}

/// Route handler function.
enum RouteHandler {
    Collection,
    Record,
}

impl RouteHandler {
    /// Handles a request with the given route parameters.
    fn handle(
        &self,
        req: &WireRequest,
        params: &MatchitParams<'_, '_>,
        state: &AppState,
    ) -> Result<WireResponse, RouterError> {
        let collection = params.get("collection").unwrap_or_default();
        if !state.store.has_collection(collection) {
            return Err(RouterError::NotFound(format!(
                "Collection '{}' not found",
                collection
            )));
        }

        match self {
            RouteHandler::Collection => match req.method {
                Method::Get => handlers::list_records(req, collection, state),
                Method::Post => handlers::create_record(req, collection, state),
                _ => Err(RouterError::MethodNotAllowed),
            },
            RouteHandler::Record => {
                let key = record_key(params)?;
                match req.method {
                    Method::Get => handlers::read_record(collection, &key, state),
                    Method::Put => handlers::update_record(req, collection, &key, state),
                    Method::Delete => handlers::delete_record(collection, &key, state),
                    Method::Post => Err(RouterError::MethodNotAllowed),
                }
            }
        }
    }
}

/// Router error type.
#[derive(Debug, Clone, PartialEq)]
pub enum RouterError {
    MethodNotAllowed,
    InternalError(String),
    Timeout,
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Validation { message: String, errors: FieldErrors },
}

impl std::fmt::Display for RouterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RouterError::MethodNotAllowed => write!(f, "Method Not Allowed"),
            RouterError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            RouterError::Timeout => write!(f, "Request Timeout"),
            RouterError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            RouterError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            RouterError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            RouterError::Validation { message, errors } => {
                write!(f, "Validation: {} ({} field(s))", message, errors.len())
            }
        }
    }
}

impl std::error::Error for RouterError {}

impl RouterError {
    pub fn status(&self) -> u16 {
        match self {
            RouterError::MethodNotAllowed => 405,
            RouterError::InternalError(_) => 500,
            RouterError::Timeout => 408,
            RouterError::BadRequest(_) | RouterError::Validation { .. } => 400,
            RouterError::NotFound(_) => 404,
            RouterError::Conflict(_) => 409,
        }
    }

    /// Problem response; field names in `errors` use the wire casing.
    pub fn into_response(self, mapper: &SchemaMapper) -> WireResponse {
        let status = self.status();
        let problem = match self {
            RouterError::MethodNotAllowed => {
                handlers::error_response(status, "Method Not Allowed", None, None)
            }
            RouterError::Timeout => handlers::error_response(status, "Request Timeout", None, None),
            RouterError::InternalError(msg) => {
                handlers::error_response(status, "Internal Server Error", Some(msg), None)
            }
            RouterError::BadRequest(msg) => {
                handlers::error_response(status, "Bad Request", Some(msg), None)
            }
            RouterError::NotFound(msg) => {
                handlers::error_response(status, "Not Found", Some(msg), None)
            }
            RouterError::Conflict(msg) => {
                handlers::error_response(status, "Conflict", Some(msg), None)
            }
            RouterError::Validation { message, errors } => handlers::error_response(
                status,
                "One or more validation errors occurred.",
                Some(message),
                Some(mapper.errors_to_wire(errors)),
            ),
        };

        // keep the status even if the body cannot be rendered
        serde_json::to_value(&problem)
            .ok()
            .and_then(|value| WireResponse::json(status, &value).ok())
            .unwrap_or_else(|| WireResponse::new(status))
    }
}
