//! In-memory reference backend for the datamart REST contract.
//!
//! Serves every catalog collection with optimistic concurrency: each write
//! stamps a new hex version token, updates must present the current one, and
//! stale tokens are answered with 409. Usable over HTTP through [`server`] or
//! in-process as a [`Transport`].

pub mod config;
pub mod handlers;
pub mod router;
pub mod seed;
pub mod server;
pub mod store;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;

use datamart_core::transport::{Transport, WireRequest, WireResponse};
use datamart_core::Result;

pub use config::StubConfig;
pub use router::{Router, RouterError};
pub use store::{MemoryStore, StoreError};

/// Stub backend handling wire requests directly.
#[derive(Clone)]
pub struct StubBackend {
    router: Arc<Router>,
}

impl StubBackend {
    pub fn new(config: StubConfig) -> std::result::Result<Self, RouterError> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    pub fn with_store(
        store: Arc<MemoryStore>,
        config: StubConfig,
    ) -> std::result::Result<Self, RouterError> {
        let router = Router::new(store, Arc::new(config))?;
        Ok(Self {
            router: Arc::new(router),
        })
    }

    /// Backend preloaded with the demo data set.
    pub fn demo(config: StubConfig) -> std::result::Result<Self, RouterError> {
        let backend = Self::new(config)?;
        seed::load_demo(backend.store()).map_err(handlers::request_utils::map_store_error)?;
        Ok(backend)
    }

    pub fn store(&self) -> &MemoryStore {
        &self.router.state().store
    }

    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.router)
    }

    /// Handles one request; failures come back as problem responses.
    pub fn handle(&self, request: &WireRequest) -> WireResponse {
        self.router.handle(request)
    }

    /// Serves this backend over HTTP on `addr`.
    pub async fn serve(&self, addr: SocketAddr) -> std::io::Result<()> {
        server::Server::new(addr, self.router()).serve().await
    }
}

#[async_trait]
impl Transport for StubBackend {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        Ok(self.handle(&request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datamart_core::schema::WireCase;
    use datamart_core::transport::ProblemDetails;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn backend() -> StubBackend {
        StubBackend::new(StubConfig::default()).unwrap()
    }

    #[test]
    fn create_then_read_in_wire_case() {
        let backend = backend();
        let created = backend.handle(&WireRequest::post(
            "/customers",
            json!({"customerId": "CUST1", "customerName": "Acme"}),
        ));
        assert_eq!(created.status, 201);
        let body = created.body_json().unwrap().unwrap();
        assert_eq!(body["timestamp"], "0000000000000001");

        let read = backend.handle(&WireRequest::get("/customers/CUST1"));
        assert_eq!(read.status, 200);
        assert_eq!(read.body_json().unwrap().unwrap()["customerName"], "Acme");
    }

    #[test]
    fn missing_token_is_field_error() {
        let backend = backend();
        backend.handle(&WireRequest::post(
            "/customers",
            json!({"customerId": "CUST1", "customerName": "Acme"}),
        ));
        let response = backend.handle(&WireRequest::put(
            "/customers/CUST1",
            json!({"customerName": "Acme Corp"}),
        ));
        assert_eq!(response.status, 400);
        let problem = ProblemDetails::from_body(&response.body).unwrap();
        assert!(problem.errors.unwrap().contains_key("timestamp"));
    }

    #[test]
    fn duplicate_create_conflicts() {
        let backend = backend();
        let body = json!({"customerId": "CUST1", "userId": "USERA"});
        assert_eq!(
            backend
                .handle(&WireRequest::post("/customerusers", body.clone()))
                .status,
            201
        );
        assert_eq!(
            backend
                .handle(&WireRequest::post("/customerusers", body))
                .status,
            409
        );
        let read = backend.handle(&WireRequest::get("/customerusers/CUST1/USERA"));
        assert_eq!(read.status, 200);
    }

    #[test]
    fn paging_headers_on_paged_lists() {
        let backend = StubBackend::demo(StubConfig {
            wire_case: WireCase::Pascal,
            ..StubConfig::default()
        })
        .unwrap();
        let response = backend.handle(&WireRequest::get("/users").with_query(vec![
            ("CustomerId".to_string(), "CUST1".to_string()),
            ("PageSize".to_string(), "2".to_string()),
        ]));
        assert_eq!(response.status, 200);
        assert_eq!(response.header("x-pagination-totalitems"), Some("3"));
        assert_eq!(response.header("x-pagination-pagesize"), Some("2"));
        let rows = response.body_json().unwrap().unwrap();
        assert_eq!(rows.as_array().map(Vec::len), Some(2));
        assert_eq!(rows[0]["UserId"], "USERA");
    }

    #[test]
    fn unknown_routes_and_methods() {
        let backend = backend();
        assert_eq!(backend.handle(&WireRequest::get("/widgets")).status, 404);
        assert_eq!(
            backend
                .handle(&WireRequest::delete("/customers"))
                .status,
            405
        );
        assert_eq!(
            backend
                .handle(&WireRequest::delete("/customers/NOPE"))
                .status,
            404
        );
    }
}
