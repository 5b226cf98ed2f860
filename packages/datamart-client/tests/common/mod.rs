#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use datamart_client::DatamartClient;
use datamart_core::config::ClientConfig;
use datamart_core::transport::{Method, Transport, WireRequest, WireResponse};
use datamart_core::Result;
use datamart_stub::{StubBackend, StubConfig};

/// Records every request before forwarding it.
pub struct CountingTransport<T> {
    inner: T,
    calls: AtomicUsize,
    log: Mutex<Vec<WireRequest>>,
}

impl<T: Transport> CountingTransport<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<WireRequest> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<WireRequest> {
        self.log.lock().unwrap().last().cloned()
    }

    pub fn count(&self, method: Method) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == method)
            .count()
    }
}

#[async_trait]
impl<T: Transport> Transport for CountingTransport<T> {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(request.clone());
        self.inner.send(request).await
    }
}

/// Drops version tokens from list responses, like a backend whose list
/// projection omits them.
pub struct TokenlessLists<T> {
    pub inner: T,
}

#[async_trait]
impl<T: Transport> Transport for TokenlessLists<T> {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let is_list = request.method == Method::Get && request.path.matches('/').count() == 1;
        let mut response = self.inner.send(request).await?;
        if is_list {
            if let Some(Value::Array(mut rows)) = response.body_json()? {
                for row in &mut rows {
                    if let Value::Object(map) = row {
                        map.remove("timestamp");
                    }
                }
                response.body = serde_json::to_vec(&Value::Array(rows))?;
            }
        }
        Ok(response)
    }
}

/// Answers every request with the same response.
pub struct Canned {
    pub response: WireResponse,
}

#[async_trait]
impl Transport for Canned {
    async fn send(&self, _request: WireRequest) -> Result<WireResponse> {
        Ok(self.response.clone())
    }
}

pub type Counted = Arc<CountingTransport<StubBackend>>;

/// Client over an empty stub backend.
pub fn empty_client() -> (DatamartClient, Counted) {
    client_for(StubBackend::new(StubConfig::default()).unwrap())
}

/// Client over a stub backend holding the demo data.
pub fn demo_client() -> (DatamartClient, Counted) {
    client_for(StubBackend::demo(StubConfig::default()).unwrap())
}

pub fn client_for(backend: StubBackend) -> (DatamartClient, Counted) {
    let transport = Arc::new(CountingTransport::new(backend));
    let client = DatamartClient::new(ClientConfig::default(), transport.clone());
    (client, transport)
}
