//! Hyper-based HTTP transport.

use std::time::Duration;

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use tokio::time;

use datamart_core::config::ClientConfig;
use datamart_core::transport::{Method, Transport, WireRequest, WireResponse};
use datamart_core::{DatamartError, Result};

/// Sends wire requests to a REST backend over HTTP/1.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client<HttpConnector, Full<Bytes>>,
    base_url: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.request_timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

fn http_method(method: Method) -> hyper::Method {
    match method {
        Method::Get => hyper::Method::GET,
        Method::Post => hyper::Method::POST,
        Method::Put => hyper::Method::PUT,
        Method::Delete => hyper::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let uri = format!("{}{}", self.base_url, request.uri());
        let body = match &request.body {
            Some(value) => Bytes::from(serde_json::to_vec(value)?),
            None => Bytes::new(),
        };

        let mut builder = hyper::Request::builder()
            .method(http_method(request.method))
            .uri(&uri)
            .header("Accept", "application/json");
        if request.body.is_some() {
            builder = builder.header("Content-Type", "application/json");
        }
        let http_request = builder
            .body(Full::new(body))
            .map_err(|e| DatamartError::Network(format!("Failed to build request: {}", e)))?;

        let timeout_duration = Duration::from_millis(self.timeout_ms);
        let timed_out = || DatamartError::Timeout {
            timeout_ms: self.timeout_ms,
        };

        let response = time::timeout(timeout_duration, self.client.request(http_request))
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| DatamartError::Network(format!("{} {}: {}", request.method, uri, e)))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let body = time::timeout(timeout_duration, response.into_body().collect())
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| DatamartError::Network(format!("Failed to read response body: {}", e)))?
            .to_bytes();

        tracing::trace!(method = %request.method, uri = %uri, status, "http exchange");

        Ok(WireResponse {
            status,
            headers,
            body: body.to_vec(),
        })
    }
}
