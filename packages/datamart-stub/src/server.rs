//! Hyper server setup and request handling.

use std::net::SocketAddr;
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming as IncomingBody};
use hyper::header::{HeaderName, HeaderValue};
use hyper::{Request, Response, Result as HyperResult, StatusCode};
use hyper_util::rt::TokioExecutor;
use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use tokio::net::TcpListener;

use datamart_core::transport::{Method, WireRequest, WireResponse};

use crate::handlers::request_utils::{parse_query_string, read_request_body_with_timeout};
use crate::router::{Router, RouterError};

/// HTTP server for the stub backend.
pub struct Server {
    addr: SocketAddr,
    router: Arc<Router>,
}

impl Server {
    /// Creates a new server instance.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to
    /// * `router` - Request router
    pub fn new(addr: SocketAddr, router: Arc<Router>) -> Self {
        Self { addr, router }
    }

    /// Binds and serves until the listener fails.
    pub async fn serve(self) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        serve_listener(listener, self.router).await
    }
}

/// Serves connections accepted on an already bound listener.
pub async fn serve_listener(
    listener: TcpListener,
    router: Arc<Router>,
) -> Result<(), std::io::Error> {
    tracing::info!(addr = %listener.local_addr()?, "stub backend listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let router = Arc::clone(&router);

        tokio::task::spawn(async move {
            let builder = ConnectionBuilder::new(TokioExecutor::new());
            if let Err(err) = builder
                .serve_connection(
                    io,
                    hyper::service::service_fn(move |req| handle_request(req, router.clone())),
                )
                .await
            {
                tracing::warn!(%peer, "error serving connection: {}", err);
            }
        });
    }
}

/// Handles an incoming HTTP request.
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> HyperResult<Response<Full<Bytes>>> {
    let timeout_ms = router.state().config.request_timeout_ms;
    let response = match wire_request(req, timeout_ms).await {
        Ok(request) => router.handle(&request),
        Err(err) => {
            tracing::debug!(error = %err, "rejected request");
            err.into_response(&router.state().mapper)
        }
    };
    Ok(http_response(response))
}

/// Converts a hyper request into a wire request, reading the body.
async fn wire_request(
    req: Request<IncomingBody>,
    timeout_ms: u64,
) -> Result<WireRequest, RouterError> {
    let method = match *req.method() {
        hyper::Method::GET => Method::Get,
        hyper::Method::POST => Method::Post,
        hyper::Method::PUT => Method::Put,
        hyper::Method::DELETE => Method::Delete,
        _ => return Err(RouterError::MethodNotAllowed),
    };
    let path = req.uri().path().to_string();
    let query = parse_query_string(req.uri().query());

    let bytes = read_request_body_with_timeout(req, timeout_ms).await?;
    let mut request = WireRequest::new(method, path).with_query(query);
    if !bytes.iter().all(u8::is_ascii_whitespace) {
        let body = serde_json::from_slice(&bytes)
            .map_err(|e| RouterError::BadRequest(format!("Failed to parse request: {}", e)))?;
        request = request.with_body(body);
    }
    Ok(request)
}

fn http_response(response: WireResponse) -> Response<Full<Bytes>> {
    let mut http = Response::new(Full::new(Bytes::from(response.body)));
    *http.status_mut() =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    for (name, value) in &response.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            http.headers_mut().insert(name, value);
        }
    }
    http
}
