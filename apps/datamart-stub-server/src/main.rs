//! HTTP server for the in-memory datamart backend.
//!
//! Serves every catalog collection with version-token checks, for local
//! development of the console and for end-to-end tests of the client.

use std::net::SocketAddr;

use anyhow::Context;
use clap::Parser;
use datamart_core::schema::WireCase;
use datamart_stub::{StubBackend, StubConfig};
use tokio::signal;

/// Command-line arguments for the stub server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Request body read timeout in milliseconds
    #[arg(long, default_value_t = 5000)]
    request_timeout_ms: u64,

    /// Page size when only a page number is requested
    #[arg(long, default_value_t = 25)]
    default_page_size: u32,

    /// Field-name casing of bodies and query parameters (snake, camel, pascal)
    #[arg(long, default_value = "camel")]
    wire_case: WireCase,

    /// Start with the demo data set
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt::init();

    let config = StubConfig {
        request_timeout_ms: args.request_timeout_ms,
        default_page_size: args.default_page_size,
        wire_case: args.wire_case,
        ..StubConfig::default()
    };

    let backend = if args.seed {
        StubBackend::demo(config)
    } else {
        StubBackend::new(config)
    }
    .map_err(|e| anyhow::anyhow!("Failed to build backend: {}", e))?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", args.host, args.port))?;

    tracing::info!(
        %addr,
        wire_case = %args.wire_case,
        collections = backend.store().collection_names().len(),
        "starting stub backend"
    );

    tokio::select! {
        result = backend.serve(addr) => {
            result.context("Server failed")?;
        }
        _ = signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
