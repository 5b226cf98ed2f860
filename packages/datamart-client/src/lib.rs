//! Datamart administration client.
//!
//! Repository client, association managers and headless list/form views
//! over any [`Transport`]: the HTTP transport in [`http`], the in-process
//! stub backend, or a test double.

pub mod association;
pub mod http;
pub mod repository;
pub mod view;

use std::sync::Arc;

use datamart_core::config::ClientConfig;
use datamart_core::filter::ListFilter;
use datamart_core::guard::ConcurrencyGuard;
use datamart_core::schema::SchemaMapper;
use datamart_core::transport::Transport;
use datamart_core::{ParentScoped, Record};

pub use association::AssociationManager;
pub use http::HttpTransport;
pub use repository::Repository;
pub use view::{FormSession, ListView};

/// Entry point handing out repositories, managers and views that share one
/// transport and configuration.
#[derive(Clone)]
pub struct DatamartClient {
    transport: Arc<dyn Transport>,
    config: ClientConfig,
}

impl DatamartClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self { transport, config }
    }

    /// Client talking HTTP to `config.base_url`.
    pub fn connect(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config));
        Self::new(config, transport)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn repository<R: Record>(&self) -> Repository<R> {
        Repository::new(
            Arc::clone(&self.transport),
            SchemaMapper::new(self.config.wire_case),
            ConcurrencyGuard::from_config(&self.config),
        )
    }

    /// Manager with nothing loaded; call `load_for_parent` first.
    pub fn associations<A: ParentScoped>(&self) -> AssociationManager<A> {
        AssociationManager::new(self.repository())
    }

    /// List view over the first page at the configured page size.
    pub fn list_view<R: Record>(&self) -> ListView<R> {
        let filter = ListFilter::new()
            .page(1)
            .page_size(self.config.default_page_size);
        ListView::new(self.repository(), filter)
    }
}
