//! Client configuration.

use crate::schema::WireCase;

/// Settings for talking to the datamart backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the REST backend, without trailing slash
    pub base_url: String,
    /// Request timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Page size used by list views when none is given
    pub default_page_size: u32,
    /// Field-name casing the backend speaks
    pub wire_case: WireCase,
    /// HTTP statuses that mean "stale version token" on update
    pub conflict_statuses: Vec<u16>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            request_timeout_ms: 5000, // 5 seconds default
            default_page_size: 25,
            wire_case: WireCase::Camel,
            conflict_statuses: vec![409, 412],
        }
    }
}
