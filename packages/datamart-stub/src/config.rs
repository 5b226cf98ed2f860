//! Stub backend configuration.

use datamart_core::schema::WireCase;

/// Stub backend configuration.
#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Request body read timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Page size applied when only a page number is requested
    pub default_page_size: u32,
    /// Largest page size honoured
    pub max_page_size: u32,
    /// Field-name casing of request and response bodies
    pub wire_case: WireCase,
}

impl Default for StubConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5000, // 5 seconds default
            default_page_size: 25,
            max_page_size: 500,
            wire_case: WireCase::Camel,
        }
    }
}
