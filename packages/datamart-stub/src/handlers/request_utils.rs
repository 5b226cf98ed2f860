//! Request utilities for collection endpoints.

use std::time::Duration;

use http_body_util::BodyExt;
use hyper::body::Bytes;
use hyper::Request;
use percent_encoding::percent_decode_str;
use serde_json::Value;
use tokio::time;

use datamart_core::filter::{PAGE_PARAM, PAGE_SIZE_PARAM};
use datamart_core::record::VERSION_FIELD;
use datamart_core::schema::SchemaMapper;
use datamart_core::transport::WireRequest;
use datamart_core::{FieldErrors, RecordKey};

use crate::config::StubConfig;
use crate::router::RouterError;
use crate::store::{ListQuery, StoreError};

/// Type alias for matchit parameters with explicit lifetimes
pub type MatchitParams<'a, 'b> = matchit::Params<'a, 'b>;

/// Helper function to read request body with timeout
pub async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout_ms: u64,
) -> Result<Bytes, RouterError> {
    let timeout_duration = Duration::from_millis(timeout_ms);
    let body = time::timeout(timeout_duration, req.collect())
        .await
        .map_err(|_| RouterError::Timeout)?
        .map_err(|e| RouterError::InternalError(format!("Failed to read request body: {}", e)))?;
    Ok(body.to_bytes())
}

/// Splits a raw query string into decoded pairs. Pairs without `=` are skipped.
pub fn parse_query_string(query: Option<&str>) -> Vec<(String, String)> {
    let Some(query) = query else {
        return Vec::new();
    };
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            (
                percent_decode_str(key).decode_utf8_lossy().to_string(),
                percent_decode_str(value).decode_utf8_lossy().to_string(),
            )
        })
        .collect()
}

/// Record key from the `id` and optional `id2` route parameters.
pub fn record_key(params: &MatchitParams<'_, '_>) -> Result<RecordKey, RouterError> {
    let segments: Vec<&str> = ["id", "id2"]
        .iter()
        .filter_map(|name| params.get(*name))
        .collect();
    RecordKey::from_segments(&segments)
        .filter(|key| !key.is_blank())
        .ok_or_else(|| RouterError::BadRequest("Invalid record key".to_string()))
}

/// JSON body in domain field naming.
pub fn read_body(req: &WireRequest, mapper: &SchemaMapper) -> Result<Value, RouterError> {
    match &req.body {
        Some(body @ Value::Object(_)) => Ok(mapper.from_wire(body.clone())),
        Some(_) => Err(RouterError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        None => Err(RouterError::BadRequest("Request body required".to_string())),
    }
}

/// Builds the store query from request parameters.
///
/// Parameter names are read in the configured wire casing. Paging applies
/// only when `page` or `page_size` is present.
pub fn list_query(
    req: &WireRequest,
    mapper: &SchemaMapper,
    config: &StubConfig,
) -> Result<ListQuery, RouterError> {
    let mut page = None;
    let mut page_size = None;
    let mut filters = Vec::new();

    for (key, value) in &req.query {
        let field = mapper.field_from_wire(key);
        match field.as_str() {
            PAGE_PARAM => page = Some(parse_positive(&field, value)?),
            PAGE_SIZE_PARAM => page_size = Some(parse_positive(&field, value)?),
            _ => filters.push((field, value.clone())),
        }
    }

    let paging = match (page, page_size) {
        (None, None) => None,
        (page, size) => Some((
            page.unwrap_or(1),
            size.unwrap_or(config.default_page_size)
                .min(config.max_page_size),
        )),
    };

    Ok(ListQuery { filters, paging })
}

fn parse_positive(field: &str, value: &str) -> Result<u32, RouterError> {
    value
        .trim()
        .parse::<u32>()
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            RouterError::BadRequest(format!("Invalid {} value '{}'", field, value))
        })
}

/// Map StoreError to appropriate RouterError
pub fn map_store_error(e: StoreError) -> RouterError {
    match e {
        StoreError::CollectionNotFound { .. } | StoreError::RecordNotFound { .. } => {
            RouterError::NotFound(e.to_string())
        }
        StoreError::DuplicateKey { .. } | StoreError::StaleVersion { .. } => {
            RouterError::Conflict(e.to_string())
        }
        StoreError::MissingVersion { .. } => {
            let mut errors = FieldErrors::new();
            errors.insert(
                VERSION_FIELD.to_string(),
                vec!["A version token is required to update this record".to_string()],
            );
            RouterError::Validation {
                message: e.to_string(),
                errors,
            }
        }
        StoreError::Validation { errors, .. } => RouterError::Validation {
            message: "One or more validation errors occurred.".to_string(),
            errors,
        },
        StoreError::InvalidBody(msg) => RouterError::BadRequest(msg),
    }
}
