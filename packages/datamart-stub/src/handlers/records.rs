//! Collection and record handlers.

use datamart_core::filter::{PAGE_HEADER, PAGE_SIZE_HEADER, TOTAL_ITEMS_HEADER};
use datamart_core::transport::{WireRequest, WireResponse};
use datamart_core::RecordKey;
use serde_json::Value;

use crate::router::{AppState, RouterError};

use super::request_utils::{list_query, map_store_error, read_body};
use super::response::{build_empty_response, build_response};

/// Lists records of a collection.
///
/// # Endpoint
/// `GET /{collection}?{field}={value}&page={n}&pageSize={n}`
///
/// # Response
/// - **200 OK**: JSON array of records. Paged requests also carry
///   `x-pagination-totalitems`, `x-pagination-pagesize` and `x-pagination-page`.
///
/// # Notes
/// - Filters on fields no record carries are ignored
pub fn list_records(
    req: &WireRequest,
    collection: &str,
    state: &AppState,
) -> Result<WireResponse, RouterError> {
    let query = list_query(req, &state.mapper, &state.config)?;
    let listing = state
        .store
        .list(collection, &query)
        .map_err(map_store_error)?;

    let body = state.mapper.to_wire(Value::Array(listing.rows));
    let mut response = build_response(200, &body)?;
    if let Some((page, size)) = listing.paging {
        response = response
            .with_header(TOTAL_ITEMS_HEADER, listing.total)
            .with_header(PAGE_SIZE_HEADER, size)
            .with_header(PAGE_HEADER, page);
    }
    Ok(response)
}

/// Reads one record.
///
/// # Endpoint
/// `GET /{collection}/{id}` or `GET /{collection}/{id}/{id2}`
///
/// # Errors
/// - **404 Not Found**: No record with that key
pub fn read_record(
    collection: &str,
    key: &RecordKey,
    state: &AppState,
) -> Result<WireResponse, RouterError> {
    let row = state.store.get(collection, key).map_err(map_store_error)?;
    build_response(200, &state.mapper.to_wire(row))
}

/// Creates a record.
///
/// # Endpoint
/// `POST /{collection}`
///
/// # Response
/// - **201 Created**: The stored record with its identity and version token
///
/// # Errors
/// - **400 Bad Request**: Field constraints failed (`errors` map)
/// - **409 Conflict**: A record with that key already exists
pub fn create_record(
    req: &WireRequest,
    collection: &str,
    state: &AppState,
) -> Result<WireResponse, RouterError> {
    let body = read_body(req, &state.mapper)?;
    let row = state
        .store
        .insert(collection, body)
        .map_err(map_store_error)?;
    build_response(201, &state.mapper.to_wire(row))
}

/// Updates a record.
///
/// # Endpoint
/// `PUT /{collection}/{id}` or `PUT /{collection}/{id}/{id2}`
///
/// # Request Body
/// Mutable fields plus the version token read with the record, e.g.
/// ```json
/// { "customerName": "Acme", "timestamp": "0000000000000003" }
/// ```
///
/// # Errors
/// - **400 Bad Request**: Token missing or field constraints failed
/// - **404 Not Found**: No record with that key
/// - **409 Conflict**: Token is no longer current
pub fn update_record(
    req: &WireRequest,
    collection: &str,
    key: &RecordKey,
    state: &AppState,
) -> Result<WireResponse, RouterError> {
    let body = read_body(req, &state.mapper)?;
    let row = state
        .store
        .update(collection, key, body)
        .map_err(map_store_error)?;
    build_response(200, &state.mapper.to_wire(row))
}

/// Deletes a record.
///
/// # Endpoint
/// `DELETE /{collection}/{id}` or `DELETE /{collection}/{id}/{id2}`
///
/// # Errors
/// - **404 Not Found**: No record with that key
pub fn delete_record(
    collection: &str,
    key: &RecordKey,
    state: &AppState,
) -> Result<WireResponse, RouterError> {
    state
        .store
        .delete(collection, key)
        .map_err(map_store_error)?;
    Ok(build_empty_response(204))
}
