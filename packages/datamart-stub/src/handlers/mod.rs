//! HTTP endpoint handlers for the collection resources.

pub mod records;
pub mod request_utils;
pub mod response;

pub use records::{create_record, delete_record, list_records, read_record, update_record};
pub use response::error_response;
