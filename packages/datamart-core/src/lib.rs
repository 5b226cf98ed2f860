//! Core of the datamart administration client.
//!
//! Provides the entity catalog, version tokens and record keys, edit buffers
//! and form intents, the optimistic concurrency guard, association set logic,
//! the DTO schema mapping, and the transport seam used by the repository
//! client.

pub mod association;
pub mod buffer;
pub mod config;
pub mod error;
pub mod filter;
pub mod guard;
pub mod key;
pub mod model;
pub mod record;
pub mod schema;
pub mod transport;
pub mod version;

pub use error::{DatamartError, FieldErrors, Operation, Result};
pub use key::{KeyPart, RecordKey};
pub use record::{ParentScoped, Record};
pub use version::VersionToken;
