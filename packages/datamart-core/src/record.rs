//! Record contracts implemented by every entity and association type.

use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{FieldErrors, Result};
use crate::key::{KeyPart, RecordKey};
use crate::version::VersionToken;

/// Domain-case name of the version token field on every record.
pub const VERSION_FIELD: &str = "timestamp";

/// A flat record stored in one backend collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// Collection resource name, e.g. `customers`.
    const COLLECTION: &'static str;

    /// One field for simple keys, two for composite keys.
    const KEY_FIELDS: &'static [&'static str];

    /// Identity is assigned by the server (autoincrement) rather than the client.
    const SERVER_ASSIGNED_KEY: bool = false;

    /// Relation and display fields that are never transmitted on writes.
    const READ_ONLY_FIELDS: &'static [&'static str] = &[];

    fn key(&self) -> RecordKey;

    fn version(&self) -> Option<&VersionToken>;

    /// Field-level constraints checked before submission.
    fn validate(&self) -> FieldErrors {
        FieldErrors::new()
    }
}

/// A record managed as a set scoped to one parent identity.
///
/// Covers both composite-key associations (cube/user) and simple-key children
/// carrying a parent foreign key (customer/role). `child_id` is the value that
/// must be unique within one parent.
pub trait ParentScoped: Record {
    /// Attributes a caller may set on add and edit.
    type Attributes: Clone + Send + Sync;

    /// Field holding the parent identity, used as the list filter.
    const PARENT_FIELD: &'static str;

    fn parent_id(&self) -> KeyPart;

    fn child_id(&self) -> KeyPart;

    /// Builds a new unsaved record for `parent` and `child`.
    fn compose(parent: &KeyPart, child: &KeyPart, attributes: Self::Attributes) -> Result<Self>;

    fn attributes(&self) -> Self::Attributes;

    /// Replaces the mutable attributes, leaving identity untouched.
    fn apply(&mut self, attributes: Self::Attributes);
}

/// Accumulates field-level constraint failures.
#[derive(Debug, Default)]
pub struct FieldRules {
    errors: FieldErrors,
}

impl FieldRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.push(field, format!("{} is required", field));
        }
        self
    }

    pub fn max_len(mut self, field: &str, value: &str, max: usize) -> Self {
        if value.chars().count() > max {
            self.push(field, format!("{} must be at most {} characters", field, max));
        }
        self
    }

    pub fn optional_max_len(self, field: &str, value: Option<&str>, max: usize) -> Self {
        match value {
            Some(v) => self.max_len(field, v, max),
            None => self,
        }
    }

    /// Integer identity references must point at an existing record.
    pub fn reference(mut self, field: &str, value: i64) -> Self {
        if value <= 0 {
            self.push(field, format!("{} must reference an existing record", field));
        }
        self
    }

    pub fn check(mut self, field: &str, ok: bool, message: &str) -> Self {
        if !ok {
            self.push(field, message.to_string());
        }
        self
    }

    pub fn finish(self) -> FieldErrors {
        self.errors
    }

    fn push(&mut self, field: &str, message: String) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message);
    }
}

/// Builds the error used when a key part does not fit an identity field.
pub(crate) fn invalid_key<R: Record>(part: &KeyPart) -> crate::error::DatamartError {
    crate::error::DatamartError::InvalidKey {
        collection: R::COLLECTION.to_string(),
        key: part.to_string(),
    }
}

/// Reads an integer identity from a key part.
pub(crate) fn int_part<R: Record>(part: &KeyPart) -> Result<i64> {
    part.as_int()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid_key::<R>(part))
}

/// Reads a text identity from a key part.
pub(crate) fn text_part<R: Record>(part: &KeyPart) -> Result<String> {
    if part.is_blank() {
        return Err(invalid_key::<R>(part));
    }
    Ok(part.as_text())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_collect_per_field() {
        let errors = FieldRules::new()
            .required("customer_id", "")
            .max_len("customer_id", "ABCDEFGHIJKL", 10)
            .required("customer_name", "Acme")
            .reference("cube_id", 0)
            .finish();

        assert_eq!(errors.get("customer_id").map(Vec::len), Some(2));
        assert!(!errors.contains_key("customer_name"));
        assert!(errors.contains_key("cube_id"));
    }
}
