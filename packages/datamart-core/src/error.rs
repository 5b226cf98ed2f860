//! Error taxonomy shared by the repository client, guard and managers.

use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to validation messages.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Shorthand result type.
pub type Result<T> = std::result::Result<T, DatamartError>;

/// Repository operation a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Get,
    Create,
    Update,
    Delete,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Get => "get",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors surfaced to callers of the datamart client.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DatamartError {
    /// Transport failure, no response received
    #[error("Network error: {0}")]
    Network(String),

    /// No response within the configured request timeout
    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Non-2xx response without field detail
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Non-2xx response carrying field-level messages
    #[error("Validation failed: {message}")]
    Validation { message: String, errors: FieldErrors },

    /// Update rejected because the version token is stale
    #[error("Record {key} in '{collection}' was changed by someone else; reload before saving")]
    Concurrency { collection: String, key: String },

    /// No record matches the key
    #[error("Record {key} not found in '{collection}'")]
    NotFound { collection: String, key: String },

    /// Child already present in the loaded association set
    #[error("'{child}' is already associated with '{parent}' in '{collection}'")]
    DuplicateAssociation {
        collection: String,
        parent: String,
        child: String,
    },

    /// Update attempted without a captured version token
    #[error("Update of {key} in '{collection}' carries no version token")]
    MissingVersionToken { collection: String, key: String },

    /// Identity fields were modified in an edit buffer
    #[error("Identity of record in '{collection}' changed from {original} to {current}")]
    IdentityChanged {
        collection: String,
        original: String,
        current: String,
    },

    /// Key part cannot populate the identity fields of the record type
    #[error("Key {key} is not valid for '{collection}'")]
    InvalidKey { collection: String, key: String },

    /// Local field constraints failed before dispatch
    #[error("Record in '{collection}' has {} invalid field(s)", .errors.len())]
    InvalidRecord {
        collection: String,
        errors: FieldErrors,
    },

    /// Payload could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DatamartError {
    /// True when the user must reload the record before resubmitting.
    pub fn requires_reload(&self) -> bool {
        matches!(self, DatamartError::Concurrency { .. })
    }

    /// True for failures detected before any request was dispatched.
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            DatamartError::DuplicateAssociation { .. }
                | DatamartError::MissingVersionToken { .. }
                | DatamartError::IdentityChanged { .. }
                | DatamartError::InvalidKey { .. }
                | DatamartError::InvalidRecord { .. }
        )
    }

    /// Field-level messages, if the failure carries any.
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            DatamartError::Validation { errors, .. } | DatamartError::InvalidRecord { errors, .. } => {
                Some(errors)
            }
            _ => None,
        }
    }

    /// Message suitable for display.
    ///
    /// Shapes without a specific message fall back to a generic one.
    pub fn user_message(&self) -> String {
        match self {
            DatamartError::Server { message, .. } | DatamartError::Validation { message, .. }
                if !message.trim().is_empty() =>
            {
                message.clone()
            }
            DatamartError::Server { .. } | DatamartError::Validation { .. } => {
                "The request could not be completed.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<serde_json::Error> for DatamartError {
    fn from(err: serde_json::Error) -> Self {
        DatamartError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concurrency_requires_reload() {
        let err = DatamartError::Concurrency {
            collection: "cubesets".to_string(),
            key: "5".to_string(),
        };
        assert!(err.requires_reload());
        assert!(!err.is_pre_dispatch());

        let err = DatamartError::Validation {
            message: "bad".to_string(),
            errors: FieldErrors::new(),
        };
        assert!(!err.requires_reload());
    }

    #[test]
    fn blank_server_message_falls_back() {
        let err = DatamartError::Server {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(err.user_message(), "The request could not be completed.");

        let err = DatamartError::Server {
            status: 500,
            message: "Database offline".to_string(),
        };
        assert_eq!(err.user_message(), "Database offline");
    }

    #[test]
    fn field_errors_exposed_for_validation() {
        let mut errors = FieldErrors::new();
        errors.insert("customer_name".to_string(), vec!["required".to_string()]);
        let err = DatamartError::Validation {
            message: "One or more validation errors occurred.".to_string(),
            errors: errors.clone(),
        };
        assert_eq!(err.field_errors(), Some(&errors));
        assert!(DatamartError::Network("refused".to_string())
            .field_errors()
            .is_none());
    }
}
