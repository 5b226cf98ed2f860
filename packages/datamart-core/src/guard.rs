//! Optimistic concurrency guard.
//!
//! Sits between an edit buffer and the repository client. Every update must
//! carry the version token captured when the record was read; a missing token
//! stops the update before anything is sent. Stale-token rejections from the
//! server are reported as `Concurrency` and are never retried with a freshly
//! fetched token.

use serde_json::Value;

use crate::buffer::EditBuffer;
use crate::config::ClientConfig;
use crate::error::{DatamartError, Operation, Result};
use crate::key::RecordKey;
use crate::record::{Record, VERSION_FIELD};
use crate::transport::ProblemDetails;
use crate::version::{present, VersionToken};

/// Body of a create request, in domain field naming.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePayload {
    pub body: Value,
}

/// Body of an update request, in domain field naming.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatePayload {
    pub key: RecordKey,
    pub version: VersionToken,
    pub body: Value,
}

/// Enforces version-token handling at the write boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyGuard {
    conflict_statuses: Vec<u16>,
}

impl Default for ConcurrencyGuard {
    fn default() -> Self {
        Self::new(ClientConfig::default().conflict_statuses)
    }
}

impl ConcurrencyGuard {
    /// `conflict_statuses` are the HTTP statuses that mean "stale token" on update.
    pub fn new(conflict_statuses: Vec<u16>) -> Self {
        Self { conflict_statuses }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.conflict_statuses.clone())
    }

    /// Builds an update from an edit buffer.
    pub fn prepare_update<R: Record>(&self, buffer: &EditBuffer<R>) -> Result<UpdatePayload> {
        if !buffer.identity_intact() {
            return Err(DatamartError::IdentityChanged {
                collection: R::COLLECTION.to_string(),
                original: buffer.key().to_string(),
                current: buffer.record().key().to_string(),
            });
        }
        self.prepare_update_from(buffer.key(), buffer.record(), buffer.version())
    }

    /// Builds an update for `key` from a draft and an explicitly supplied token.
    ///
    /// The token is attached as given; whatever token the draft itself holds
    /// is replaced.
    pub fn prepare_update_from<R: Record>(
        &self,
        key: &RecordKey,
        draft: &R,
        version: Option<&VersionToken>,
    ) -> Result<UpdatePayload> {
        let Some(version) = present(version) else {
            tracing::warn!(
                collection = R::COLLECTION,
                key = %key,
                "update refused: no version token"
            );
            return Err(DatamartError::MissingVersionToken {
                collection: R::COLLECTION.to_string(),
                key: key.to_string(),
            });
        };

        let current = draft.key();
        if !current.is_blank() && !current.matches(key) {
            return Err(DatamartError::IdentityChanged {
                collection: R::COLLECTION.to_string(),
                original: key.to_string(),
                current: current.to_string(),
            });
        }

        let mut body = serde_json::to_value(draft)?;
        strip_fields(&mut body, R::KEY_FIELDS);
        strip_fields(&mut body, R::READ_ONLY_FIELDS);
        if let Value::Object(map) = &mut body {
            map.insert(
                VERSION_FIELD.to_string(),
                Value::String(version.as_str().to_string()),
            );
        }

        Ok(UpdatePayload {
            key: key.clone(),
            version: version.clone(),
            body,
        })
    }

    /// Builds a create body with server-owned fields removed.
    ///
    /// Callers may leave a version token, relation fields or a placeholder
    /// server-assigned id on the draft; none of them are transmitted.
    pub fn prepare_create<R: Record>(&self, draft: &R) -> Result<CreatePayload> {
        let mut body = serde_json::to_value(draft)?;
        let mut stripped = strip_fields(&mut body, &[VERSION_FIELD]);
        stripped += strip_fields(&mut body, R::READ_ONLY_FIELDS);
        if R::SERVER_ASSIGNED_KEY {
            stripped += strip_fields(&mut body, R::KEY_FIELDS);
        }
        if stripped > 0 {
            tracing::debug!(
                collection = R::COLLECTION,
                stripped,
                "removed server-owned fields from create draft"
            );
        }
        debug_assert!(body.get(VERSION_FIELD).is_none());
        Ok(CreatePayload { body })
    }

    /// True when `status` signals a stale version token on update.
    pub fn is_conflict(&self, status: u16) -> bool {
        self.conflict_statuses.contains(&status)
    }

    /// Turns a stale-token response into a `Concurrency` error.
    pub fn interpret_conflict(
        &self,
        collection: &str,
        key: &RecordKey,
        problem: Option<&ProblemDetails>,
    ) -> DatamartError {
        tracing::warn!(
            collection,
            key = %key,
            server_message = %problem.and_then(ProblemDetails::best_message).unwrap_or_default(),
            "update rejected: version token is stale"
        );
        DatamartError::Concurrency {
            collection: collection.to_string(),
            key: key.to_string(),
        }
    }

    /// Maps a non-2xx response onto the error taxonomy.
    pub fn classify_failure(
        &self,
        operation: Operation,
        collection: &str,
        key: Option<&RecordKey>,
        status: u16,
        problem: Option<ProblemDetails>,
    ) -> DatamartError {
        if let Some(key) = key {
            if status == 404 && operation != Operation::List {
                return DatamartError::NotFound {
                    collection: collection.to_string(),
                    key: key.to_string(),
                };
            }
            if operation == Operation::Update && self.is_conflict(status) {
                return self.interpret_conflict(collection, key, problem.as_ref());
            }
        }

        match problem {
            Some(problem) if problem.has_field_errors() => DatamartError::Validation {
                message: problem
                    .best_message()
                    .unwrap_or_else(|| "Validation failed".to_string()),
                errors: problem.errors.unwrap_or_default(),
            },
            Some(problem) => DatamartError::Server {
                status,
                message: problem.best_message().unwrap_or_default(),
            },
            None => DatamartError::Server {
                status,
                message: String::new(),
            },
        }
    }
}

/// Removes `fields` from a JSON object, returning how many were present.
fn strip_fields(body: &mut Value, fields: &[&str]) -> usize {
    let Value::Object(map) = body else {
        return 0;
    };
    fields
        .iter()
        .filter(|f| map.remove(**f).is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FieldErrors;
    use crate::model::{Cubeset, Customer, CustomerUser};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn cubeset(version: Option<&str>) -> Cubeset {
        Cubeset {
            cubeset_id: 5,
            customer_id: "CUST1".to_string(),
            cubeset_name: "X".to_string(),
            description: None,
            customer_name: Some("Acme".to_string()),
            version: version.and_then(VersionToken::new),
        }
    }

    #[test]
    fn update_carries_captured_token_unchanged() {
        let guard = ConcurrencyGuard::default();
        let mut buffer = EditBuffer::from_record(cubeset(Some("abc")));
        buffer.record_mut().cubeset_name = "Y".to_string();

        let payload = guard.prepare_update(&buffer).unwrap();
        assert_eq!(payload.version.as_str(), "abc");
        assert_eq!(payload.key, RecordKey::simple(5));
        assert_eq!(
            payload.body,
            json!({"customer_id": "CUST1", "cubeset_name": "Y", "timestamp": "abc"})
        );
    }

    #[test]
    fn update_without_token_refused() {
        let guard = ConcurrencyGuard::default();
        let buffer = EditBuffer::from_record(cubeset(None));
        let err = guard.prepare_update(&buffer).unwrap_err();
        assert!(matches!(err, DatamartError::MissingVersionToken { .. }));
        assert!(err.is_pre_dispatch());

        let empty: VersionToken = serde_json::from_str("\"\"").unwrap();
        let err = guard
            .prepare_update_from(&RecordKey::simple(5), &cubeset(None), Some(&empty))
            .unwrap_err();
        assert!(matches!(err, DatamartError::MissingVersionToken { .. }));
    }

    #[test]
    fn identity_change_refused() {
        let guard = ConcurrencyGuard::default();
        let mut buffer = EditBuffer::from_record(cubeset(Some("abc")));
        buffer.record_mut().cubeset_id = 6;
        let err = guard.prepare_update(&buffer).unwrap_err();
        assert!(matches!(err, DatamartError::IdentityChanged { .. }));
    }

    #[test]
    fn explicit_token_replaces_draft_token() {
        let guard = ConcurrencyGuard::default();
        let token = VersionToken::new("fresh").unwrap();
        let payload = guard
            .prepare_update_from(&RecordKey::simple(5), &cubeset(Some("old")), Some(&token))
            .unwrap();
        assert_eq!(payload.body[VERSION_FIELD], "fresh");
    }

    #[test]
    fn create_strips_server_owned_fields() {
        let guard = ConcurrencyGuard::default();
        let payload = guard.prepare_create(&cubeset(Some("abc"))).unwrap();
        assert_eq!(
            payload.body,
            json!({"customer_id": "CUST1", "cubeset_name": "X"})
        );

        let mut customer = Customer::new("CUST1", "Acme");
        customer.version = VersionToken::new("zzz");
        let payload = guard.prepare_create(&customer).unwrap();
        assert_eq!(payload.body["customer_id"], "CUST1");
        assert!(payload.body.get(VERSION_FIELD).is_none());
    }

    #[test]
    fn composite_create_keeps_identity() {
        let guard = ConcurrencyGuard::default();
        let link = CustomerUser {
            customer_id: "CUST1".to_string(),
            user_id: "USERA".to_string(),
            role_id: None,
            user_full_name: Some("Ann A".to_string()),
            role_name: None,
            version: None,
        };
        let payload = guard.prepare_create(&link).unwrap();
        assert_eq!(payload.body, json!({"customer_id": "CUST1", "user_id": "USERA"}));
    }

    #[test]
    fn conflict_status_wins_over_field_errors() {
        let guard = ConcurrencyGuard::default();
        let mut errors = FieldErrors::new();
        errors.insert("timestamp".to_string(), vec!["stale".to_string()]);
        let problem = ProblemDetails::titled("Conflict", 409).with_errors(errors);
        let err = guard.classify_failure(
            Operation::Update,
            "cubesets",
            Some(&RecordKey::simple(5)),
            409,
            Some(problem),
        );
        assert!(err.requires_reload());
    }

    #[test]
    fn classification_by_shape() {
        let guard = ConcurrencyGuard::default();
        let key = RecordKey::simple("CUST9");

        let err = guard.classify_failure(Operation::Delete, "customers", Some(&key), 404, None);
        assert!(matches!(err, DatamartError::NotFound { .. }));

        let mut errors = FieldErrors::new();
        errors.insert("customer_name".to_string(), vec!["required".to_string()]);
        let problem = ProblemDetails::titled("Bad Request", 400).with_errors(errors);
        let err = guard.classify_failure(Operation::Create, "customers", None, 400, Some(problem));
        assert!(matches!(err, DatamartError::Validation { .. }));

        // 409 on create is a uniqueness failure, not a stale token
        let problem = ProblemDetails::titled("Duplicate key", 409);
        let err = guard.classify_failure(Operation::Create, "customers", Some(&key), 409, Some(problem));
        assert_eq!(
            err,
            DatamartError::Server {
                status: 409,
                message: "Duplicate key".to_string()
            }
        );

        let err = guard.classify_failure(Operation::List, "customers", None, 500, None);
        assert_eq!(err.user_message(), "The request could not be completed.");
    }
}
