//! In-memory collection store.
//!
//! Rows are kept as JSON objects in domain (snake_case) field naming, keyed
//! by the rendered record key. Every write stamps a fresh version token from
//! one store-wide counter.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use thiserror::Error;

use datamart_core::model::{
    CalcType, CollectionInfo, Cube, CubeUser, Cubeset, Customer, CustomerUser, Dimension, Fact,
    FactColumn, FactColumnCalcType, RdlGroup, RdlGroupFactColumn, Role, User,
};
use datamart_core::record::VERSION_FIELD;
use datamart_core::{FieldErrors, KeyPart, Record, RecordKey};

/// Store operation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Collection not found
    #[error("Collection '{collection}' not found")]
    CollectionNotFound { collection: String },

    /// Record not found in collection
    #[error("Record {key} not found in '{collection}'")]
    RecordNotFound { collection: String, key: String },

    /// Create with a key that is already stored
    #[error("Record {key} already exists in '{collection}'")]
    DuplicateKey { collection: String, key: String },

    /// Update without a version token
    #[error("Update of {key} in '{collection}' carries no version token")]
    MissingVersion { collection: String, key: String },

    /// Update with a token that is no longer current
    #[error("Record {key} in '{collection}' was modified since it was read")]
    StaleVersion { collection: String, key: String },

    /// Field constraints failed
    #[error("Record in '{collection}' failed validation")]
    Validation {
        collection: String,
        errors: FieldErrors,
    },

    /// Body is not a JSON object
    #[error("Invalid body: {0}")]
    InvalidBody(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Shape and field checks of one collection.
#[derive(Debug, Clone)]
pub struct CollectionSchema {
    pub info: CollectionInfo,
    validate: fn(&Value) -> FieldErrors,
}

impl CollectionSchema {
    pub fn of<R: Record>() -> Self {
        Self {
            info: CollectionInfo::of::<R>(),
            validate: validate_as::<R>,
        }
    }
}

/// Checks a row by decoding it as `R` and running its field rules.
fn validate_as<R: Record>(row: &Value) -> FieldErrors {
    match serde_json::from_value::<R>(row.clone()) {
        Ok(record) => record.validate(),
        Err(err) => {
            let mut errors = FieldErrors::new();
            errors.insert("body".to_string(), vec![err.to_string()]);
            errors
        }
    }
}

/// Schemas of every collection the console administers.
pub fn schemas() -> Vec<CollectionSchema> {
    vec![
        CollectionSchema::of::<Customer>(),
        CollectionSchema::of::<Cube>(),
        CollectionSchema::of::<Cubeset>(),
        CollectionSchema::of::<Dimension>(),
        CollectionSchema::of::<Fact>(),
        CollectionSchema::of::<FactColumn>(),
        CollectionSchema::of::<CalcType>(),
        CollectionSchema::of::<FactColumnCalcType>(),
        CollectionSchema::of::<Role>(),
        CollectionSchema::of::<User>(),
        CollectionSchema::of::<CustomerUser>(),
        CollectionSchema::of::<CubeUser>(),
        CollectionSchema::of::<RdlGroup>(),
        CollectionSchema::of::<RdlGroupFactColumn>(),
    ]
}

/// Equality constraints and paging for a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    /// Field (snake_case) and expected rendered value
    pub filters: Vec<(String, String)>,
    /// 1-based page number and page size
    pub paging: Option<(u32, u32)>,
}

/// Result of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub rows: Vec<Value>,
    /// Matching rows before paging
    pub total: usize,
    pub paging: Option<(u32, u32)>,
}

#[derive(Debug, Clone)]
struct Row {
    seq: u64,
    fields: Map<String, Value>,
}

#[derive(Debug)]
struct Collection {
    schema: CollectionSchema,
    rows: BTreeMap<String, Row>,
    next_id: i64,
}

impl Collection {
    fn new(schema: CollectionSchema) -> Self {
        Self {
            schema,
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }

    fn name(&self) -> &'static str {
        self.schema.info.name
    }

    fn key_of(&self, fields: &Map<String, Value>) -> Option<RecordKey> {
        let parts = self
            .schema
            .info
            .key_fields
            .iter()
            .map(|field| fields.get(*field).and_then(KeyPart::from_json))
            .collect::<Option<Vec<KeyPart>>>()?;
        match parts.as_slice() {
            [one] => Some(RecordKey::Simple(one.clone())),
            [first, second] => Some(RecordKey::Composite(first.clone(), second.clone())),
            _ => None,
        }
    }

    fn check(&self, fields: &Map<String, Value>) -> StoreResult<RecordKey> {
        let mut errors = (self.schema.validate)(&Value::Object(fields.clone()));
        let key = self.key_of(fields).filter(|k| !k.is_blank());
        if key.is_none() {
            for field in self.schema.info.key_fields {
                errors
                    .entry(field.to_string())
                    .or_default()
                    .push(format!("{} is required", field));
            }
        }
        match key {
            Some(key) if errors.is_empty() => Ok(key),
            _ => Err(StoreError::Validation {
                collection: self.name().to_string(),
                errors,
            }),
        }
    }

    fn not_found(&self, key: &RecordKey) -> StoreError {
        StoreError::RecordNotFound {
            collection: self.name().to_string(),
            key: key.to_string(),
        }
    }
}

/// How a display field is rendered from its source row.
#[derive(Debug, Clone, Copy)]
enum Display {
    Field(&'static str),
    FullName,
}

/// Read-only display field filled from another collection on every read.
#[derive(Debug, Clone, Copy)]
struct Derived {
    collection: &'static str,
    field: &'static str,
    source: &'static str,
    join: &'static str,
    display: Display,
}

const DERIVED: &[Derived] = &[
    Derived {
        collection: CustomerUser::COLLECTION,
        field: "user_full_name",
        source: User::COLLECTION,
        join: "user_id",
        display: Display::FullName,
    },
    Derived {
        collection: CustomerUser::COLLECTION,
        field: "role_name",
        source: Role::COLLECTION,
        join: "role_id",
        display: Display::Field("role_name"),
    },
    Derived {
        collection: CubeUser::COLLECTION,
        field: "user_full_name",
        source: User::COLLECTION,
        join: "user_id",
        display: Display::FullName,
    },
    Derived {
        collection: CubeUser::COLLECTION,
        field: "cube_name",
        source: Cube::COLLECTION,
        join: "cube_id",
        display: Display::Field("cube_name"),
    },
    Derived {
        collection: Dimension::COLLECTION,
        field: "cube_name",
        source: Cube::COLLECTION,
        join: "cube_id",
        display: Display::Field("cube_name"),
    },
    Derived {
        collection: Role::COLLECTION,
        field: "customer_name",
        source: Customer::COLLECTION,
        join: "customer_id",
        display: Display::Field("customer_name"),
    },
    Derived {
        collection: Cube::COLLECTION,
        field: "customer_name",
        source: Customer::COLLECTION,
        join: "customer_id",
        display: Display::Field("customer_name"),
    },
    Derived {
        collection: Cubeset::COLLECTION,
        field: "customer_name",
        source: Customer::COLLECTION,
        join: "customer_id",
        display: Display::Field("customer_name"),
    },
    Derived {
        collection: FactColumn::COLLECTION,
        field: "fact_name",
        source: Fact::COLLECTION,
        join: "fact_id",
        display: Display::Field("fact_name"),
    },
    Derived {
        collection: FactColumnCalcType::COLLECTION,
        field: "calc_type_description",
        source: CalcType::COLLECTION,
        join: "calc_type_code",
        display: Display::Field("description"),
    },
    Derived {
        collection: RdlGroupFactColumn::COLLECTION,
        field: "column_name",
        source: FactColumn::COLLECTION,
        join: "fact_column_id",
        display: Display::Field("column_name"),
    },
];

/// Fills the display fields of a row of `collection` from current source rows.
///
/// Stale or client-supplied values are replaced; a missing source clears the field.
fn decorate(
    collections: &BTreeMap<&'static str, Collection>,
    collection: &str,
    fields: &mut Map<String, Value>,
) {
    for derived in DERIVED.iter().filter(|d| d.collection == collection) {
        let value = fields
            .get(derived.join)
            .map(render)
            .and_then(|slot| collections.get(derived.source)?.rows.get(&slot))
            .and_then(|row| match derived.display {
                Display::Field(name) => row.fields.get(name).cloned(),
                Display::FullName => {
                    let part = |name: &str| {
                        row.fields
                            .get(name)
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string()
                    };
                    let full = format!("{} {}", part("first_name"), part("last_name"));
                    Some(Value::String(full.trim().to_string()))
                }
            });
        match value {
            Some(value) => {
                fields.insert(derived.field.to_string(), value);
            }
            None => {
                fields.remove(derived.field);
            }
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    collections: BTreeMap<&'static str, Collection>,
    version_counter: u64,
    seq: u64,
}

/// Thread-safe in-memory store for every collection.
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_schemas(schemas())
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schemas(schemas: Vec<CollectionSchema>) -> Self {
        let collections = schemas
            .into_iter()
            .map(|schema| (schema.info.name, Collection::new(schema)))
            .collect();
        Self {
            inner: RwLock::new(Inner {
                collections,
                ..Inner::default()
            }),
        }
    }

    pub fn collection_names(&self) -> Vec<&'static str> {
        self.inner.read().collections.keys().copied().collect()
    }

    pub fn has_collection(&self, collection: &str) -> bool {
        self.inner.read().collections.contains_key(collection)
    }

    /// Number of stored rows in `collection`.
    pub fn len(&self, collection: &str) -> StoreResult<usize> {
        let inner = self.inner.read();
        Ok(lookup(&inner.collections, collection)?.rows.len())
    }

    /// Rows matching every recognized filter, in insertion order.
    ///
    /// A filter field that no row carries is ignored.
    pub fn list(&self, collection: &str, query: &ListQuery) -> StoreResult<Listing> {
        let inner = self.inner.read();
        let coll = lookup(&inner.collections, collection)?;

        let filters: Vec<&(String, String)> = query
            .filters
            .iter()
            .filter(|(field, _)| coll.rows.values().any(|r| r.fields.contains_key(field)))
            .collect();

        let mut matching: Vec<&Row> = coll
            .rows
            .values()
            .filter(|row| {
                filters.iter().all(|(field, expected)| {
                    row.fields
                        .get(field)
                        .is_some_and(|v| render(v) == *expected)
                })
            })
            .collect();
        matching.sort_by_key(|row| row.seq);

        let total = matching.len();
        let (skip, take) = match query.paging {
            Some((page, size)) => ((page.max(1) as usize - 1) * size as usize, size as usize),
            None => (0, total),
        };
        let rows: Vec<Value> = matching
            .into_iter()
            .skip(skip)
            .take(take)
            .map(|row| {
                let mut fields = row.fields.clone();
                decorate(&inner.collections, collection, &mut fields);
                Value::Object(fields)
            })
            .collect();

        Ok(Listing {
            rows,
            total,
            paging: query.paging,
        })
    }

    pub fn get(&self, collection: &str, key: &RecordKey) -> StoreResult<Value> {
        let inner = self.inner.read();
        let coll = lookup(&inner.collections, collection)?;
        let mut fields = coll
            .rows
            .get(&key.to_string())
            .map(|row| row.fields.clone())
            .ok_or_else(|| coll.not_found(key))?;
        decorate(&inner.collections, collection, &mut fields);
        Ok(Value::Object(fields))
    }

    /// Stores a new row and returns it with its identity and first token.
    ///
    /// Server-assigned identities overwrite whatever the body carries.
    pub fn insert(&self, collection: &str, body: Value) -> StoreResult<Value> {
        let mut fields = object(body)?;
        fields.remove(VERSION_FIELD);

        let mut guard = self.inner.write();
        let Inner {
            collections,
            version_counter,
            seq,
        } = &mut *guard;
        let coll = lookup_mut(collections, collection)?;

        let assigned = coll.schema.info.server_assigned_key;
        if assigned {
            if let Some(field) = coll.schema.info.key_fields.first() {
                fields.insert(field.to_string(), Value::from(coll.next_id));
            }
        }

        let key = coll.check(&fields)?;
        let slot = key.to_string();
        if coll.rows.contains_key(&slot) {
            return Err(StoreError::DuplicateKey {
                collection: coll.name().to_string(),
                key: slot,
            });
        }

        if assigned {
            coll.next_id += 1;
        }
        fields.insert(
            VERSION_FIELD.to_string(),
            Value::String(next_version(version_counter)),
        );
        *seq += 1;
        coll.rows.insert(
            slot,
            Row {
                seq: *seq,
                fields: fields.clone(),
            },
        );

        tracing::debug!(collection, key = %key, "row inserted");
        decorate(collections, collection, &mut fields);
        Ok(Value::Object(fields))
    }

    /// Replaces the mutable fields of a stored row.
    ///
    /// The body must carry the row's current token. Identity fields in the
    /// body are ignored.
    pub fn update(&self, collection: &str, key: &RecordKey, body: Value) -> StoreResult<Value> {
        let mut fields = object(body)?;
        let supplied = fields
            .remove(VERSION_FIELD)
            .and_then(|v| v.as_str().map(str::to_string))
            .filter(|v| !v.is_empty());

        let mut guard = self.inner.write();
        let Inner {
            collections,
            version_counter,
            ..
        } = &mut *guard;
        let coll = lookup_mut(collections, collection)?;

        let slot = key.to_string();
        let Some(row) = coll.rows.get(&slot) else {
            return Err(coll.not_found(key));
        };

        let Some(supplied) = supplied else {
            return Err(StoreError::MissingVersion {
                collection: coll.name().to_string(),
                key: slot,
            });
        };
        let current = row.fields.get(VERSION_FIELD).and_then(Value::as_str);
        if current != Some(supplied.as_str()) {
            tracing::debug!(collection, key = %key, "stale version token");
            return Err(StoreError::StaleVersion {
                collection: coll.name().to_string(),
                key: slot,
            });
        }

        let mut merged = row.fields.clone();
        for (field, value) in fields {
            if !coll.schema.info.key_fields.contains(&field.as_str()) {
                merged.insert(field, value);
            }
        }
        coll.check(&merged)?;

        merged.insert(
            VERSION_FIELD.to_string(),
            Value::String(next_version(version_counter)),
        );
        if let Some(row) = coll.rows.get_mut(&slot) {
            row.fields = merged.clone();
        }

        tracing::debug!(collection, key = %key, "row updated");
        decorate(collections, collection, &mut merged);
        Ok(Value::Object(merged))
    }

    pub fn delete(&self, collection: &str, key: &RecordKey) -> StoreResult<()> {
        let mut guard = self.inner.write();
        let coll = lookup_mut(&mut guard.collections, collection)?;
        match coll.rows.remove(&key.to_string()) {
            Some(_) => {
                tracing::debug!(collection, key = %key, "row deleted");
                Ok(())
            }
            None => Err(coll.not_found(key)),
        }
    }
}

fn lookup<'a>(
    collections: &'a BTreeMap<&'static str, Collection>,
    name: &str,
) -> StoreResult<&'a Collection> {
    collections
        .get(name)
        .ok_or_else(|| StoreError::CollectionNotFound {
            collection: name.to_string(),
        })
}

fn lookup_mut<'a>(
    collections: &'a mut BTreeMap<&'static str, Collection>,
    name: &str,
) -> StoreResult<&'a mut Collection> {
    collections
        .get_mut(name)
        .ok_or_else(|| StoreError::CollectionNotFound {
            collection: name.to_string(),
        })
}

fn object(body: Value) -> StoreResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::InvalidBody(format!(
            "expected a JSON object, got {}",
            other
        ))),
    }
}

/// Next token: the counter as big-endian hex.
fn next_version(counter: &mut u64) -> String {
    *counter += 1;
    hex::encode(counter.to_be_bytes())
}

/// Renders a scalar the way it appears in a query string.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn customer(id: &str) -> Value {
        json!({"customer_id": id, "customer_name": format!("{} Inc", id), "is_active": true})
    }

    #[test]
    fn insert_assigns_hex_token() {
        let store = MemoryStore::new();
        let row = store.insert("customers", customer("CUST1")).unwrap();
        assert_eq!(row[VERSION_FIELD], "0000000000000001");

        let err = store.insert("customers", customer("CUST1")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));
    }

    #[test]
    fn server_assigned_ids_increment() {
        let store = MemoryStore::new();
        store.insert("customers", customer("CUST1")).unwrap();
        let first = store
            .insert("roles", json!({"role_id": 99, "customer_id": "CUST1", "role_name": "Admin"}))
            .unwrap();
        let second = store
            .insert("roles", json!({"customer_id": "CUST1", "role_name": "Analyst"}))
            .unwrap();
        assert_eq!(first["role_id"], 1);
        assert_eq!(second["role_id"], 2);
    }

    #[test]
    fn stale_and_missing_tokens_rejected() {
        let store = MemoryStore::new();
        let row = store.insert("customers", customer("CUST1")).unwrap();
        let key = RecordKey::simple("CUST1");
        let token = row[VERSION_FIELD].clone();

        let err = store
            .update("customers", &key, json!({"customer_name": "Acme"}))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingVersion { .. }));

        let updated = store
            .update(
                "customers",
                &key,
                json!({"customer_name": "Acme", "timestamp": token.clone()}),
            )
            .unwrap();
        assert_ne!(updated[VERSION_FIELD], token);

        let err = store
            .update(
                "customers",
                &key,
                json!({"customer_name": "Acme 2", "timestamp": token}),
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::StaleVersion { .. }));
    }

    #[test]
    fn update_keeps_identity() {
        let store = MemoryStore::new();
        let row = store.insert("customers", customer("CUST1")).unwrap();
        let updated = store
            .update(
                "customers",
                &RecordKey::simple("CUST1"),
                json!({"customer_id": "OTHER", "customer_name": "Acme", "timestamp": row["timestamp"]}),
            )
            .unwrap();
        assert_eq!(updated["customer_id"], "CUST1");
    }

    #[test]
    fn invalid_rows_report_field_errors() {
        let store = MemoryStore::new();
        let err = store
            .insert("customers", json!({"customer_id": "", "customer_name": ""}))
            .unwrap_err();
        let StoreError::Validation { errors, .. } = err else {
            panic!("expected validation error");
        };
        assert!(errors.contains_key("customer_id"));
        assert!(errors.contains_key("customer_name"));
    }

    #[test]
    fn list_filters_and_pages() {
        let store = MemoryStore::new();
        for id in ["CUST1", "CUST2"] {
            store.insert("customers", customer(id)).unwrap();
        }
        for user in ["USERA", "USERB", "USERC"] {
            store
                .insert("customerusers", json!({"customer_id": "CUST1", "user_id": user}))
                .unwrap();
        }
        store
            .insert("customerusers", json!({"customer_id": "CUST2", "user_id": "USERA"}))
            .unwrap();

        let query = ListQuery {
            filters: vec![
                ("customer_id".to_string(), "CUST1".to_string()),
                ("unknown_field".to_string(), "x".to_string()),
            ],
            paging: Some((2, 2)),
        };
        let listing = store.list("customerusers", &query).unwrap();
        assert_eq!(listing.total, 3);
        assert_eq!(listing.rows.len(), 1);
        assert_eq!(listing.rows[0]["user_id"], "USERC");
    }

    #[test]
    fn delete_absent_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .delete("customers", &RecordKey::simple("NOPE"))
            .unwrap_err();
        assert!(matches!(err, StoreError::RecordNotFound { .. }));
        assert!(matches!(
            store.len("nothing"),
            Err(StoreError::CollectionNotFound { .. })
        ));
    }

    #[test]
    fn display_fields_follow_source_rows() {
        let store = MemoryStore::new();
        store.insert("customers", customer("CUST1")).unwrap();
        store
            .insert(
                "users",
                json!({"user_id": "USERA", "customer_id": "CUST1", "first_name": "Ann", "last_name": "Archer"}),
            )
            .unwrap();

        let link = store
            .insert(
                "customerusers",
                json!({"customer_id": "CUST1", "user_id": "USERA", "user_full_name": "Someone Else"}),
            )
            .unwrap();
        assert_eq!(link["user_full_name"], "Ann Archer");
        assert!(link.get("role_name").is_none());

        let user_key = RecordKey::simple("USERA");
        let user = store.get("users", &user_key).unwrap();
        store
            .update(
                "users",
                &user_key,
                json!({"last_name": "Ames", "timestamp": user["timestamp"].clone()}),
            )
            .unwrap();

        let key = RecordKey::composite("CUST1", "USERA");
        assert_eq!(
            store.get("customerusers", &key).unwrap()["user_full_name"],
            "Ann Ames"
        );
        let listed = store.list("customerusers", &ListQuery::default()).unwrap();
        assert_eq!(listed.rows[0]["user_full_name"], "Ann Ames");
    }
}
