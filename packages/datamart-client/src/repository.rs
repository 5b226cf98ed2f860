//! Entity repository client.
//!
//! One generic client per record type. Every call maps to exactly one
//! request against the record's collection resource, except `create` on a
//! 204 reply, which re-reads the record by its client-assigned key.

use std::marker::PhantomData;
use std::sync::Arc;

use serde_json::Value;

use datamart_core::buffer::EditBuffer;
use datamart_core::filter::{ListFilter, Page, PageInfo};
use datamart_core::guard::{ConcurrencyGuard, UpdatePayload};
use datamart_core::schema::SchemaMapper;
use datamart_core::transport::{ProblemDetails, Transport, WireRequest, WireResponse};
use datamart_core::{DatamartError, Operation, Record, RecordKey, Result, VersionToken};

/// CRUD access to one collection resource.
pub struct Repository<R: Record> {
    transport: Arc<dyn Transport>,
    mapper: SchemaMapper,
    guard: ConcurrencyGuard,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            mapper: self.mapper,
            guard: self.guard.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new(transport: Arc<dyn Transport>, mapper: SchemaMapper, guard: ConcurrencyGuard) -> Self {
        Self {
            transport,
            mapper,
            guard,
            _record: PhantomData,
        }
    }

    pub fn guard(&self) -> &ConcurrencyGuard {
        &self.guard
    }

    pub fn mapper(&self) -> &SchemaMapper {
        &self.mapper
    }

    fn collection_path() -> String {
        format!("/{}", R::COLLECTION)
    }

    fn record_path(key: &RecordKey) -> String {
        format!("/{}{}", R::COLLECTION, key.path())
    }

    /// Lists records matching `filter`, in server order.
    pub async fn list(&self, filter: &ListFilter) -> Result<Page<R>> {
        let query = filter
            .query_pairs()
            .into_iter()
            .map(|(field, value)| (self.mapper.field_to_wire(&field), value))
            .collect();
        let request = WireRequest::get(Self::collection_path()).with_query(query);
        let response = self.dispatch(request).await?;
        if !response.is_success() {
            return Err(self.failure(Operation::List, None, &response));
        }

        let items = match response.body_json()? {
            None => Vec::new(),
            Some(Value::Array(items)) => items,
            // Some backends wrap list results in an envelope
            Some(Value::Object(mut map)) => match map.remove("data") {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(DatamartError::Serialization(format!(
                        "Expected an array of '{}' records",
                        R::COLLECTION
                    )))
                }
            },
            Some(other) => {
                return Err(DatamartError::Serialization(format!(
                    "Expected an array of '{}' records, got {}",
                    R::COLLECTION,
                    other
                )))
            }
        };

        let records = items
            .into_iter()
            .map(|item| self.mapper.decode(item))
            .collect::<Result<Vec<R>>>()?;

        Ok(Page {
            records,
            page_info: PageInfo::from_headers(&response.headers),
        })
    }

    /// Reads one record, including its current version token.
    pub async fn get_by_id(&self, key: &RecordKey) -> Result<R> {
        self.ensure_key(key)?;
        let response = self.dispatch(WireRequest::get(Self::record_path(key))).await?;
        if !response.is_success() {
            return Err(self.failure(Operation::Get, Some(key), &response));
        }
        match response.body_json()? {
            Some(body) => self.mapper.decode(body),
            None => Err(DatamartError::Serialization(format!(
                "Empty body reading {} from '{}'",
                key,
                R::COLLECTION
            ))),
        }
    }

    /// Creates a record from `draft`.
    ///
    /// Server-owned fields on the draft are never transmitted. When the
    /// server answers without a body, the record is re-read if its key is
    /// client-assigned; otherwise the draft is returned as submitted.
    pub async fn create(&self, draft: &R) -> Result<R> {
        let payload = self.guard.prepare_create(draft)?;
        let request = WireRequest::post(Self::collection_path(), self.mapper.to_wire(payload.body));
        let response = self.dispatch(request).await?;
        if !response.is_success() {
            return Err(self.failure(Operation::Create, None, &response));
        }

        match response.body_json()? {
            Some(body) => self.mapper.decode(body),
            None => {
                let key = draft.key();
                if !R::SERVER_ASSIGNED_KEY && !key.is_blank() {
                    self.get_by_id(&key).await
                } else {
                    Ok(draft.clone())
                }
            }
        }
    }

    /// Updates the record at `key` with the fields of `draft`.
    ///
    /// `version` must be the token read together with the record. Returns
    /// `None` when the server acknowledges without a body.
    pub async fn update(
        &self,
        key: &RecordKey,
        draft: &R,
        version: Option<&VersionToken>,
    ) -> Result<Option<R>> {
        let payload = self.guard.prepare_update_from(key, draft, version)?;
        self.send_update(payload).await
    }

    /// Updates from an edit buffer, using the token it captured.
    pub async fn submit_update(&self, buffer: &EditBuffer<R>) -> Result<Option<R>> {
        let payload = self.guard.prepare_update(buffer)?;
        self.send_update(payload).await
    }

    async fn send_update(&self, payload: UpdatePayload) -> Result<Option<R>> {
        self.ensure_key(&payload.key)?;
        let request = WireRequest::put(
            Self::record_path(&payload.key),
            self.mapper.to_wire(payload.body),
        );
        let response = self.dispatch(request).await?;
        if !response.is_success() {
            return Err(self.failure(Operation::Update, Some(&payload.key), &response));
        }
        match response.body_json()? {
            Some(body) => Ok(Some(self.mapper.decode(body)?)),
            None => Ok(None),
        }
    }

    pub async fn delete_by_id(&self, key: &RecordKey) -> Result<()> {
        self.ensure_key(key)?;
        let response = self
            .dispatch(WireRequest::delete(Self::record_path(key)))
            .await?;
        if !response.is_success() {
            return Err(self.failure(Operation::Delete, Some(key), &response));
        }
        Ok(())
    }

    fn ensure_key(&self, key: &RecordKey) -> Result<()> {
        let expected = R::KEY_FIELDS.len();
        if key.is_blank() || key.parts().len() != expected {
            return Err(DatamartError::InvalidKey {
                collection: R::COLLECTION.to_string(),
                key: key.to_string(),
            });
        }
        Ok(())
    }

    async fn dispatch(&self, request: WireRequest) -> Result<WireResponse> {
        tracing::debug!(
            collection = R::COLLECTION,
            method = %request.method,
            uri = %request.uri(),
            "sending request"
        );
        let response = self.transport.send(request).await?;
        tracing::debug!(
            collection = R::COLLECTION,
            status = response.status,
            "received response"
        );
        Ok(response)
    }

    fn failure(
        &self,
        operation: Operation,
        key: Option<&RecordKey>,
        response: &WireResponse,
    ) -> DatamartError {
        let problem = ProblemDetails::from_body(&response.body).map(|mut problem| {
            problem.errors = problem
                .errors
                .map(|errors| self.mapper.errors_from_wire(errors));
            problem
        });
        let err = self.guard.classify_failure(
            operation,
            R::COLLECTION,
            key,
            response.status,
            problem,
        );
        tracing::debug!(
            collection = R::COLLECTION,
            %operation,
            status = response.status,
            error = %err,
            "request failed"
        );
        err
    }
}
