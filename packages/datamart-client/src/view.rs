//! Headless list and form views.
//!
//! A `ListView` holds a filter and the page last read for it. A
//! `FormSession` drives one create or edit through validation, the
//! concurrency guard and the repository. Mutations made through a list view
//! complete before the view refreshes.

use datamart_core::buffer::FormIntent;
use datamart_core::filter::{ListFilter, Page, PageInfo};
use datamart_core::{DatamartError, FieldErrors, Record, RecordKey, Result};

use crate::repository::Repository;

/// Filtered, paged listing of one collection.
pub struct ListView<R: Record> {
    repository: Repository<R>,
    filter: ListFilter,
    page: Page<R>,
}

impl<R: Record> ListView<R> {
    pub fn new(repository: Repository<R>, filter: ListFilter) -> Self {
        Self {
            repository,
            filter,
            page: Page::empty(),
        }
    }

    pub fn filter(&self) -> &ListFilter {
        &self.filter
    }

    /// Rows of the last refresh, each carrying identity and version token.
    pub fn rows(&self) -> &[R] {
        &self.page.records
    }

    pub fn page_info(&self) -> Option<&PageInfo> {
        self.page.page_info.as_ref()
    }

    pub fn row(&self, key: &RecordKey) -> Option<&R> {
        self.page.records.iter().find(|r| r.key().matches(key))
    }

    /// Re-reads the current page from the server.
    pub async fn refresh(&mut self) -> Result<&[R]> {
        self.page = self.repository.list(&self.filter).await?;
        Ok(&self.page.records)
    }

    pub async fn set_filter(&mut self, filter: ListFilter) -> Result<&[R]> {
        self.filter = filter;
        self.refresh().await
    }

    pub async fn set_page(&mut self, page: u32) -> Result<&[R]> {
        self.filter.set_page(page);
        self.refresh().await
    }

    pub fn open_create(&self, draft: R) -> FormSession<R> {
        FormSession::new(self.repository.clone(), FormIntent::create(draft))
    }

    /// Opens an edit session for a listed row.
    ///
    /// Rows listed without a version token, or not on the current page, are
    /// read by key first so the session always holds a token.
    pub async fn open_edit(&self, key: &RecordKey) -> Result<FormSession<R>> {
        let record = match self.row(key) {
            Some(row) if row.version().is_some_and(|v| !v.is_empty()) => row.clone(),
            _ => self.repository.get_by_id(key).await?,
        };
        Ok(FormSession::new(
            self.repository.clone(),
            FormIntent::edit(record),
        ))
    }

    /// Submits `session`, then refreshes the list.
    pub async fn commit(&mut self, session: &mut FormSession<R>) -> Result<Option<R>> {
        let saved = session.submit().await?;
        self.refresh().await?;
        Ok(saved)
    }

    /// Deletes a row, then refreshes the list.
    pub async fn delete(&mut self, key: &RecordKey) -> Result<()> {
        self.repository.delete_by_id(key).await?;
        self.refresh().await?;
        Ok(())
    }
}

/// One create or edit form.
pub struct FormSession<R: Record> {
    repository: Repository<R>,
    intent: FormIntent<R>,
    /// Set once a create succeeded without returning the stored record.
    created_unidentified: bool,
}

impl<R: Record> FormSession<R> {
    pub fn new(repository: Repository<R>, intent: FormIntent<R>) -> Self {
        Self {
            repository,
            intent,
            created_unidentified: false,
        }
    }

    pub fn intent(&self) -> &FormIntent<R> {
        &self.intent
    }

    pub fn record(&self) -> &R {
        self.intent.record()
    }

    pub fn record_mut(&mut self) -> &mut R {
        self.intent.record_mut()
    }

    pub fn field_errors(&self) -> &FieldErrors {
        self.intent.field_errors()
    }

    pub fn is_read_only(&self, field: &str) -> bool {
        self.intent.is_read_only(field)
    }

    /// False after a create whose stored identity is unknown.
    pub fn has_identity(&self) -> bool {
        !self.created_unidentified
    }

    /// Validates locally, then creates or updates.
    ///
    /// Field messages from a `Validation` failure are attached to the form.
    /// A `Concurrency` failure leaves the form untouched; the caller decides
    /// whether to `reload`.
    ///
    /// After a successful save the session turns into an edit of the saved
    /// record so a second submit carries the new token. A create the server
    /// acknowledged without the stored record leaves the session without an
    /// identity; submitting it again fails with `InvalidKey` instead of
    /// creating a second record.
    pub async fn submit(&mut self) -> Result<Option<R>> {
        if self.created_unidentified {
            return Err(DatamartError::InvalidKey {
                collection: R::COLLECTION.to_string(),
                key: self.record().key().to_string(),
            });
        }
        if !self.intent.validate() {
            return Err(DatamartError::InvalidRecord {
                collection: R::COLLECTION.to_string(),
                errors: self.intent.field_errors().clone(),
            });
        }

        let outcome = match &self.intent {
            FormIntent::Create(create) => self.repository.create(&create.draft).await.map(Some),
            FormIntent::Edit(edit) => self.repository.submit_update(&edit.buffer).await,
        };

        let saved = match outcome {
            Ok(saved) => saved,
            Err(err) => {
                if let DatamartError::Validation { errors, .. } = &err {
                    self.intent.set_field_errors(errors.clone());
                }
                return Err(err);
            }
        };

        match &saved {
            Some(record) if record.version().is_some() => {
                self.intent = FormIntent::edit(record.clone());
            }
            _ if self.intent.is_edit() => self.reload().await?,
            _ => {
                tracing::debug!(
                    collection = R::COLLECTION,
                    "create acknowledged without the stored record"
                );
                self.created_unidentified = true;
            }
        }
        Ok(saved)
    }

    /// Replaces an edit buffer with the server's current record.
    pub async fn reload(&mut self) -> Result<()> {
        if let FormIntent::Edit(edit) = &mut self.intent {
            let current = self.repository.get_by_id(edit.buffer.key()).await?;
            edit.buffer.reload(current);
        }
        Ok(())
    }
}
