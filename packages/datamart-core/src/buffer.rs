//! Edit buffers and form intents.

use crate::error::FieldErrors;
use crate::key::RecordKey;
use crate::record::Record;
use crate::version::VersionToken;

/// Mutable projection of one record for the lifetime of a form session.
///
/// Identity and version are captured when the buffer is created; the guard
/// refuses to build an update if the record's identity later drifts.
#[derive(Debug, Clone)]
pub struct EditBuffer<R: Record> {
    key: RecordKey,
    version: Option<VersionToken>,
    record: R,
    field_errors: FieldErrors,
}

impl<R: Record> EditBuffer<R> {
    pub fn from_record(record: R) -> Self {
        Self {
            key: record.key(),
            version: record.version().cloned(),
            record,
            field_errors: FieldErrors::new(),
        }
    }

    /// Identity captured at creation.
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Version token captured at creation.
    pub fn version(&self) -> Option<&VersionToken> {
        self.version.as_ref()
    }

    pub fn record(&self) -> &R {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut R {
        &mut self.record
    }

    pub fn into_record(self) -> R {
        self.record
    }

    /// True when the edited record still carries the captured identity.
    pub fn identity_intact(&self) -> bool {
        self.record.key() == self.key
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn has_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    pub fn set_field_errors(&mut self, errors: FieldErrors) {
        self.field_errors = errors;
    }

    pub fn clear_errors(&mut self) {
        self.field_errors.clear();
    }

    /// Runs the record's field constraints and stores the outcome.
    pub fn validate(&mut self) -> bool {
        self.field_errors = self.record.validate();
        self.field_errors.is_empty()
    }

    /// Replaces contents with a freshly read record, e.g. after a conflict.
    pub fn reload(&mut self, record: R) {
        *self = Self::from_record(record);
    }
}

/// Form session that will create a new record.
#[derive(Debug, Clone)]
pub struct CreateIntent<R: Record> {
    pub draft: R,
    pub field_errors: FieldErrors,
}

/// Form session editing an existing record.
#[derive(Debug, Clone)]
pub struct EditIntent<R: Record> {
    pub buffer: EditBuffer<R>,
}

/// What a form session is for.
#[derive(Debug, Clone)]
pub enum FormIntent<R: Record> {
    Create(CreateIntent<R>),
    Edit(EditIntent<R>),
}

impl<R: Record> FormIntent<R> {
    pub fn create(draft: R) -> Self {
        FormIntent::Create(CreateIntent {
            draft,
            field_errors: FieldErrors::new(),
        })
    }

    pub fn edit(record: R) -> Self {
        FormIntent::Edit(EditIntent {
            buffer: EditBuffer::from_record(record),
        })
    }

    pub fn record(&self) -> &R {
        match self {
            FormIntent::Create(c) => &c.draft,
            FormIntent::Edit(e) => e.buffer.record(),
        }
    }

    pub fn record_mut(&mut self) -> &mut R {
        match self {
            FormIntent::Create(c) => &mut c.draft,
            FormIntent::Edit(e) => e.buffer.record_mut(),
        }
    }

    pub fn field_errors(&self) -> &FieldErrors {
        match self {
            FormIntent::Create(c) => &c.field_errors,
            FormIntent::Edit(e) => e.buffer.field_errors(),
        }
    }

    pub fn set_field_errors(&mut self, errors: FieldErrors) {
        match self {
            FormIntent::Create(c) => c.field_errors = errors,
            FormIntent::Edit(e) => e.buffer.set_field_errors(errors),
        }
    }

    /// Runs local field constraints, storing failures on the intent.
    pub fn validate(&mut self) -> bool {
        let errors = self.record().validate();
        let ok = errors.is_empty();
        self.set_field_errors(errors);
        ok
    }

    /// Whether `field` must be rendered read-only.
    ///
    /// Identity fields are fixed once a record exists; on create they are
    /// fixed only when the server assigns them.
    pub fn is_read_only(&self, field: &str) -> bool {
        if R::READ_ONLY_FIELDS.contains(&field) {
            return true;
        }
        let is_key = R::KEY_FIELDS.contains(&field);
        match self {
            FormIntent::Create(_) => is_key && R::SERVER_ASSIGNED_KEY,
            FormIntent::Edit(_) => is_key,
        }
    }

    pub fn is_edit(&self) -> bool {
        matches!(self, FormIntent::Edit(_))
    }
}
