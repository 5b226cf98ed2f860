//! Association manager for parent-scoped record sets.

use datamart_core::association::AssociationSet;
use datamart_core::filter::ListFilter;
use datamart_core::{DatamartError, KeyPart, ParentScoped, Result, VersionToken};

use crate::repository::Repository;

/// Manages the records attached to one parent identity.
///
/// The manager owns the slice it loaded; nothing is shared with other
/// managers or views. Every successful mutation is followed by a reload from
/// the server rather than a local patch.
pub struct AssociationManager<A: ParentScoped> {
    repository: Repository<A>,
    set: AssociationSet<A>,
}

impl<A: ParentScoped> AssociationManager<A> {
    pub fn new(repository: Repository<A>) -> Self {
        Self {
            repository,
            set: AssociationSet::empty(KeyPart::Text(String::new())),
        }
    }

    /// Parent the loaded set belongs to.
    pub fn parent(&self) -> &KeyPart {
        self.set.parent()
    }

    pub fn set(&self) -> &AssociationSet<A> {
        &self.set
    }

    pub fn records(&self) -> &[A] {
        self.set.records()
    }

    /// Loads the set for `parent`. A blank parent yields an empty set
    /// without contacting the server.
    pub async fn load_for_parent(&mut self, parent: &KeyPart) -> Result<&[A]> {
        if parent.is_blank() {
            self.set = AssociationSet::empty(parent.clone());
            return Ok(self.set.records());
        }

        let filter = ListFilter::for_parent(A::PARENT_FIELD, parent);
        let page = self.repository.list(&filter).await?;

        // unrecognized filters are ignored server-side
        let wanted = parent.to_string();
        let records: Vec<A> = page
            .records
            .into_iter()
            .filter(|r| r.parent_id().to_string() == wanted)
            .collect();

        tracing::debug!(
            collection = A::COLLECTION,
            parent = %parent,
            count = records.len(),
            "loaded association set"
        );
        self.set = AssociationSet::new(parent.clone(), records);
        Ok(self.set.records())
    }

    /// Reloads the current parent's set from the server.
    pub async fn refresh(&mut self) -> Result<&[A]> {
        let parent = self.set.parent().clone();
        self.load_for_parent(&parent).await
    }

    /// Associates `child` with the loaded parent.
    ///
    /// Fails with `DuplicateAssociation` before any request when the child is
    /// already in the loaded set.
    pub async fn add(&mut self, child: &KeyPart, attributes: A::Attributes) -> Result<()> {
        self.require_parent()?;
        self.set.ensure_absent(child)?;

        let draft = A::compose(self.set.parent(), child, attributes)?;
        let errors = draft.validate();
        if !errors.is_empty() {
            return Err(DatamartError::InvalidRecord {
                collection: A::COLLECTION.to_string(),
                errors,
            });
        }

        self.repository.create(&draft).await?;
        self.refresh().await?;
        Ok(())
    }

    /// Replaces the attributes of an associated child.
    ///
    /// `version` is the token the caller read with the record; identity is
    /// taken from the loaded set and never changes.
    pub async fn edit(
        &mut self,
        child: &KeyPart,
        attributes: A::Attributes,
        version: Option<&VersionToken>,
    ) -> Result<()> {
        self.require_parent()?;
        let mut draft = self.set.require_child(child)?.clone();
        let key = draft.key();
        draft.apply(attributes);

        self.repository.update(&key, &draft, version).await?;
        self.refresh().await?;
        Ok(())
    }

    /// Removes the association of `child` and reloads the set.
    pub async fn remove(&mut self, child: &KeyPart) -> Result<()> {
        self.require_parent()?;
        let key = self.set.require_child(child)?.key();

        self.repository.delete_by_id(&key).await?;
        self.refresh().await?;
        Ok(())
    }

    /// Candidate child ids not yet associated, recomputed from current state.
    pub fn available_children<I>(&self, candidates: I) -> Vec<KeyPart>
    where
        I: IntoIterator<Item = KeyPart>,
    {
        self.set.available(candidates)
    }

    /// Candidate records not yet associated.
    pub fn available_records<'c, C, F>(&self, candidates: &'c [C], child_of: F) -> Vec<&'c C>
    where
        F: Fn(&C) -> KeyPart,
    {
        self.set.available_records(candidates, child_of)
    }

    fn require_parent(&self) -> Result<()> {
        if self.set.parent().is_blank() {
            return Err(DatamartError::InvalidKey {
                collection: A::COLLECTION.to_string(),
                key: self.set.parent().to_string(),
            });
        }
        Ok(())
    }
}
