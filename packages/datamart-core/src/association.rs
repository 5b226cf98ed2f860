//! Client-held association set for one parent.

use std::collections::BTreeSet;

use crate::error::{DatamartError, Result};
use crate::key::KeyPart;
use crate::record::ParentScoped;

/// Records currently loaded for one parent identity.
///
/// The set is a snapshot of the last `load_for_parent`; duplicate checks run
/// against it without re-fetching, so it can be stale. The server stays the
/// final arbiter.
#[derive(Debug, Clone)]
pub struct AssociationSet<A: ParentScoped> {
    parent: KeyPart,
    records: Vec<A>,
}

impl<A: ParentScoped> AssociationSet<A> {
    pub fn new(parent: KeyPart, records: Vec<A>) -> Self {
        Self { parent, records }
    }

    pub fn empty(parent: KeyPart) -> Self {
        Self::new(parent, Vec::new())
    }

    pub fn parent(&self) -> &KeyPart {
        &self.parent
    }

    pub fn records(&self) -> &[A] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn child_ids(&self) -> BTreeSet<KeyPart> {
        self.records.iter().map(ParentScoped::child_id).collect()
    }

    pub fn contains_child(&self, child: &KeyPart) -> bool {
        self.find_child(child).is_some()
    }

    pub fn find_child(&self, child: &KeyPart) -> Option<&A> {
        let wanted = child.to_string();
        self.records
            .iter()
            .find(|r| r.child_id().to_string() == wanted)
    }

    /// Fails with `DuplicateAssociation` if `child` is already loaded.
    pub fn ensure_absent(&self, child: &KeyPart) -> Result<()> {
        if self.contains_child(child) {
            return Err(DatamartError::DuplicateAssociation {
                collection: A::COLLECTION.to_string(),
                parent: self.parent.to_string(),
                child: child.to_string(),
            });
        }
        Ok(())
    }

    /// Looks up a loaded child, failing with `NotFound` when absent.
    pub fn require_child(&self, child: &KeyPart) -> Result<&A> {
        self.find_child(child)
            .ok_or_else(|| DatamartError::NotFound {
                collection: A::COLLECTION.to_string(),
                key: format!("({}, {})", self.parent, child),
            })
    }

    /// Candidate child ids not yet associated, in candidate order.
    pub fn available<I>(&self, candidates: I) -> Vec<KeyPart>
    where
        I: IntoIterator<Item = KeyPart>,
    {
        let taken: BTreeSet<String> = self
            .records
            .iter()
            .map(|r| r.child_id().to_string())
            .collect();
        candidates
            .into_iter()
            .filter(|c| !taken.contains(&c.to_string()))
            .collect()
    }

    /// Candidate records not yet associated, selected by `child_of`.
    pub fn available_records<'c, C, F>(&self, candidates: &'c [C], child_of: F) -> Vec<&'c C>
    where
        F: Fn(&C) -> KeyPart,
    {
        let taken: BTreeSet<String> = self
            .records
            .iter()
            .map(|r| r.child_id().to_string())
            .collect();
        candidates
            .iter()
            .filter(|c| !taken.contains(&child_of(c).to_string()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CustomerUser, User};
    use crate::record::Record;

    fn link(customer: &str, user: &str) -> CustomerUser {
        CustomerUser {
            customer_id: customer.to_string(),
            user_id: user.to_string(),
            role_id: None,
            user_full_name: None,
            role_name: None,
            version: None,
        }
    }

    fn user(id: &str) -> User {
        User {
            user_id: id.to_string(),
            customer_id: "CUST1".to_string(),
            first_name: id.to_string(),
            last_name: "Test".to_string(),
            email: None,
            is_active: true,
            version: None,
        }
    }

    #[test]
    fn duplicate_child_rejected() {
        let set = AssociationSet::new(KeyPart::from("CUST1"), vec![link("CUST1", "USERA")]);
        let err = set.ensure_absent(&KeyPart::from("USERA")).unwrap_err();
        assert!(matches!(err, DatamartError::DuplicateAssociation { .. }));
        assert!(set.ensure_absent(&KeyPart::from("USERB")).is_ok());
    }

    #[test]
    fn available_is_set_difference() {
        let set = AssociationSet::new(
            KeyPart::from("CUST1"),
            vec![link("CUST1", "USERA"), link("CUST1", "USERC")],
        );
        let candidates = ["USERA", "USERB", "USERC", "USERD"].map(KeyPart::from);
        assert_eq!(
            set.available(candidates),
            vec![KeyPart::from("USERB"), KeyPart::from("USERD")]
        );

        let users = vec![user("USERA"), user("USERB")];
        let free = set.available_records(&users, |u| KeyPart::from(u.user_id.as_str()));
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].user_id, "USERB");
    }

    #[test]
    fn require_child_reports_composite_key() {
        let set = AssociationSet::new(KeyPart::from("CUST1"), vec![link("CUST1", "USERA")]);
        assert!(set.require_child(&KeyPart::from("USERA")).is_ok());
        let err = set.require_child(&KeyPart::from("USERZ")).unwrap_err();
        assert_eq!(
            err,
            DatamartError::NotFound {
                collection: "customerusers".to_string(),
                key: "(CUST1, USERZ)".to_string()
            }
        );
        assert_eq!(
            set.find_child(&KeyPart::from("USERA")).map(Record::key),
            Some(crate::key::RecordKey::composite("CUST1", "USERA"))
        );
    }
}
