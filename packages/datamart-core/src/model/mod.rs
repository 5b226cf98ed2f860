//! Entity and association records of the datamart catalog.

mod cube;
mod customer;
mod fact;
mod report;
mod security;

pub use cube::{Cube, Cubeset, CubesetAttributes, Dimension};
pub use customer::Customer;
pub use fact::{CalcType, CalcTypeDisplay, Fact, FactColumn, FactColumnAttributes, FactColumnCalcType};
pub use report::{DisplayOrder, RdlGroup, RdlGroupFactColumn};
pub use security::{
    CubeUser, CubeUserAttributes, CustomerUser, CustomerUserAttributes, Role, RoleAttributes, User,
};

use crate::record::Record;

/// Static description of one collection resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: &'static str,
    pub key_fields: &'static [&'static str],
    pub server_assigned_key: bool,
    pub read_only_fields: &'static [&'static str],
}

impl CollectionInfo {
    pub fn of<R: Record>() -> Self {
        Self {
            name: R::COLLECTION,
            key_fields: R::KEY_FIELDS,
            server_assigned_key: R::SERVER_ASSIGNED_KEY,
            read_only_fields: R::READ_ONLY_FIELDS,
        }
    }
}

/// Every collection the console administers.
pub fn catalog() -> Vec<CollectionInfo> {
    vec![
        CollectionInfo::of::<Customer>(),
        CollectionInfo::of::<Cube>(),
        CollectionInfo::of::<Cubeset>(),
        CollectionInfo::of::<Dimension>(),
        CollectionInfo::of::<Fact>(),
        CollectionInfo::of::<FactColumn>(),
        CollectionInfo::of::<CalcType>(),
        CollectionInfo::of::<FactColumnCalcType>(),
        CollectionInfo::of::<Role>(),
        CollectionInfo::of::<User>(),
        CollectionInfo::of::<CustomerUser>(),
        CollectionInfo::of::<CubeUser>(),
        CollectionInfo::of::<RdlGroup>(),
        CollectionInfo::of::<RdlGroupFactColumn>(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{KeyPart, RecordKey};
    use crate::record::{ParentScoped, VERSION_FIELD};
    use crate::DatamartError;

    #[test]
    fn version_serialized_under_timestamp() {
        let json = serde_json::json!({
            "customer_id": "CUST1",
            "customer_name": "Acme",
            "timestamp": "AAAAAAAAB9E="
        });
        let customer: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(customer.version().unwrap().as_str(), "AAAAAAAAB9E=");
        assert!(customer.is_active);

        let back = serde_json::to_value(&customer).unwrap();
        assert_eq!(back[VERSION_FIELD], "AAAAAAAAB9E=");
    }

    #[test]
    fn composite_keys_follow_parent_child_order() {
        let link = CustomerUser::compose(
            &KeyPart::from("CUST1"),
            &KeyPart::from("USERA"),
            CustomerUserAttributes { role_id: Some(3) },
        )
        .unwrap();
        assert_eq!(link.key(), RecordKey::composite("CUST1", "USERA"));
        assert_eq!(link.parent_id(), KeyPart::from("CUST1"));
        assert_eq!(link.child_id(), KeyPart::from("USERA"));
    }

    #[test]
    fn compose_rejects_unusable_parent() {
        let err = RdlGroupFactColumn::compose(
            &KeyPart::from("not-a-number"),
            &KeyPart::Int(4),
            DisplayOrder(1),
        )
        .unwrap_err();
        assert!(matches!(err, DatamartError::InvalidKey { .. }));
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<_> = catalog().iter().map(|c| c.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), catalog().len());
    }

    #[test]
    fn apply_keeps_identity() {
        let mut column = FactColumn::compose(
            &KeyPart::Int(2),
            &KeyPart::from("Amount"),
            FactColumnAttributes {
                data_type: "decimal".to_string(),
                is_measure: true,
                format_string: None,
            },
        )
        .unwrap();
        column.apply(FactColumnAttributes {
            data_type: "money".to_string(),
            is_measure: true,
            format_string: Some("#,##0.00".to_string()),
        });
        assert_eq!(column.child_id(), KeyPart::from("Amount"));
        assert_eq!(column.fact_id, 2);
        assert_eq!(column.data_type, "money");
    }
}
